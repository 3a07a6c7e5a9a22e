//! 브로커 연결 관리를 위한 도메인 모델.

mod credential;
mod session;

pub use credential::*;
pub use session::*;
