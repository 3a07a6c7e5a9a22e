//! 브로커 연결 관리 전반에서 사용되는 공통 타입.

mod broker;
mod fetch_kind;

pub use broker::*;
pub use fetch_kind::*;
