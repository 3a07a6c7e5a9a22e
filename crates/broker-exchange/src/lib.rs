//! 브로커 프로토콜 어댑터.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - BrokerAdapter trait: 연결 시작, 세션 검증, 주문/포지션/체결 조회
//! - Kite (로그인 리다이렉트), Dhan (토큰 직접 인증), Angel One (모의) 어댑터
//! - 어댑터 레지스트리: 브로커 종류별 단일 디스패치 지점
//! - 검증/조회 결과 타입: "데이터 없음"과 "도달 실패"를 구분

pub mod connector;
pub mod credentials;
pub mod error;
mod http;
pub mod outcome;
pub mod registry;
pub mod traits;

pub use connector::{AngelAdapter, DhanAdapter, KiteAdapter};
pub use credentials::BrokerCredentials;
pub use error::*;
pub use outcome::*;
pub use registry::AdapterRegistry;
pub use traits::*;
