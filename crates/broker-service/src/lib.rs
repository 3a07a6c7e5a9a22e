//! # Broker Service
//!
//! 브로커 연결 관리자. 외부 호출자(CLI, 웹 계층)는 이 크레이트의
//! [`ConnectionManager`]만 사용합니다.
//!
//! - 등록: 브로커별 필드 검증 후 암호화 저장
//! - 연결/상태/연결 해제/조회: 모든 결과는 구조화된 [`Outcome`]으로 반환
//! - 토큰 가져오기: 외부에서 발급받은 액세스 토큰으로 세션 생성

pub mod manager;
pub mod outcome;
pub mod token_import;
pub mod validation;

pub use manager::ConnectionManager;
pub use outcome::{ConnectionState, HealthReport, InitReport, Outcome, StatusReport};
pub use token_import::{TokenFileError, TokenImport};
pub use validation::{validate_registration, ValidRegistration};
