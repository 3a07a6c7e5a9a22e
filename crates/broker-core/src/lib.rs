//! # Broker Core
//!
//! 브로커 연결 관리자의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 다른 모든 크레이트가 공유하는 기본 타입을 제공합니다:
//! - 브로커 식별자 및 조회 데이터 종류
//! - 자격증명 레코드와 세션 레코드
//! - 설정 관리
//! - 로깅 인프라
//! - 자격증명 암호화

pub mod config;
pub mod crypto;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use config::*;
pub use crypto::{CredentialEncryptor, CryptoError};
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
