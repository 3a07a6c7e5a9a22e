//! 브로커 연결 관리자의 에러 타입.
//!
//! 이 모듈은 오케스트레이터 경계에서 구조화된 결과로 변환되는
//! 에러 분류 체계를 정의합니다.

use crate::types::BrokerKind;
use thiserror::Error;

/// 핵심 에러.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// 등록 필드 검증 실패 (필드별 메시지)
    #[error("Validation failed: {}", .0.join(" "))]
    Validation(Vec<String>),

    /// 해당 브로커/사용자의 자격증명이 없음
    #[error("No saved credentials found for {} user {user_id}. Please register your credentials first.", .broker.display_name())]
    NotRegistered { broker: BrokerKind, user_id: String },

    /// 네트워크 타임아웃/연결 실패
    #[error("Transport error: {0}")]
    Transport(String),

    /// 세션 검증 실패 (재연결 필요)
    #[error("Authentication expired: {0}")]
    AuthExpired(String),

    /// 암호문 손상 또는 키 불일치
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// 영속 저장소 에러
    #[error("Storage error: {0}")]
    Storage(String),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),
}

/// 브로커 작업을 위한 Result 타입.
pub type BrokerResult<T> = Result<T, BrokerError>;

impl BrokerError {
    /// 재시도 가능한 에러인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BrokerError::Transport(_) | BrokerError::Storage(_))
    }

    /// 재연결(재인증)이 필요한 에러인지 확인합니다.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, BrokerError::AuthExpired(_))
    }

    /// 짧은 에러 분류 코드.
    pub fn kind(&self) -> &'static str {
        match self {
            BrokerError::Validation(_) => "validation",
            BrokerError::NotRegistered { .. } => "not_registered",
            BrokerError::Transport(_) => "transport",
            BrokerError::AuthExpired(_) => "auth_expired",
            BrokerError::Encryption(_) => "encryption",
            BrokerError::Storage(_) => "storage",
            BrokerError::Config(_) => "config",
        }
    }
}

impl From<crate::crypto::CryptoError> for BrokerError {
    fn from(err: crate::crypto::CryptoError) -> Self {
        BrokerError::Encryption(err.to_string())
    }
}

impl From<serde_json::Error> for BrokerError {
    fn from(err: serde_json::Error) -> Self {
        BrokerError::Storage(err.to_string())
    }
}

impl From<config::ConfigError> for BrokerError {
    fn from(err: config::ConfigError) -> Self {
        BrokerError::Config(err.to_string())
    }
}
