//! 저장소 오류 타입.

use broker_core::BrokerError;
use thiserror::Error;

/// 저장소 관련 오류.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 파일 입출력 오류
    #[error("IO error: {0}")]
    Io(String),

    /// 직렬화/역직렬화 오류
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 민감 필드 암호화 실패
    #[error("Failed to encrypt field '{field}'")]
    Encryption { field: String },

    /// 저장된 암호문 복호화 실패 (키 불일치 또는 손상)
    #[error("Failed to decrypt field '{field}' of stored credentials")]
    Decryption { field: String },
}

/// 저장소 작업을 위한 Result 타입.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// 재시도 가능한 오류인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Io(_))
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<StoreError> for BrokerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Encryption { .. } | StoreError::Decryption { .. } => {
                BrokerError::Encryption(err.to_string())
            }
            other => BrokerError::Storage(other.to_string()),
        }
    }
}
