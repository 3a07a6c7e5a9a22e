//! 어댑터 에러 타입.
//!
//! 메시지는 호출자에게 그대로 보여줄 수 있는 문장이며 자격증명 값을 담지 않습니다.

use broker_core::BrokerError;
use thiserror::Error;

/// 브로커 어댑터 에러.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// 필요한 자격증명 필드 누락
    #[error("{0}")]
    MissingCredentials(String),

    /// 자격증명 형식 오류
    #[error("{0}")]
    InvalidCredentials(String),

    /// 브로커가 인증을 거부 (401/403)
    #[error("{message}")]
    Unauthorized { status: u16, message: String },

    /// 그 외 비정상 HTTP 상태
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// 요청 타임아웃
    #[error("{0}")]
    Timeout(String),

    /// 연결 실패
    #[error("{0}")]
    Network(String),

    /// HTTP 클라이언트 구성 실패
    #[error("HTTP client error: {0}")]
    Client(String),
}

/// 어댑터 작업을 위한 Result 타입.
pub type AdapterResult<T> = Result<T, AdapterError>;

impl AdapterError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AdapterError::Timeout(_) | AdapterError::Network(_) | AdapterError::Rejected { .. }
        )
    }

    /// 인증 에러인지 확인.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, AdapterError::Unauthorized { .. })
    }

    /// 짧은 에러 분류 코드.
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterError::MissingCredentials(_) | AdapterError::InvalidCredentials(_) => {
                "validation"
            }
            AdapterError::Unauthorized { .. } => "auth_expired",
            AdapterError::Rejected { .. } => "rejected",
            AdapterError::Timeout(_) | AdapterError::Network(_) => "transport",
            AdapterError::Client(_) => "config",
        }
    }
}

impl From<AdapterError> for BrokerError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::MissingCredentials(msg) | AdapterError::InvalidCredentials(msg) => {
                BrokerError::Validation(vec![msg])
            }
            AdapterError::Unauthorized { message, .. } => BrokerError::AuthExpired(message),
            AdapterError::Rejected { message, .. }
            | AdapterError::Timeout(message)
            | AdapterError::Network(message) => BrokerError::Transport(message),
            AdapterError::Client(msg) => BrokerError::Config(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let unauthorized = AdapterError::Unauthorized {
            status: 401,
            message: "denied".to_string(),
        };
        assert!(unauthorized.is_auth_error());
        assert!(!unauthorized.is_retryable());
        assert_eq!(unauthorized.to_string(), "denied");

        let timeout = AdapterError::Timeout("timed out".to_string());
        assert!(timeout.is_retryable());
        assert_eq!(timeout.kind(), "transport");
    }

    #[test]
    fn test_into_broker_error() {
        let err: BrokerError = AdapterError::MissingCredentials("missing".to_string()).into();
        assert_eq!(err.kind(), "validation");

        let err: BrokerError = AdapterError::Network("down".to_string()).into();
        assert!(err.is_retryable());
    }
}
