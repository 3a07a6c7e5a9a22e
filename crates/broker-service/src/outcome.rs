//! 호출자에게 돌려주는 구조화된 결과 타입.
//!
//! 모든 오케스트레이터 작업은 에러를 전파하지 않고 이 타입들로 변환합니다.
//!
//! ```json
//! {
//!   "ok": false,
//!   "message": "Validation failed: Dhan Access Token seems too short ...",
//!   "errors": ["Dhan Access Token seems too short ..."],
//!   "error_code": "validation"
//! }
//! ```

use broker_core::{BrokerError, SessionSummary};
use broker_store::SessionStats;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// 작업 결과.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    /// 성공 여부
    pub ok: bool,
    /// 사람이 읽을 수 있는 메시지 (비밀 값은 포함하지 않음)
    pub message: String,
    /// 작업별 데이터
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// 필드별 검증 에러
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// 재연결이 필요한 경우 `true`
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub auth_error: bool,
    /// 브라우저 로그인이 필요한 경우 `true`
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub requires_redirect: bool,
    /// 브라우저 로그인 URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    /// 에러 분류 코드 (validation, not_registered, transport, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl Outcome {
    /// 성공 결과.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            data: None,
            errors: Vec::new(),
            auth_error: false,
            requires_redirect: false,
            redirect_url: None,
            error_code: None,
        }
    }

    /// 실패 결과.
    pub fn failure(code: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error_code: Some(code.to_string()),
            ..Self::success(message)
        }
    }

    /// 재연결이 필요한 실패 결과.
    pub fn auth_failure(message: impl Into<String>) -> Self {
        Self {
            auth_error: true,
            ..Self::failure("auth_expired", message)
        }
    }

    /// 브로커 에러를 결과로 변환합니다.
    pub fn from_error(err: &BrokerError) -> Self {
        match err {
            BrokerError::Validation(errors) => Self {
                errors: errors.clone(),
                ..Self::failure(err.kind(), err.to_string())
            },
            BrokerError::NotRegistered { .. } => Self::failure(err.kind(), err.to_string()),
            BrokerError::Transport(msg) => Self::failure(err.kind(), msg.clone()),
            BrokerError::AuthExpired(msg) => Self::auth_failure(msg.clone()),
            BrokerError::Encryption(_) => Self::failure(
                err.kind(),
                "Stored credentials could not be decrypted. Please register your credentials again.",
            ),
            BrokerError::Storage(_) => Self::failure(
                err.kind(),
                "Could not access broker storage. Please try again.",
            ),
            BrokerError::Config(_) => Self::failure(err.kind(), err.to_string()),
        }
    }

    /// 데이터 설정.
    pub fn with_data<T: Serialize>(mut self, data: T) -> Self {
        self.data = serde_json::to_value(data).ok();
        self
    }

    /// 리다이렉트 설정.
    pub fn with_redirect(mut self, url: impl Into<String>) -> Self {
        self.requires_redirect = true;
        self.redirect_url = Some(url.into());
        self
    }
}

/// 연결 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// 활성 세션이 있고 브로커가 확인함
    Connected,
    /// 세션 검증 실패로 무효화됨
    Expired,
    /// 자격증명은 있지만 활성 세션 없음
    NotConnected,
    /// 자격증명 없음
    NotRegistered,
    /// 브로커에 도달하지 못해 확인 불가 (세션 유지)
    Unreachable,
    /// 저장소/복호화 오류
    Error,
}

/// 상태 확인 결과.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub connected: bool,
    pub state: ConnectionState,
    /// 브로커 도달 가능 여부
    pub reachable: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionSummary>,
}

impl StatusReport {
    pub(crate) fn new(state: ConnectionState, message: impl Into<String>) -> Self {
        Self {
            connected: state == ConnectionState::Connected,
            state,
            reachable: state != ConnectionState::Unreachable,
            message: message.into(),
            session: None,
        }
    }

    pub(crate) fn with_session(mut self, session: SessionSummary) -> Self {
        self.session = Some(session);
        self
    }
}

/// 초기화 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InitReport {
    pub accounts_loaded: usize,
    pub active_sessions: usize,
    pub expired_cleaned: usize,
    pub sessions_purged: usize,
}

/// 상태 점검 결과.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub credentials_count: usize,
    pub sessions: SessionStats,
    pub timestamp: DateTime<Utc>,
}
