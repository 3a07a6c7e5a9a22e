//! 브로커 세션 레코드.
//!
//! 세션은 (브로커, 사용자) 쌍이 현재 인증되어 있다는 시간 제한 주장입니다.
//! 상태 전이: `Active` → `Expired` (만료 시각 경과 시 지연 전이 또는 정리 시)
//! / `Active` → `Invalidated` (연결 해제 또는 검증 실패 시).

use crate::types::BrokerKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 세션 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// 활성
    Active,
    /// 만료됨
    Expired,
    /// 무효화됨
    Invalidated,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Expired => write!(f, "expired"),
            SessionStatus::Invalidated => write!(f, "invalidated"),
        }
    }
}

/// 세션 생성 요청.
///
/// `expires_at`이 없으면 저장소의 기본 만료 시간이 적용됩니다.
/// `data`에는 브로커별 비밀이 아닌 메타데이터만 담습니다.
#[derive(Debug, Clone, Default)]
pub struct SessionPayload {
    /// 브로커가 제공한 만료 시각
    pub expires_at: Option<DateTime<Utc>>,
    /// 브로커별 메타데이터
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl SessionPayload {
    /// 빈 페이로드 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 만료 시각 설정.
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// 메타데이터 항목 추가.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// 저장된 세션.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub broker: BrokerKind,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: SessionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalidated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl Session {
    /// 주어진 시각 기준으로 만료 시각이 지났는지 확인.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// 주어진 시각 기준으로 활성 세션인지 확인 (상태 active + 미만료).
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Active && !self.is_expired_at(now)
    }

    /// (브로커, 사용자) 쌍이 일치하는지 확인.
    pub fn belongs_to(&self, broker: BrokerKind, user_id: &str) -> bool {
        self.broker == broker && self.user_id == user_id
    }

    /// 메타데이터 문자열 값 조회.
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// 호출자에게 보여줄 요약.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            broker: self.broker,
            user_id: self.user_id.clone(),
            status: self.status,
            created_at: self.created_at,
            last_activity: self.last_activity,
            expires_at: self.expires_at,
        }
    }
}

/// 세션 요약.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub broker: BrokerKind,
    pub user_id: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
