//! 자격증명 레코드.
//!
//! (브로커, 사용자) 쌍마다 하나의 레코드가 존재합니다. 필드 중 민감한 부분집합은
//! 저장 시 암호화되고, 나머지 필드(예: remember 플래그, 세션 기간)는 평문으로 저장됩니다.

use crate::types::BrokerKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 저장 시 암호화되는 필드 이름.
pub const SENSITIVE_FIELDS: [&str; 4] = ["api_key", "api_secret", "access_token", "client_id"];

/// "기억하기" 플래그 필드.
pub const FIELD_REMEMBER_SESSION: &str = "remember_session";

/// 기억된 세션 기간(초) 필드.
pub const FIELD_SESSION_DURATION: &str = "session_duration";

/// 필드 이름 → 값 매핑.
pub type CredentialFields = BTreeMap<String, serde_json::Value>;

/// 민감 필드인지 확인.
pub fn is_sensitive_field(name: &str) -> bool {
    SENSITIVE_FIELDS.contains(&name)
}

/// 복호화된 자격증명 레코드.
///
/// # 보안
/// - `Debug` 구현은 민감 필드를 마스킹합니다.
#[derive(Clone, PartialEq)]
pub struct CredentialRecord {
    pub broker: BrokerKind,
    pub user_id: String,
    pub fields: CredentialFields,
    pub saved_at: DateTime<Utc>,
}

impl CredentialRecord {
    /// 필드 값을 문자열로 조회 (문자열이 아니거나 비어 있으면 `None`).
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// "기억하기" 플래그 여부.
    pub fn remember_session(&self) -> bool {
        self.fields
            .get(FIELD_REMEMBER_SESSION)
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }

    /// 목록 표시용 요약 (비밀 필드 제외).
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            broker: self.broker,
            user_id: self.user_id.clone(),
            saved_at: self.saved_at,
            remember_session: self.remember_session(),
        }
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: BTreeMap<&str, String> = self
            .fields
            .iter()
            .map(|(name, value)| {
                let shown = if is_sensitive_field(name) {
                    "***REDACTED***".to_string()
                } else {
                    value.to_string()
                };
                (name.as_str(), shown)
            })
            .collect();

        f.debug_struct("CredentialRecord")
            .field("broker", &self.broker)
            .field("user_id", &self.user_id)
            .field("fields", &fields)
            .field("saved_at", &self.saved_at)
            .finish()
    }
}

/// 기억된 계정 목록 항목.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub broker: BrokerKind,
    pub user_id: String,
    pub saved_at: DateTime<Utc>,
    pub remember_session: bool,
}
