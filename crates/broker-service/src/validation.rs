//! 자격증명 등록 검증.
//!
//! 브로커마다 필수 필드와 최소 길이 규칙이 다릅니다. 검증은 필드별 메시지를
//! 모두 모아 반환하므로 호출자가 필드 단위로 피드백을 표시할 수 있습니다.

use broker_core::{
    BrokerKind, CredentialFields, SessionConfig, FIELD_REMEMBER_SESSION, FIELD_SESSION_DURATION,
};
use serde_json::Value;

/// 템플릿 자리표시자 접두사 (예: `your_kite_api_key`).
const PLACEHOLDER_PREFIX: &str = "your_";

/// 필드 규칙.
struct FieldRule {
    name: &'static str,
    label: &'static str,
    min_len: usize,
    noun: &'static str,
}

const KITE_RULES: &[FieldRule] = &[
    FieldRule { name: "api_key", label: "API Key", min_len: 10, noun: "key" },
    FieldRule { name: "api_secret", label: "API Secret", min_len: 10, noun: "secret" },
];

const DHAN_RULES: &[FieldRule] = &[
    FieldRule { name: "client_id", label: "Client ID", min_len: 5, noun: "Client ID" },
    FieldRule { name: "access_token", label: "Access Token", min_len: 20, noun: "token" },
];

const ANGEL_RULES: &[FieldRule] = &[
    FieldRule { name: "api_key", label: "API Key", min_len: 8, noun: "key" },
    FieldRule { name: "api_secret", label: "API Secret", min_len: 10, noun: "secret" },
];

fn rules_for(broker: BrokerKind) -> &'static [FieldRule] {
    match broker {
        BrokerKind::Kite => KITE_RULES,
        BrokerKind::Dhan => DHAN_RULES,
        BrokerKind::Angel => ANGEL_RULES,
    }
}

/// 검증을 통과한 등록 요청.
#[derive(Clone, PartialEq)]
pub struct ValidRegistration {
    /// 최종 사용자 ID (Dhan은 비어 있으면 Client ID 사용)
    pub user_id: String,
    /// 저장할 필드 (공백 제거됨, 알 수 없는 필드는 제외)
    pub fields: CredentialFields,
}

impl std::fmt::Debug for ValidRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidRegistration")
            .field("user_id", &self.user_id)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn text(fields: &CredentialFields, name: &str) -> String {
    fields
        .get(name)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn is_placeholder(value: &str) -> bool {
    value.to_ascii_lowercase().starts_with(PLACEHOLDER_PREFIX)
}

/// 등록 요청을 검증합니다.
///
/// 실패 시 필드별 메시지 목록을 반환합니다. 메시지에는 입력 값이 포함되지 않습니다.
pub fn validate_registration(
    broker: BrokerKind,
    user_id: &str,
    fields: &CredentialFields,
    sessions: &SessionConfig,
) -> Result<ValidRegistration, Vec<String>> {
    let name = broker.display_name();
    let mut errors = Vec::new();
    let mut accepted = CredentialFields::new();

    for rule in rules_for(broker) {
        let value = text(fields, rule.name);
        if value.is_empty() || is_placeholder(&value) {
            errors.push(format!(
                "{name} {} is required and cannot be empty. Please enter your {name} {}.",
                rule.label, rule.label
            ));
        } else if value.chars().count() < rule.min_len {
            errors.push(format!(
                "{name} {} seems too short (minimum length is {} characters). Please check and enter the correct {}.",
                rule.label, rule.min_len, rule.noun
            ));
        } else {
            accepted.insert(rule.name.to_string(), Value::String(value));
        }
    }

    let mut user_id = user_id.trim().to_string();
    if user_id.is_empty() && broker == BrokerKind::Dhan {
        user_id = text(fields, "client_id");
    }
    if user_id.is_empty() {
        errors.insert(
            0,
            "User ID is required. Please enter your trading account User ID.".to_string(),
        );
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let remember = fields
        .get(FIELD_REMEMBER_SESSION)
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if remember {
        accepted.insert(FIELD_REMEMBER_SESSION.to_string(), Value::Bool(true));
        accepted.insert(
            FIELD_SESSION_DURATION.to_string(),
            Value::from(sessions.remembered_ttl().num_seconds()),
        );
    }

    Ok(ValidRegistration {
        user_id,
        fields: accepted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> CredentialFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_dhan_short_token_mentions_minimum_length() {
        let f = fields(&[
            ("client_id", json!("1100012345")),
            ("access_token", json!("short-token")),
        ]);
        let errors =
            validate_registration(BrokerKind::Dhan, "CID1", &f, &SessionConfig::default())
                .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Access Token"));
        assert!(errors[0].contains("minimum length is 20"));
        assert!(!errors[0].contains("short-token"));
    }

    #[test]
    fn test_all_field_errors_are_collected() {
        let errors = validate_registration(
            BrokerKind::Kite,
            "",
            &CredentialFields::new(),
            &SessionConfig::default(),
        )
        .unwrap_err();

        assert_eq!(errors.len(), 3);
        assert!(errors[0].starts_with("User ID is required"));
        assert!(errors[1].contains("Kite API Key is required"));
        assert!(errors[2].contains("Kite API Secret is required"));
    }

    #[test]
    fn test_placeholder_rejected_as_missing() {
        let f = fields(&[
            ("api_key", json!("your_kite_api_key")),
            ("api_secret", json!("realsecret123")),
        ]);
        let errors =
            validate_registration(BrokerKind::Kite, "U1", &f, &SessionConfig::default())
                .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("cannot be empty"));
    }

    #[test]
    fn test_dhan_user_id_falls_back_to_client_id() {
        let f = fields(&[
            ("client_id", json!("  1100012345 ")),
            ("access_token", json!("abcdefghijklmnopqrstuvwxy")),
        ]);
        let valid =
            validate_registration(BrokerKind::Dhan, "  ", &f, &SessionConfig::default()).unwrap();

        assert_eq!(valid.user_id, "1100012345");
        assert_eq!(valid.fields["client_id"], "1100012345");
    }

    #[test]
    fn test_remember_session_adds_duration_and_drops_unknown_fields() {
        let f = fields(&[
            ("api_key", json!("angelkey1")),
            ("api_secret", json!("angelsecret1")),
            ("remember_session", json!(true)),
            ("nickname", json!("main")),
        ]);
        let valid =
            validate_registration(BrokerKind::Angel, "A1", &f, &SessionConfig::default()).unwrap();

        assert_eq!(valid.fields[FIELD_REMEMBER_SESSION], true);
        assert_eq!(valid.fields[FIELD_SESSION_DURATION], 2_592_000);
        assert!(!valid.fields.contains_key("nickname"));
    }

    #[test]
    fn test_debug_does_not_render_values() {
        let f = fields(&[
            ("api_key", json!("angelkey1")),
            ("api_secret", json!("angelsecret1")),
        ]);
        let valid =
            validate_registration(BrokerKind::Angel, "A1", &f, &SessionConfig::default()).unwrap();
        let rendered = format!("{valid:?}");
        assert!(!rendered.contains("angelkey1"));
        assert!(!rendered.contains("angelsecret1"));
    }
}
