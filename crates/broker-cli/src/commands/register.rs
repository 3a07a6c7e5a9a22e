//! 등록 명령 인자 처리.

use broker_core::{CredentialFields, FIELD_REMEMBER_SESSION};
use serde_json::Value;

/// 등록 명령에서 받은 자격증명 인자.
#[derive(Default)]
pub struct RegisterArgs {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub client_id: Option<String>,
    pub access_token: Option<String>,
    pub remember: bool,
}

impl RegisterArgs {
    /// 지정된 인자만 등록 필드로 변환합니다.
    pub fn into_fields(self) -> CredentialFields {
        let mut fields = CredentialFields::new();
        let pairs = [
            ("api_key", self.api_key),
            ("api_secret", self.api_secret),
            ("client_id", self.client_id),
            ("access_token", self.access_token),
        ];
        for (name, value) in pairs {
            if let Some(value) = value {
                fields.insert(name.to_string(), Value::String(value));
            }
        }
        if self.remember {
            fields.insert(FIELD_REMEMBER_SESSION.to_string(), Value::Bool(true));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_supplied_fields_are_included() {
        let fields = RegisterArgs {
            client_id: Some("1100012345".to_string()),
            access_token: Some("abcdefghijklmnopqrstuvwxy".to_string()),
            ..Default::default()
        }
        .into_fields();

        assert_eq!(fields.len(), 2);
        assert!(!fields.contains_key("api_key"));
        assert!(!fields.contains_key(FIELD_REMEMBER_SESSION));
    }

    #[test]
    fn test_remember_flag() {
        let fields = RegisterArgs {
            remember: true,
            ..Default::default()
        }
        .into_fields();
        assert_eq!(fields[FIELD_REMEMBER_SESSION], true);
    }
}
