//! 어댑터에 전달되는 자격증명.
//!
//! 보관소에서 복호화한 값을 `SecretString`으로 감싸 요청 헤더를 만들 때만 노출합니다.

use broker_core::{BrokerKind, CredentialRecord};
use secrecy::SecretString;

/// 어댑터용 자격증명.
#[derive(Debug)]
pub struct BrokerCredentials {
    pub broker: BrokerKind,
    pub user_id: String,
    pub api_key: Option<SecretString>,
    pub api_secret: Option<SecretString>,
    pub access_token: Option<SecretString>,
    pub client_id: Option<SecretString>,
    /// "로그인 유지" 선택 여부
    pub remember_session: bool,
}

impl BrokerCredentials {
    /// 빈 자격증명 생성.
    pub fn new(broker: BrokerKind, user_id: impl Into<String>) -> Self {
        Self {
            broker,
            user_id: user_id.into(),
            api_key: None,
            api_secret: None,
            access_token: None,
            client_id: None,
            remember_session: false,
        }
    }

    pub fn with_api_key(mut self, value: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(value.into()));
        self
    }

    pub fn with_api_secret(mut self, value: impl Into<String>) -> Self {
        self.api_secret = Some(SecretString::from(value.into()));
        self
    }

    pub fn with_access_token(mut self, value: impl Into<String>) -> Self {
        self.access_token = Some(SecretString::from(value.into()));
        self
    }

    pub fn with_client_id(mut self, value: impl Into<String>) -> Self {
        self.client_id = Some(SecretString::from(value.into()));
        self
    }

    pub fn with_remember_session(mut self, remember: bool) -> Self {
        self.remember_session = remember;
        self
    }
}

impl From<&CredentialRecord> for BrokerCredentials {
    fn from(record: &CredentialRecord) -> Self {
        let secret = |name: &str| {
            record
                .field_str(name)
                .map(|v| SecretString::from(v.to_string()))
        };

        Self {
            broker: record.broker,
            user_id: record.user_id.clone(),
            api_key: secret("api_key"),
            api_secret: secret("api_secret"),
            access_token: secret("access_token"),
            client_id: secret("client_id"),
            remember_session: record.remember_session(),
        }
    }
}
