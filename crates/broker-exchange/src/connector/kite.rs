//! Zerodha Kite Connect 어댑터.
//!
//! Kite는 서버 측에서 로그인을 완료할 수 없으므로 연결 시작 시
//! 브라우저 로그인 URL을 돌려주고 세션은 만들지 않습니다.
//! 검증과 조회는 `Authorization: token <api_key>:<access_token>` 헤더를 사용합니다.

use async_trait::async_trait;
use broker_core::{BrokerEndpointConfig, BrokerKind, FetchKind};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::info;

use crate::credentials::BrokerCredentials;
use crate::error::{AdapterError, AdapterResult};
use crate::http;
use crate::outcome::{ConnectOutcome, FetchFailure, FetchOutcome, VerifyOutcome};
use crate::traits::{BrokerAdapter, SessionContext};

const DEFAULT_LOGIN_URL: &str = "https://kite.zerodha.com/connect/login";
const KITE_API_VERSION: &str = "3";
const MIN_API_KEY_LEN: usize = 10;

/// Kite 어댑터.
#[derive(Debug)]
pub struct KiteAdapter {
    client: Client,
    config: BrokerEndpointConfig,
}

impl KiteAdapter {
    /// 엔드포인트 설정으로 어댑터 생성.
    pub fn new(config: BrokerEndpointConfig) -> AdapterResult<Self> {
        Ok(Self {
            client: http::build_client()?,
            config,
        })
    }

    /// 브라우저 로그인 URL.
    pub fn login_url(&self, api_key: &str) -> String {
        let base = self.config.login_url.as_deref().unwrap_or(DEFAULT_LOGIN_URL);
        format!("{}?api_key={}&v={}", base, api_key, KITE_API_VERSION)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn auth_headers(credentials: &BrokerCredentials) -> Option<AdapterResult<HeaderMap>> {
        let api_key = credentials.api_key.as_ref()?;
        let access_token = credentials.access_token.as_ref()?;

        let authorization = format!(
            "token {}:{}",
            api_key.expose_secret(),
            access_token.expose_secret()
        );
        Some(http::secret_header(&authorization).map(|auth| {
            http::headers([
                ("authorization", auth),
                ("x-kite-version", HeaderValue::from_static(KITE_API_VERSION)),
            ])
        }))
    }
}

/// API 키 형식 확인: 최소 길이 이상이고 `_`/`-`를 제외하면 영숫자만 포함.
pub fn is_valid_api_key(api_key: &str) -> bool {
    api_key.chars().count() >= MIN_API_KEY_LEN
        && api_key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && api_key.chars().any(|c| c.is_ascii_alphanumeric())
}

fn positions_list(body: Value) -> Option<Vec<Value>> {
    match body.get("data")?.get("net")? {
        Value::Array(items) => Some(items.clone()),
        Value::Null => Some(Vec::new()),
        _ => None,
    }
}

#[async_trait]
impl BrokerAdapter for KiteAdapter {
    fn kind(&self) -> BrokerKind {
        BrokerKind::Kite
    }

    async fn initiate_connect(
        &self,
        credentials: &BrokerCredentials,
    ) -> AdapterResult<ConnectOutcome> {
        let api_key = credentials.api_key.as_ref().ok_or_else(|| {
            AdapterError::MissingCredentials(
                "Kite API Key is missing. Please register your credentials again.".to_string(),
            )
        })?;

        if !is_valid_api_key(api_key.expose_secret()) {
            return Err(AdapterError::InvalidCredentials(
                "Kite API Key format appears invalid. Please check and register the correct API Key."
                    .to_string(),
            ));
        }

        info!(user_id = %credentials.user_id, "Kite login redirect prepared");

        Ok(ConnectOutcome::Redirect {
            url: self.login_url(api_key.expose_secret()),
            message: "Redirecting to Kite login. Please complete the authentication process."
                .to_string(),
        })
    }

    async fn verify(&self, ctx: SessionContext<'_>) -> VerifyOutcome {
        let headers = match Self::auth_headers(ctx.credentials) {
            Some(Ok(headers)) => headers,
            Some(Err(e)) => {
                return VerifyOutcome::Rejected {
                    status: None,
                    reason: e.to_string(),
                }
            }
            None => {
                return VerifyOutcome::Rejected {
                    status: None,
                    reason: "Kite access token is missing. Complete the Kite login first."
                        .to_string(),
                }
            }
        };

        http::verify_get(
            BrokerKind::Kite,
            &self.client,
            &self.endpoint("/user/profile"),
            headers,
            self.config.verify_timeout(),
        )
        .await
    }

    async fn fetch(&self, kind: FetchKind, ctx: SessionContext<'_>) -> FetchOutcome {
        let Some(Ok(headers)) = Self::auth_headers(ctx.credentials) else {
            return FetchOutcome::Failed(FetchFailure::MissingCredentials);
        };

        let (path, extract): (&str, fn(Value) -> Option<Vec<Value>>) = match kind {
            FetchKind::Orders => ("/orders", http::data_list),
            FetchKind::Positions => ("/portfolio/positions", positions_list),
            FetchKind::Trades => ("/trades", http::data_list),
        };

        http::fetch_get(
            BrokerKind::Kite,
            &self.client,
            &self.endpoint(path),
            headers,
            self.config.request_timeout(),
            extract,
        )
        .await
    }
}
