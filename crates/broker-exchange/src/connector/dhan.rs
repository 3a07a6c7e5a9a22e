//! Dhan 어댑터.
//!
//! `access-token` 헤더로 포지션 엔드포인트를 호출하여 즉시 연결합니다.
//! 세션 만료는 "로그인 유지" 선택 시 30일, 아니면 8시간입니다.

use async_trait::async_trait;
use broker_core::{BrokerEndpointConfig, BrokerKind, FetchKind, SessionConfig, SessionPayload};
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use tracing::{info, warn};

use crate::credentials::BrokerCredentials;
use crate::error::{AdapterError, AdapterResult};
use crate::http;
use crate::outcome::{ConnectOutcome, FetchFailure, FetchOutcome, VerifyOutcome};
use crate::traits::{BrokerAdapter, SessionContext};

/// Dhan 어댑터.
#[derive(Debug)]
pub struct DhanAdapter {
    client: Client,
    config: BrokerEndpointConfig,
    sessions: SessionConfig,
}

impl DhanAdapter {
    /// 엔드포인트/세션 설정으로 어댑터 생성.
    pub fn new(config: BrokerEndpointConfig, sessions: SessionConfig) -> AdapterResult<Self> {
        Ok(Self {
            client: http::build_client()?,
            config,
            sessions,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn auth_headers(credentials: &BrokerCredentials) -> Option<AdapterResult<HeaderMap>> {
        let token = credentials.access_token.as_ref()?;
        Some(http::secret_header(token.expose_secret()).map(|token| {
            http::headers([
                ("access-token", token),
                ("content-type", HeaderValue::from_static("application/json")),
            ])
        }))
    }
}

#[async_trait]
impl BrokerAdapter for DhanAdapter {
    fn kind(&self) -> BrokerKind {
        BrokerKind::Dhan
    }

    async fn initiate_connect(
        &self,
        credentials: &BrokerCredentials,
    ) -> AdapterResult<ConnectOutcome> {
        let incomplete = || {
            AdapterError::MissingCredentials(
                "Dhan credentials are incomplete. Please register your Client ID and Access Token again."
                    .to_string(),
            )
        };
        if credentials.client_id.is_none() {
            return Err(incomplete());
        }
        let headers = Self::auth_headers(credentials).ok_or_else(incomplete)??;

        let response = http::get(
            &self.client,
            &self.endpoint("/positions"),
            headers,
            self.config.request_timeout(),
        )
        .await
        .map_err(|e| {
            warn!(user_id = %credentials.user_id, failure = %http::classify(&e), "Dhan connect request failed");
            if e.is_timeout() {
                AdapterError::Timeout(
                    "Dhan connection timed out. Please check your internet connection and try again."
                        .to_string(),
                )
            } else {
                AdapterError::Network(
                    "Cannot connect to Dhan servers. Please check your internet connection and try again."
                        .to_string(),
                )
            }
        })?;

        match response.status() {
            StatusCode::OK => {
                let remember = credentials.remember_session;
                let expires_at = Utc::now() + self.sessions.ttl_for(remember);
                info!(user_id = %credentials.user_id, remember, "Dhan connection established");

                Ok(ConnectOutcome::Established {
                    payload: SessionPayload::new()
                        .with_expires_at(expires_at)
                        .with_data("remember_session", remember),
                    message: format!(
                        "Successfully connected to Dhan for client {}",
                        credentials.user_id
                    ),
                })
            }
            StatusCode::UNAUTHORIZED => Err(AdapterError::Unauthorized {
                status: 401,
                message: "Dhan authentication failed. Your Access Token may be expired or invalid. Please check your credentials and try again."
                    .to_string(),
            }),
            StatusCode::FORBIDDEN => Err(AdapterError::Unauthorized {
                status: 403,
                message: "Dhan access denied. Please check your Client ID and Access Token permissions."
                    .to_string(),
            }),
            other => Err(AdapterError::Rejected {
                status: other.as_u16(),
                message: format!(
                    "Dhan connection failed with status {}. Please check your credentials and try again.",
                    other.as_u16()
                ),
            }),
        }
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
                    reason: "Dhan access token is missing.".to_string(),
                }
            }
        };

        http::verify_get(
            BrokerKind::Dhan,
            &self.client,
            &self.endpoint("/positions"),
            headers,
            self.config.verify_timeout(),
        )
        .await
    }

    async fn fetch(&self, kind: FetchKind, ctx: SessionContext<'_>) -> FetchOutcome {
        let Some(Ok(headers)) = Self::auth_headers(ctx.credentials) else {
            return FetchOutcome::Failed(FetchFailure::MissingCredentials);
        };

        let path = match kind {
            FetchKind::Orders => "/orders",
            FetchKind::Positions => "/positions",
            FetchKind::Trades => "/trades",
        };

        http::fetch_get(
            BrokerKind::Dhan,
            &self.client,
            &self.endpoint(path),
            headers,
            self.config.request_timeout(),
            http::data_list,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_requires_client_id_and_token() {
        let adapter =
            DhanAdapter::new(BrokerEndpointConfig::new("http://127.0.0.1:9"), SessionConfig::default())
                .unwrap();

        let no_token = BrokerCredentials::new(BrokerKind::Dhan, "CID1").with_client_id("CID1");
        let err = adapter.initiate_connect(&no_token).await.unwrap_err();
        assert!(matches!(err, AdapterError::MissingCredentials(_)));

        let no_client = BrokerCredentials::new(BrokerKind::Dhan, "CID1")
            .with_access_token("abcdefghijklmnopqrstuvwxy");
        let err = adapter.initiate_connect(&no_client).await.unwrap_err();
        assert!(err.to_string().contains("incomplete"));
    }
}
