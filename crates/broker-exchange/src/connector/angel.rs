//! Angel One 모의 어댑터.
//!
//! 실제 인증을 수행하지 않습니다. 연결 시 비밀이 아닌 `mock-jwt-…` 표식을
//! 세션에 넣고, 검증은 그 표식의 존재만 확인하며, 조회는 입력과 무관하게
//! 고정된 샘플 데이터를 반환합니다. `is_live()`는 `false`입니다.

use async_trait::async_trait;
use broker_core::{BrokerKind, FetchKind, SessionPayload};
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use tracing::info;

use crate::credentials::BrokerCredentials;
use crate::error::{AdapterError, AdapterResult};
use crate::outcome::{ConnectOutcome, FetchOutcome, VerifyOutcome};
use crate::traits::{BrokerAdapter, SessionContext};

/// 세션 데이터의 모의 토큰 키.
pub const MOCK_TOKEN_FIELD: &str = "jwt_token";

const MIN_API_KEY_LEN: usize = 8;

/// Angel One 모의 어댑터.
#[derive(Debug, Default)]
pub struct AngelAdapter;

impl AngelAdapter {
    pub fn new() -> Self {
        Self
    }

    fn sample(kind: FetchKind) -> Vec<Value> {
        match kind {
            FetchKind::Orders => vec![json!({
                "order_id": "ORD001",
                "symbol": "RELIANCE",
                "quantity": 10,
                "price": 2500,
                "order_type": "BUY",
                "status": "COMPLETE",
                "time": "09:30:00"
            })],
            FetchKind::Positions => vec![json!({
                "symbol": "RELIANCE",
                "quantity": 10,
                "average_price": 2500,
                "ltp": 2520,
                "pnl": 200,
                "product": "MIS"
            })],
            FetchKind::Trades => vec![json!({
                "trade_id": "TRD001",
                "symbol": "RELIANCE",
                "quantity": 10,
                "price": 2500,
                "trade_type": "BUY",
                "time": "09:30:00"
            })],
        }
    }
}

#[async_trait]
impl BrokerAdapter for AngelAdapter {
    fn kind(&self) -> BrokerKind {
        BrokerKind::Angel
    }

    fn is_live(&self) -> bool {
        false
    }

    async fn initiate_connect(
        &self,
        credentials: &BrokerCredentials,
    ) -> AdapterResult<ConnectOutcome> {
        let (Some(api_key), Some(_)) = (&credentials.api_key, &credentials.api_secret) else {
            return Err(AdapterError::MissingCredentials(
                "Angel credentials are incomplete. Please register your API Key and Secret again."
                    .to_string(),
            ));
        };

        if api_key.expose_secret().chars().count() < MIN_API_KEY_LEN {
            return Err(AdapterError::InvalidCredentials(
                "Angel API Key appears too short. Please check and enter the correct API Key."
                    .to_string(),
            ));
        }

        info!(user_id = %credentials.user_id, "Angel simulated session prepared");

        Ok(ConnectOutcome::Established {
            payload: SessionPayload::new()
                .with_data(MOCK_TOKEN_FIELD, format!("mock-jwt-{}", uuid::Uuid::new_v4()))
                .with_data("mock", true),
            message: "Connected to Angel One (simulated session; sample data only).".to_string(),
        })
    }

    async fn verify(&self, ctx: SessionContext<'_>) -> VerifyOutcome {
        match ctx.session.data_str(MOCK_TOKEN_FIELD) {
            Some(token) if !token.is_empty() => VerifyOutcome::Valid,
            _ => VerifyOutcome::Rejected {
                status: None,
                reason: "Angel One session token is missing.".to_string(),
            },
        }
    }

    async fn fetch(&self, kind: FetchKind, _ctx: SessionContext<'_>) -> FetchOutcome {
        FetchOutcome::from_items(Self::sample(kind))
    }
}
