//! 브로커 어댑터 trait 정의.

use async_trait::async_trait;
use broker_core::{BrokerKind, FetchKind, Session};

use crate::credentials::BrokerCredentials;
use crate::error::AdapterResult;
use crate::outcome::{ConnectOutcome, FetchOutcome, VerifyOutcome};

/// 검증/조회 호출에 필요한 컨텍스트.
///
/// 세션에는 비밀이 없으므로 자격증명은 호출 시점에 보관소에서 읽어 함께 전달합니다.
#[derive(Debug, Clone, Copy)]
pub struct SessionContext<'a> {
    pub session: &'a Session,
    pub credentials: &'a BrokerCredentials,
}

impl<'a> SessionContext<'a> {
    pub fn new(session: &'a Session, credentials: &'a BrokerCredentials) -> Self {
        Self {
            session,
            credentials,
        }
    }
}

/// 브로커 프로토콜 어댑터.
///
/// 검증과 조회는 전송 실패를 에러로 전파하지 않고 결과 타입으로 돌려줍니다.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    /// 브로커 종류.
    fn kind(&self) -> BrokerKind;

    /// 실제 브로커와 통신하는지 여부. 고정 데이터를 반환하는 어댑터는 `false`.
    fn is_live(&self) -> bool {
        true
    }

    /// 연결을 시작합니다.
    async fn initiate_connect(&self, credentials: &BrokerCredentials)
        -> AdapterResult<ConnectOutcome>;

    /// 세션이 아직 유효한지 브로커에 확인합니다.
    async fn verify(&self, ctx: SessionContext<'_>) -> VerifyOutcome;

    /// 데이터 종류별 조회.
    async fn fetch(&self, kind: FetchKind, ctx: SessionContext<'_>) -> FetchOutcome;

    /// 주문 목록 조회.
    async fn fetch_orders(&self, ctx: SessionContext<'_>) -> FetchOutcome {
        self.fetch(FetchKind::Orders, ctx).await
    }

    /// 포지션 목록 조회.
    async fn fetch_positions(&self, ctx: SessionContext<'_>) -> FetchOutcome {
        self.fetch(FetchKind::Positions, ctx).await
    }

    /// 체결 목록 조회.
    async fn fetch_trades(&self, ctx: SessionContext<'_>) -> FetchOutcome {
        self.fetch(FetchKind::Trades, ctx).await
    }
}
