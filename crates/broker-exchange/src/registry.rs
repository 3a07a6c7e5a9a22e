//! 브로커 종류별 어댑터 레지스트리.

use std::sync::Arc;

use broker_core::{BrokerKind, BrokersConfig, SessionConfig};

use crate::connector::{AngelAdapter, DhanAdapter, KiteAdapter};
use crate::error::AdapterResult;
use crate::traits::BrokerAdapter;

/// 어댑터 레지스트리.
///
/// 지원 브로커 집합이 닫혀 있으므로 브로커마다 필드 하나를 둡니다.
#[derive(Clone)]
pub struct AdapterRegistry {
    kite: Arc<dyn BrokerAdapter>,
    dhan: Arc<dyn BrokerAdapter>,
    angel: Arc<dyn BrokerAdapter>,
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("angel_live", &self.angel.is_live())
            .finish_non_exhaustive()
    }
}

impl AdapterRegistry {
    /// 설정으로 기본 어댑터를 생성합니다.
    pub fn from_config(brokers: &BrokersConfig, sessions: &SessionConfig) -> AdapterResult<Self> {
        Ok(Self {
            kite: Arc::new(KiteAdapter::new(brokers.kite.clone())?),
            dhan: Arc::new(DhanAdapter::new(brokers.dhan.clone(), sessions.clone())?),
            angel: Arc::new(AngelAdapter::new()),
        })
    }

    /// 특정 브로커의 어댑터를 교체합니다.
    pub fn with_adapter(mut self, adapter: Arc<dyn BrokerAdapter>) -> Self {
        match adapter.kind() {
            BrokerKind::Kite => self.kite = adapter,
            BrokerKind::Dhan => self.dhan = adapter,
            BrokerKind::Angel => self.angel = adapter,
        }
        self
    }

    /// 브로커 종류에 해당하는 어댑터.
    pub fn get(&self, kind: BrokerKind) -> &dyn BrokerAdapter {
        match kind {
            BrokerKind::Kite => self.kite.as_ref(),
            BrokerKind::Dhan => self.dhan.as_ref(),
            BrokerKind::Angel => self.angel.as_ref(),
        }
    }
}
