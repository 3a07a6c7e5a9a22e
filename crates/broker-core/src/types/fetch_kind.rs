//! 브로커에서 조회할 수 있는 데이터 종류.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 조회 데이터 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchKind {
    /// 주문 내역
    Orders,
    /// 보유 포지션
    Positions,
    /// 체결 내역
    Trades,
}

impl FetchKind {
    /// 소문자 식별자 반환.
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchKind::Orders => "orders",
            FetchKind::Positions => "positions",
            FetchKind::Trades => "trades",
        }
    }
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "orders" | "order" => Ok(FetchKind::Orders),
            "positions" | "position" => Ok(FetchKind::Positions),
            "trades" | "trade" => Ok(FetchKind::Trades),
            other => Err(format!("Unknown fetch kind: {}", other)),
        }
    }
}
