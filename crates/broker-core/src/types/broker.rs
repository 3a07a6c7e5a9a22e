//! 지원 브로커 식별자.
//!
//! 브로커 이름 문자열은 외부 경계(CLI, 웹 계층)에서 한 번만 파싱되고,
//! 내부에서는 항상 닫힌 열거형으로 다룹니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 지원하는 브로커.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerKind {
    /// Zerodha Kite Connect (브라우저 리다이렉트 로그인)
    Kite,
    /// DhanHQ (access-token 헤더 기반 REST)
    Dhan,
    /// Angel One SmartAPI (모의 구현)
    Angel,
}

impl BrokerKind {
    /// 모든 브로커 목록.
    pub const ALL: [BrokerKind; 3] = [BrokerKind::Kite, BrokerKind::Dhan, BrokerKind::Angel];

    /// 소문자 식별자 반환.
    pub fn as_str(&self) -> &'static str {
        match self {
            BrokerKind::Kite => "kite",
            BrokerKind::Dhan => "dhan",
            BrokerKind::Angel => "angel",
        }
    }

    /// 사용자에게 보여줄 이름 반환.
    pub fn display_name(&self) -> &'static str {
        match self {
            BrokerKind::Kite => "Kite",
            BrokerKind::Dhan => "Dhan",
            BrokerKind::Angel => "Angel One",
        }
    }

    /// 연결 시 브라우저 리다이렉트가 필요한지 여부.
    pub fn requires_redirect(&self) -> bool {
        matches!(self, BrokerKind::Kite)
    }
}

impl fmt::Display for BrokerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrokerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kite" | "zerodha" => Ok(BrokerKind::Kite),
            "dhan" => Ok(BrokerKind::Dhan),
            "angel" | "angelone" | "angel_one" => Ok(BrokerKind::Angel),
            other => Err(format!(
                "Broker \"{}\" is not supported. Please select Kite, Dhan, or Angel.",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broker_from_str() {
        assert_eq!("kite".parse::<BrokerKind>().unwrap(), BrokerKind::Kite);
        assert_eq!(" DHAN ".parse::<BrokerKind>().unwrap(), BrokerKind::Dhan);
        assert_eq!("angel_one".parse::<BrokerKind>().unwrap(), BrokerKind::Angel);
        assert!("upstox".parse::<BrokerKind>().is_err());
    }

    #[test]
    fn test_broker_serde_lowercase() {
        let json = serde_json::to_string(&BrokerKind::Dhan).unwrap();
        assert_eq!(json, "\"dhan\"");

        let parsed: BrokerKind = serde_json::from_str("\"angel\"").unwrap();
        assert_eq!(parsed, BrokerKind::Angel);
    }

    #[test]
    fn test_only_kite_requires_redirect() {
        assert!(BrokerKind::Kite.requires_redirect());
        assert!(!BrokerKind::Dhan.requires_redirect());
        assert!(!BrokerKind::Angel.requires_redirect());
    }
}
