//! 검증/조회/연결 결과 타입.
//!
//! "브로커가 데이터 없음이라고 답함"과 "브로커에 도달하지 못함"을 구분합니다.

use broker_core::SessionPayload;
use serde_json::Value;
use std::fmt;

/// 세션 검증 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// 브로커가 세션을 인정함
    Valid,
    /// 브로커가 거부했거나 필요한 토큰이 없음
    Rejected { status: Option<u16>, reason: String },
    /// 브로커에 도달하지 못함 (타임아웃/연결 실패)
    Unreachable { reason: String },
}

impl VerifyOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyOutcome::Valid)
    }
}

/// 조회 실패 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    /// 요청 타임아웃
    Timeout,
    /// 연결 실패
    Network,
    /// 비정상 HTTP 상태
    Status(u16),
    /// 응답 형식 오류
    Parse,
    /// 필요한 자격증명이 없음
    MissingCredentials,
}

impl FetchFailure {
    /// 전송 계층 실패인지 확인.
    pub fn is_transport(&self) -> bool {
        matches!(self, FetchFailure::Timeout | FetchFailure::Network)
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Timeout => write!(f, "request timed out"),
            FetchFailure::Network => write!(f, "broker unreachable"),
            FetchFailure::Status(code) => write!(f, "broker returned status {}", code),
            FetchFailure::Parse => write!(f, "unexpected response format"),
            FetchFailure::MissingCredentials => write!(f, "credentials incomplete"),
        }
    }
}

/// 데이터 조회 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// 데이터 있음
    Data(Vec<Value>),
    /// 정상 응답이지만 데이터 없음
    Empty,
    /// 조회 실패
    Failed(FetchFailure),
}

impl FetchOutcome {
    /// 항목 목록으로 변환. 빈 응답이면 빈 목록.
    pub fn from_items(items: Vec<Value>) -> Self {
        if items.is_empty() {
            FetchOutcome::Empty
        } else {
            FetchOutcome::Data(items)
        }
    }

    /// 항목 수 (실패 시 0).
    pub fn len(&self) -> usize {
        match self {
            FetchOutcome::Data(items) => items.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }
}

/// 연결 시작 결과.
#[derive(Debug, Clone)]
pub enum ConnectOutcome {
    /// 즉시 인증 완료. 페이로드로 세션을 생성합니다.
    Established {
        payload: SessionPayload,
        message: String,
    },
    /// 사용자가 브라우저에서 로그인을 완료해야 함. 세션은 생성되지 않습니다.
    Redirect { url: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fetch_outcome_from_items() {
        assert_eq!(FetchOutcome::from_items(vec![]), FetchOutcome::Empty);
        let data = FetchOutcome::from_items(vec![json!({"order_id": "1"})]);
        assert_eq!(data.len(), 1);
        assert!(!data.is_failed());
    }

    #[test]
    fn test_failure_is_distinct_from_empty() {
        let failed = FetchOutcome::Failed(FetchFailure::Timeout);
        assert!(failed.is_failed());
        assert!(failed.is_empty());
        assert_ne!(failed, FetchOutcome::Empty);
        assert!(FetchFailure::Network.is_transport());
        assert!(!FetchFailure::Status(500).is_transport());
    }
}
