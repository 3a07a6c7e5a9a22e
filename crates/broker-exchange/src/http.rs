//! 어댑터 공통 HTTP 처리.
//!
//! 요청마다 타임아웃을 지정하고, 전송 실패를 결과 타입으로 변환합니다.
//! 로그와 사유 문자열에는 URL이나 헤더 값을 남기지 않습니다.

use crate::error::{AdapterError, AdapterResult};
use crate::outcome::{FetchFailure, FetchOutcome, VerifyOutcome};
use broker_core::BrokerKind;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// HTTP 클라이언트 생성.
pub(crate) fn build_client() -> AdapterResult<Client> {
    Client::builder()
        .user_agent(concat!("broker-connect/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AdapterError::Client(e.to_string()))
}

/// 민감한 헤더 값 생성. 디버그 출력에서 값이 가려집니다.
pub(crate) fn secret_header(value: &str) -> AdapterResult<HeaderValue> {
    let mut header = HeaderValue::from_str(value).map_err(|_| {
        AdapterError::InvalidCredentials(
            "Stored credentials contain characters that cannot be sent to the broker.".to_string(),
        )
    })?;
    header.set_sensitive(true);
    Ok(header)
}

/// 헤더 맵 생성.
pub(crate) fn headers<const N: usize>(entries: [(&'static str, HeaderValue); N]) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(N);
    for (name, value) in entries {
        map.insert(HeaderName::from_static(name), value);
    }
    map
}

/// 전송 실패 분류.
pub(crate) fn classify(err: &reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        FetchFailure::Timeout
    } else if err.is_decode() {
        FetchFailure::Parse
    } else {
        FetchFailure::Network
    }
}

/// 인증된 GET 요청.
pub(crate) async fn get(
    client: &Client,
    url: &str,
    headers: HeaderMap,
    timeout: Duration,
) -> Result<reqwest::Response, reqwest::Error> {
    client
        .get(url)
        .headers(headers)
        .timeout(timeout)
        .send()
        .await
}

/// GET 요청으로 세션을 검증합니다. HTTP 200이면 유효.
pub(crate) async fn verify_get(
    broker: BrokerKind,
    client: &Client,
    url: &str,
    headers: HeaderMap,
    timeout: Duration,
) -> VerifyOutcome {
    match get(client, url, headers, timeout).await {
        Ok(response) if response.status() == StatusCode::OK => VerifyOutcome::Valid,
        Ok(response) => {
            let status = response.status().as_u16();
            debug!(broker = %broker, status, "Session verification rejected");
            VerifyOutcome::Rejected {
                status: Some(status),
                reason: format!("{} rejected the session (HTTP {})", broker.display_name(), status),
            }
        }
        Err(e) => {
            let failure = classify(&e);
            warn!(broker = %broker, failure = %failure, "Session verification failed");
            VerifyOutcome::Unreachable {
                reason: format!("{}: {}", broker.display_name(), failure),
            }
        }
    }
}

/// GET 요청으로 목록 데이터를 조회합니다.
///
/// `extract`가 응답 본문에서 목록을 찾지 못하면 형식 오류로 처리합니다.
pub(crate) async fn fetch_get(
    broker: BrokerKind,
    client: &Client,
    url: &str,
    headers: HeaderMap,
    timeout: Duration,
    extract: fn(Value) -> Option<Vec<Value>>,
) -> FetchOutcome {
    let response = match get(client, url, headers, timeout).await {
        Ok(response) => response,
        Err(e) => {
            let failure = classify(&e);
            warn!(broker = %broker, failure = %failure, "Fetch request failed");
            return FetchOutcome::Failed(failure);
        }
    };

    let status = response.status();
    if status != StatusCode::OK {
        warn!(broker = %broker, status = status.as_u16(), "Fetch request rejected");
        return FetchOutcome::Failed(FetchFailure::Status(status.as_u16()));
    }

    let body = match response.json::<Value>().await {
        Ok(body) => body,
        Err(e) => {
            let failure = classify(&e);
            warn!(broker = %broker, failure = %failure, "Fetch response unreadable");
            return FetchOutcome::Failed(FetchFailure::Parse);
        }
    };

    match extract(body) {
        Some(items) => FetchOutcome::from_items(items),
        None => {
            warn!(broker = %broker, "Fetch response missing data list");
            FetchOutcome::Failed(FetchFailure::Parse)
        }
    }
}

/// `{"data": [...]}` 또는 최상위 배열에서 목록을 꺼냅니다.
pub(crate) fn data_list(body: Value) -> Option<Vec<Value>> {
    match body {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Some(items),
            Some(Value::Null) => Some(Vec::new()),
            _ => None,
        },
        _ => None,
    }
}
