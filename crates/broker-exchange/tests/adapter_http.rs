//! 모의 HTTP 서버를 사용한 어댑터 테스트.

use broker_core::{
    BrokerEndpointConfig, BrokerKind, FetchKind, Session, SessionConfig, SessionStatus,
};
use broker_exchange::{
    AdapterError, BrokerAdapter, BrokerCredentials, ConnectOutcome, DhanAdapter, FetchFailure,
    FetchOutcome, KiteAdapter, SessionContext, VerifyOutcome,
};
use chrono::{Duration, Utc};

const DHAN_TOKEN: &str = "abcdefghijklmnopqrstuvwxy";

fn session(broker: BrokerKind, user_id: &str) -> Session {
    let now = Utc::now();
    Session {
        session_id: "s1".to_string(),
        broker,
        user_id: user_id.to_string(),
        created_at: now,
        last_activity: now,
        expires_at: now + Duration::hours(8),
        status: SessionStatus::Active,
        invalidated_at: None,
        data: serde_json::Map::new(),
    }
}

fn dhan(url: &str) -> DhanAdapter {
    DhanAdapter::new(BrokerEndpointConfig::new(url), SessionConfig::default()).unwrap()
}

fn dhan_credentials(remember: bool) -> BrokerCredentials {
    BrokerCredentials::new(BrokerKind::Dhan, "CID1")
        .with_client_id("CID1")
        .with_access_token(DHAN_TOKEN)
        .with_remember_session(remember)
}

fn kite(url: &str) -> KiteAdapter {
    KiteAdapter::new(BrokerEndpointConfig::new(url)).unwrap()
}

fn kite_credentials() -> BrokerCredentials {
    BrokerCredentials::new(BrokerKind::Kite, "U1")
        .with_api_key("kiteapikey12")
        .with_access_token("kiteaccesstoken")
}

#[tokio::test]
async fn test_dhan_connect_success_sets_short_expiry() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/positions")
        .match_header("access-token", DHAN_TOKEN)
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let outcome = dhan(&server.url())
        .initiate_connect(&dhan_credentials(false))
        .await
        .unwrap();
    mock.assert_async().await;

    let ConnectOutcome::Established { payload, message } = outcome else {
        panic!("dhan connect must establish a session");
    };
    let ttl = payload.expires_at.unwrap() - Utc::now();
    assert!(ttl <= Duration::hours(8) && ttl > Duration::hours(7));
    assert_eq!(payload.data["remember_session"], false);
    assert!(message.contains("CID1"));
    assert!(!serde_json::to_string(&payload.data).unwrap().contains(DHAN_TOKEN));
}

#[tokio::test]
async fn test_dhan_connect_remembered_session_lasts_thirty_days() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/positions")
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let outcome = dhan(&server.url())
        .initiate_connect(&dhan_credentials(true))
        .await
        .unwrap();

    let ConnectOutcome::Established { payload, .. } = outcome else {
        panic!("dhan connect must establish a session");
    };
    let ttl = payload.expires_at.unwrap() - Utc::now();
    assert!(ttl > Duration::days(29));
    assert_eq!(payload.data["remember_session"], true);
}

#[tokio::test]
async fn test_dhan_connect_status_messages() {
    let mut server = mockito::Server::new_async().await;
    let adapter = dhan(&server.url());

    let m401 = server
        .mock("GET", "/positions")
        .with_status(401)
        .create_async()
        .await;
    let err = adapter
        .initiate_connect(&dhan_credentials(false))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::Unauthorized { status: 401, .. }));
    assert!(err.to_string().contains("authentication failed"));
    m401.remove_async().await;

    let m403 = server
        .mock("GET", "/positions")
        .with_status(403)
        .create_async()
        .await;
    let err = adapter
        .initiate_connect(&dhan_credentials(false))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("access denied"));
    m403.remove_async().await;

    server
        .mock("GET", "/positions")
        .with_status(500)
        .create_async()
        .await;
    let err = adapter
        .initiate_connect(&dhan_credentials(false))
        .await
        .unwrap_err();
    assert!(matches!(err, AdapterError::Rejected { status: 500, .. }));
    assert!(err.to_string().contains("500"));
    assert!(!err.to_string().contains(DHAN_TOKEN));
}

#[tokio::test]
async fn test_dhan_connect_unreachable_is_network_error() {
    let adapter = dhan("http://127.0.0.1:1");
    let err = adapter
        .initiate_connect(&dhan_credentials(false))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(err.to_string().contains("Dhan"));
}

#[tokio::test]
async fn test_dhan_verify_valid_then_rejected() {
    let mut server = mockito::Server::new_async().await;
    let adapter = dhan(&server.url());
    let creds = dhan_credentials(false);
    let s = session(BrokerKind::Dhan, "CID1");

    let ok = server
        .mock("GET", "/positions")
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;
    assert_eq!(
        adapter.verify(SessionContext::new(&s, &creds)).await,
        VerifyOutcome::Valid
    );
    ok.remove_async().await;

    server
        .mock("GET", "/positions")
        .with_status(401)
        .create_async()
        .await;
    let outcome = adapter.verify(SessionContext::new(&s, &creds)).await;
    assert!(matches!(
        outcome,
        VerifyOutcome::Rejected {
            status: Some(401),
            ..
        }
    ));
}

#[tokio::test]
async fn test_verify_unreachable_is_distinct_from_rejected() {
    let adapter = dhan("http://127.0.0.1:1");
    let creds = dhan_credentials(false);
    let s = session(BrokerKind::Dhan, "CID1");

    let outcome = adapter.verify(SessionContext::new(&s, &creds)).await;
    assert!(matches!(outcome, VerifyOutcome::Unreachable { .. }));
}

#[tokio::test]
async fn test_dhan_fetch_distinguishes_empty_data_and_failure() {
    let mut server = mockito::Server::new_async().await;
    let adapter = dhan(&server.url());
    let creds = dhan_credentials(false);
    let s = session(BrokerKind::Dhan, "CID1");

    server
        .mock("GET", "/orders")
        .with_status(200)
        .with_body(r#"[{"orderId": "1"}, {"orderId": "2"}]"#)
        .create_async()
        .await;
    server
        .mock("GET", "/trades")
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;
    server
        .mock("GET", "/positions")
        .with_status(500)
        .create_async()
        .await;

    let ctx = SessionContext::new(&s, &creds);
    assert_eq!(adapter.fetch(FetchKind::Orders, ctx).await.len(), 2);
    assert_eq!(adapter.fetch(FetchKind::Trades, ctx).await, FetchOutcome::Empty);
    assert_eq!(
        adapter.fetch(FetchKind::Positions, ctx).await,
        FetchOutcome::Failed(FetchFailure::Status(500))
    );
}

#[tokio::test]
async fn test_fetch_unreachable_is_transport_failure() {
    let adapter = dhan("http://127.0.0.1:1");
    let creds = dhan_credentials(false);
    let s = session(BrokerKind::Dhan, "CID1");

    let FetchOutcome::Failed(failure) = adapter.fetch_orders(SessionContext::new(&s, &creds)).await
    else {
        panic!("unreachable broker must fail");
    };
    assert!(failure.is_transport());
}

#[tokio::test]
async fn test_kite_verify_uses_token_header() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/user/profile")
        .match_header("authorization", "token kiteapikey12:kiteaccesstoken")
        .match_header("x-kite-version", "3")
        .with_status(200)
        .with_body(r#"{"status": "success", "data": {}}"#)
        .create_async()
        .await;

    let creds = kite_credentials();
    let s = session(BrokerKind::Kite, "U1");
    let outcome = kite(&server.url())
        .verify(SessionContext::new(&s, &creds))
        .await;

    mock.assert_async().await;
    assert!(outcome.is_valid());
}

#[tokio::test]
async fn test_kite_verify_without_access_token_is_rejected_locally() {
    let creds = BrokerCredentials::new(BrokerKind::Kite, "U1").with_api_key("kiteapikey12");
    let s = session(BrokerKind::Kite, "U1");
    let outcome = kite("http://127.0.0.1:1")
        .verify(SessionContext::new(&s, &creds))
        .await;
    assert!(matches!(outcome, VerifyOutcome::Rejected { status: None, .. }));
}

#[tokio::test]
async fn test_kite_fetch_paths() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/orders")
        .with_status(200)
        .with_body(r#"{"status": "success", "data": [{"order_id": "1"}]}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/portfolio/positions")
        .with_status(200)
        .with_body(r#"{"status": "success", "data": {"net": [{"tradingsymbol": "INFY"}, {"tradingsymbol": "TCS"}], "day": []}}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/trades")
        .with_status(200)
        .with_body(r#"{"status": "success"}"#)
        .create_async()
        .await;

    let adapter = kite(&server.url());
    let creds = kite_credentials();
    let s = session(BrokerKind::Kite, "U1");
    let ctx = SessionContext::new(&s, &creds);

    assert_eq!(adapter.fetch_orders(ctx).await.len(), 1);
    assert_eq!(adapter.fetch_positions(ctx).await.len(), 2);
    assert_eq!(
        adapter.fetch_trades(ctx).await,
        FetchOutcome::Failed(FetchFailure::Parse)
    );
}
