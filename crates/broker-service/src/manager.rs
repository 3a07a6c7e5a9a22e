//! 브로커 연결 관리자.
//!
//! 자격증명 보관소, 세션 저장소, 어댑터 레지스트리를 조합하여
//! 등록/연결/상태 확인/연결 해제/데이터 조회를 제공합니다.
//!
//! # 흐름
//!
//! ```text
//! register ──► validate ──► CredentialVault::save
//! connect  ──► CredentialVault::load ──► adapter.initiate_connect ──► SessionStore::create
//! status   ──► SessionStore::get_active ──► adapter.verify ──► (무효화 | 활동 갱신)
//! fetch    ──► status와 같은 검증 ──► adapter.fetch
//! ```
//!
//! 모든 공개 작업은 에러를 전파하지 않고 [`Outcome`]/[`StatusReport`]로 변환합니다.
//! 메시지와 로그에는 비밀 값이 포함되지 않습니다.

use std::path::Path;

use broker_core::crypto::KeyOrigin;
use broker_core::{
    connection_span, AppConfig, BrokerError, BrokerKind, BrokerResult, CredentialEncryptor,
    CredentialFields, CredentialRecord, FetchKind, Session, SessionConfig, SessionPayload,
    FIELD_REMEMBER_SESSION,
};
use broker_exchange::{
    AdapterRegistry, BrokerCredentials, ConnectOutcome, FetchFailure, FetchOutcome,
    SessionContext, VerifyOutcome,
};
use broker_store::{CredentialVault, SessionStore};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde_json::{json, Value};
use tracing::{error, info, warn, Instrument};

use crate::outcome::{ConnectionState, HealthReport, InitReport, Outcome, StatusReport};
use crate::token_import::TokenImport;
use crate::validation::validate_registration;

/// 활성 세션 검증 결과.
enum Verified {
    /// 브로커가 세션을 확인함 (활동 시각 갱신됨)
    Live {
        session: Session,
        credentials: BrokerCredentials,
    },
    /// 활성 세션 없음
    NoSession,
    /// 브로커가 거부하여 세션을 무효화함
    Rejected,
    /// 브로커에 도달하지 못함 (세션 유지)
    Unreachable { session: Session },
}

/// 브로커 연결 관리자.
#[derive(Debug)]
pub struct ConnectionManager {
    vault: CredentialVault,
    sessions: SessionStore,
    adapters: AdapterRegistry,
    session_config: SessionConfig,
}

impl ConnectionManager {
    /// 구성 요소로 관리자를 생성합니다.
    pub fn new(
        vault: CredentialVault,
        sessions: SessionStore,
        adapters: AdapterRegistry,
        session_config: SessionConfig,
    ) -> Self {
        Self {
            vault,
            sessions,
            adapters,
            session_config,
        }
    }

    /// 설정에 따라 저장소와 어댑터를 열어 관리자를 생성합니다.
    ///
    /// 키 파일이 없으면 새 키를 생성합니다. 이때 이미 저장된 자격증명은
    /// 더 이상 복호화할 수 없습니다.
    pub async fn open(config: &AppConfig) -> BrokerResult<Self> {
        let storage = &config.storage;

        let (encryptor, origin) = CredentialEncryptor::from_key_file(&storage.key_path())?;
        let vault = CredentialVault::open(storage.credentials_path(), encryptor).await?;
        if origin == KeyOrigin::Generated {
            let stale = vault.count().await;
            if stale > 0 {
                error!(
                    records = stale,
                    "Stored credentials were encrypted with a previous key and cannot be decrypted"
                );
            }
        }

        let sessions =
            SessionStore::open(storage.sessions_path(), config.session.default_ttl()).await?;
        let adapters = AdapterRegistry::from_config(&config.brokers, &config.session)?;

        Ok(Self::new(vault, sessions, adapters, config.session.clone()))
    }

    /// 만료된 세션을 정리하고 현재 상태를 보고합니다.
    pub async fn initialize(&self) -> Outcome {
        let expired_cleaned = match self.sessions.cleanup_expired().await {
            Ok(count) => count,
            Err(e) => return Outcome::from_error(&e.into()),
        };
        let sessions_purged = match self
            .sessions
            .purge_inactive(self.session_config.retention())
            .await
        {
            Ok(count) => count,
            Err(e) => return Outcome::from_error(&e.into()),
        };

        let report = InitReport {
            accounts_loaded: self.vault.count().await,
            active_sessions: self.sessions.stats().await.active,
            expired_cleaned,
            sessions_purged,
        };

        info!(
            accounts = report.accounts_loaded,
            active_sessions = report.active_sessions,
            expired_cleaned = report.expired_cleaned,
            sessions_purged = report.sessions_purged,
            "Broker connection manager initialized"
        );

        Outcome::success(format!(
            "Loaded {} saved account(s) with {} active session(s)",
            report.accounts_loaded, report.active_sessions
        ))
        .with_data(report)
    }

    /// 자격증명을 검증 후 암호화하여 저장합니다.
    pub async fn register(
        &self,
        broker: BrokerKind,
        user_id: &str,
        fields: CredentialFields,
    ) -> Outcome {
        let valid = match validate_registration(broker, user_id, &fields, &self.session_config) {
            Ok(valid) => valid,
            Err(errors) => {
                warn!(broker = %broker, errors = errors.len(), "Credential registration rejected");
                return Outcome::from_error(&BrokerError::Validation(errors));
            }
        };

        let remember = valid.fields.contains_key(FIELD_REMEMBER_SESSION);
        if let Err(e) = self.vault.save(broker, &valid.user_id, valid.fields).await {
            error!(broker = %broker, user_id = %valid.user_id, error = %e, "Failed to save credentials");
            return Outcome::from_error(&e.into());
        }

        Outcome::success(format!(
            "{} credentials registered and encrypted successfully for user {}",
            broker.display_name(),
            valid.user_id
        ))
        .with_data(json!({
            "broker": broker,
            "user_id": valid.user_id,
            "remember_session": remember,
        }))
    }

    /// 브로커 연결을 시작합니다.
    ///
    /// 즉시 인증되는 브로커는 세션을 생성하고, Kite는 브라우저 로그인 URL을
    /// 반환하며 세션을 만들지 않습니다.
    pub async fn connect(&self, broker: BrokerKind, user_id: &str) -> Outcome {
        let span = connection_span!("connect", broker, user_id);
        self.connect_inner(broker, user_id).instrument(span).await
    }

    async fn connect_inner(&self, broker: BrokerKind, user_id: &str) -> Outcome {
        let record = match self.load_record(broker, user_id).await {
            Ok(record) => record,
            Err(e) => return Outcome::from_error(&e),
        };
        let credentials = BrokerCredentials::from(&record);
        let adapter = self.adapters.get(broker);

        match adapter.initiate_connect(&credentials).await {
            Ok(ConnectOutcome::Redirect { url, message }) => {
                info!("Browser login required to complete connection");
                Outcome::success(message).with_redirect(url)
            }
            Ok(ConnectOutcome::Established { payload, message }) => {
                let session = match self.sessions.create(broker, user_id, payload).await {
                    Ok(session) => session,
                    Err(e) => return Outcome::from_error(&e.into()),
                };

                let mut data = json!({
                    "session_id": session.session_id,
                    "expires_at": session.expires_at,
                });
                if !adapter.is_live() {
                    data["mock"] = Value::Bool(true);
                }
                Outcome::success(message).with_data(data)
            }
            Err(e) => {
                warn!(error_kind = e.kind(), "Connection attempt failed");
                Outcome {
                    auth_error: e.is_auth_error(),
                    ..Outcome::failure(e.kind(), e.to_string())
                }
            }
        }
    }

    /// 연결 상태를 확인합니다. 활성 세션이 있으면 브로커에 실시간으로 검증합니다.
    pub async fn status(&self, broker: BrokerKind, user_id: &str) -> StatusReport {
        let span = connection_span!("status", broker, user_id);
        self.status_inner(broker, user_id).instrument(span).await
    }

    async fn status_inner(&self, broker: BrokerKind, user_id: &str) -> StatusReport {
        let name = broker.display_name();

        match self.verify_active(broker, user_id).await {
            Ok(Verified::Live { session, .. }) => StatusReport::new(
                ConnectionState::Connected,
                format!("{name} is connected and verified for user {user_id}"),
            )
            .with_session(session.summary()),
            Ok(Verified::Rejected) => StatusReport::new(
                ConnectionState::Expired,
                format!("{name} session has expired or become invalid. Please reconnect."),
            ),
            Ok(Verified::Unreachable { session }) => StatusReport::new(
                ConnectionState::Unreachable,
                format!("Could not reach {name} to verify the session for user {user_id}. Please try again."),
            )
            .with_session(session.summary()),
            Ok(Verified::NoSession) => {
                if self.vault.contains(broker, user_id).await {
                    StatusReport::new(
                        ConnectionState::NotConnected,
                        format!("Credentials found for {name} user {user_id}, but not connected. Click Connect to establish connection."),
                    )
                } else {
                    let err = BrokerError::NotRegistered {
                        broker,
                        user_id: user_id.to_string(),
                    };
                    StatusReport::new(ConnectionState::NotRegistered, err.to_string())
                }
            }
            Err(e) => {
                error!(error = %e, "Connection status check failed");
                StatusReport::new(
                    ConnectionState::Error,
                    format!(
                        "Error checking {name} connection status: {}",
                        Outcome::from_error(&e).message
                    ),
                )
            }
        }
    }

    /// 연결을 해제합니다.
    ///
    /// `clear_all`이면 모든 자격증명과 세션을 삭제하고, 아니면 해당
    /// (브로커, 사용자)의 세션만 무효화합니다.
    pub async fn disconnect(&self, broker: BrokerKind, user_id: &str, clear_all: bool) -> Outcome {
        if clear_all {
            return self.disconnect_all().await;
        }

        match self.sessions.invalidate_all(broker, user_id).await {
            Ok(count) => {
                info!(broker = %broker, user_id = %user_id, sessions = count, "Disconnected");
                Outcome::success(format!("Disconnected from {}", broker.display_name()))
                    .with_data(json!({ "sessions_invalidated": count }))
            }
            Err(e) => Outcome::from_error(&e.into()),
        }
    }

    /// 모든 자격증명과 세션을 삭제합니다.
    ///
    /// 세션을 먼저 삭제하므로 중간에 실패해도 자격증명 없는 세션은 남지 않습니다.
    pub async fn disconnect_all(&self) -> Outcome {
        let sessions = match self.sessions.wipe_all().await {
            Ok(count) => count,
            Err(e) => return Outcome::from_error(&e.into()),
        };
        let credentials = match self.vault.wipe_all().await {
            Ok(count) => count,
            Err(e) => {
                error!(sessions_removed = sessions, "Credential wipe failed after sessions were removed");
                return Outcome::from_error(&e.into()).with_data(json!({
                    "credentials_removed": 0,
                    "sessions_removed": sessions,
                }));
            }
        };

        Outcome::success("All broker connections cleared").with_data(json!({
            "credentials_removed": credentials,
            "sessions_removed": sessions,
        }))
    }

    /// 주문/포지션/체결 내역을 조회합니다.
    ///
    /// 조회 전에 활성 세션을 실시간으로 검증합니다. 검증이 거부되면 세션을
    /// 무효화하고 `auth_error`를 설정합니다.
    pub async fn fetch(&self, kind: FetchKind, broker: BrokerKind, user_id: &str) -> Outcome {
        let span = connection_span!("fetch", broker, user_id);
        self.fetch_inner(kind, broker, user_id).instrument(span).await
    }

    async fn fetch_inner(&self, kind: FetchKind, broker: BrokerKind, user_id: &str) -> Outcome {
        let name = broker.display_name();
        let expired = || Outcome::auth_failure(format!("Connection to {name} has expired. Please reconnect."));

        let (session, credentials) = match self.verify_active(broker, user_id).await {
            Ok(Verified::Live {
                session,
                credentials,
            }) => (session, credentials),
            Ok(Verified::NoSession) => {
                return Outcome::auth_failure(format!(
                    "Not connected to {name}. Please connect first."
                ))
            }
            Ok(Verified::Rejected) => return expired(),
            Ok(Verified::Unreachable { .. }) => {
                return Outcome::failure(
                    "transport",
                    format!("Could not reach {name} to verify the connection. Please try again."),
                )
            }
            Err(e) => return Outcome::from_error(&e),
        };

        let adapter = self.adapters.get(broker);
        let items = match adapter
            .fetch(kind, SessionContext::new(&session, &credentials))
            .await
        {
            FetchOutcome::Data(items) => items,
            FetchOutcome::Empty => Vec::new(),
            FetchOutcome::Failed(
                FetchFailure::Status(401 | 403) | FetchFailure::MissingCredentials,
            ) => {
                warn!(kind = %kind.as_str(), "Broker refused data request; invalidating session");
                if let Err(e) = self.sessions.invalidate_all(broker, user_id).await {
                    error!(error = %e, "Failed to invalidate sessions");
                }
                return expired();
            }
            FetchOutcome::Failed(failure) => {
                warn!(kind = %kind.as_str(), failure = %failure, "Data request failed");
                let code = if failure.is_transport() {
                    "transport"
                } else {
                    "rejected"
                };
                return Outcome::failure(
                    code,
                    format!("Failed to fetch {} from {name}: {failure}", kind.as_str()),
                );
            }
        };

        let message = if items.is_empty() {
            format!("No {} found at {name}", kind.as_str())
        } else {
            format!("Fetched {} {} from {name}", items.len(), kind.as_str())
        };
        let mut data = json!({
            "kind": kind.as_str(),
            "count": items.len(),
            "items": items,
        });
        if !adapter.is_live() {
            data["mock"] = Value::Bool(true);
        }
        Outcome::success(message).with_data(data)
    }

    /// 저장된 계정 목록 (비밀 필드 제외, 저장 시각 내림차순).
    pub async fn list_accounts(&self) -> Outcome {
        let accounts = self.vault.list_accounts().await;
        Outcome::success(format!("{} saved account(s)", accounts.len()))
            .with_data(json!({ "accounts": accounts }))
    }

    /// 저장소 상태 점검.
    pub async fn health(&self) -> HealthReport {
        HealthReport {
            credentials_count: self.vault.count().await,
            sessions: self.sessions.stats().await,
            timestamp: Utc::now(),
        }
    }

    /// 외부에서 발급받은 액세스 토큰을 저장하고 활성 세션을 생성합니다.
    ///
    /// Kite는 API Key가 먼저 등록되어 있어야 합니다. Angel One은 지원하지 않습니다.
    pub async fn import_token(&self, import: TokenImport) -> Outcome {
        let TokenImport {
            broker,
            user_id,
            access_token,
            expires_at,
            client_id,
        } = import;
        let name = broker.display_name();
        let user_id = user_id.trim();

        if broker == BrokerKind::Angel {
            return Outcome::failure(
                "validation",
                "Angel One does not support access token import.",
            );
        }
        if user_id.is_empty() {
            return Outcome::failure(
                "validation",
                "User ID is required. Please enter your trading account User ID.",
            );
        }
        let token = access_token.expose_secret().trim();
        if token.is_empty() {
            return Outcome::failure("validation", format!("No access token supplied for {name}."));
        }
        if expires_at.is_some_and(|at| at <= Utc::now()) {
            return Outcome::failure(
                "validation",
                format!("{name} access token is expired. Please generate a new token."),
            );
        }

        let mut fields = match self.vault.load(broker, user_id).await {
            Ok(existing) => existing.map(|r| r.fields).unwrap_or_default(),
            Err(e) => return Outcome::from_error(&e.into()),
        };

        if broker == BrokerKind::Kite {
            let has_key = fields
                .get("api_key")
                .and_then(Value::as_str)
                .is_some_and(|k| !k.trim().is_empty());
            if !has_key {
                return Outcome::failure(
                    "not_registered",
                    "Kite API Key must be registered before importing an access token.",
                );
            }
        }
        if broker == BrokerKind::Dhan {
            match client_id.map(|c| c.trim().to_string()).filter(|c| !c.is_empty()) {
                Some(cid) => {
                    fields.insert("client_id".to_string(), Value::String(cid));
                }
                None => {
                    fields
                        .entry("client_id".to_string())
                        .or_insert_with(|| Value::String(user_id.to_string()));
                }
            }
        }
        fields.insert("access_token".to_string(), Value::String(token.to_string()));

        if let Err(e) = self.vault.save(broker, user_id, fields).await {
            return Outcome::from_error(&e.into());
        }

        let mut payload = SessionPayload::new().with_data("imported", true);
        if let Some(at) = expires_at {
            payload = payload.with_expires_at(at);
        }
        let session = match self.sessions.create(broker, user_id, payload).await {
            Ok(session) => session,
            Err(e) => return Outcome::from_error(&e.into()),
        };

        info!(broker = %broker, user_id = %user_id, expires_at = %session.expires_at, "Access token imported");

        Outcome::success(format!("Successfully integrated {name} token for user {user_id}"))
            .with_data(json!({
                "session_id": session.session_id,
                "expires_at": session.expires_at,
            }))
    }

    /// `dhan_token.json` 형식 파일에서 Dhan 토큰을 가져옵니다.
    pub async fn import_token_file(&self, path: &Path, client_id: &str) -> Outcome {
        let client_id = client_id.trim();
        if client_id.is_empty() {
            return Outcome::failure(
                "validation",
                "Dhan client ID is required to import a token.",
            );
        }

        match TokenImport::from_dhan_token_file(path, client_id).await {
            Ok(import) => self.import_token(import).await,
            Err(e) => {
                warn!(path = %path.display(), error_kind = e.kind(), "Token file import failed");
                Outcome::failure(e.kind(), e.to_string())
            }
        }
    }

    async fn load_record(&self, broker: BrokerKind, user_id: &str) -> BrokerResult<CredentialRecord> {
        self.vault
            .load(broker, user_id)
            .await?
            .ok_or_else(|| BrokerError::NotRegistered {
                broker,
                user_id: user_id.to_string(),
            })
    }

    /// 활성 세션을 찾아 브로커에 검증합니다.
    async fn verify_active(&self, broker: BrokerKind, user_id: &str) -> BrokerResult<Verified> {
        let Some(session) = self.sessions.get_active(broker, user_id).await? else {
            return Ok(Verified::NoSession);
        };

        let Some(record) = self.vault.load(broker, user_id).await? else {
            warn!("Active session has no stored credentials; invalidating");
            self.sessions.invalidate_all(broker, user_id).await?;
            return Ok(Verified::NoSession);
        };
        let credentials = BrokerCredentials::from(&record);

        let outcome = self
            .adapters
            .get(broker)
            .verify(SessionContext::new(&session, &credentials))
            .await;

        match outcome {
            VerifyOutcome::Valid => match self.sessions.get(&session.session_id).await? {
                Some(session) => Ok(Verified::Live {
                    session,
                    credentials,
                }),
                None => Ok(Verified::NoSession),
            },
            VerifyOutcome::Rejected { status, reason } => {
                warn!(status = ?status, reason = %reason, "Session verification rejected; invalidating");
                self.sessions.invalidate_all(broker, user_id).await?;
                Ok(Verified::Rejected)
            }
            VerifyOutcome::Unreachable { reason } => {
                warn!(reason = %reason, "Broker unreachable during verification; session kept");
                Ok(Verified::Unreachable { session })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use broker_core::StorageConfig;

    async fn manager(dir: &Path) -> ConnectionManager {
        let config = AppConfig {
            storage: StorageConfig::under(dir),
            ..Default::default()
        };
        ConnectionManager::open(&config).await.unwrap()
    }

    fn fields(pairs: &[(&str, &str)]) -> CredentialFields {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect()
    }

    #[tokio::test]
    async fn test_register_then_list_accounts_hides_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path()).await;

        let outcome = manager
            .register(
                BrokerKind::Angel,
                "A1",
                fields(&[("api_key", "angelkey1"), ("api_secret", "angelsecret1")]),
            )
            .await;
        assert!(outcome.ok, "{}", outcome.message);
        assert!(outcome.message.contains("Angel One credentials registered"));

        let listed = manager.list_accounts().await;
        let rendered = serde_json::to_string(&listed).unwrap();
        assert!(rendered.contains("A1"));
        assert!(!rendered.contains("angelkey1"));
        assert!(!rendered.contains("angelsecret1"));
    }

    #[tokio::test]
    async fn test_connect_unregistered() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path()).await;

        let outcome = manager.connect(BrokerKind::Dhan, "nobody").await;
        assert!(!outcome.ok);
        assert_eq!(outcome.error_code.as_deref(), Some("not_registered"));
        assert!(outcome.message.contains("register"));
    }

    #[tokio::test]
    async fn test_status_distinguishes_registered_from_unknown() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path()).await;
        manager
            .register(
                BrokerKind::Angel,
                "A1",
                fields(&[("api_key", "angelkey1"), ("api_secret", "angelsecret1")]),
            )
            .await;

        let known = manager.status(BrokerKind::Angel, "A1").await;
        assert_eq!(known.state, ConnectionState::NotConnected);
        assert!(known.message.contains("but not connected"));

        let unknown = manager.status(BrokerKind::Angel, "A2").await;
        assert_eq!(unknown.state, ConnectionState::NotRegistered);
        assert!(!unknown.connected);
    }

    #[tokio::test]
    async fn test_import_token_rules() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path()).await;

        let angel = manager
            .import_token(TokenImport::new(BrokerKind::Angel, "A1", "token-value-1"))
            .await;
        assert!(!angel.ok);

        let kite = manager
            .import_token(TokenImport::new(BrokerKind::Kite, "U1", "kite-access-token"))
            .await;
        assert!(!kite.ok);
        assert_eq!(kite.error_code.as_deref(), Some("not_registered"));

        let expired = manager
            .import_token(
                TokenImport::new(BrokerKind::Dhan, "1100012345", "abcdefghijklmnopqrstuvwxy")
                    .with_expires_at(Utc::now() - chrono::Duration::minutes(1)),
            )
            .await;
        assert!(!expired.ok);
        assert!(expired.message.contains("expired"));
        assert!(!expired.message.contains("abcdefghijklmnopqrstuvwxy"));
    }
}
