//! 세션 저장소.
//!
//! 세션마다 파일 하나를 원자적으로 기록하고, 프로세스 내에서는
//! `tokio::sync::Mutex` 하나로 모든 변경을 직렬화합니다.
//! 여러 프로세스가 같은 디렉토리를 동시에 쓰는 경우는 조정하지 않습니다.
//!
//! 변경은 항상 복사본을 먼저 파일에 기록하고, 기록이 성공한 뒤에만
//! 메모리 상태에 반영합니다. 기록이 실패하면 메모리와 디스크 모두 이전
//! 레코드를 유지합니다.
//!
//! (브로커, 사용자) 쌍당 활성 세션은 최대 하나입니다. `create`가 같은
//! 쌍의 기존 활성 세션을 먼저 무효화하여 이를 보장합니다.

use crate::error::StoreResult;
use crate::file_store::JsonFileStore;
use broker_core::{BrokerKind, Session, SessionPayload, SessionStatus};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const SESSION_ID_HEX_LEN: usize = 32;

/// 상태별 세션 수.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total: usize,
    pub active: usize,
    pub expired: usize,
    pub invalidated: usize,
}

/// 세션 저장소.
#[derive(Debug)]
pub struct SessionStore {
    files: JsonFileStore<Session>,
    sessions: Mutex<BTreeMap<String, Session>>,
    default_ttl: Duration,
}

impl SessionStore {
    /// 디렉토리에서 세션 저장소를 엽니다.
    ///
    /// `default_ttl`은 페이로드에 만료 시각이 없을 때 적용됩니다.
    pub async fn open(dir: impl Into<PathBuf>, default_ttl: Duration) -> StoreResult<Self> {
        let files = JsonFileStore::open(dir).await?;
        let sessions = files
            .load_all()
            .await?
            .into_iter()
            .map(|s: Session| (s.session_id.clone(), s))
            .collect::<BTreeMap<_, _>>();

        info!(sessions = sessions.len(), "Session store opened");

        Ok(Self {
            files,
            sessions: Mutex::new(sessions),
            default_ttl,
        })
    }

    /// 새 활성 세션을 생성합니다.
    ///
    /// 같은 (브로커, 사용자)의 기존 활성 세션은 먼저 무효화됩니다.
    pub async fn create(
        &self,
        broker: BrokerKind,
        user_id: &str,
        payload: SessionPayload,
    ) -> StoreResult<Session> {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();

        let superseded = self
            .invalidate_matching(&mut sessions, broker, user_id, now)
            .await?;
        if superseded > 0 {
            debug!(broker = %broker, user_id = %user_id, superseded, "Superseded previous sessions");
        }

        let session_id = loop {
            let candidate = generate_session_id(broker, user_id, now);
            if !sessions.contains_key(&candidate) {
                break candidate;
            }
        };

        let session = Session {
            session_id: session_id.clone(),
            broker,
            user_id: user_id.to_string(),
            created_at: now,
            last_activity: now,
            expires_at: payload.expires_at.unwrap_or(now + self.default_ttl),
            status: SessionStatus::Active,
            invalidated_at: None,
            data: payload.data,
        };

        self.files.write(&session_id, &session).await?;
        sessions.insert(session_id, session.clone());

        info!(
            broker = %broker,
            user_id = %user_id,
            expires_at = %session.expires_at,
            "Session created"
        );
        Ok(session)
    }

    /// 세션을 조회합니다.
    ///
    /// 만료 시각이 지났으면 상태를 `Expired`로 바꾸고 `None`을 반환합니다.
    /// 활성 세션이면 `last_activity`를 갱신합니다 (`expires_at`은 연장하지 않음).
    /// 만료/무효화된 세션은 `None`입니다.
    pub async fn get(&self, session_id: &str) -> StoreResult<Option<Session>> {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();

        let Some(session) = sessions.get_mut(session_id) else {
            return Ok(None);
        };

        if session.status != SessionStatus::Active {
            return Ok(None);
        }

        let mut updated = session.clone();
        if updated.is_expired_at(now) {
            updated.status = SessionStatus::Expired;
            self.files.write(session_id, &updated).await?;
            *session = updated;
            debug!(session_id = %session_id, "Session expired on read");
            return Ok(None);
        }

        updated.last_activity = now;
        self.files.write(session_id, &updated).await?;
        *session = updated.clone();
        Ok(Some(updated))
    }

    /// (브로커, 사용자)의 활성 세션을 조회합니다.
    ///
    /// 스캔 중 만료된 세션은 `Expired`로 전이됩니다. 활성 세션이 여러 개면
    /// 가장 최근에 생성된 세션을 반환하고 경고를 남깁니다.
    pub async fn get_active(
        &self,
        broker: BrokerKind,
        user_id: &str,
    ) -> StoreResult<Option<Session>> {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();

        let mut newest: Option<&Session> = None;
        let mut active_count = 0;
        let mut newly_expired = Vec::new();

        for session in sessions.values() {
            if !session.belongs_to(broker, user_id) || session.status != SessionStatus::Active {
                continue;
            }
            if session.is_expired_at(now) {
                newly_expired.push(session.session_id.clone());
                continue;
            }
            active_count += 1;
            if newest.map_or(true, |n| session.created_at > n.created_at) {
                newest = Some(session);
            }
        }

        if active_count > 1 {
            warn!(
                broker = %broker,
                user_id = %user_id,
                active = active_count,
                "Multiple active sessions found; using the newest"
            );
        }
        let found = newest.map(|s| s.session_id.clone());

        for id in newly_expired {
            if let Some(session) = sessions.get_mut(&id) {
                let mut expired = session.clone();
                expired.status = SessionStatus::Expired;
                self.files.write(&id, &expired).await?;
                *session = expired;
            }
        }

        Ok(found.and_then(|id| sessions.get(&id).cloned()))
    }

    /// 세션을 무효화합니다. 이미 무효화된 세션도 `true`를 반환합니다.
    /// 알 수 없는 세션이면 `false`.
    pub async fn invalidate(&self, session_id: &str) -> StoreResult<bool> {
        let mut sessions = self.sessions.lock().await;

        let Some(session) = sessions.get_mut(session_id) else {
            return Ok(false);
        };

        if session.status != SessionStatus::Invalidated {
            let mut invalidated = session.clone();
            invalidated.status = SessionStatus::Invalidated;
            invalidated.invalidated_at = Some(Utc::now());
            self.files.write(session_id, &invalidated).await?;
            *session = invalidated;
            info!(
                broker = %session.broker,
                user_id = %session.user_id,
                "Session invalidated"
            );
        }
        Ok(true)
    }

    /// (브로커, 사용자)의 모든 활성 세션을 무효화하고 무효화한 수를 반환합니다.
    pub async fn invalidate_all(&self, broker: BrokerKind, user_id: &str) -> StoreResult<usize> {
        let mut sessions = self.sessions.lock().await;
        let count = self
            .invalidate_matching(&mut sessions, broker, user_id, Utc::now())
            .await?;

        if count > 0 {
            info!(broker = %broker, user_id = %user_id, count, "Sessions invalidated");
        }
        Ok(count)
    }

    /// 만료 시각이 지난 활성 세션을 `Expired`로 전이하고 그 수를 반환합니다.
    pub async fn cleanup_expired(&self) -> StoreResult<usize> {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();
        let mut count = 0;

        for (id, session) in sessions.iter_mut() {
            if session.status == SessionStatus::Active && session.is_expired_at(now) {
                let mut expired = session.clone();
                expired.status = SessionStatus::Expired;
                self.files.write(id, &expired).await?;
                *session = expired;
                count += 1;
            }
        }

        if count > 0 {
            info!(count, "Expired sessions cleaned up");
        }
        Ok(count)
    }

    /// 활성 상태가 아닌 세션 중 `retention`보다 오래된 것을 삭제하고 그 수를 반환합니다.
    ///
    /// 기준 시각은 무효화 시각, 없으면 만료 시각입니다. 파일 삭제가 실패하면
    /// 해당 세션은 메모리에도 남습니다.
    pub async fn purge_inactive(&self, retention: Duration) -> StoreResult<usize> {
        let mut sessions = self.sessions.lock().await;
        let cutoff = Utc::now() - retention;

        let stale: Vec<String> = sessions
            .values()
            .filter(|s| s.status != SessionStatus::Active)
            .filter(|s| s.invalidated_at.unwrap_or(s.expires_at) < cutoff)
            .map(|s| s.session_id.clone())
            .collect();

        let mut purged = 0;
        for id in stale {
            self.files.remove(&id).await?;
            sessions.remove(&id);
            purged += 1;
        }

        if purged > 0 {
            info!(purged, "Inactive sessions purged");
        }
        Ok(purged)
    }

    /// 모든 세션을 삭제하고 삭제한 수를 반환합니다.
    pub async fn wipe_all(&self) -> StoreResult<usize> {
        let mut sessions = self.sessions.lock().await;
        let removed = match self.files.clear().await {
            Ok(removed) => removed,
            Err(e) => {
                sessions.retain(|id, _| self.files.record_path(id).exists());
                return Err(e);
            }
        };
        let count = sessions.len().max(removed);
        sessions.clear();

        warn!(removed = count, "All sessions wiped");
        Ok(count)
    }

    /// 상태별 세션 수.
    ///
    /// 만료 시각이 지났지만 아직 전이되지 않은 세션은 `expired`로 셉니다.
    pub async fn stats(&self) -> SessionStats {
        let sessions = self.sessions.lock().await;
        let now = Utc::now();
        let mut stats = SessionStats {
            total: sessions.len(),
            ..Default::default()
        };

        for session in sessions.values() {
            match session.status {
                SessionStatus::Active if session.is_expired_at(now) => stats.expired += 1,
                SessionStatus::Active => stats.active += 1,
                SessionStatus::Expired => stats.expired += 1,
                SessionStatus::Invalidated => stats.invalidated += 1,
            }
        }
        stats
    }

    async fn invalidate_matching(
        &self,
        sessions: &mut BTreeMap<String, Session>,
        broker: BrokerKind,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> StoreResult<usize> {
        let mut count = 0;
        for (id, session) in sessions.iter_mut() {
            if session.belongs_to(broker, user_id) && session.status == SessionStatus::Active {
                let mut invalidated = session.clone();
                invalidated.status = SessionStatus::Invalidated;
                invalidated.invalidated_at = Some(now);
                self.files.write(id, &invalidated).await?;
                *session = invalidated;
                count += 1;
            }
        }
        Ok(count)
    }
}

/// 브로커, 사용자, 생성 시각과 랜덤 솔트로 세션 ID를 만듭니다.
fn generate_session_id(broker: BrokerKind, user_id: &str, now: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(broker.as_str().as_bytes());
    hasher.update(b"\0");
    hasher.update(user_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(now.timestamp_nanos_opt().unwrap_or_default().to_be_bytes());
    hasher.update(uuid::Uuid::new_v4().as_bytes());

    let mut id = hex::encode(hasher.finalize());
    id.truncate(SESSION_ID_HEX_LEN);
    id
}
