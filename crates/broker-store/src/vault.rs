//! 암호화된 자격증명 보관소.
//!
//! (브로커, 사용자) 쌍마다 레코드 하나를 저장합니다. 민감 필드
//! (`api_key`, `api_secret`, `access_token`, `client_id`)는 AES-256-GCM으로
//! 암호화하고 나머지 필드(로그인 유지 여부 등)는 평문으로 둡니다.
//!
//! 조회 결과는 세 가지로 구분됩니다:
//! - `Ok(Some(record))`: 복호화 성공
//! - `Ok(None)`: 등록된 자격증명 없음
//! - `Err(StoreError::Decryption { .. })`: 암호문 손상 또는 키 불일치

use crate::error::{StoreError, StoreResult};
use crate::file_store::JsonFileStore;
use broker_core::{
    is_sensitive_field, AccountSummary, BrokerKind, CredentialEncryptor, CredentialFields,
    CredentialRecord, FIELD_REMEMBER_SESSION,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// 디스크에 저장되는 형태. 민감 필드 값은 암호문 문자열입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCredential {
    broker: BrokerKind,
    user_id: String,
    fields: CredentialFields,
    #[serde(default)]
    encrypted_fields: Vec<String>,
    saved_at: DateTime<Utc>,
}

impl StoredCredential {
    fn summary(&self) -> AccountSummary {
        AccountSummary {
            broker: self.broker,
            user_id: self.user_id.clone(),
            saved_at: self.saved_at,
            remember_session: self
                .fields
                .get(FIELD_REMEMBER_SESSION)
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        }
    }
}

fn record_key(broker: BrokerKind, user_id: &str) -> String {
    format!("{}:{}", broker.as_str(), user_id)
}

/// 자격증명 보관소.
pub struct CredentialVault {
    files: JsonFileStore<StoredCredential>,
    encryptor: CredentialEncryptor,
    records: Mutex<BTreeMap<String, StoredCredential>>,
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault")
            .field("dir", &self.files.dir())
            .finish_non_exhaustive()
    }
}

impl CredentialVault {
    /// 디렉토리에서 보관소를 엽니다.
    pub async fn open(dir: impl Into<PathBuf>, encryptor: CredentialEncryptor) -> StoreResult<Self> {
        let files = JsonFileStore::open(dir).await?;
        let records = files
            .load_all()
            .await?
            .into_iter()
            .map(|r: StoredCredential| (record_key(r.broker, &r.user_id), r))
            .collect::<BTreeMap<_, _>>();

        info!(accounts = records.len(), "Credential vault opened");

        Ok(Self {
            files,
            encryptor,
            records: Mutex::new(records),
        })
    }

    /// 자격증명을 저장합니다. 같은 (브로커, 사용자)의 기존 레코드는 덮어씁니다.
    pub async fn save(
        &self,
        broker: BrokerKind,
        user_id: &str,
        fields: CredentialFields,
    ) -> StoreResult<()> {
        let mut stored_fields = CredentialFields::new();
        let mut encrypted_fields = Vec::new();

        for (name, value) in fields {
            if is_sensitive_field(&name) {
                let token = self
                    .encryptor
                    .encrypt_value(&value)
                    .map_err(|_| StoreError::Encryption {
                        field: name.clone(),
                    })?;
                stored_fields.insert(name.clone(), serde_json::Value::String(token));
                encrypted_fields.push(name);
            } else {
                stored_fields.insert(name, value);
            }
        }

        let stored = StoredCredential {
            broker,
            user_id: user_id.to_string(),
            fields: stored_fields,
            encrypted_fields,
            saved_at: Utc::now(),
        };

        let key = record_key(broker, user_id);
        let mut records = self.records.lock().await;
        self.files.write(&key, &stored).await?;

        info!(
            broker = %broker,
            user_id = %user_id,
            encrypted = stored.encrypted_fields.len(),
            "Credentials saved"
        );
        records.insert(key, stored);
        Ok(())
    }

    /// 자격증명을 복호화하여 반환합니다.
    pub async fn load(
        &self,
        broker: BrokerKind,
        user_id: &str,
    ) -> StoreResult<Option<CredentialRecord>> {
        let stored = {
            let records = self.records.lock().await;
            match records.get(&record_key(broker, user_id)) {
                Some(stored) => stored.clone(),
                None => return Ok(None),
            }
        };

        let mut fields = stored.fields;
        for name in &stored.encrypted_fields {
            let Some(token) = fields.get(name).and_then(|v| v.as_str()) else {
                continue;
            };

            let value = self.encryptor.decrypt_value(token).map_err(|_| {
                warn!(
                    broker = %broker,
                    user_id = %user_id,
                    field = %name,
                    "Stored credential could not be decrypted"
                );
                StoreError::Decryption {
                    field: name.clone(),
                }
            })?;
            fields.insert(name.clone(), value);
        }

        Ok(Some(CredentialRecord {
            broker,
            user_id: stored.user_id,
            fields,
            saved_at: stored.saved_at,
        }))
    }

    /// 자격증명이 등록되어 있는지 확인합니다.
    pub async fn contains(&self, broker: BrokerKind, user_id: &str) -> bool {
        self.records
            .lock()
            .await
            .contains_key(&record_key(broker, user_id))
    }

    /// 저장된 계정 목록 (저장 시각 내림차순). 비밀 필드는 포함하지 않습니다.
    pub async fn list_accounts(&self) -> Vec<AccountSummary> {
        let records = self.records.lock().await;
        let mut accounts: Vec<AccountSummary> =
            records.values().map(StoredCredential::summary).collect();
        accounts.sort_by(|a, b| {
            b.saved_at
                .cmp(&a.saved_at)
                .then_with(|| a.broker.as_str().cmp(b.broker.as_str()))
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        accounts
    }

    /// 저장된 계정 수.
    pub async fn count(&self) -> usize {
        self.records.lock().await.len()
    }

    /// 모든 자격증명을 삭제하고 삭제한 레코드 수를 반환합니다.
    pub async fn wipe_all(&self) -> StoreResult<usize> {
        let mut records = self.records.lock().await;
        let removed = self.files.clear().await?;
        let count = records.len().max(removed);
        records.clear();

        warn!(removed = count, "All stored credentials wiped");
        Ok(count)
    }
}
