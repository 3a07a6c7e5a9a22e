//! 외부에서 발급받은 액세스 토큰 가져오기.
//!
//! 기존 `dhan_token.json` 형식을 읽습니다:
//!
//! ```json
//! { "access_token": "...", "expires_at": 1735689600 }
//! ```
//!
//! `expires_at`은 유닉스 초이며 소수점이 있어도 됩니다.

use broker_core::BrokerKind;
use chrono::{DateTime, TimeZone, Utc};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 토큰 파일 읽기 에러.
#[derive(Debug, Error)]
pub enum TokenFileError {
    #[error("{} not found. Please ensure the token file exists.", .0.display())]
    NotFound(PathBuf),

    #[error("Could not read token file: {0}")]
    Unreadable(String),

    #[error("No access_token found in {}", .0.display())]
    MissingToken(PathBuf),

    #[error("Token in {} is expired. Please generate a new token.", .0.display())]
    Expired(PathBuf),
}

impl TokenFileError {
    /// 짧은 에러 분류 코드.
    pub fn kind(&self) -> &'static str {
        match self {
            TokenFileError::NotFound(_) => "not_found",
            TokenFileError::Unreadable(_) => "storage",
            TokenFileError::MissingToken(_) | TokenFileError::Expired(_) => "validation",
        }
    }
}

#[derive(Deserialize)]
struct TokenFile {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_at: Option<f64>,
}

/// 가져올 토큰.
#[derive(Debug)]
pub struct TokenImport {
    pub broker: BrokerKind,
    pub user_id: String,
    pub access_token: SecretString,
    /// 없으면 기본 세션 기간 적용
    pub expires_at: Option<DateTime<Utc>>,
    /// Dhan Client ID (없으면 사용자 ID 사용)
    pub client_id: Option<String>,
}

impl TokenImport {
    pub fn new(broker: BrokerKind, user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            broker,
            user_id: user_id.into(),
            access_token: SecretString::from(access_token.into()),
            expires_at: None,
            client_id: None,
        }
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// `dhan_token.json` 형식 파일에서 Dhan 토큰을 읽습니다.
    pub async fn from_dhan_token_file(path: &Path, client_id: &str) -> Result<Self, TokenFileError> {
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(TokenFileError::NotFound(path.to_path_buf()))
            }
            Err(e) => return Err(TokenFileError::Unreadable(e.to_string())),
        };

        let file: TokenFile = serde_json::from_str(&contents)
            .map_err(|e| TokenFileError::Unreadable(e.to_string()))?;

        let token = file
            .access_token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| TokenFileError::MissingToken(path.to_path_buf()))?;

        let expires_at = file
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs.trunc() as i64, 0).single());
        if expires_at.is_some_and(|at| at <= Utc::now()) {
            return Err(TokenFileError::Expired(path.to_path_buf()));
        }

        let mut import = Self::new(BrokerKind::Dhan, client_id, token).with_client_id(client_id);
        import.expires_at = expires_at;
        Ok(import)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    async fn write(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join("dhan_token.json");
        tokio::fs::write(&path, contents).await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_reads_token_and_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let expires = Utc::now().timestamp() + 3600;
        let path = write(
            dir.path(),
            &format!(r#"{{"access_token": "tok-abcdefghijklmnopqrstu", "expires_at": {expires}.5}}"#),
        )
        .await;

        let import = TokenImport::from_dhan_token_file(&path, "1100012345").await.unwrap();
        assert_eq!(import.broker, BrokerKind::Dhan);
        assert_eq!(import.user_id, "1100012345");
        assert_eq!(import.access_token.expose_secret(), "tok-abcdefghijklmnopqrstu");
        assert_eq!(import.expires_at.unwrap().timestamp(), expires);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = TokenImport::from_dhan_token_file(&dir.path().join("dhan_token.json"), "C1")
            .await
            .unwrap_err();
        assert!(matches!(err, TokenFileError::NotFound(_)));
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_missing_and_expired_tokens() {
        let dir = tempfile::tempdir().unwrap();

        let path = write(dir.path(), r#"{"expires_at": 1}"#).await;
        let err = TokenImport::from_dhan_token_file(&path, "C1").await.unwrap_err();
        assert!(matches!(err, TokenFileError::MissingToken(_)));

        let path = write(dir.path(), r#"{"access_token": "tok-abcdefghijklmnopqrstu", "expires_at": 1}"#).await;
        let err = TokenImport::from_dhan_token_file(&path, "C1").await.unwrap_err();
        assert!(matches!(err, TokenFileError::Expired(_)));
        assert!(!err.to_string().contains("tok-abcdefghijklmnopqrstu"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let import = TokenImport::new(BrokerKind::Kite, "U1", "kite-access-token-1");
        assert!(!format!("{import:?}").contains("kite-access-token-1"));
    }
}
