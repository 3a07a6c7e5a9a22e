//! # 암호화 모듈
//!
//! AES-256-GCM을 사용한 자격증명 필드 암호화/복호화 기능을 제공합니다.
//!
//! ## 보안 고려사항
//! - 마스터 키는 최초 사용 시 생성되어 키 파일에 저장됨
//! - 각 암호화마다 고유한 nonce (12바이트) 사용
//! - 저장 형식은 base64(nonce || ciphertext)
//!
//! ## 운영상 주의
//! 키 파일이 없으면 새 키가 생성됩니다. 이 경우 이전 키로 암호화된
//! 모든 자격증명은 복호화할 수 없게 되며, 사용자가 다시 등록해야 합니다.

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::Engine;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// 암호화 에러
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Invalid master key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid nonce length: expected 12 bytes, got {0}")]
    InvalidNonceLength(usize),

    #[error("Ciphertext too short: {0} bytes")]
    CiphertextTooShort(usize),

    #[error("Base64 decode error: {0}")]
    Base64DecodeError(#[from] base64::DecodeError),

    #[error("UTF-8 decode error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    #[error("Key file error: {0}")]
    KeyFile(String),
}

/// AES-256-GCM nonce 크기 (바이트)
pub const NONCE_SIZE: usize = 12;

/// AES-256 키 크기 (바이트)
pub const KEY_SIZE: usize = 32;

/// 키 파일에서 마스터 키를 얻은 경로.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOrigin {
    /// 기존 키 파일을 읽음
    Loaded,
    /// 키 파일이 없어 새로 생성함
    Generated,
}

/// 자격증명 암호화 관리자
pub struct CredentialEncryptor {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for CredentialEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CredentialEncryptor { .. }")
    }
}

impl CredentialEncryptor {
    /// Base64 마스터 키로 암호화 관리자 생성
    pub fn new(master_key: &str) -> Result<Self, CryptoError> {
        let key_bytes = Self::decode_key(master_key)?;
        let cipher = Aes256Gcm::new_from_slice(&key_bytes)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        Ok(Self { cipher })
    }

    /// 키 파일에서 마스터 키를 로드하고, 없으면 새로 생성하여 저장.
    ///
    /// 새 키를 생성한 경우 `KeyOrigin::Generated`를 반환하며,
    /// 호출자는 이전에 저장된 암호문이 더 이상 복호화되지 않음을 알아야 합니다.
    pub fn from_key_file(path: &Path) -> Result<(Self, KeyOrigin), CryptoError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| CryptoError::KeyFile(format!("{}: {}", path.display(), e)))?;
            let key = SecretString::from(contents.trim().to_string());
            let encryptor = Self::new(key.expose_secret())?;
            info!(path = %path.display(), "Loaded encryption key");
            return Ok((encryptor, KeyOrigin::Loaded));
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| CryptoError::KeyFile(format!("{}: {}", parent.display(), e)))?;
            }
        }

        let key = SecretString::from(generate_master_key());
        write_key_file(path, key.expose_secret().as_bytes())
            .map_err(|e| CryptoError::KeyFile(format!("{}: {}", path.display(), e)))?;

        warn!(
            path = %path.display(),
            "Generated a new encryption key; credentials encrypted with any previous key are unreadable"
        );

        let encryptor = Self::new(key.expose_secret())?;
        Ok((encryptor, KeyOrigin::Generated))
    }

    /// Base64로 인코딩된 마스터 키 디코드
    fn decode_key(master_key: &str) -> Result<Vec<u8>, CryptoError> {
        let key_bytes = base64::engine::general_purpose::STANDARD.decode(master_key)?;

        if key_bytes.len() != KEY_SIZE {
            return Err(CryptoError::InvalidKeyLength(key_bytes.len()));
        }

        Ok(key_bytes)
    }

    /// 랜덤 nonce 생성
    pub fn generate_nonce() -> [u8; NONCE_SIZE] {
        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);
        nonce
    }

    /// 문자열 암호화
    ///
    /// # Returns
    /// * `(encrypted_data, nonce)` - 암호화된 데이터와 사용된 nonce
    pub fn encrypt(&self, plaintext: &str) -> Result<(Vec<u8>, [u8; NONCE_SIZE]), CryptoError> {
        let nonce_bytes = Self::generate_nonce();
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        Ok((ciphertext, nonce_bytes))
    }

    /// 암호화된 데이터 복호화
    pub fn decrypt(&self, ciphertext: &[u8], nonce: &[u8]) -> Result<String, CryptoError> {
        if nonce.len() != NONCE_SIZE {
            return Err(CryptoError::InvalidNonceLength(nonce.len()));
        }

        let nonce = Nonce::from_slice(nonce);

        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext).map_err(CryptoError::from)
    }

    /// 문자열을 암호화하여 저장용 토큰(base64(nonce || ciphertext))으로 반환.
    pub fn encrypt_to_string(&self, plaintext: &str) -> Result<String, CryptoError> {
        let (ciphertext, nonce) = self.encrypt(plaintext)?;

        let mut packed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        packed.extend_from_slice(&nonce);
        packed.extend_from_slice(&ciphertext);

        Ok(base64::engine::general_purpose::STANDARD.encode(packed))
    }

    /// `encrypt_to_string`으로 만든 토큰 복호화.
    pub fn decrypt_from_string(&self, token: &str) -> Result<String, CryptoError> {
        let packed = base64::engine::general_purpose::STANDARD.decode(token)?;

        if packed.len() <= NONCE_SIZE {
            return Err(CryptoError::CiphertextTooShort(packed.len()));
        }

        let (nonce, ciphertext) = packed.split_at(NONCE_SIZE);
        self.decrypt(ciphertext, nonce)
    }

    /// JSON 값 암호화 (숫자/불리언도 원래 타입으로 복원됨)
    pub fn encrypt_value(&self, value: &serde_json::Value) -> Result<String, CryptoError> {
        let json = serde_json::to_string(value)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;
        self.encrypt_to_string(&json)
    }

    /// 암호화된 JSON 값 복호화
    pub fn decrypt_value(&self, token: &str) -> Result<serde_json::Value, CryptoError> {
        let json = self.decrypt_from_string(token)?;
        serde_json::from_str(&json).map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }
}

/// 새로운 마스터 키 생성 (초기 설정용)
///
/// # Example
/// ```
/// let key = broker_core::crypto::generate_master_key();
/// assert!(broker_core::CredentialEncryptor::new(&key).is_ok());
/// ```
pub fn generate_master_key() -> String {
    let mut key = [0u8; KEY_SIZE];
    OsRng.fill_bytes(&mut key);
    base64::engine::general_purpose::STANDARD.encode(key)
}

/// 새 키 파일 생성. 이미 있으면 실패하며, Unix에서는 생성 시점부터 0600.
fn write_key_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_encryptor() -> CredentialEncryptor {
        let key = generate_master_key();
        CredentialEncryptor::new(&key).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_string() {
        let encryptor = test_encryptor();
        let plaintext = "my-secret-api-key-12345";

        let (ciphertext, nonce) = encryptor.encrypt(plaintext).unwrap();
        let decrypted = encryptor.decrypt(&ciphertext, &nonce).unwrap();

        assert_eq!(plaintext, decrypted);
    }

    #[test]
    fn test_packed_token_round_trip() {
        let encryptor = test_encryptor();

        let token = encryptor.encrypt_to_string("dhan-access-token").unwrap();
        assert!(!token.contains("dhan-access-token"));
        assert_eq!(encryptor.decrypt_from_string(&token).unwrap(), "dhan-access-token");
    }

    #[test]
    fn test_same_plaintext_different_ciphertext() {
        let encryptor = test_encryptor();

        let a = encryptor.encrypt_to_string("same").unwrap();
        let b = encryptor.encrypt_to_string("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_value_round_trip_keeps_type() {
        let encryptor = test_encryptor();

        for value in [
            serde_json::json!("text"),
            serde_json::json!(12345),
            serde_json::json!(true),
        ] {
            let token = encryptor.encrypt_value(&value).unwrap();
            assert_eq!(encryptor.decrypt_value(&token).unwrap(), value);
        }
    }

    #[test]
    fn test_invalid_key_length() {
        let short_key = base64::engine::general_purpose::STANDARD.encode([0u8; 16]);
        let result = CredentialEncryptor::new(&short_key);
        assert!(matches!(result, Err(CryptoError::InvalidKeyLength(16))));
    }

    #[test]
    fn test_wrong_key_fails() {
        let token = test_encryptor().encrypt_to_string("secret").unwrap();

        let result = test_encryptor().decrypt_from_string(&token);
        assert!(matches!(result, Err(CryptoError::DecryptionFailed(_))));
    }

    #[test]
    fn test_truncated_token_fails() {
        let encryptor = test_encryptor();
        let token = base64::engine::general_purpose::STANDARD.encode([1u8; 8]);

        let result = encryptor.decrypt_from_string(&token);
        assert!(matches!(result, Err(CryptoError::CiphertextTooShort(8))));
    }

    #[test]
    fn test_key_file_created_then_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys").join("broker.key");

        let (first, origin) = CredentialEncryptor::from_key_file(&path).unwrap();
        assert_eq!(origin, KeyOrigin::Generated);
        assert!(path.exists());

        let token = first.encrypt_to_string("persisted").unwrap();

        let (second, origin) = CredentialEncryptor::from_key_file(&path).unwrap();
        assert_eq!(origin, KeyOrigin::Loaded);
        assert_eq!(second.decrypt_from_string(&token).unwrap(), "persisted");
    }

    #[cfg(unix)]
    #[test]
    fn test_generated_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broker.key");
        CredentialEncryptor::from_key_file(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_existing_key_file_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broker.key");
        std::fs::write(&path, "not-a-key").unwrap();

        assert!(write_key_file(&path, b"replacement").is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not-a-key");
    }

    #[test]
    fn test_generate_master_key() {
        let key1 = generate_master_key();
        let key2 = generate_master_key();

        assert_ne!(key1, key2);
        assert!(key1.len() >= 40);
        assert!(CredentialEncryptor::new(&key1).is_ok());
    }

    proptest! {
        #[test]
        fn prop_decrypt_inverts_encrypt(s in ".*") {
            let encryptor = test_encryptor();
            let token = encryptor.encrypt_to_string(&s).unwrap();
            prop_assert_eq!(encryptor.decrypt_from_string(&token).unwrap(), s);
        }
    }
}
