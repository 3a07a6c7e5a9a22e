//! 설정 관리.
//!
//! 기본값 → TOML 파일(선택) → `BROKER__` 환경 변수 순서로 덮어씁니다.
//! 경로와 URL은 모두 설정 값이며 핵심 로직에 하드코딩하지 않습니다.

use crate::types::BrokerKind;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 저장소 경로 설정
    pub storage: StorageConfig,
    /// 세션 만료 설정
    pub session: SessionConfig,
    /// 브로커별 엔드포인트 설정
    pub brokers: BrokersConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

/// 저장소 설정.
///
/// 상대 경로는 `data_dir` 기준으로 해석됩니다.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// 데이터 루트 디렉토리
    pub data_dir: PathBuf,
    /// 마스터 키 파일
    pub key_file: PathBuf,
    /// 자격증명 레코드 디렉토리
    pub credentials_dir: PathBuf,
    /// 세션 레코드 디렉토리
    pub sessions_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            key_file: PathBuf::from("broker.key"),
            credentials_dir: PathBuf::from("credentials"),
            sessions_dir: PathBuf::from("sessions"),
        }
    }
}

impl StorageConfig {
    /// 모든 경로를 `data_dir` 아래로 고정한 설정을 생성합니다.
    pub fn under(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    /// 키 파일 경로.
    pub fn key_path(&self) -> PathBuf {
        self.resolve(&self.key_file)
    }

    /// 자격증명 디렉토리 경로.
    pub fn credentials_path(&self) -> PathBuf {
        self.resolve(&self.credentials_dir)
    }

    /// 세션 디렉토리 경로.
    pub fn sessions_path(&self) -> PathBuf {
        self.resolve(&self.sessions_dir)
    }
}

/// 세션 만료 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// 브로커가 만료 시각을 주지 않을 때의 기본 유효 시간 (시간)
    pub default_ttl_hours: i64,
    /// "로그인 유지" 선택 시 유효 기간 (일)
    pub remembered_ttl_days: i64,
    /// 짧은 기본 유효 시간 (시간)
    pub short_ttl_hours: i64,
    /// 만료/무효화된 세션 기록 보존 기간 (일)
    pub retention_days: i64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_ttl_hours: 24,
            remembered_ttl_days: 30,
            short_ttl_hours: 8,
            retention_days: 7,
        }
    }
}

impl SessionConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::hours(self.default_ttl_hours)
    }

    pub fn remembered_ttl(&self) -> Duration {
        Duration::days(self.remembered_ttl_days)
    }

    pub fn short_ttl(&self) -> Duration {
        Duration::hours(self.short_ttl_hours)
    }

    pub fn retention(&self) -> Duration {
        Duration::days(self.retention_days)
    }

    /// "로그인 유지" 여부에 따른 유효 시간.
    pub fn ttl_for(&self, remember: bool) -> Duration {
        if remember {
            self.remembered_ttl()
        } else {
            self.short_ttl()
        }
    }
}

/// 브로커 엔드포인트 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerEndpointConfig {
    /// REST API 기본 URL
    pub base_url: String,
    /// 로그인 페이지 URL (리다이렉트 방식 브로커)
    #[serde(default)]
    pub login_url: Option<String>,
    /// 세션 검증 타임아웃 (초)
    #[serde(default = "default_verify_timeout")]
    pub verify_timeout_secs: u64,
    /// 데이터 조회 타임아웃 (초)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_verify_timeout() -> u64 {
    10
}
fn default_request_timeout() -> u64 {
    15
}

impl BrokerEndpointConfig {
    /// 기본 타임아웃으로 엔드포인트 설정 생성.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            login_url: None,
            verify_timeout_secs: default_verify_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }

    pub fn with_login_url(mut self, login_url: impl Into<String>) -> Self {
        self.login_url = Some(login_url.into());
        self
    }

    pub fn verify_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.verify_timeout_secs)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}

/// 브로커별 엔드포인트 모음.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrokersConfig {
    pub kite: BrokerEndpointConfig,
    pub dhan: BrokerEndpointConfig,
    pub angel: BrokerEndpointConfig,
}

impl Default for BrokersConfig {
    fn default() -> Self {
        Self {
            kite: BrokerEndpointConfig::new("https://api.kite.trade")
                .with_login_url("https://kite.zerodha.com/connect/login"),
            dhan: BrokerEndpointConfig::new("https://api.dhan.co"),
            angel: BrokerEndpointConfig::new("https://apiconnect.angelbroking.com"),
        }
    }
}

impl BrokersConfig {
    /// 브로커 종류로 엔드포인트 설정 조회.
    pub fn get(&self, kind: BrokerKind) -> &BrokerEndpointConfig {
        match kind {
            BrokerKind::Kite => &self.kite,
            BrokerKind::Dhan => &self.dhan,
            BrokerKind::Angel => &self.angel,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값과 환경 변수만 사용합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(false))
            .add_source(
                config::Environment::with_prefix("BROKER")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        Self::load("config/default.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.session.default_ttl(), Duration::hours(24));
        assert_eq!(config.session.ttl_for(true), Duration::days(30));
        assert_eq!(config.session.ttl_for(false), Duration::hours(8));
        assert_eq!(config.brokers.get(BrokerKind::Kite).verify_timeout_secs, 10);
        assert_eq!(config.brokers.get(BrokerKind::Dhan).request_timeout_secs, 15);
        assert!(config.brokers.kite.login_url.is_some());
    }

    #[test]
    fn test_storage_paths_resolve_under_data_dir() {
        let storage = StorageConfig::under("/tmp/broker");
        assert_eq!(storage.key_path(), PathBuf::from("/tmp/broker/broker.key"));
        assert_eq!(
            storage.sessions_path(),
            PathBuf::from("/tmp/broker/sessions")
        );
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[session]\ndefault_ttl_hours = 12\n\n[brokers.dhan]\nbase_url = \"http://localhost:9999\""
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.session.default_ttl_hours, 12);
        assert_eq!(config.session.short_ttl_hours, 8);
        assert_eq!(config.session.retention(), chrono::Duration::days(7));
        assert_eq!(config.brokers.dhan.base_url, "http://localhost:9999");
        assert_eq!(config.brokers.dhan.verify_timeout_secs, 10);
        assert_eq!(config.brokers.kite.base_url, "https://api.kite.trade");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.logging.level, "info");
    }
}
