//! 레코드 단위 JSON 파일 저장소.
//!
//! 레코드마다 `<sha256(key)>.json` 파일 하나를 사용합니다.
//! 쓰기는 `<name>.json.tmp`에 먼저 기록한 뒤 원자적으로 rename하므로
//! 중단되더라도 이전 레코드 또는 새 레코드 중 하나만 남습니다.
//!
//! 동시 쓰기 제어는 호출자(저장소 타입)의 책임입니다.

use crate::error::StoreResult;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

const RECORD_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "json.tmp";

/// 레코드 단위 JSON 파일 저장소.
#[derive(Debug)]
pub struct JsonFileStore<T> {
    dir: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T>
where
    T: Serialize + DeserializeOwned,
{
    /// 디렉토리를 열고 없으면 생성합니다.
    pub async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            _record: PhantomData,
        })
    }

    /// 저장 디렉토리.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 키에 해당하는 레코드 파일 경로.
    pub fn record_path(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.dir
            .join(format!("{}.{RECORD_EXTENSION}", hex::encode(digest)))
    }

    /// 레코드를 원자적으로 기록합니다.
    pub async fn write(&self, key: &str, record: &T) -> StoreResult<()> {
        let path = self.record_path(key);
        let temp_path = path.with_extension(TEMP_EXTENSION);
        let bytes = serde_json::to_vec_pretty(record)?;

        {
            let mut file = tokio::fs::File::create(&temp_path).await?;
            file.write_all(&bytes).await?;
            file.sync_all().await?;
        }

        tokio::fs::rename(&temp_path, &path).await?;
        debug!(path = %path.display(), "Record written");
        Ok(())
    }

    /// 레코드를 읽습니다. 파일이 없으면 `None`.
    pub async fn read(&self, key: &str) -> StoreResult<Option<T>> {
        let path = self.record_path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 레코드를 삭제합니다. 삭제했으면 `true`.
    pub async fn remove(&self, key: &str) -> StoreResult<bool> {
        match tokio::fs::remove_file(self.record_path(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// 디렉토리의 모든 레코드를 읽습니다.
    ///
    /// 읽을 수 없거나 손상된 파일은 경고를 남기고 건너뜁니다.
    pub async fn load_all(&self) -> StoreResult<Vec<T>> {
        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_record_file(&path) {
                continue;
            }

            let parsed = match tokio::fs::read(&path).await {
                Ok(bytes) => serde_json::from_slice::<T>(&bytes).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            match parsed {
                Ok(record) => records.push(record),
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "Skipping unreadable record file");
                }
            }
        }

        Ok(records)
    }

    /// 모든 레코드 파일(임시 파일 포함)을 삭제하고 삭제한 레코드 수를 반환합니다.
    pub async fn clear(&self) -> StoreResult<usize> {
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_temp = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(TEMP_EXTENSION));

            if is_record_file(&path) {
                tokio::fs::remove_file(&path).await?;
                removed += 1;
            } else if is_temp {
                tokio::fs::remove_file(&path).await?;
            }
        }

        Ok(removed)
    }
}

fn is_record_file(path: &Path) -> bool {
    path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        body: String,
    }

    fn note(id: &str, body: &str) -> Note {
        Note {
            id: id.to_string(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_write_read_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::<Note>::open(dir.path()).await.unwrap();

        store.write("a", &note("a", "first")).await.unwrap();
        store.write("a", &note("a", "second")).await.unwrap();

        assert_eq!(store.read("a").await.unwrap(), Some(note("a", "second")));
        assert_eq!(store.read("missing").await.unwrap(), None);
        assert!(!store.record_path("a").with_extension(TEMP_EXTENSION).exists());
    }

    #[tokio::test]
    async fn test_file_name_hides_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::<Note>::open(dir.path()).await.unwrap();

        let path = store.record_path("dhan:../../etc/passwd");
        assert_eq!(path.parent(), Some(dir.path()));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(!name.contains("passwd"));
        assert_eq!(name.len(), 64 + ".json".len());
    }

    #[tokio::test]
    async fn test_load_all_skips_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::<Note>::open(dir.path()).await.unwrap();

        store.write("a", &note("a", "x")).await.unwrap();
        store.write("b", &note("b", "y")).await.unwrap();
        std::fs::write(dir.path().join("broken.json"), b"{not json").unwrap();
        std::fs::write(dir.path().join("stale.json.tmp"), b"{}").unwrap();

        let mut all = store.load_all().await.unwrap();
        all.sort_by(|l, r| l.id.cmp(&r.id));
        assert_eq!(all, vec![note("a", "x"), note("b", "y")]);
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::<Note>::open(dir.path()).await.unwrap();

        store.write("a", &note("a", "x")).await.unwrap();
        store.write("b", &note("b", "y")).await.unwrap();

        assert!(store.remove("a").await.unwrap());
        assert!(!store.remove("a").await.unwrap());
        assert_eq!(store.clear().await.unwrap(), 1);
        assert!(store.load_all().await.unwrap().is_empty());
    }
}
