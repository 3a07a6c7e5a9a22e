//! # Broker Store
//!
//! 자격증명 보관소와 세션 저장소를 제공합니다.
//!
//! 두 저장소 모두 레코드 단위 JSON 파일을 원자적으로 교체하는 방식으로
//! 영속화하며, 서로의 객체를 참조하지 않고 키로만 조회합니다.

pub mod error;
pub mod file_store;
pub mod session_store;
pub mod vault;

pub use error::{StoreError, StoreResult};
pub use file_store::JsonFileStore;
pub use session_store::{SessionStats, SessionStore};
pub use vault::CredentialVault;
