//! 브로커 커넥터.

pub mod angel;
pub mod dhan;
pub mod kite;

pub use angel::AngelAdapter;
pub use dhan::DhanAdapter;
pub use kite::KiteAdapter;
