//! 存储管理器实现
//!
//! - `sqlite`: SQLite 存储（`Storage` 协作接口的默认实现）

pub mod sqlite;

pub use sqlite::{QueryRow, SqliteManager, Storage};
