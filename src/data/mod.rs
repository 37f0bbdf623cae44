//! 数据存储层
//!
//! 提供表结构定义和 SQLite 存储协作者。
//!
//! # 模块组织
//!
//! - `error`: 统一错误类型定义
//! - `schema`: 表名/列名常量与建表
//! - `managers`: 存储管理器（`Storage` trait + SQLite 实现）

pub mod error;
pub mod managers;
pub mod schema;

pub use error::{DataError, Result};
pub use managers::{QueryRow, SqliteManager, Storage};
