//! 持久化表结构
//!
//! 两张表：`toaster`（通知日志）和 `filter`（包过滤规则）。
//! 列名常量供投影注册表、模型转换和测试共用。

use rusqlite::Connection;

/// `toaster` 表
pub mod toaster_table {
    pub const TABLE_NAME: &str = "toaster";
    pub const ID: &str = "_id";
    pub const TIMESTAMP: &str = "timestamp";
    pub const MESSAGE: &str = "message";
    pub const PACKAGE: &str = "package";
    pub const VERSION_CODE: &str = "version_code";
    pub const VERSION_NAME: &str = "version_name";

    pub const COLUMNS: &[&str] = &[ID, TIMESTAMP, MESSAGE, PACKAGE, VERSION_CODE, VERSION_NAME];
}

/// `filter` 表
pub mod filter_table {
    pub const TABLE_NAME: &str = "filter";
    pub const ID: &str = "_id";
    pub const PACKAGE: &str = "package";
    pub const EXCL_INCL: &str = "excl_incl";

    pub const COLUMNS: &[&str] = &[ID, PACKAGE, EXCL_INCL];
}

const CREATE_TOASTER: &str = "CREATE TABLE IF NOT EXISTS toaster (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER,
    message TEXT,
    package TEXT,
    version_code INTEGER,
    version_name TEXT
)";

const CREATE_FILTER: &str = "CREATE TABLE IF NOT EXISTS filter (
    _id INTEGER PRIMARY KEY AUTOINCREMENT,
    package TEXT NOT NULL,
    excl_incl INTEGER NOT NULL DEFAULT 0
)";

/// 建表（幂等）
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(&format!("{CREATE_TOASTER};\n{CREATE_FILTER};"))?;
    tracing::debug!("数据表已就绪: toaster, filter");
    Ok(())
}
