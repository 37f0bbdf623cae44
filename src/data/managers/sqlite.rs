//! SQLite 存储管理器
//!
//! 提供 `Storage` 协作接口的 SQLite 实现，支持：
//! - 延迟打开连接（单连接 + Mutex，首次访问时打开并建表）
//! - 连接无法打开时返回 `StorageUnavailable`，由上层决定是否降级
//! - 参数化查询（条件文本与参数分离）
//!
//! # 使用示例
//!
//! ```rust
//! use std::path::Path;
//! use crate::data::managers::{SqliteManager, Storage};
//!
//! let manager = SqliteManager::open(Path::new("toaster.db"));
//!
//! let rows = manager.query(
//!     "SELECT package FROM toaster WHERE _id = ?",
//!     &[SqlValue::Text("1".into())],
//! )?;
//! ```

use crate::data::schema;
use crate::data::{DataError, Result};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const IN_MEMORY: &str = ":memory:";

/// 存储协作接口
///
/// 查询/写入均为单条语句，原子性由底层存储保证。
pub trait Storage: Send + Sync {
    /// 执行查询，返回通用行格式
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<QueryRow>>;

    /// 执行更新/删除，返回受影响的行数
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize>;

    /// 执行插入，返回新行 ID；未创建任何行时返回 `None`
    fn insert(&self, sql: &str, params: &[SqlValue]) -> Result<Option<i64>>;
}

/// 查询结果行（通用 JSON 格式）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRow {
    pub columns: Vec<String>,
    pub values: Vec<serde_json::Value>,
}

impl QueryRow {
    /// 按列名取值
    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }
}

/// SQLite 管理器
pub struct SqliteManager {
    /// 数据库连接（None 表示尚未打开）
    conn: Mutex<Option<Connection>>,
    /// 数据库路径（用于错误报告）
    db_path: PathBuf,
}

impl SqliteManager {
    /// 创建文件数据库管理器（连接在首次访问时打开）
    pub fn open(path: &Path) -> Self {
        Self {
            conn: Mutex::new(None),
            db_path: path.to_path_buf(),
        }
    }

    /// 创建内存数据库管理器（用于测试）
    pub fn in_memory() -> Self {
        Self::open(Path::new(IN_MEMORY))
    }

    /// 打开数据库连接并建表
    fn open_connection(path: &Path) -> Result<Connection> {
        let conn = if path == Path::new(IN_MEMORY) {
            Connection::open_in_memory()?
        } else {
            // 创建父目录
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DataError::io(parent.to_path_buf(), e))?;
            }
            Connection::open(path)?
        };

        schema::ensure_schema(&conn)?;
        Ok(conn)
    }

    /// 在连接上执行操作，必要时先打开连接
    fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| DataError::Concurrency(e.to_string()))?;

        if let Some(conn) = guard.as_ref() {
            return f(conn);
        }

        let conn = Self::open_connection(&self.db_path).map_err(|e| {
            tracing::warn!(path = ?self.db_path, error = %e, "数据库连接打开失败");
            DataError::StorageUnavailable(format!("{}: {e}", self.db_path.display()))
        })?;
        tracing::debug!(path = ?self.db_path, "数据库连接已打开");

        f(guard.insert(conn))
    }

    /// 将 rusqlite::Row 转换为 QueryRow
    fn row_to_query_row(
        row: &Row,
        column_names: &[String],
        column_count: usize,
    ) -> rusqlite::Result<QueryRow> {
        let mut values = Vec::with_capacity(column_count);

        for i in 0..column_count {
            let value = Self::get_value_as_json(row, i)?;
            values.push(value);
        }

        Ok(QueryRow {
            columns: column_names.to_vec(),
            values,
        })
    }

    /// 从 Row 中获取 JSON 值
    fn get_value_as_json(row: &Row, idx: usize) -> rusqlite::Result<serde_json::Value> {
        match row.get_ref(idx)? {
            ValueRef::Null => Ok(serde_json::Value::Null),
            ValueRef::Integer(i) => Ok(serde_json::Value::Number(i.into())),
            ValueRef::Real(f) => Ok(serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null)),
            ValueRef::Text(s) => {
                let text = String::from_utf8_lossy(s);
                Ok(serde_json::Value::String(text.into_owned()))
            }
            ValueRef::Blob(b) => Ok(serde_json::Value::String(format!(
                "<blob {} bytes>",
                b.len()
            ))),
        }
    }

    /// 检查表是否存在
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?",
                [table_name],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// 执行原始 SQL（用于 DDL 等操作）
    pub fn execute_raw(&self, sql: &str) -> Result<()> {
        self.with_connection(|conn| conn.execute_batch(sql).map_err(DataError::Database))
    }

    /// 获取数据库路径
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl Storage for SqliteManager {
    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<QueryRow>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(sql)?;

            // 获取列名
            let column_names: Vec<String> =
                stmt.column_names().iter().map(|s| s.to_string()).collect();
            let column_count = column_names.len();

            let rows = stmt
                .query_map(params_from_iter(params.iter()), |row| {
                    Self::row_to_query_row(row, &column_names, column_count)
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize> {
        self.with_connection(|conn| {
            conn.execute(sql, params_from_iter(params.iter()))
                .map_err(DataError::Database)
        })
    }

    fn insert(&self, sql: &str, params: &[SqlValue]) -> Result<Option<i64>> {
        self.with_connection(|conn| {
            let created = conn.execute(sql, params_from_iter(params.iter()))?;
            if created == 0 {
                return Ok(None);
            }
            Ok(Some(conn.last_insert_rowid()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn text(s: &str) -> SqlValue {
        SqlValue::Text(s.to_string())
    }

    #[test]
    fn test_open_is_lazy() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("toaster.db");
        let manager = SqliteManager::open(&db_path);

        assert!(!db_path.exists());
        assert!(manager.table_exists("toaster").unwrap());
        assert!(db_path.exists());
    }

    #[test]
    fn test_insert_and_query() {
        let manager = SqliteManager::in_memory();

        let id = manager
            .insert(
                "INSERT INTO toaster (timestamp, message, package) VALUES (?, ?, ?)",
                &[SqlValue::Integer(1000), text("hello"), text("org.example")],
            )
            .unwrap();
        assert_eq!(id, Some(1));

        let rows = manager
            .query(
                "SELECT _id, message, package FROM toaster WHERE _id = ?",
                &[text("1")],
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].columns, vec!["_id", "message", "package"]);
        assert_eq!(rows[0].get("message"), Some(&serde_json::json!("hello")));
        assert_eq!(rows[0].values[0], serde_json::Value::Number(1.into()));
    }

    #[test]
    fn test_insert_or_ignore_reports_no_row() {
        let manager = SqliteManager::in_memory();
        manager
            .insert(
                "INSERT INTO filter (_id, package) VALUES (?, ?)",
                &[SqlValue::Integer(7), text("org.example")],
            )
            .unwrap();

        let id = manager
            .insert(
                "INSERT OR IGNORE INTO filter (_id, package) VALUES (?, ?)",
                &[SqlValue::Integer(7), text("org.other")],
            )
            .unwrap();
        assert_eq!(id, None);
    }

    #[test]
    fn test_execute_counts_rows() {
        let manager = SqliteManager::in_memory();
        for package in ["a", "b", "a"] {
            manager
                .insert("INSERT INTO toaster (package) VALUES (?)", &[text(package)])
                .unwrap();
        }

        let affected = manager
            .execute("DELETE FROM toaster WHERE package = ?", &[text("a")])
            .unwrap();
        assert_eq!(affected, 2);
    }

    #[test]
    fn test_unopenable_path_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let manager = SqliteManager::open(&blocker.join("toaster.db"));
        let err = manager.query("SELECT 1", &[]).unwrap_err();
        assert!(err.is_storage_unavailable());
    }

    #[test]
    fn test_execute_raw() {
        let manager = SqliteManager::in_memory();
        manager
            .execute_raw("CREATE TABLE extra (id INTEGER PRIMARY KEY, value TEXT)")
            .unwrap();

        assert!(manager.table_exists("extra").unwrap());
        assert!(!manager.table_exists("nonexistent").unwrap());
    }
}
