//! 统一错误类型定义
//!
//! 使用 `thiserror` 定义数据访问层的所有错误类型，并提供与 `anyhow` 的兼容层。
//!
//! 存储不可用（`StorageUnavailable`）在查询/更新/删除路径上会被降级为空结果，
//! 只有插入路径会把它转换为 `WriteFailure` 抛给调用方。

use std::path::PathBuf;
use thiserror::Error;

/// 数据访问层的统一错误类型
#[derive(Error, Debug)]
pub enum DataError {
    /// 资源地址无法识别（或该地址不支持请求的操作）
    #[error("未知资源地址: {0}")]
    UnrecognizedResource(String),

    /// 插入未创建任何行
    #[error("写入失败: {uri}")]
    WriteFailure {
        uri: String,
        #[source]
        source: Option<Box<DataError>>,
    },

    /// 请求的列不在投影范围内
    #[error("无效的列: {column} (资源: {resource})")]
    InvalidColumn { column: String, resource: String },

    /// 存储连接无法打开
    #[error("存储不可用: {0}")]
    StorageUnavailable(String),

    /// 数据库错误
    #[error("数据库错误: {0}")]
    Database(#[from] rusqlite::Error),

    /// 文件 I/O 错误
    #[error("文件 I/O 错误: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML 反序列化错误
    #[error("TOML 反序列化错误: {0}")]
    TomlDeserialization(#[from] toml::de::Error),

    /// JSON 序列化/反序列化错误
    #[error("JSON 序列化错误: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// 并发错误
    #[error("并发错误: {0}")]
    Concurrency(String),
}

/// 便于与现有代码集成的类型别名
pub type Result<T> = std::result::Result<T, DataError>;

impl DataError {
    /// 从 `std::io::Error` 和路径创建 I/O 错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// 创建不带底层原因的写入失败
    pub fn write_failure(uri: impl Into<String>) -> Self {
        Self::WriteFailure {
            uri: uri.into(),
            source: None,
        }
    }

    /// 创建携带底层原因的写入失败
    pub fn write_failure_caused_by(uri: impl Into<String>, source: DataError) -> Self {
        Self::WriteFailure {
            uri: uri.into(),
            source: Some(Box::new(source)),
        }
    }

    /// 是否为存储不可用（可降级）错误
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}
