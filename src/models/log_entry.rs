use crate::data::schema::toaster_table as col;
use crate::data::QueryRow;
use crate::provider::ContentValues;
use serde::{Deserialize, Serialize};

/// 一条通知日志
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// 存储分配的 ID，未入库时为 None
    pub id: Option<i64>,
    /// 毫秒时间戳
    pub timestamp: i64,
    pub message: String,
    pub package: String,
    pub version_code: i64,
    pub version_name: String,
}

impl LogEntry {
    /// 以当前时间创建日志
    pub fn captured_now(
        package: impl Into<String>,
        message: impl Into<String>,
        version_code: i64,
        version_name: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            timestamp: chrono::Utc::now().timestamp_millis(),
            message: message.into(),
            package: package.into(),
            version_code,
            version_name: version_name.into(),
        }
    }

    /// 转换为写入值（不含 ID）
    pub fn to_values(&self) -> ContentValues {
        ContentValues::new()
            .with(col::TIMESTAMP, self.timestamp)
            .with(col::MESSAGE, self.message.as_str())
            .with(col::PACKAGE, self.package.as_str())
            .with(col::VERSION_CODE, self.version_code)
            .with(col::VERSION_NAME, self.version_name.as_str())
    }

    /// 从查询行还原；缺失或为 NULL 的列取默认值
    pub fn from_row(row: &QueryRow) -> Self {
        let int = |c: &str| row.get(c).and_then(|v| v.as_i64());
        let text = |c: &str| {
            row.get(c)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };

        Self {
            id: int(col::ID),
            timestamp: int(col::TIMESTAMP).unwrap_or_default(),
            message: text(col::MESSAGE),
            package: text(col::PACKAGE),
            version_code: int(col::VERSION_CODE).unwrap_or_default(),
            version_name: text(col::VERSION_NAME),
        }
    }
}
