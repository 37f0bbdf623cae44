use crate::data::schema::filter_table as col;
use crate::data::QueryRow;
use crate::provider::ContentValues;
use serde::{Deserialize, Serialize};

/// 过滤决定，存储为整数：排除 0，包含 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Exclude,
    Include,
}

impl FilterMode {
    pub fn as_i64(self) -> i64 {
        match self {
            FilterMode::Exclude => 0,
            FilterMode::Include => 1,
        }
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(FilterMode::Exclude),
            1 => Some(FilterMode::Include),
            _ => None,
        }
    }
}

/// 包过滤规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterEntry {
    pub id: Option<i64>,
    pub package: String,
    pub mode: FilterMode,
}

impl FilterEntry {
    pub fn new(package: impl Into<String>, mode: FilterMode) -> Self {
        Self {
            id: None,
            package: package.into(),
            mode,
        }
    }

    pub fn to_values(&self) -> ContentValues {
        ContentValues::new()
            .with(col::PACKAGE, self.package.as_str())
            .with(col::EXCL_INCL, self.mode.as_i64())
    }

    /// 从查询行还原；过滤值无法识别时返回 None
    pub fn from_row(row: &QueryRow) -> Option<Self> {
        let mode = row
            .get(col::EXCL_INCL)
            .and_then(|v| v.as_i64())
            .and_then(FilterMode::from_i64)?;

        Some(Self {
            id: row.get(col::ID).and_then(|v| v.as_i64()),
            package: row.get(col::PACKAGE)?.as_str()?.to_string(),
            mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mode_storage_values() {
        assert_eq!(FilterMode::Include.as_i64(), 1);
        assert_eq!(FilterMode::from_i64(0), Some(FilterMode::Exclude));
        assert_eq!(FilterMode::from_i64(2), None);
    }

    #[test]
    fn test_from_row() {
        let row = QueryRow {
            columns: vec!["_id".into(), "package".into(), "excl_incl".into()],
            values: vec![json!(8), json!("org.example"), json!(1)],
        };
        assert_eq!(
            FilterEntry::from_row(&row),
            Some(FilterEntry {
                id: Some(8),
                package: "org.example".to_string(),
                mode: FilterMode::Include,
            })
        );

        let broken = QueryRow {
            columns: vec!["package".into(), "excl_incl".into()],
            values: vec![json!("org.example"), json!(5)],
        };
        assert!(FilterEntry::from_row(&broken).is_none());
    }
}
