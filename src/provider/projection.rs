//! 投影注册表
//!
//! 资源类型 → 表名、可见列、默认排序、是否去重。进程启动时构建一次，之后只读。

use crate::data::schema::{filter_table, toaster_table};
use crate::data::{DataError, Result};
use crate::provider::uri::ResourceKind;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// 单个资源类型的投影定义
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub table: &'static str,
    /// 读取时可出现的列（按默认输出顺序）
    pub columns: &'static [&'static str],
    /// 更新时可写的列（不含 ID 列）
    pub writable: &'static [&'static str],
    /// 调用方未指定排序时使用
    pub default_sort: Option<&'static str>,
    /// 查询是否去重
    pub distinct: bool,
    /// 行 ID 列
    pub id_column: &'static str,
    /// 集合的 MIME 名称段，如 `toaster`
    pub type_name: &'static str,
}

impl Projection {
    pub fn allows(&self, column: &str) -> bool {
        self.columns.iter().any(|c| *c == column)
    }

    pub fn allows_write(&self, column: &str) -> bool {
        self.writable.iter().any(|c| *c == column)
    }
}

const LOG_COLUMNS: &[&str] = toaster_table::COLUMNS;
const PACKAGE_COLUMNS: &[&str] = &[toaster_table::PACKAGE];
const FILTER_COLUMNS: &[&str] = filter_table::COLUMNS;
// `_id` 由存储分配，分配后不可修改
const LOG_WRITABLE: &[&str] = &[
    toaster_table::TIMESTAMP,
    toaster_table::MESSAGE,
    toaster_table::PACKAGE,
    toaster_table::VERSION_CODE,
    toaster_table::VERSION_NAME,
];
const FILTER_WRITABLE: &[&str] = &[filter_table::PACKAGE, filter_table::EXCL_INCL];

static REGISTRY: Lazy<HashMap<ResourceKind, Projection>> = Lazy::new(|| {
    let log_item = Projection {
        table: toaster_table::TABLE_NAME,
        columns: LOG_COLUMNS,
        writable: LOG_WRITABLE,
        default_sort: None,
        distinct: false,
        id_column: toaster_table::ID,
        type_name: "toaster",
    };
    let filter_item = Projection {
        table: filter_table::TABLE_NAME,
        columns: FILTER_COLUMNS,
        writable: FILTER_WRITABLE,
        default_sort: None,
        distinct: false,
        id_column: filter_table::ID,
        type_name: "filter",
    };

    HashMap::from([
        (
            ResourceKind::LogCollection,
            Projection {
                default_sort: Some("timestamp DESC"),
                ..log_item.clone()
            },
        ),
        (ResourceKind::LogItem, log_item),
        (
            ResourceKind::PackageCollection,
            Projection {
                table: toaster_table::TABLE_NAME,
                columns: PACKAGE_COLUMNS,
                writable: &[],
                default_sort: Some("package ASC"),
                distinct: true,
                id_column: toaster_table::ID,
                type_name: "packages",
            },
        ),
        (
            ResourceKind::FilterCollection,
            Projection {
                default_sort: Some("package ASC"),
                ..filter_item.clone()
            },
        ),
        (ResourceKind::FilterItem, filter_item),
    ])
});

/// 获取资源类型的投影定义
pub fn projection_for(kind: ResourceKind) -> &'static Projection {
    // 注册表覆盖全部 ResourceKind
    &REGISTRY[&kind]
}

pub fn table_for(kind: ResourceKind) -> &'static str {
    projection_for(kind).table
}

pub fn columns_for(kind: ResourceKind) -> &'static [&'static str] {
    projection_for(kind).columns
}

pub fn default_sort_for(kind: ResourceKind) -> Option<&'static str> {
    projection_for(kind).default_sort
}

/// 校验调用方请求的列；为空时返回全部可见列
pub fn resolve_columns(kind: ResourceKind, requested: Option<&[&str]>) -> Result<Vec<String>> {
    let projection = projection_for(kind);
    match requested {
        None | Some([]) => Ok(projection.columns.iter().map(|c| c.to_string()).collect()),
        Some(columns) => columns
            .iter()
            .map(|column| {
                if projection.allows(column) {
                    Ok(column.to_string())
                } else {
                    Err(DataError::InvalidColumn {
                        column: column.to_string(),
                        resource: kind.to_string(),
                    })
                }
            })
            .collect(),
    }
}
