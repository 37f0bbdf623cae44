//! 查询/写入引擎
//!
//! 把已路由的资源和调用方参数拼装成单条参数化 SQL 并交给存储执行。
//! 行 ID 永远以绑定参数出现，不拼接进语句文本。
//!
//! 引擎不做降级也不发通知，这两件事由 `ToasterProvider` 负责。

use crate::data::{DataError, Result, Storage};
use crate::provider::cursor::Cursor;
use crate::provider::projection::{self, Projection};
use crate::provider::uri::{ResolvedResource, ResourceKind};
use crate::provider::values::ContentValues;
use rusqlite::types::Value as SqlValue;
use std::sync::Arc;

/// 调用方条件：条件文本 + 绑定参数
#[derive(Debug, Clone, Copy, Default)]
pub struct Selection<'a> {
    pub clause: Option<&'a str>,
    pub args: &'a [&'a str],
}

impl<'a> Selection<'a> {
    pub fn new(clause: Option<&'a str>, args: &'a [&'a str]) -> Self {
        Self { clause, args }
    }

    pub fn none() -> Self {
        Self::default()
    }

    /// 与行 ID 等值条件合并，返回 WHERE 子句和按占位符顺序排列的参数
    ///
    /// `preceding` 为语句中位于 WHERE 之前的参数个数。调用方条件在前，
    /// 行 ID 使用显式编号，调用方条件里的 `?` 与 `?NNN` 都按调用方参数编号。
    fn merge_with_id(
        &self,
        id_column: &str,
        id: Option<&str>,
        preceding: usize,
    ) -> (Option<String>, Vec<SqlValue>) {
        let mut params: Vec<SqlValue> = self
            .args
            .iter()
            .map(|a| SqlValue::Text(a.to_string()))
            .collect();
        let caller = self.clause.map(str::trim).filter(|c| !c.is_empty());
        let id_index = preceding + params.len() + 1;

        let clause = match (id, caller) {
            (Some(id), Some(caller)) => {
                params.push(SqlValue::Text(id.to_string()));
                Some(format!("({caller}) AND {id_column} = ?{id_index}"))
            }
            (Some(id), None) => {
                params.push(SqlValue::Text(id.to_string()));
                Some(format!("{id_column} = ?{id_index}"))
            }
            (None, Some(caller)) => Some(caller.to_string()),
            (None, None) => None,
        };

        (clause, params)
    }
}

/// 读取参数
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadRequest<'a> {
    pub projection: Option<&'a [&'a str]>,
    pub selection: Selection<'a>,
    pub sort_order: Option<&'a str>,
}

/// 查询/写入引擎
#[derive(Clone)]
pub struct QueryEngine {
    storage: Arc<dyn Storage>,
}

impl QueryEngine {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// 生成读取语句
    pub fn build_read(
        resource: &ResolvedResource,
        request: &ReadRequest<'_>,
    ) -> Result<(String, Vec<String>, Vec<SqlValue>)> {
        let projection = projection::projection_for(resource.kind);
        let columns = projection::resolve_columns(resource.kind, request.projection)?;
        let (clause, params) = request
            .selection
            .merge_with_id(projection.id_column, resource.id.as_deref(), 0);

        let mut sql = format!(
            "SELECT {}{} FROM {}",
            if projection.distinct { "DISTINCT " } else { "" },
            columns.join(", "),
            projection.table
        );
        if let Some(clause) = clause {
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
        }
        let sort_order = request
            .sort_order
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or(projection.default_sort);
        if let Some(sort_order) = sort_order {
            sql.push_str(" ORDER BY ");
            sql.push_str(sort_order);
        }

        Ok((sql, columns, params))
    }

    /// 读取
    pub fn read(&self, resource: &ResolvedResource, request: &ReadRequest<'_>) -> Result<Cursor> {
        let (sql, columns, params) = Self::build_read(resource, request)?;
        tracing::trace!(sql = %sql, "执行查询");
        let rows = self.storage.query(&sql, &params)?;
        Ok(Cursor::new(columns, rows))
    }

    /// 插入，返回新行 ID
    ///
    /// 调用方需保证 `kind` 支持插入。
    pub fn insert(&self, kind: ResourceKind, values: &ContentValues) -> Result<Option<i64>> {
        let projection = projection::projection_for(kind);
        check_columns(kind, projection, values, true)?;

        let sql = if values.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", projection.table)
        } else {
            let columns: Vec<&str> = values.columns().collect();
            let placeholders = vec!["?"; columns.len()].join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({placeholders})",
                projection.table,
                columns.join(", ")
            )
        };
        tracing::trace!(sql = %sql, "执行插入");
        self.storage.insert(&sql, &values.to_sql_params())
    }

    /// 更新，返回受影响行数；值为空时不访问存储
    pub fn update(
        &self,
        resource: &ResolvedResource,
        values: &ContentValues,
        selection: Selection<'_>,
    ) -> Result<usize> {
        let projection = projection::projection_for(resource.kind);
        check_columns(resource.kind, projection, values, false)?;
        if values.is_empty() {
            return Ok(0);
        }

        let assignments: Vec<String> = values.columns().map(|c| format!("{c} = ?")).collect();
        let (clause, where_params) =
            selection.merge_with_id(projection.id_column, resource.id.as_deref(), values.len());

        let mut sql = format!("UPDATE {} SET {}", projection.table, assignments.join(", "));
        if let Some(clause) = clause {
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
        }

        let mut params = values.to_sql_params();
        params.extend(where_params);
        tracing::trace!(sql = %sql, "执行更新");
        self.storage.execute(&sql, &params)
    }

    /// 删除，返回受影响行数
    pub fn delete(&self, resource: &ResolvedResource, selection: Selection<'_>) -> Result<usize> {
        let projection = projection::projection_for(resource.kind);
        let (clause, params) =
            selection.merge_with_id(projection.id_column, resource.id.as_deref(), 0);

        let mut sql = format!("DELETE FROM {}", projection.table);
        if let Some(clause) = clause {
            sql.push_str(" WHERE ");
            sql.push_str(&clause);
        }
        tracing::trace!(sql = %sql, "执行删除");
        self.storage.execute(&sql, &params)
    }
}

/// 校验写入列；插入允许显式指定 ID 列，但只接受正整数（或 NULL 由存储分配）
fn check_columns(
    kind: ResourceKind,
    projection: &Projection,
    values: &ContentValues,
    allow_id: bool,
) -> Result<()> {
    for (column, value) in values.iter() {
        let allowed = if column == projection.id_column {
            allow_id && (value.is_null() || value.as_i64().is_some_and(|id| id > 0))
        } else {
            projection.allows_write(column)
        };
        if !allowed {
            return Err(DataError::InvalidColumn {
                column: column.to_string(),
                resource: kind.to_string(),
            });
        }
    }
    Ok(())
}
