//! 查询结果
//!
//! 结果本身不会自动刷新：它持有一条登记在查询地址上的变更订阅，
//! 由持有者决定何时重新查询。

use crate::data::QueryRow;
use crate::provider::uri::ContentUri;
use tokio::sync::mpsc::{self, error::TryRecvError};

#[derive(Debug)]
pub struct Cursor {
    columns: Vec<String>,
    rows: Vec<QueryRow>,
    notification_uri: Option<ContentUri>,
    changes: Option<mpsc::UnboundedReceiver<ContentUri>>,
}

impl Cursor {
    pub fn new(columns: Vec<String>, rows: Vec<QueryRow>) -> Self {
        Self {
            columns,
            rows,
            notification_uri: None,
            changes: None,
        }
    }

    /// 空结果（存储不可用时的降级结果）
    pub fn empty(columns: Vec<String>) -> Self {
        Self::new(columns, Vec::new())
    }

    /// 绑定变更订阅
    pub fn set_notification(
        &mut self,
        uri: ContentUri,
        changes: mpsc::UnboundedReceiver<ContentUri>,
    ) {
        self.notification_uri = Some(uri);
        self.changes = Some(changes);
    }

    pub fn notification_uri(&self) -> Option<&ContentUri> {
        self.notification_uri.as_ref()
    }

    /// 自上次调用以来是否收到过变更通知（会消费掉已到达的通知）
    pub fn has_changed(&mut self) -> bool {
        let Some(changes) = self.changes.as_mut() else {
            return false;
        };

        let mut changed = false;
        loop {
            match changes.try_recv() {
                Ok(_) => changed = true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        changed
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[QueryRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryRow> {
        self.rows.iter()
    }

    /// 取某列的全部值
    pub fn column_values(&self, column: &str) -> Vec<&serde_json::Value> {
        self.rows.iter().filter_map(|row| row.get(column)).collect()
    }

    pub fn into_rows(self) -> Vec<QueryRow> {
        self.rows
    }
}

impl<'a> IntoIterator for &'a Cursor {
    type Item = &'a QueryRow;
    type IntoIter = std::slice::Iter<'a, QueryRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
