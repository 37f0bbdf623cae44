//! 通知日志数据提供者
//!
//! 以地址统一访问三类资源：日志条目、去重包名、包过滤规则。
//!
//! # 模块组织
//!
//! - `uri`: 地址解析与路由
//! - `projection`: 投影注册表（表名、可见列、默认排序）
//! - `engine`: 参数化 SQL 拼装与执行
//! - `notifier`: 写后通知（显示刷新 + 观察者）
//! - `cursor`: 查询结果
//! - `values`: 写入值集合
//!
//! # 使用示例
//!
//! ```ignore
//! use std::sync::Arc;
//! use crate::data::SqliteManager;
//! use crate::provider::{ContentUri, ContentValues, ToasterProvider};
//!
//! let provider = ToasterProvider::new(
//!     "org.mars3142.android.toaster.provider",
//!     Arc::new(SqliteManager::in_memory()),
//! );
//!
//! let uri = provider.insert(
//!     &ContentUri::parse("/toaster")?,
//!     &ContentValues::new().with("message", "Saved").with("package", "org.example"),
//! )?;
//! let cursor = provider.query(&uri, None, None, &[], None)?;
//! ```

pub mod cursor;
pub mod engine;
pub mod notifier;
pub mod projection;
pub mod uri;
pub mod values;


pub use cursor::Cursor;
pub use engine::{QueryEngine, ReadRequest, Selection};
pub use notifier::{ChangeNotifier, ChannelRefreshSink, ContentObserver, ObserverId, RefreshSink};
pub use uri::{ContentUri, ResolvedResource, ResourceKind, UriRouter};
pub use values::ContentValues;

use crate::data::{DataError, Result, SqliteManager, Storage};
use crate::utils::config::ProviderConfig;
use std::sync::Arc;
use tokio::sync::mpsc;

const DIR_TYPE_PREFIX: &str = "vnd.android.cursor.dir";
const ITEM_TYPE_PREFIX: &str = "vnd.android.cursor.item";

/// 数据提供者
///
/// 路由、投影和引擎在构造后只读，可直接在线程间共享（`Arc<ToasterProvider>`）。
pub struct ToasterProvider {
    router: UriRouter,
    engine: QueryEngine,
    notifier: Arc<ChangeNotifier>,
}

impl ToasterProvider {
    /// 创建不带显示刷新接收方的提供者
    pub fn new(authority: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        Self::with_notifier(authority, storage, Arc::new(ChangeNotifier::new()))
    }

    pub fn with_notifier(
        authority: impl Into<String>,
        storage: Arc<dyn Storage>,
        notifier: Arc<ChangeNotifier>,
    ) -> Self {
        Self {
            router: UriRouter::new(authority),
            engine: QueryEngine::new(storage),
            notifier,
        }
    }

    /// 按配置创建：SQLite 存储 + 通道刷新接收方
    ///
    /// 返回的接收端会收到配置中的刷新动作名。
    pub fn from_config(config: &ProviderConfig) -> (Self, mpsc::UnboundedReceiver<String>) {
        let storage = Arc::new(SqliteManager::open(&config.database_path));
        let (sink, refreshes) = ChannelRefreshSink::new(config.widget_action());
        let notifier = Arc::new(ChangeNotifier::with_refresh_sink(Arc::new(sink)));

        tracing::info!(
            authority = %config.authority,
            database = ?config.database_path,
            "数据提供者已创建"
        );
        (
            Self::with_notifier(config.authority.clone(), storage, notifier),
            refreshes,
        )
    }

    pub fn authority(&self) -> &str {
        self.router.authority()
    }

    pub fn notifier(&self) -> &Arc<ChangeNotifier> {
        &self.notifier
    }

    /// 集合地址（带授权名）
    pub fn collection_uri(&self, kind: ResourceKind) -> ContentUri {
        self.router.collection_uri(kind)
    }

    /// 解析地址字符串并路由
    pub fn resolve(&self, uri: &ContentUri) -> Result<ResolvedResource> {
        self.router.resolve(uri)
    }

    /// 查询
    ///
    /// 存储不可用时返回空结果。返回的结果登记在 `uri` 上，
    /// 该地址或其上级/下级地址发生写操作后 `Cursor::has_changed` 为真。
    pub fn query(
        &self,
        uri: &ContentUri,
        projection: Option<&[&str]>,
        selection: Option<&str>,
        selection_args: &[&str],
        sort_order: Option<&str>,
    ) -> Result<Cursor> {
        tracing::debug!(
            uri = %uri,
            projection = ?projection,
            selection = ?selection,
            args = ?selection_args,
            order = ?sort_order,
            "query"
        );

        let resource = self.router.resolve(uri)?;
        let request = ReadRequest {
            projection,
            selection: Selection::new(selection, selection_args),
            sort_order,
        };

        let mut cursor = match self.engine.read(&resource, &request) {
            Ok(cursor) => cursor,
            Err(e) if e.is_storage_unavailable() => {
                tracing::warn!(uri = %uri, error = %e, "存储不可用，返回空结果");
                Cursor::empty(projection::resolve_columns(resource.kind, projection)?)
            }
            Err(e) => return Err(e),
        };

        cursor.set_notification(uri.clone(), self.notifier.subscribe(uri.clone()));
        Ok(cursor)
    }

    /// 资源的 MIME 类型
    pub fn get_type(&self, uri: &ContentUri) -> Result<String> {
        tracing::debug!(uri = %uri, "get_type");

        let resource = self.router.resolve(uri)?;
        let prefix = if resource.kind.is_item() {
            ITEM_TYPE_PREFIX
        } else {
            DIR_TYPE_PREFIX
        };
        let type_name = projection::projection_for(resource.kind).type_name;
        Ok(format!("{prefix}/vnd.{}.{type_name}", self.router.authority()))
    }

    /// 插入，返回新行的完整地址
    ///
    /// 只接受 `/toaster` 和 `/filter`。未创建任何行（含存储不可用）时返回 `WriteFailure`；
    /// 成功后才触发通知。
    pub fn insert(&self, uri: &ContentUri, values: &ContentValues) -> Result<ContentUri> {
        tracing::debug!(uri = %uri, values = ?values, "insert");

        let resource = self.router.resolve(uri)?;
        if !resource.kind.supports_insert() {
            return Err(DataError::UnrecognizedResource(uri.to_string()));
        }

        let row_id = match self.engine.insert(resource.kind, values) {
            Ok(Some(row_id)) if row_id > 0 => row_id,
            Ok(_) => return Err(DataError::write_failure(uri.to_string())),
            Err(e @ DataError::InvalidColumn { .. }) => return Err(e),
            Err(e) => {
                tracing::warn!(uri = %uri, error = %e, "插入失败");
                return Err(DataError::write_failure_caused_by(uri.to_string(), e));
            }
        };

        self.notify_write(uri, resource.kind);
        Ok(self.router.collection_uri(resource.kind).with_appended_id(row_id))
    }

    /// 更新，返回受影响行数
    ///
    /// 无论受影响行数是否为 0 都会触发通知；存储不可用时按 0 行处理。
    pub fn update(
        &self,
        uri: &ContentUri,
        values: &ContentValues,
        selection: Option<&str>,
        selection_args: &[&str],
    ) -> Result<usize> {
        tracing::debug!(
            uri = %uri,
            values = ?values,
            selection = ?selection,
            args = ?selection_args,
            "update"
        );

        let resource = self.writable_resource(uri)?;
        let result = self
            .engine
            .update(&resource, values, Selection::new(selection, selection_args));
        self.finish_write(uri, resource.kind, result)
    }

    /// 删除，返回受影响行数
    ///
    /// 通知规则同 `update`。
    pub fn delete(
        &self,
        uri: &ContentUri,
        selection: Option<&str>,
        selection_args: &[&str],
    ) -> Result<usize> {
        tracing::debug!(
            uri = %uri,
            selection = ?selection,
            args = ?selection_args,
            "delete"
        );

        let resource = self.writable_resource(uri)?;
        let result = self
            .engine
            .delete(&resource, Selection::new(selection, selection_args));
        self.finish_write(uri, resource.kind, result)
    }

    fn writable_resource(&self, uri: &ContentUri) -> Result<ResolvedResource> {
        let resource = self.router.resolve(uri)?;
        if !resource.kind.supports_write() {
            return Err(DataError::UnrecognizedResource(uri.to_string()));
        }
        Ok(resource)
    }

    /// 存储不可用降级为 0，然后触发通知
    fn finish_write(
        &self,
        uri: &ContentUri,
        kind: ResourceKind,
        result: Result<usize>,
    ) -> Result<usize> {
        let count = match result {
            Ok(count) => count,
            Err(e) if e.is_storage_unavailable() => {
                tracing::warn!(uri = %uri, error = %e, "存储不可用，按 0 行处理");
                0
            }
            Err(e) => return Err(e),
        };

        self.notify_write(uri, kind);
        Ok(count)
    }

    /// 写后通知；日志表的写操作同时影响去重包名视图
    fn notify_write(&self, uri: &ContentUri, kind: ResourceKind) {
        self.notifier.notify_write(uri);
        if matches!(kind, ResourceKind::LogCollection | ResourceKind::LogItem) {
            self.notifier
                .notify_change(&self.router.collection_uri(ResourceKind::PackageCollection));
        }
    }
}
