// lib.rs - 暴露数据提供者给 CLI 和宿主进程使用

pub mod data; // 存储与错误类型
pub mod logging;
pub mod models;
pub mod packages; // 已安装包元数据缓存
pub mod provider;
pub mod utils;

pub use data::{DataError, QueryRow, SqliteManager, Storage};
pub use models::{FilterEntry, FilterMode, Icon, LogEntry, MountState, PackageDescriptor};
pub use packages::{ManifestResolver, PackageCatalog, PackageEntry, PackageResolver};
pub use provider::{
    ChangeNotifier, ContentObserver, ContentUri, ContentValues, Cursor, RefreshSink,
    ResourceKind, ToasterProvider,
};
pub use utils::ProviderConfig;

// 重新导出常用类型
pub use anyhow::{Context, Result};

// 导出日志模块
pub use logging::{init_global_logger, LogLevel, LoggingConfig};
