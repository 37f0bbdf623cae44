//! 已安装包元数据
//!
//! 为展示层提供带挂载感知的名称/图标缓存

pub mod catalog;
pub mod entry;
pub mod resolver;

pub use catalog::PackageCatalog;
pub use entry::PackageEntry;
pub use resolver::{ManifestResolver, PackageResolver};
