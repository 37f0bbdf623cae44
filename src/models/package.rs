use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// 已安装包的描述（来自系统的已安装应用列表）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub package_name: String,
    /// 安装包文件路径，构造后不变
    pub source_path: PathBuf,
}

impl PackageDescriptor {
    pub fn new(package_name: impl Into<String>, source_path: impl Into<PathBuf>) -> Self {
        Self {
            package_name: package_name.into(),
            source_path: source_path.into(),
        }
    }
}

/// 安装包文件的挂载状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MountState {
    #[default]
    Unknown,
    Mounted,
    Unmounted,
}

/// 应用图标
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Icon {
    /// 系统默认图标，从不缓存在条目上
    SystemDefault,
    Image(Arc<[u8]>),
}

impl Icon {
    pub fn image(bytes: impl Into<Arc<[u8]>>) -> Self {
        Icon::Image(bytes.into())
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Icon::SystemDefault)
    }
}
