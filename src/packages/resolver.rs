// 包元数据解析
//
// 从安装包文件中读取显示名称与图标

use crate::models::{Icon, PackageDescriptor};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// 包元数据来源
///
/// 只在安装包文件存在时被调用；返回 None 表示无法解析
pub trait PackageResolver: Send + Sync {
    /// 读取声明的显示名称
    fn load_label(&self, descriptor: &PackageDescriptor) -> Option<String>;

    /// 读取应用图标
    fn load_icon(&self, descriptor: &PackageDescriptor) -> Option<Icon>;
}

#[derive(Debug, Default, Deserialize)]
struct PackageManifest {
    label: Option<String>,
    icon: Option<PathBuf>,
}

/// 把安装包文件当作 TOML 清单解析：
///
/// ```toml
/// label = "Chat"
/// icon = "chat.png"   # 相对于清单所在目录
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestResolver;

impl ManifestResolver {
    fn read_manifest(&self, descriptor: &PackageDescriptor) -> Option<PackageManifest> {
        let content = match fs::read_to_string(&descriptor.source_path) {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(
                    package = %descriptor.package_name,
                    error = ?e,
                    "读取安装包清单失败"
                );
                return None;
            }
        };

        match toml::from_str(&content) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                tracing::warn!(
                    package = %descriptor.package_name,
                    error = %e,
                    "安装包清单格式无效"
                );
                None
            }
        }
    }
}

impl PackageResolver for ManifestResolver {
    fn load_label(&self, descriptor: &PackageDescriptor) -> Option<String> {
        self.read_manifest(descriptor)?
            .label
            .filter(|label| !label.trim().is_empty())
    }

    fn load_icon(&self, descriptor: &PackageDescriptor) -> Option<Icon> {
        let icon_path = self.read_manifest(descriptor)?.icon?;
        let icon_path = match descriptor.source_path.parent() {
            Some(dir) if icon_path.is_relative() => dir.join(icon_path),
            _ => icon_path,
        };

        match fs::read(&icon_path) {
            Ok(bytes) if !bytes.is_empty() => Some(Icon::image(bytes)),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!(path = ?icon_path, error = ?e, "读取图标失败");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_manifest_resolver() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("com.example.chat.toml");
        fs::write(&manifest, "label = \"Chat\"\nicon = \"chat.png\"\n").unwrap();
        fs::write(dir.path().join("chat.png"), [0x89, b'P', b'N', b'G']).unwrap();

        let descriptor = PackageDescriptor::new("com.example.chat", &manifest);
        let resolver = ManifestResolver;

        assert_eq!(resolver.load_label(&descriptor).as_deref(), Some("Chat"));
        assert_eq!(
            resolver.load_icon(&descriptor),
            Some(Icon::image(vec![0x89, b'P', b'N', b'G']))
        );
    }

    #[test]
    fn test_manifest_resolver_missing_fields() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("org.example.toml");
        fs::write(&manifest, "label = \"  \"\n").unwrap();

        let descriptor = PackageDescriptor::new("org.example", &manifest);
        assert!(ManifestResolver.load_label(&descriptor).is_none());
        assert!(ManifestResolver.load_icon(&descriptor).is_none());

        fs::write(&manifest, "not toml at all [").unwrap();
        assert!(ManifestResolver.load_label(&descriptor).is_none());
    }
}
