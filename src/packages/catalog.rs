use super::entry::PackageEntry;
use super::resolver::PackageResolver;
use crate::data::{DataError, Result};
use crate::models::PackageDescriptor;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// 安装包清单文件扩展名
pub const MANIFEST_EXTENSION: &str = "toml";

/// 已安装包集合，按包名索引，独占持有每个条目
#[derive(Debug, Default)]
pub struct PackageCatalog {
    entries: HashMap<String, PackageEntry>,
}

impl PackageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_descriptors(descriptors: impl IntoIterator<Item = PackageDescriptor>) -> Self {
        let mut catalog = Self::new();
        for descriptor in descriptors {
            catalog.insert(descriptor);
        }
        catalog
    }

    /// 扫描目录中的安装包清单，文件名（不含扩展名）即包名
    pub fn scan_dir(dir: &Path) -> Result<Self> {
        let read_dir = fs::read_dir(dir).map_err(|e| DataError::io(dir, e))?;

        let mut descriptors = Vec::new();
        for dir_entry in read_dir {
            let path = dir_entry.map_err(|e| DataError::io(dir, e))?.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(MANIFEST_EXTENSION)
            {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                descriptors.push(PackageDescriptor::new(name, &path));
            }
        }

        tracing::debug!(dir = ?dir, count = descriptors.len(), "扫描安装包完成");
        Ok(Self::from_descriptors(descriptors))
    }

    /// 加入或替换条目；替换时丢弃旧条目的缓存
    pub fn insert(&mut self, descriptor: PackageDescriptor) {
        self.entries.insert(
            descriptor.package_name.clone(),
            PackageEntry::new(descriptor),
        );
    }

    pub fn remove(&mut self, package_name: &str) -> bool {
        self.entries.remove(package_name).is_some()
    }

    pub fn get(&self, package_name: &str) -> Option<&PackageEntry> {
        self.entries.get(package_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按显示名称排序（忽略大小写），名称相同时按包名
    pub fn sorted_by_label(&self, resolver: &dyn PackageResolver) -> Vec<(&PackageEntry, String)> {
        let mut listed: Vec<_> = self
            .entries
            .values()
            .map(|entry| (entry, entry.label(resolver)))
            .collect();

        listed.sort_by(|(a, a_label), (b, b_label)| {
            a_label
                .to_lowercase()
                .cmp(&b_label.to_lowercase())
                .then_with(|| a.package_name().cmp(b.package_name()))
        });
        listed
    }
}
