use super::resolver::PackageResolver;
use crate::models::{Icon, MountState, PackageDescriptor};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 已缓存的名称及其来源
#[derive(Debug, Clone)]
enum CachedLabel {
    /// 文件不可用时的包名回退，文件出现后必须重新读取
    Fallback(String),
    /// 在文件存在时读取得到（含解析失败时的包名）
    Resolved(String),
}

#[derive(Debug, Default)]
struct EntryState {
    mount: MountState,
    label: Option<CachedLabel>,
    icon: Option<Icon>,
}

/// 单个已安装包的元数据缓存
///
/// 名称与图标按需加载；每次访问都会根据安装包文件是否存在重新判断挂载状态。
/// 每个条目自带一把锁，`label()` / `icon()` 的检查与写入是原子的。
#[derive(Debug)]
pub struct PackageEntry {
    descriptor: PackageDescriptor,
    state: Mutex<EntryState>,
}

impl PackageEntry {
    pub fn new(descriptor: PackageDescriptor) -> Self {
        Self {
            descriptor,
            state: Mutex::new(EntryState::default()),
        }
    }

    pub fn package_name(&self) -> &str {
        &self.descriptor.package_name
    }

    pub fn source_path(&self) -> &Path {
        &self.descriptor.source_path
    }

    pub fn descriptor(&self) -> &PackageDescriptor {
        &self.descriptor
    }

    pub fn mount_state(&self) -> MountState {
        self.lock().mount
    }

    /// 显示名称
    ///
    /// 未挂载时回退为包名，并在每次调用时重试；
    /// 一旦挂载且名称已缓存，不再重新读取
    pub fn label(&self, resolver: &dyn PackageResolver) -> String {
        let mut state = self.lock();

        // 挂载状态可能由 icon() 更新，回退名称不能当作已缓存
        if let (Some(CachedLabel::Resolved(label)), MountState::Mounted) =
            (&state.label, state.mount)
        {
            return label.clone();
        }

        let cached = if self.source_exists() {
            state.mount = MountState::Mounted;
            CachedLabel::Resolved(
                resolver
                    .load_label(&self.descriptor)
                    .unwrap_or_else(|| self.descriptor.package_name.clone()),
            )
        } else {
            self.mark_unmounted(&mut state);
            CachedLabel::Fallback(self.descriptor.package_name.clone())
        };

        let label = match &cached {
            CachedLabel::Fallback(label) | CachedLabel::Resolved(label) => label.clone(),
        };
        state.label = Some(cached);
        label
    }

    /// 应用图标
    ///
    /// 挂载且已缓存时直接返回；否则重新检查文件并尝试加载。
    /// 无法加载时返回系统默认图标（默认图标不会缓存到条目上）
    pub fn icon(&self, resolver: &dyn PackageResolver) -> Icon {
        let mut state = self.lock();

        if let (Some(icon), MountState::Mounted) = (&state.icon, state.mount) {
            return icon.clone();
        }

        if self.source_exists() {
            state.mount = MountState::Mounted;
            match resolver.load_icon(&self.descriptor) {
                Some(icon) if !icon.is_default() => {
                    state.icon = Some(icon.clone());
                    return icon;
                }
                _ => {
                    tracing::debug!(package = %self.descriptor.package_name, "图标无法加载，使用默认图标");
                }
            }
        } else {
            self.mark_unmounted(&mut state);
        }

        Icon::SystemDefault
    }

    fn mark_unmounted(&self, state: &mut EntryState) {
        if state.mount != MountState::Unmounted {
            tracing::debug!(
                package = %self.descriptor.package_name,
                path = ?self.descriptor.source_path,
                "安装包文件不可用，标记为未挂载"
            );
        }
        state.mount = MountState::Unmounted;
    }

    fn source_exists(&self) -> bool {
        self.descriptor.source_path.exists()
    }

    fn lock(&self) -> MutexGuard<'_, EntryState> {
        // 状态只含缓存值，锁中毒后继续使用不会破坏不变量
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// 记录调用次数的解析器
    #[derive(Default)]
    struct CountingResolver {
        label_calls: AtomicUsize,
        icon_calls: AtomicUsize,
    }

    impl PackageResolver for CountingResolver {
        fn load_label(&self, _descriptor: &PackageDescriptor) -> Option<String> {
            let n = self.label_calls.fetch_add(1, Ordering::SeqCst);
            Some(format!("Chat #{n}"))
        }

        fn load_icon(&self, _descriptor: &PackageDescriptor) -> Option<Icon> {
            self.icon_calls.fetch_add(1, Ordering::SeqCst);
            Some(Icon::image(vec![1, 2, 3]))
        }
    }

    struct NoMetadata;

    impl PackageResolver for NoMetadata {
        fn load_label(&self, _descriptor: &PackageDescriptor) -> Option<String> {
            None
        }

        fn load_icon(&self, _descriptor: &PackageDescriptor) -> Option<Icon> {
            None
        }
    }

    fn entry_in(dir: &TempDir) -> PackageEntry {
        PackageEntry::new(PackageDescriptor::new(
            "com.example.chat",
            dir.path().join("chat.pkg"),
        ))
    }

    #[test]
    fn test_unmounted_falls_back() {
        let dir = TempDir::new().unwrap();
        let entry = entry_in(&dir);
        let resolver = CountingResolver::default();

        assert_eq!(entry.mount_state(), MountState::Unknown);
        assert_eq!(entry.label(&resolver), "com.example.chat");
        assert_eq!(entry.icon(&resolver), Icon::SystemDefault);
        assert_eq!(entry.mount_state(), MountState::Unmounted);
        assert_eq!(resolver.label_calls.load(Ordering::SeqCst), 0);
        assert_eq!(resolver.icon_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unmounted_to_mounted_recomputes() {
        let dir = TempDir::new().unwrap();
        let entry = entry_in(&dir);
        let resolver = CountingResolver::default();

        assert_eq!(entry.label(&resolver), "com.example.chat");
        assert!(entry.icon(&resolver).is_default());

        fs::write(entry.source_path(), b"pkg").unwrap();

        assert_eq!(entry.label(&resolver), "Chat #0");
        assert_eq!(entry.icon(&resolver), Icon::image(vec![1, 2, 3]));
        assert_eq!(entry.mount_state(), MountState::Mounted);
    }

    #[test]
    fn test_icon_before_label_after_remount() {
        let dir = TempDir::new().unwrap();
        let entry = entry_in(&dir);
        let resolver = CountingResolver::default();

        assert_eq!(entry.label(&resolver), "com.example.chat");
        fs::write(entry.source_path(), b"pkg").unwrap();

        // icon() 先发现文件出现，label() 仍需重新读取
        assert_eq!(entry.icon(&resolver), Icon::image(vec![1, 2, 3]));
        assert_eq!(entry.mount_state(), MountState::Mounted);
        assert_eq!(entry.label(&resolver), "Chat #0");
        assert_eq!(entry.label(&resolver), "Chat #0");
        assert_eq!(resolver.label_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_mounted_label_is_cached() {
        let dir = TempDir::new().unwrap();
        let entry = entry_in(&dir);
        fs::write(entry.source_path(), b"pkg").unwrap();
        let resolver = CountingResolver::default();

        let first = entry.label(&resolver);
        let second = entry.label(&resolver);
        assert_eq!(first, second);
        assert_eq!(resolver.label_calls.load(Ordering::SeqCst), 1);

        entry.icon(&resolver);
        entry.icon(&resolver);
        assert_eq!(resolver.icon_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cached_values_survive_unmount() {
        let dir = TempDir::new().unwrap();
        let entry = entry_in(&dir);
        fs::write(entry.source_path(), b"pkg").unwrap();
        let resolver = CountingResolver::default();

        assert_eq!(entry.label(&resolver), "Chat #0");
        fs::remove_file(entry.source_path()).unwrap();

        // 已挂载且已缓存时不重新检查文件
        assert_eq!(entry.label(&resolver), "Chat #0");
        assert_eq!(entry.mount_state(), MountState::Mounted);

        // 图标未缓存，检查后发现文件已消失
        assert!(entry.icon(&resolver).is_default());
        assert_eq!(entry.mount_state(), MountState::Unmounted);

        // 未挂载后名称回退为包名
        assert_eq!(entry.label(&resolver), "com.example.chat");
    }

    #[test]
    fn test_unresolvable_label_uses_package_name() {
        let dir = TempDir::new().unwrap();
        let entry = entry_in(&dir);
        fs::write(entry.source_path(), b"pkg").unwrap();

        assert_eq!(entry.label(&NoMetadata), "com.example.chat");
        assert!(entry.icon(&NoMetadata).is_default());
        assert_eq!(entry.mount_state(), MountState::Mounted);
    }
}
