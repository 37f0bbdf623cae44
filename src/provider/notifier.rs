//! 变更通知
//!
//! 写操作之后依次触发两个副作用：
//! 1. 显示刷新事件（例如桌面小部件），发出即忘；
//! 2. 通知在被修改地址（或其上级/下级地址）上登记的观察者。
//!
//! 两者都是尽力而为，投递失败只记录日志，不影响触发它的写操作。

use crate::provider::uri::ContentUri;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

/// 内容观察者
pub trait ContentObserver: Send + Sync {
    fn on_change(&self, uri: &ContentUri);
}

impl<F> ContentObserver for F
where
    F: Fn(&ContentUri) + Send + Sync,
{
    fn on_change(&self, uri: &ContentUri) {
        self(uri)
    }
}

/// 显示刷新事件接收方
pub trait RefreshSink: Send + Sync {
    fn refresh(&self) -> anyhow::Result<()>;
}

/// 通过通道转发刷新动作名的刷新接收方
pub struct ChannelRefreshSink {
    action: String,
    sender: mpsc::UnboundedSender<String>,
}

impl ChannelRefreshSink {
    /// 创建接收方，返回它和对应的接收端
    pub fn new(action: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                action: action.into(),
                sender,
            },
            receiver,
        )
    }
}

impl RefreshSink for ChannelRefreshSink {
    fn refresh(&self) -> anyhow::Result<()> {
        self.sender
            .send(self.action.clone())
            .map_err(|e| anyhow::anyhow!("刷新事件发送失败: {e}"))
    }
}

/// 观察者登记 ID，用于注销
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

enum Target {
    Observer(Arc<dyn ContentObserver>),
    Channel(mpsc::UnboundedSender<ContentUri>),
}

struct Registration {
    id: ObserverId,
    uri: ContentUri,
    target: Target,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    registrations: Vec<Registration>,
}

/// 变更通知器
#[derive(Default)]
pub struct ChangeNotifier {
    refresh_sink: Option<Arc<dyn RefreshSink>>,
    registry: RwLock<Registry>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_refresh_sink(sink: Arc<dyn RefreshSink>) -> Self {
        Self {
            refresh_sink: Some(sink),
            registry: RwLock::default(),
        }
    }

    fn register(&self, uri: ContentUri, target: Target) -> ObserverId {
        let mut registry = match self.registry.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        // 只读场景下不会触发通知，登记时顺带清理已关闭的订阅
        registry.registrations.retain(|r| match &r.target {
            Target::Channel(sender) => !sender.is_closed(),
            Target::Observer(_) => true,
        });
        registry.next_id += 1;
        let id = ObserverId(registry.next_id);
        registry.registrations.push(Registration { id, uri, target });
        id
    }

    /// 登记观察者
    pub fn register_observer(
        &self,
        uri: ContentUri,
        observer: Arc<dyn ContentObserver>,
    ) -> ObserverId {
        self.register(uri, Target::Observer(observer))
    }

    /// 订阅某地址的变更通知，返回接收端
    ///
    /// 接收端被丢弃后，登记在下一次登记或通知时自动清理。
    pub fn subscribe(&self, uri: ContentUri) -> mpsc::UnboundedReceiver<ContentUri> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.register(uri, Target::Channel(sender));
        receiver
    }

    /// 注销观察者
    pub fn unregister(&self, id: ObserverId) -> bool {
        let mut registry = match self.registry.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = registry.registrations.len();
        registry.registrations.retain(|r| r.id != id);
        registry.registrations.len() != before
    }

    /// 当前登记数量
    pub fn observer_count(&self) -> usize {
        self.registry
            .read()
            .map(|r| r.registrations.len())
            .unwrap_or(0)
    }

    /// 写操作后的完整通知：先刷新显示，再通知观察者
    pub fn notify_write(&self, uri: &ContentUri) {
        self.refresh_display();
        self.notify_change(uri);
    }

    /// 发出显示刷新事件
    pub fn refresh_display(&self) {
        if let Some(sink) = &self.refresh_sink {
            match panic::catch_unwind(AssertUnwindSafe(|| sink.refresh())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "显示刷新事件投递失败"),
                Err(_) => tracing::warn!("显示刷新接收方发生 panic，已忽略"),
            }
        }
    }

    /// 通知与 `uri` 相关（相等、上级或下级）的观察者
    pub fn notify_change(&self, uri: &ContentUri) {
        let mut observers: Vec<Arc<dyn ContentObserver>> = Vec::new();
        let mut delivered = 0usize;

        {
            let mut registry = match self.registry.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            registry.registrations.retain(|registration| {
                if let Target::Channel(sender) = &registration.target {
                    if sender.is_closed() {
                        return false;
                    }
                }
                if !registration.uri.is_related_to(uri) {
                    return true;
                }
                match &registration.target {
                    Target::Observer(observer) => {
                        observers.push(Arc::clone(observer));
                        true
                    }
                    Target::Channel(sender) => {
                        let alive = sender.send(uri.clone()).is_ok();
                        delivered += usize::from(alive);
                        alive
                    }
                }
            });
        }

        // 回调在锁外执行，观察者可以在回调中再次登记或注销
        for observer in &observers {
            if panic::catch_unwind(AssertUnwindSafe(|| observer.on_change(uri))).is_err() {
                tracing::warn!(uri = %uri, "观察者回调发生 panic，已忽略");
            }
        }

        tracing::trace!(
            uri = %uri,
            observers = observers.len(),
            channels = delivered,
            "变更通知已发出"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn uri(path: &str) -> ContentUri {
        ContentUri::parse(path).unwrap()
    }

    struct FailingSink;

    impl RefreshSink for FailingSink {
        fn refresh(&self) -> anyhow::Result<()> {
            anyhow::bail!("widget host gone")
        }
    }

    #[test]
    fn test_observer_notified_for_related_uris() {
        let notifier = ChangeNotifier::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        notifier.register_observer(
            uri("/toaster"),
            Arc::new(move |_: &ContentUri| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        notifier.notify_change(&uri("/toaster"));
        notifier.notify_change(&uri("/toaster/4"));
        notifier.notify_change(&uri("/filter/4"));

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_item_subscription_sees_collection_change() {
        let notifier = ChangeNotifier::new();
        let mut rx = notifier.subscribe(uri("/filter/2"));

        notifier.notify_change(&uri("/filter"));
        assert_eq!(rx.try_recv().unwrap(), uri("/filter"));

        notifier.notify_change(&uri("/filter/3"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_subscription_is_pruned() {
        let notifier = ChangeNotifier::new();
        let rx = notifier.subscribe(uri("/toaster"));
        let _keep = notifier.subscribe(uri("/filter"));
        assert_eq!(notifier.observer_count(), 2);

        drop(rx);
        notifier.notify_change(&uri("/packages"));
        assert_eq!(notifier.observer_count(), 1);
    }

    #[test]
    fn test_closed_subscriptions_pruned_without_writes() {
        let notifier = ChangeNotifier::new();
        let _observer = notifier.register_observer(uri("/"), Arc::new(|_: &ContentUri| {}));

        for _ in 0..1000 {
            drop(notifier.subscribe(uri("/toaster")));
        }

        // 观察者 + 最后一次登记的订阅
        assert!(notifier.observer_count() <= 2);
    }

    #[test]
    fn test_panicking_observer_does_not_stop_delivery() {
        let notifier = ChangeNotifier::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        notifier.register_observer(
            uri("/toaster"),
            Arc::new(|_: &ContentUri| panic!("observer failed")),
        );
        notifier.register_observer(
            uri("/toaster"),
            Arc::new(move |_: &ContentUri| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        notifier.notify_write(&uri("/toaster/1"));
        notifier.notify_write(&uri("/toaster/2"));

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unregister() {
        let notifier = ChangeNotifier::new();
        let id = notifier.register_observer(uri("/toaster"), Arc::new(|_: &ContentUri| {}));
        assert!(notifier.unregister(id));
        assert!(!notifier.unregister(id));
        assert_eq!(notifier.observer_count(), 0);
    }

    #[test]
    fn test_notify_write_refreshes_then_notifies() {
        let (sink, mut actions) = ChannelRefreshSink::new("org.example.APPWIDGET_UPDATE");
        let notifier = ChangeNotifier::with_refresh_sink(Arc::new(sink));
        let mut changes = notifier.subscribe(uri("/toaster"));

        notifier.notify_write(&uri("/toaster/1"));

        assert_eq!(actions.try_recv().unwrap(), "org.example.APPWIDGET_UPDATE");
        assert_eq!(changes.try_recv().unwrap(), uri("/toaster/1"));
    }

    #[test]
    fn test_refresh_failure_is_swallowed() {
        let notifier = ChangeNotifier::with_refresh_sink(Arc::new(FailingSink));
        let mut changes = notifier.subscribe(uri("/filter"));

        notifier.notify_write(&uri("/filter"));

        assert!(changes.try_recv().is_ok());
    }
}
