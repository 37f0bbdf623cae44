use crate::logging::config::LogLevel;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::Subscriber;
use tracing_subscriber::{
    layer::{Context, Layer},
    registry::LookupSpan,
};

/// 本 crate 的日志 target 前缀
pub const CRATE_TARGET: &str = "toaster_provider";

/// 全局日志级别控制器
static GLOBAL_LOG_LEVEL: AtomicU8 = AtomicU8::new(3); // 默认 INFO (3)

/// 日志级别转换为数字
fn log_level_to_number(level: LogLevel) -> u8 {
    match level {
        LogLevel::Error => 1,
        LogLevel::Warn => 2,
        LogLevel::Info => 3,
        LogLevel::Debug => 4,
        LogLevel::Trace => 5,
    }
}

/// 转换 tracing::Level 到数字
fn tracing_level_to_number(level: &tracing::Level) -> u8 {
    match *level {
        tracing::Level::ERROR => 1,
        tracing::Level::WARN => 2,
        tracing::Level::INFO => 3,
        tracing::Level::DEBUG => 4,
        tracing::Level::TRACE => 5,
    }
}

/// 动态日志过滤器 - 可以实时控制本 crate 的日志级别
///
/// 其他 crate 的日志固定在 INFO 及以上。
#[derive(Clone, Default)]
pub struct DynamicLogFilter;

impl DynamicLogFilter {
    pub fn new() -> Self {
        Self
    }

    /// 设置全局日志级别
    pub fn set_global_level(level: LogLevel) {
        GLOBAL_LOG_LEVEL.store(log_level_to_number(level), Ordering::SeqCst);
    }

    /// 获取当前全局日志级别
    pub fn get_global_level() -> LogLevel {
        match GLOBAL_LOG_LEVEL.load(Ordering::SeqCst) {
            1 => LogLevel::Error,
            2 => LogLevel::Warn,
            3 => LogLevel::Info,
            4 => LogLevel::Debug,
            5 => LogLevel::Trace,
            _ => LogLevel::Info,
        }
    }

    /// 检查是否应该记录某个级别的日志
    pub fn should_log(&self, level: &tracing::Level) -> bool {
        tracing_level_to_number(level) <= GLOBAL_LOG_LEVEL.load(Ordering::SeqCst)
    }

    fn allows(&self, metadata: &tracing::Metadata<'_>) -> bool {
        if metadata.target().starts_with(CRATE_TARGET) {
            return self.should_log(metadata.level());
        }
        *metadata.level() <= tracing::Level::INFO
    }
}

impl<S> Layer<S> for DynamicLogFilter
where
    S: Subscriber,
    S: for<'span> LookupSpan<'span>,
{
    fn enabled(&self, metadata: &tracing::Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        self.allows(metadata)
    }

    fn register_callsite(
        &self,
        _metadata: &'static tracing::Metadata<'static>,
    ) -> tracing::subscriber::Interest {
        // 级别可在运行时变化，不能缓存 always/never
        tracing::subscriber::Interest::sometimes()
    }
}

/// 便捷函数：设置全局日志级别
pub fn set_global_log_level(level: LogLevel) {
    DynamicLogFilter::set_global_level(level);
}

/// 便捷函数：获取全局日志级别
pub fn get_global_log_level() -> LogLevel {
    DynamicLogFilter::get_global_level()
}
