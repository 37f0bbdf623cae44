use crate::logging::config::{LogLevel, LoggingConfig};
use crate::logging::dynamic_filter::{
    get_global_log_level, set_global_log_level as set_global_level, DynamicLogFilter, CRATE_TARGET,
};
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use std::fs;
use std::sync::Mutex;
use std::time::Instant;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// 日志文件名前缀（按天滚动）
pub const LOG_FILE_PREFIX: &str = "toaster.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// 日志管理器，支持动态级别控制
pub struct LogManager {
    pub config: LoggingConfig,
    pub start_time: Instant,
    _guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl LogManager {
    /// 使用指定配置初始化日志系统（会先应用环境变量覆盖）
    pub fn init_with_config(config: LoggingConfig) -> Result<Self> {
        let config = Self::apply_env_overrides(config);

        // 确保日志目录存在
        if config.file_enabled {
            let log_dir = config.effective_log_dir();
            fs::create_dir_all(&log_dir)
                .with_context(|| format!("无法创建日志目录: {:?}", log_dir))?;
        }

        set_global_level(config.level);

        let mut layers: Vec<BoxedLayer> = vec![DynamicLogFilter::new().boxed()];
        let mut file_guard = None;

        if config.console_enabled {
            layers.push(Self::create_console_layer());
        }

        if config.file_enabled {
            let (layer, guard) = Self::create_file_layer(&config);
            file_guard = Some(guard);
            layers.push(layer);
        }

        // 实际级别由动态过滤器控制
        let filter = EnvFilter::new(format!("{CRATE_TARGET}=trace,info"));
        Registry::default()
            .with(layers)
            .with(filter)
            .try_init()
            .context("全局日志订阅器已存在")?;

        tracing::info!(
            "日志系统初始化完成 - 级别: {}, 控制台: {}, 文件: {}",
            config.level,
            config.console_enabled,
            config.file_enabled
        );

        Ok(Self {
            config,
            start_time: Instant::now(),
            _guard: file_guard,
        })
    }

    /// 环境变量覆盖
    fn apply_env_overrides(mut config: LoggingConfig) -> LoggingConfig {
        if let Ok(level_str) = std::env::var("RUST_LOG") {
            if let Ok(level) = LoggingConfig::parse_level(&level_str) {
                config.level = level;
            }
        }

        if let Ok(enabled) = std::env::var("TOASTER_LOG_CONSOLE") {
            config.console_enabled = enabled.parse().unwrap_or(config.console_enabled);
        }

        if let Ok(enabled) = std::env::var("TOASTER_LOG_FILE") {
            config.file_enabled = enabled.parse().unwrap_or(config.file_enabled);
        }

        if let Ok(path) = std::env::var("TOASTER_LOG_PATH") {
            config.file_path = Some(path.into());
        }

        if let Ok(json_fmt) = std::env::var("TOASTER_LOG_JSON") {
            config.json_format = json_fmt.parse().unwrap_or(config.json_format);
        }

        config
    }

    /// 创建控制台日志层（stderr，避免干扰标准输出上的查询结果）
    fn create_console_layer() -> BoxedLayer {
        fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr)
            .boxed()
    }

    /// 创建文件日志层（带guard）
    fn create_file_layer(
        config: &LoggingConfig,
    ) -> (BoxedLayer, tracing_appender::non_blocking::WorkerGuard) {
        let file_appender =
            tracing_appender::rolling::daily(config.effective_log_dir(), LOG_FILE_PREFIX);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let layer = if config.json_format {
            fmt::layer()
                .json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_writer(non_blocking)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_writer(non_blocking)
                .boxed()
        };

        (layer, guard)
    }

    /// 动态更新日志级别
    pub fn update_level(&mut self, level: LogLevel) {
        set_global_level(level);
        self.config.level = level;
        tracing::info!("日志级别已实时更新为: {}", level);
    }

    /// 获取当前日志级别
    pub fn current_level() -> LogLevel {
        get_global_log_level()
    }

    /// 运行时长（秒）
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

static GLOBAL_LOG_MANAGER: OnceCell<Mutex<LogManager>> = OnceCell::new();

/// 获取全局日志管理器
pub fn get_global_log_manager() -> Option<&'static Mutex<LogManager>> {
    GLOBAL_LOG_MANAGER.get()
}

/// 初始化全局日志系统（重复调用时保持第一次的配置）
pub fn init_global_logger(config: LoggingConfig) -> Result<()> {
    GLOBAL_LOG_MANAGER
        .get_or_try_init(|| LogManager::init_with_config(config).map(Mutex::new))
        .map(|_| ())
}
