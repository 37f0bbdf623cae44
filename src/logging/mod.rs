//! 日志系统模块
//!
//! 提供结构化、可配置的日志功能，支持：
//! - 动态级别控制
//! - 控制台和文件输出
//! - JSON格式可选
//! - 非阻塞文件写入

pub mod config;
pub mod dynamic_filter;
pub mod logger;

pub use config::{LogLevel, LoggingConfig};
pub use dynamic_filter::{get_global_log_level, set_global_log_level};
pub use logger::{get_global_log_manager, init_global_logger, LogManager};
