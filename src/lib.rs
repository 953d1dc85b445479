//! config-store - 按节访问的配置存储
//!
//! 这是一个用Rust编写的配置文件管理库与命令行工具，支持：
//! - TOML / YAML / JSON 配置文件
//! - 宽松与严格两种加载策略
//! - 按节读取、内存修改与显式写回
//! - 配置热重载
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;

// 重新导出主要类型
pub use config::{ConfigDocument, ConfigStore, ConfigValue, LoadMode, LoadOptions};
pub use error::{AppError, ConfigError};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
