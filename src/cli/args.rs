//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use crate::config::{LoadMode, LoadOptions};
use crate::logging::LogConfig;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// config-store - 按节访问的配置文件管理工具
#[derive(Parser, Debug, Clone)]
#[command(
    name = "config-store",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径",
        env = "CONFIG_STORE_FILE",
        global = true
    )]
    pub config: Option<PathBuf>,

    /// 严格模式：文件缺失、为空或格式错误时直接退出
    #[arg(long, help = "严格模式加载配置", env = "CONFIG_STORE_STRICT", global = true)]
    pub strict: bool,

    /// 启用 `${VAR}` 环境变量替换
    #[arg(long, help = "启用环境变量替换", global = true)]
    pub env_subst: bool,

    /// 日志级别
    #[arg(
        short,
        long,
        value_enum,
        default_value = "warn",
        help = "日志级别",
        env = "CONFIG_STORE_LOG_LEVEL",
        global = true
    )]
    pub log_level: LogLevel,

    /// 日志文件路径，设置后日志不再写到标准错误
    #[arg(
        long,
        value_name = "FILE",
        help = "日志文件路径（追加写入）",
        env = "CONFIG_STORE_LOG_FILE",
        global = true
    )]
    pub log_file: Option<PathBuf>,

    /// 日志输出格式
    #[arg(
        long,
        value_enum,
        default_value = "text",
        help = "日志输出格式",
        global = true
    )]
    pub log_format: OutputFormat,

    /// 是否启用详细输出
    #[arg(short, long, help = "启用详细输出", global = true)]
    pub verbose: bool,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum LogLevel {
    /// 调试级别
    Debug,
    /// 信息级别
    Info,
    /// 警告级别
    Warn,
    /// 错误级别
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 读取配置值
    Get {
        /// 配置节
        #[arg(value_name = "SECTION", help = "配置节")]
        section: String,

        /// 配置键
        #[arg(value_name = "KEY", help = "配置键")]
        key: String,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 设置配置值并立即保存
    Set {
        /// 配置节（不存在时自动创建）
        #[arg(value_name = "SECTION", help = "配置节")]
        section: String,

        /// 配置键
        #[arg(value_name = "KEY", help = "配置键")]
        key: String,

        /// 配置值（布尔、数字、null、JSON 或字符串）
        #[arg(value_name = "VALUE", help = "配置值", allow_hyphen_values = true)]
        value: String,
    },

    /// 显示配置内容
    Show {
        /// 只显示指定配置节
        #[arg(short, long, value_name = "SECTION", help = "只显示指定配置节")]
        section: Option<String>,

        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },

    /// 验证配置文件
    Validate {
        /// 允许的配置节，默认 paths,settings,engine_parameters
        #[arg(
            long,
            value_name = "SECTIONS",
            value_delimiter = ',',
            help = "允许的配置节（逗号分隔）"
        )]
        sections: Vec<String>,
    },

    /// 初始化配置文件
    Init {
        /// 配置文件路径（格式由扩展名决定）
        #[arg(value_name = "FILE", help = "配置文件路径")]
        config_path: Option<PathBuf>,

        /// 是否覆盖现有文件
        #[arg(short, long, help = "覆盖现有文件")]
        force: bool,
    },

    /// 监控配置文件变更
    Watch {
        /// 防抖动延迟（毫秒）
        #[arg(
            long,
            value_name = "MILLIS",
            default_value = "500",
            help = "防抖动延迟（毫秒）"
        )]
        debounce_ms: u64,
    },

    /// 显示版本信息
    Version {
        /// 输出格式
        #[arg(short, long, value_enum, default_value = "text", help = "输出格式")]
        format: OutputFormat,
    },
}

/// 输出格式枚举
#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum OutputFormat {
    /// 文本格式
    Text,
    /// JSON格式
    Json,
}

impl Args {
    /// 获取配置文件路径
    pub fn get_config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(crate::config::get_default_config_path)
    }

    /// 根据参数构建加载选项
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            mode: if self.strict {
                LoadMode::Strict
            } else {
                LoadMode::Lenient
            },
            env_substitution: self.env_subst,
        }
    }

    /// 根据参数构建日志配置
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level.clone().into(),
            file_path: self.log_file.clone(),
            json_format: self.log_format == OutputFormat::Json,
        }
    }

    /// 是否启用详细输出
    pub fn is_verbose(&self) -> bool {
        self.verbose || matches!(self.log_level, LogLevel::Debug)
    }
}
