//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use std::path::PathBuf;
use thiserror::Error;

/// config-store 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件不存在
    #[error("配置文件不存在: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// 配置文件解析错误，携带底层解析器的错误信息
    #[error("配置文件解析失败 ({format}) {}: {message}", path.display())]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    /// 配置文件为空或内容为 null
    #[error("配置文件为空或无效: {}", path.display())]
    Empty { path: PathBuf },

    /// 读取时节不存在
    #[error("配置节不存在: [{section}]")]
    MissingSection { section: String },

    /// 读取时键不存在
    #[error("配置键不存在: [{section}].{key}")]
    MissingKey { section: String, key: String },

    /// 值存在但类型不符
    #[error("配置值类型不匹配: [{section}].{key} 期望 {expected}")]
    TypeMismatch {
        section: String,
        key: String,
        expected: &'static str,
    },

    /// 未识别的配置节
    #[error("未识别的配置节: [{section}]")]
    UnknownSection { section: String },

    /// 写回能力不可用（未启用 `persist` 特性或存储为只读）
    #[error("持久化能力不可用: 无法写入 {format} 配置")]
    PersistenceUnavailable { format: &'static str },

    /// 当前构建不支持该格式
    #[error("不支持的配置格式: {format}")]
    FormatUnavailable { format: &'static str },

    /// 序列化失败（格式无法表达某个值）
    #[error("配置序列化失败 ({format}): {message}")]
    Serialize {
        format: &'static str,
        message: String,
    },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVar { var: String },

    /// 读写文件失败
    #[error("配置文件读写失败 {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// 是否为加载阶段的错误（严格模式下由入口决定终止进程）
    pub fn is_load_failure(&self) -> bool {
        matches!(
            self,
            ConfigError::FileNotFound { .. }
                | ConfigError::Parse { .. }
                | ConfigError::Empty { .. }
                | ConfigError::EnvVar { .. }
                | ConfigError::FormatUnavailable { .. }
                | ConfigError::Io { .. }
        )
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

/// 配置操作结果类型别名
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
