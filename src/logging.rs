//! 日志系统模块
//!
//! 日志默认写到标准错误，标准输出留给命令结果；也可以追加写入日志文件。

use crate::config::ConfigDiff;
use log::LevelFilter;
use serde_json::json;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};
use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter, Layer};

/// 进程内日志初始化结果，只初始化一次
static LOGGING_INIT: OnceLock<Mutex<Option<Result<(), String>>>> = OnceLock::new();

/// 日志配置结构
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 日志级别
    pub level: LevelFilter,
    /// 日志文件路径，设置后不再输出到标准错误
    pub file_path: Option<PathBuf>,
    /// 是否使用JSON格式
    pub json_format: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LevelFilter::Warn,
            file_path: None,
            json_format: false,
        }
    }
}

/// 日志系统管理器
pub struct LoggingSystem {
    /// 配置
    config: LogConfig,
}

impl LoggingSystem {
    /// 创建新的日志系统句柄，不安装订阅器
    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }

    /// 初始化日志系统
    ///
    /// # 参数
    /// * `config` - 日志配置
    ///
    /// # 返回
    /// * `anyhow::Result<LoggingSystem>` - 初始化结果
    ///
    /// 进程内只会真正初始化一次，之后的调用沿用第一次的结果。
    pub fn setup_logging(config: LogConfig) -> anyhow::Result<Self> {
        let state = LOGGING_INIT.get_or_init(|| Mutex::new(None));
        let mut state = state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let result = state.get_or_insert_with(|| {
            Self::perform_initialization(&config).map_err(|e| format!("{e:#}"))
        });

        match result {
            Ok(()) => Ok(Self::new(config)),
            Err(e) => Err(anyhow::anyhow!("日志系统初始化失败: {}", e)),
        }
    }

    /// 执行实际的日志系统初始化
    fn perform_initialization(config: &LogConfig) -> anyhow::Result<()> {
        // log crate 到 tracing 的桥接；已经安装过时忽略
        if let Err(e) = tracing_log::LogTracer::init() {
            tracing::debug!("LogTracer 已初始化: {}", e);
        }

        let env_filter = EnvFilter::from_default_env()
            .add_directive(Self::convert_level_to_directive(config.level));

        let output = match &config.file_path {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| anyhow::anyhow!("打开日志文件失败 {}: {}", path.display(), e))?;
                format_layer(Mutex::new(file), config.json_format, false)
            }
            None => format_layer(std::io::stderr, config.json_format, true),
        };

        let subscriber = registry().with(env_filter).with(output);
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| anyhow::anyhow!("tracing subscriber初始化失败: {}", e))?;

        tracing::debug!("日志系统初始化完成: {:?}", config);
        Ok(())
    }

    /// 将 log::LevelFilter 转换为 tracing 的指令
    fn convert_level_to_directive(level: LevelFilter) -> tracing_subscriber::filter::Directive {
        use tracing_subscriber::filter::{Directive, LevelFilter as TracingLevel};
        match level {
            LevelFilter::Off => Directive::from(TracingLevel::OFF),
            LevelFilter::Error => Directive::from(tracing::Level::ERROR),
            LevelFilter::Warn => Directive::from(tracing::Level::WARN),
            LevelFilter::Info => Directive::from(tracing::Level::INFO),
            LevelFilter::Debug => Directive::from(tracing::Level::DEBUG),
            LevelFilter::Trace => Directive::from(tracing::Level::TRACE),
        }
    }

    /// 记录审计日志
    ///
    /// # 参数
    /// * `operation` - 操作名称，例如 `set`、`init`
    /// * `target` - 操作对象，例如 `settings.max_iterations`
    /// * `result` - 操作结果
    /// * `details` - 附加信息
    pub fn audit_log(&self, operation: &str, target: &str, result: &str, details: Option<&str>) {
        if self.config.json_format {
            let audit_entry = json!({
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "type": "audit",
                "operation": operation,
                "target": target,
                "result": result,
                "details": details.unwrap_or(""),
            });
            tracing::info!("{audit_entry}");
        } else {
            tracing::info!(
                "AUDIT: {} {} - {} ({})",
                operation,
                target,
                result,
                details.unwrap_or("")
            );
        }
    }

    /// 记录配置变更日志
    pub fn config_change_log(&self, version: u64, diffs: &[ConfigDiff]) {
        if self.config.json_format {
            let change_entry = json!({
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "type": "config_change",
                "version": version,
                "changes": diffs.iter().map(ToString::to_string).collect::<Vec<_>>(),
            });
            tracing::info!("{change_entry}");
        } else {
            tracing::info!("CONFIG: 版本 {} 共 {} 处变更", version, diffs.len());
            for diff in diffs {
                tracing::info!("CONFIG:   {}", diff);
            }
        }
    }
}

/// 按输出目标和格式构建格式化层
fn format_layer<S, W>(writer: W, json_format: bool, ansi: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_timer(fmt::time::ChronoUtc::rfc_3339());

    if json_format {
        layer
            .json()
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        layer.with_ansi(ansi).with_target(false).boxed()
    }
}
