//! 命令处理逻辑
//!
//! 实现各种CLI命令的处理逻辑

use crate::cli::args::{Args, Commands, OutputFormat};
use crate::config::{
    ConfigDocument, ConfigStore, ConfigValue, ConfigWatcher, RECOGNIZED_SECTIONS,
};
use crate::error::{ConfigError, Result};
use crate::logging::LoggingSystem;
use async_trait::async_trait;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// 不需要已加载配置的命令
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 作用于配置存储的命令
///
/// 配置存储由入口统一构造后以引用传入。
#[async_trait]
pub trait StoreCommand: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args, store: &mut ConfigStore) -> Result<()>;
}

/// 将命令行文本解析为配置值
///
/// 依次尝试布尔、null、整数、浮点数与 JSON 数组/对象，其余按字符串处理。
pub fn parse_value(text: &str) -> ConfigValue {
    match text {
        "true" => return ConfigValue::Bool(true),
        "false" => return ConfigValue::Bool(false),
        "null" => return ConfigValue::Null,
        _ => {}
    }

    if let Ok(int) = text.parse::<i64>() {
        return json!(int);
    }
    if let Ok(float) = text.parse::<f64>() {
        if float.is_finite() {
            return json!(float);
        }
    }
    if text.starts_with('[') || text.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<ConfigValue>(text) {
            return value;
        }
    }

    ConfigValue::String(text.to_string())
}

/// 以文本形式展示配置值，字符串不加引号
fn render_value(value: &ConfigValue) -> String {
    match value {
        ConfigValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// 版本命令
pub struct VersionCommand;

#[async_trait]
impl Command for VersionCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Version { format } = &args.command {
            match format {
                OutputFormat::Json => {
                    let version_info = json!({
                        "name": crate::APP_NAME,
                        "version": crate::VERSION,
                        "description": crate::APP_DESCRIPTION,
                        "features": {
                            "yaml": cfg!(feature = "yaml"),
                            "persist": cfg!(feature = "persist"),
                        }
                    });
                    println!("{}", serde_json::to_string_pretty(&version_info)?);
                }
                OutputFormat::Text => {
                    println!("{} v{}", crate::APP_NAME, crate::VERSION);
                    println!("{}", crate::APP_DESCRIPTION);
                }
            }
        }
        Ok(())
    }
}

/// 初始化命令
pub struct InitCommand {
    /// 审计日志
    pub logging: LoggingSystem,
}

#[async_trait]
impl Command for InitCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        if let Commands::Init { config_path, force } = &args.command {
            let path = config_path
                .clone()
                .unwrap_or_else(|| args.get_config_path());
            self.create_config_file(&path, *force)
        } else {
            Ok(())
        }
    }
}

impl InitCommand {
    /// 创建配置文件
    fn create_config_file(&self, config_path: &Path, force: bool) -> Result<()> {
        // 检查文件是否已存在
        if config_path.exists() && !force {
            eprintln!("配置文件已存在: {}", config_path.display());
            eprintln!("使用 --force 参数覆盖现有文件");
            return Ok(());
        }

        // 创建目录（如果不存在）
        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut store = ConfigStore::in_memory(config_path);
        for (section, entries) in Self::default_document().iter() {
            for (key, value) in entries {
                store.set(section.as_str(), key.as_str(), value.clone());
            }
        }
        store.save()?;

        self.logging.audit_log(
            "init",
            &config_path.display().to_string(),
            "success",
            Some(store.format().name()),
        );
        println!("配置文件已创建: {}", config_path.display());
        println!("请编辑配置文件以填写实际的路径与参数");

        Ok(())
    }

    /// 默认配置内容
    pub fn default_document() -> ConfigDocument {
        let mut document = ConfigDocument::new();
        document.set("paths", "input_data", json!("data/input"));
        document.set("paths", "output_results", json!("data/output"));
        document.set("settings", "max_iterations", json!(1000));
        document.set("settings", "debug_mode", json!(false));
        document.set("settings", "tolerance", json!(0.001));
        document.set("engine_parameters", "chamber_pressure", json!(2500000.0));
        document
    }
}

/// 读取命令
pub struct GetCommand;

#[async_trait]
impl StoreCommand for GetCommand {
    async fn execute(&self, args: &Args, store: &mut ConfigStore) -> Result<()> {
        if let Commands::Get {
            section,
            key,
            format,
        } = &args.command
        {
            let value = store.get(section, key)?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
                OutputFormat::Text => println!("{}", render_value(value)),
            }
        }
        Ok(())
    }
}

/// 设置命令
pub struct SetCommand {
    /// 审计日志
    pub logging: LoggingSystem,
}

#[async_trait]
impl StoreCommand for SetCommand {
    async fn execute(&self, args: &Args, store: &mut ConfigStore) -> Result<()> {
        if let Commands::Set {
            section,
            key,
            value,
        } = &args.command
        {
            let value = parse_value(value);
            let target = format!("{section}.{key}");
            let rendered = value.to_string();

            if let Err(e) = store.set_and_save(section.as_str(), key.as_str(), value) {
                self.logging
                    .audit_log("set", &target, "failed", Some(&e.to_string()));
                return Err(e.into());
            }

            self.logging
                .audit_log("set", &target, "success", Some(&rendered));
            println!(
                "已更新 {} = {} 并保存到 {}",
                target,
                rendered,
                store.path().display()
            );
        }
        Ok(())
    }
}

/// 显示命令
pub struct ShowCommand;

#[async_trait]
impl StoreCommand for ShowCommand {
    async fn execute(&self, args: &Args, store: &mut ConfigStore) -> Result<()> {
        if let Commands::Show { section, format } = &args.command {
            let document = store.document();

            match (section, format) {
                (Some(name), OutputFormat::Json) => {
                    let entries = document.section(name).ok_or_else(|| {
                        ConfigError::MissingSection {
                            section: name.clone(),
                        }
                    })?;
                    println!("{}", serde_json::to_string_pretty(entries)?);
                }
                (Some(name), OutputFormat::Text) => {
                    let entries = document.section(name).ok_or_else(|| {
                        ConfigError::MissingSection {
                            section: name.clone(),
                        }
                    })?;
                    println!("[{name}]");
                    for (key, value) in entries {
                        println!("{key} = {value}");
                    }
                }
                (None, OutputFormat::Json) => {
                    println!("{}", serde_json::to_string_pretty(document)?);
                }
                (None, OutputFormat::Text) => {
                    if args.is_verbose() {
                        println!("# 文件: {}", store.path().display());
                        println!("# 格式: {} / 模式: {}", store.format(), store.mode());
                        println!("# 加载时间: {}", store.loaded_at().to_rfc3339());
                        println!("# 可写: {}", store.is_writable());
                    }
                    if document.is_empty() {
                        println!("(空配置)");
                    }
                    for (name, entries) in document.iter() {
                        println!("[{name}]");
                        for (key, value) in entries {
                            println!("{key} = {value}");
                        }
                        println!();
                    }
                }
            }
        }
        Ok(())
    }
}

/// 验证命令
pub struct ValidateCommand;

#[async_trait]
impl StoreCommand for ValidateCommand {
    async fn execute(&self, args: &Args, store: &mut ConfigStore) -> Result<()> {
        if let Commands::Validate { sections } = &args.command {
            println!("验证配置文件: {}", store.path().display());

            let allowed: Vec<&str> = if sections.is_empty() {
                RECOGNIZED_SECTIONS.to_vec()
            } else {
                sections.iter().map(String::as_str).collect()
            };

            store.validate_sections(&allowed)?;

            println!("✓ 配置文件验证通过");
            println!("✓ 找到 {} 个配置节", store.document().len());
            if args.is_verbose() {
                for (name, entries) in store.document().iter() {
                    println!("  [{}] {} 个键", name, entries.len());
                }
            }
        }
        Ok(())
    }
}

/// 监控命令
pub struct WatchCommand {
    /// 变更日志
    pub logging: LoggingSystem,
}

#[async_trait]
impl StoreCommand for WatchCommand {
    async fn execute(&self, args: &Args, store: &mut ConfigStore) -> Result<()> {
        if let Commands::Watch { debounce_ms } = &args.command {
            let (mut watcher, mut receiver) =
                ConfigWatcher::for_store(store, Duration::from_millis(*debounce_ms))?;
            watcher.start()?;

            println!(
                "正在监控配置文件: {}（Ctrl+C 退出）",
                watcher.config_path().display()
            );

            loop {
                tokio::select! {
                    event = receiver.recv() => match event {
                        Ok(change_event) => {
                            self.logging
                                .config_change_log(change_event.version, &change_event.diffs);
                            println!("配置已变更，版本: {}", change_event.version);
                            for diff in &change_event.diffs {
                                println!("  {diff}");
                            }
                            store.replace_document(change_event.document);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!("配置变更事件积压，跳过 {} 个", skipped);
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    },
                    _ = tokio::signal::ctrl_c() => {
                        info!("收到中断信号，停止监控");
                        break;
                    }
                }
            }

            watcher.stop();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogConfig;
    use clap::Parser;
    use tempfile::TempDir;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("null"), ConfigValue::Null);
        assert_eq!(parse_value("2000"), json!(2000));
        assert_eq!(parse_value("-3.5"), json!(-3.5));
        assert_eq!(parse_value("1e-4"), json!(0.0001));
        assert_eq!(parse_value("[1, 2]"), json!([1, 2]));
        assert_eq!(parse_value("/new/experiment/data"), json!("/new/experiment/data"));
        assert_eq!(parse_value("[not json"), json!("[not json"));
        assert_eq!(parse_value("inf"), json!("inf"));
    }

    #[tokio::test]
    async fn test_set_command_persists_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let path_arg = path.to_string_lossy().to_string();

        let mut store = ConfigStore::lenient(&path).unwrap();
        let command = SetCommand {
            logging: LoggingSystem::new(LogConfig::default()),
        };
        command
            .execute(
                &args(&["config-store", "-c", &path_arg, "set", "settings", "max_iterations", "2000"]),
                &mut store,
            )
            .await
            .unwrap();

        let reloaded = ConfigStore::strict(&path).unwrap();
        assert_eq!(reloaded.get_i64("settings", "max_iterations").unwrap(), 2000);
    }

    #[tokio::test]
    async fn test_get_command_missing_key() {
        let dir = TempDir::new().unwrap();
        let mut store = ConfigStore::lenient(dir.path().join("config.toml")).unwrap();
        store.set("settings", "debug_mode", true);

        let result = GetCommand
            .execute(&args(&["config-store", "get", "settings", "tolerance"]), &mut store)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_validate_command_rejects_unknown_section() {
        let dir = TempDir::new().unwrap();
        let mut store = ConfigStore::lenient(dir.path().join("config.toml")).unwrap();
        store.set("plotting", "dpi", 300);

        let result = ValidateCommand
            .execute(&args(&["config-store", "validate"]), &mut store)
            .await;
        assert!(result.is_err());

        let result = ValidateCommand
            .execute(
                &args(&["config-store", "validate", "--sections", "plotting"]),
                &mut store,
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_init_command_writes_default_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let path_arg = path.to_string_lossy().to_string();

        let command = InitCommand {
            logging: LoggingSystem::new(LogConfig::default()),
        };
        command
            .execute(&args(&["config-store", "init", &path_arg]))
            .await
            .unwrap();

        let store = ConfigStore::strict(&path).unwrap();
        assert_eq!(store.document(), &InitCommand::default_document());
        assert!(store.validate_sections(RECOGNIZED_SECTIONS).is_ok());
    }
}
