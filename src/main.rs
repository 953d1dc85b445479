//! config-store 主程序入口
//!
//! 配置存储在这里统一构造，并以引用传给各个命令

use anyhow::{Context, Result};
use clap::Parser;
use config_store::cli::args::{Args, Commands};
use config_store::cli::commands::{
    Command, GetCommand, InitCommand, SetCommand, ShowCommand, StoreCommand, ValidateCommand,
    VersionCommand, WatchCommand,
};
use config_store::config::ConfigStore;
use config_store::error::ConfigError;
use config_store::logging::{LogConfig, LoggingSystem};
use std::path::Path;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // 解析命令行参数
    let args = Args::parse();

    // 初始化日志系统
    let log_config = args.log_config();

    let _logging_system =
        LoggingSystem::setup_logging(log_config.clone()).context("初始化日志系统失败")?;

    info!("{} v{} 启动", config_store::APP_NAME, config_store::VERSION);

    // 执行命令
    if let Err(e) = execute_command(&args, log_config).await {
        error!("命令执行失败: {:#}", e);
        eprintln!("ERROR: {e:#}");
        std::process::exit(1);
    }

    Ok(())
}

/// 执行CLI命令
async fn execute_command(args: &Args, log_config: LogConfig) -> Result<()> {
    match &args.command {
        Commands::Version { .. } => {
            let command = VersionCommand;
            command.execute(args).await.map_err(|e| anyhow::anyhow!(e))
        }
        Commands::Init { .. } => {
            let command = InitCommand {
                logging: LoggingSystem::new(log_config),
            };
            command.execute(args).await.map_err(|e| anyhow::anyhow!(e))
        }
        Commands::Get { .. } => run_store_command(args, &GetCommand, false).await,
        Commands::Set { .. } => {
            let command = SetCommand {
                logging: LoggingSystem::new(log_config),
            };
            run_store_command(args, &command, true).await
        }
        Commands::Show { .. } => run_store_command(args, &ShowCommand, false).await,
        Commands::Validate { .. } => run_store_command(args, &ValidateCommand, false).await,
        Commands::Watch { .. } => {
            let command = WatchCommand {
                logging: LoggingSystem::new(log_config),
            };
            run_store_command(args, &command, false).await
        }
    }
}

/// 打开配置存储并执行命令，只有写命令拿到可写的存储
async fn run_store_command(args: &Args, command: &dyn StoreCommand, writable: bool) -> Result<()> {
    let mut store = open_store(args)?;
    if !writable {
        store = store.read_only();
    }
    command
        .execute(args, &mut store)
        .await
        .map_err(|e| anyhow::anyhow!(e))
}

/// 按命令行选项打开配置存储
///
/// 严格模式下的加载失败在这里终止进程；库代码本身只返回错误。
fn open_store(args: &Args) -> Result<ConfigStore> {
    let config_path = args.get_config_path();

    match ConfigStore::open(&config_path, args.load_options()) {
        Ok(store) => Ok(store),
        Err(e) if args.strict && e.is_load_failure() => strict_exit(&config_path, &e),
        Err(e) => Err(e).with_context(|| format!("加载配置文件失败: {}", config_path.display())),
    }
}

/// 严格模式：打印诊断信息并以非零状态退出
fn strict_exit(config_path: &Path, err: &ConfigError) -> ! {
    eprintln!("ERROR: {err}");
    match err {
        ConfigError::FileNotFound { .. } => {
            eprintln!(
                "请创建配置文件 {}，或运行 'config-store init' 生成默认配置",
                config_path.display()
            );
        }
        ConfigError::Empty { .. } => {
            eprintln!("请检查配置文件内容是否完整");
        }
        _ => {}
    }
    std::process::exit(1);
}
