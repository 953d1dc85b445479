//! 配置文件监控模块
//!
//! 提供配置文件的实时监控和热重载功能

use crate::config::diff::ConfigDiff;
use crate::config::loader::{ConfigLoader, DocumentLoader};
use crate::config::store::ConfigStore;
use crate::config::types::{ConfigDocument, LoadMode, LoadOptions};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

/// 配置变更事件
#[derive(Debug, Clone)]
pub struct ConfigChangeEvent {
    /// 配置文件路径
    pub config_path: PathBuf,
    /// 新配置文档
    pub document: ConfigDocument,
    /// 相对上一版本的差异
    pub diffs: Vec<ConfigDiff>,
    /// 变更时间
    pub timestamp: Instant,
    /// 配置版本号
    pub version: u64,
}

/// 配置文件监控器
pub struct ConfigWatcher {
    /// 配置文件路径（绝对路径）
    config_path: PathBuf,
    /// 文件系统监控器
    watcher: Option<RecommendedWatcher>,
    /// 配置加载器（始终为严格模式）
    loader: DocumentLoader,
    /// 事件发送器
    event_sender: broadcast::Sender<ConfigChangeEvent>,
    /// 防抖动延迟
    debounce_delay: Duration,
    /// 最近一次成功加载的文档
    baseline: ConfigDocument,
}

impl ConfigWatcher {
    /// 创建新的配置监控器
    ///
    /// # 参数
    /// * `config_path` - 配置文件路径
    /// * `debounce_delay` - 防抖动延迟时间
    /// * `baseline` - 当前文档，用于计算第一次变更的差异
    ///
    /// # 返回
    /// * `Result<(Self, broadcast::Receiver<ConfigChangeEvent>)>` - 监控器和事件接收器
    pub fn new<P: AsRef<Path>>(
        config_path: P,
        debounce_delay: Duration,
        baseline: ConfigDocument,
    ) -> Result<(Self, broadcast::Receiver<ConfigChangeEvent>)> {
        Self::with_options(config_path, debounce_delay, baseline, LoadOptions::strict())
    }

    /// 为已打开的配置存储创建监控器，沿用其环境变量替换设置
    pub fn for_store(
        store: &ConfigStore,
        debounce_delay: Duration,
    ) -> Result<(Self, broadcast::Receiver<ConfigChangeEvent>)> {
        Self::with_options(
            store.path(),
            debounce_delay,
            store.document().clone(),
            store.options().clone(),
        )
    }

    fn with_options<P: AsRef<Path>>(
        config_path: P,
        debounce_delay: Duration,
        baseline: ConfigDocument,
        options: LoadOptions,
    ) -> Result<(Self, broadcast::Receiver<ConfigChangeEvent>)> {
        let config_path = config_path.as_ref();

        // 验证配置文件路径
        Self::validate_config_path(config_path)?;

        // 事件中的路径是绝对路径
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("解析配置文件路径失败: {}", config_path.display()))?;

        // 中途写入的空文件或半截文件不能覆盖上一份有效配置
        let loader = DocumentLoader::new(LoadOptions {
            mode: LoadMode::Strict,
            ..options
        });
        let (event_sender, event_receiver) = broadcast::channel(32);

        let watcher = Self {
            config_path,
            watcher: None,
            loader,
            event_sender,
            debounce_delay,
            baseline,
        };

        Ok((watcher, event_receiver))
    }

    /// 验证配置文件路径
    fn validate_config_path(path: &Path) -> Result<()> {
        // 检查文件是否存在
        if !path.exists() {
            return Err(anyhow::anyhow!("配置文件不存在: {}", path.display()));
        }

        // 检查是否为文件
        if !path.is_file() {
            return Err(anyhow::anyhow!("路径不是文件: {}", path.display()));
        }

        // 检查文件权限（读取权限）
        match std::fs::File::open(path) {
            Ok(_) => {
                debug!("配置文件权限验证通过: {}", path.display());
                Ok(())
            }
            Err(e) => Err(anyhow::anyhow!(
                "无法读取配置文件 {}: {}",
                path.display(),
                e
            )),
        }
    }

    /// 启动配置文件监控
    ///
    /// # 返回
    /// * `Result<()>` - 启动结果
    pub fn start(&mut self) -> Result<()> {
        info!("启动配置文件监控: {}", self.config_path.display());

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(res);
            },
            notify::Config::default().with_poll_interval(Duration::from_secs(1)),
        )
        .context("创建文件监控器失败")?;

        // 监控配置文件所在目录，编辑器常以替换文件的方式保存
        let watch_path = self.config_path.parent().unwrap_or(&self.config_path);
        watcher
            .watch(watch_path, RecursiveMode::NonRecursive)
            .with_context(|| format!("监控目录失败: {}", watch_path.display()))?;

        self.watcher = Some(watcher);

        // 启动事件处理任务
        let config_path = self.config_path.clone();
        let event_sender = self.event_sender.clone();
        let loader = self.loader.clone();
        let debounce_delay = self.debounce_delay;
        let baseline = self.baseline.clone();

        tokio::spawn(async move {
            Self::handle_file_events(rx, config_path, event_sender, loader, debounce_delay, baseline)
                .await;
        });

        info!("配置文件监控已启动");
        Ok(())
    }

    /// 处理文件系统事件
    async fn handle_file_events(
        mut rx: mpsc::UnboundedReceiver<notify::Result<Event>>,
        config_path: PathBuf,
        event_sender: broadcast::Sender<ConfigChangeEvent>,
        loader: DocumentLoader,
        debounce_delay: Duration,
        mut baseline: ConfigDocument,
    ) {
        let mut version = 1u64;

        // 监控器被释放后发送端关闭，循环自然结束
        while let Some(res) = rx.recv().await {
            let event = match res {
                Ok(event) => event,
                Err(e) => {
                    error!("文件监控事件错误: {}", e);
                    continue;
                }
            };

            // 检查是否是我们关心的文件
            if !Self::is_target_file_event(&event, &config_path) {
                continue;
            }

            debug!("检测到配置文件变更事件: {:?}", event);

            // 延迟处理，确保文件写入完成，并合并期间的重复事件
            tokio::time::sleep(debounce_delay).await;
            while rx.try_recv().is_ok() {
                debug!("跳过重复事件（防抖动）");
            }

            match Self::reload_document(&loader, &config_path, &baseline, version) {
                Ok(Some(change_event)) => {
                    info!(
                        "配置重载成功，版本: {}，差异数: {}",
                        version,
                        change_event.diffs.len()
                    );
                    baseline = change_event.document.clone();
                    version += 1;

                    if let Err(e) = event_sender.send(change_event) {
                        warn!("发送配置变更事件失败: {}", e);
                    }
                }
                Ok(None) => {
                    debug!("配置无实质性变更，跳过通知");
                }
                Err(e) => {
                    error!("配置重载失败: {:#}", e);
                }
            }
        }

        debug!("配置文件事件处理任务结束");
    }

    /// 检查是否是目标文件的事件
    fn is_target_file_event(event: &Event, target_path: &Path) -> bool {
        match &event.kind {
            EventKind::Modify(_) | EventKind::Create(_) => {
                event.paths.iter().any(|path| path == target_path)
            }
            _ => false,
        }
    }

    /// 重新加载配置，内容未变化时返回 `None`
    fn reload_document(
        loader: &DocumentLoader,
        config_path: &Path,
        baseline: &ConfigDocument,
        version: u64,
    ) -> Result<Option<ConfigChangeEvent>> {
        debug!("重新加载配置文件: {}", config_path.display());

        let document = loader
            .load_from_file(config_path)
            .context("重新加载配置失败")?;

        let diffs = baseline.diff(&document);
        if diffs.is_empty() {
            return Ok(None);
        }

        Ok(Some(ConfigChangeEvent {
            config_path: config_path.to_path_buf(),
            document,
            diffs,
            timestamp: Instant::now(),
            version,
        }))
    }

    /// 被监控的配置文件路径
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 是否正在监控
    pub fn is_running(&self) -> bool {
        self.watcher.is_some()
    }

    /// 停止监控
    pub fn stop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            drop(watcher);
            info!("配置文件监控已停止");
        }
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}
