//! 配置存储
//!
//! 配置文件在内存中的唯一权威视图：按节读取、内存修改、显式写回。
//! 所有操作都是同步的，内部不加锁，修改操作通过 `&mut self` 保证单一所有者。

use crate::config::diff::ConfigDiff;
use crate::config::format::ConfigFormat;
use crate::config::loader::{ConfigLoader, DocumentLoader};
use crate::config::types::{
    value_kind, ConfigDocument, ConfigValue, LoadMode, LoadOptions, ENGINE_PARAMETERS_SECTION,
    PATHS_SECTION, SETTINGS_SECTION,
};
use crate::error::{ConfigError, ConfigResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 配置存储
#[derive(Debug)]
pub struct ConfigStore {
    /// 配置文件路径
    path: PathBuf,
    /// 文件格式（由扩展名决定）
    format: ConfigFormat,
    /// 加载选项
    options: LoadOptions,
    /// 配置文档
    document: ConfigDocument,
    /// 是否有未保存的修改
    dirty: bool,
    /// 最近一次加载时间
    loaded_at: DateTime<Utc>,
    /// 是否允许写回
    writable: bool,
}

impl ConfigStore {
    /// 打开配置文件
    ///
    /// # 参数
    /// * `path` - 配置文件路径，相对路径按当前工作目录解析
    /// * `options` - 加载选项
    ///
    /// # 返回
    /// * `ConfigResult<Self>` - 配置存储或加载错误
    ///
    /// 宽松模式下文件缺失或为空只会告警并得到空文档；严格模式下返回错误。
    /// 内容格式错误在两种模式下都返回 [`ConfigError::Parse`]。
    pub fn open<P: AsRef<Path>>(path: P, options: LoadOptions) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let document = DocumentLoader::new(options.clone()).load_from_file(&path)?;

        Ok(Self {
            format: ConfigFormat::from_path(&path),
            path,
            options,
            document,
            dirty: false,
            loaded_at: Utc::now(),
            writable: true,
        })
    }

    /// 以宽松模式打开
    pub fn lenient<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        Self::open(path, LoadOptions::lenient())
    }

    /// 以严格模式打开
    pub fn strict<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        Self::open(path, LoadOptions::strict())
    }

    /// 创建绑定到路径的空存储，不读取文件
    pub fn in_memory<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            format: ConfigFormat::from_path(&path),
            path,
            options: LoadOptions::lenient(),
            document: ConfigDocument::new(),
            dirty: false,
            loaded_at: Utc::now(),
            writable: true,
        }
    }

    /// 关闭写回能力
    ///
    /// 之后的 `save` / `save_as` / `set_and_save` 返回
    /// [`ConfigError::PersistenceUnavailable`]，读取和内存修改不受影响。
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// 读取 `[section].key`
    ///
    /// 节不存在返回 [`ConfigError::MissingSection`]，键不存在返回
    /// [`ConfigError::MissingKey`]，不提供默认值。
    pub fn get(&self, section: &str, key: &str) -> ConfigResult<&ConfigValue> {
        self.document.get(section, key)
    }

    /// 读取并反序列化为指定类型
    pub fn get_as<T: DeserializeOwned>(&self, section: &str, key: &str) -> ConfigResult<T> {
        let value = self.get(section, key)?;
        serde_json::from_value(value.clone()).map_err(|e| {
            debug!("[{}].{} 反序列化失败: {}", section, key, e);
            ConfigError::TypeMismatch {
                section: section.to_string(),
                key: key.to_string(),
                expected: std::any::type_name::<T>(),
            }
        })
    }

    /// 读取字符串值
    pub fn get_str(&self, section: &str, key: &str) -> ConfigResult<&str> {
        let value = self.get(section, key)?;
        value
            .as_str()
            .ok_or_else(|| type_mismatch(section, key, "字符串", value))
    }

    /// 读取整数值
    pub fn get_i64(&self, section: &str, key: &str) -> ConfigResult<i64> {
        let value = self.get(section, key)?;
        value
            .as_i64()
            .ok_or_else(|| type_mismatch(section, key, "整数", value))
    }

    /// 读取浮点值，整数也会被接受
    pub fn get_f64(&self, section: &str, key: &str) -> ConfigResult<f64> {
        let value = self.get(section, key)?;
        value
            .as_f64()
            .ok_or_else(|| type_mismatch(section, key, "浮点数", value))
    }

    /// 读取布尔值
    pub fn get_bool(&self, section: &str, key: &str) -> ConfigResult<bool> {
        let value = self.get(section, key)?;
        value
            .as_bool()
            .ok_or_else(|| type_mismatch(section, key, "布尔", value))
    }

    /// 读取 `[paths]` 中的路径
    pub fn get_path(&self, key: &str) -> ConfigResult<&ConfigValue> {
        self.get(PATHS_SECTION, key)
    }

    /// 读取 `[settings]` 中的运行参数
    pub fn get_setting(&self, key: &str) -> ConfigResult<&ConfigValue> {
        self.get(SETTINGS_SECTION, key)
    }

    /// 读取 `[engine_parameters]` 中的引擎参数
    pub fn get_engine_param(&self, key: &str) -> ConfigResult<&ConfigValue> {
        self.get(ENGINE_PARAMETERS_SECTION, key)
    }

    /// 在内存中设置 `[section].key = value`，不写回文件
    ///
    /// 节不存在时会被创建，与 `get` 的严格检查刻意不对称。
    pub fn set<V: Into<ConfigValue>>(
        &mut self,
        section: impl Into<String>,
        key: impl Into<String>,
        value: V,
    ) {
        let (section, key, value) = (section.into(), key.into(), value.into());
        debug!("设置配置 [{}].{} = {}", section, key, value);
        self.document.set(section, key, value);
        self.dirty = true;
    }

    /// 将整个文档写回配置文件，完整覆盖原内容
    ///
    /// 不是原子写入：写入中途失败可能留下不完整的文件。
    pub fn save(&mut self) -> ConfigResult<()> {
        self.ensure_writable(self.format)?;
        write_document(&self.document, &self.path, self.format)?;
        self.dirty = false;
        info!("配置已保存到: {}", self.path.display());
        Ok(())
    }

    /// 将文档写入另一个路径，格式由目标路径扩展名决定
    ///
    /// 存储仍绑定原路径，修改标记不变。
    pub fn save_as<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path);
        self.ensure_writable(format)?;
        write_document(&self.document, path, format)?;
        info!("配置已另存为: {}", path.display());
        Ok(())
    }

    /// 设置并立即保存
    ///
    /// 保存失败时内存中的修改不会回滚。
    pub fn set_and_save<V: Into<ConfigValue>>(
        &mut self,
        section: impl Into<String>,
        key: impl Into<String>,
        value: V,
    ) -> ConfigResult<()> {
        let (section, key, value) = (section.into(), key.into(), value.into());
        let rendered = value.to_string();
        self.set(section.clone(), key.clone(), value);
        self.save()?;
        info!(
            "已更新 {}.{} = {} 并保存到 {}",
            section,
            key,
            rendered,
            self.path.display()
        );
        Ok(())
    }

    /// 从文件重新加载，丢弃未保存的修改
    ///
    /// # 返回
    /// * `ConfigResult<Vec<ConfigDiff>>` - 相对于重载前内存文档的差异
    pub fn reload(&mut self) -> ConfigResult<Vec<ConfigDiff>> {
        let document = DocumentLoader::new(self.options.clone()).load_from_file(&self.path)?;
        Ok(self.replace_document(document))
    }

    /// 用外部加载的文档（例如热重载事件）替换内存文档
    pub fn replace_document(&mut self, document: ConfigDocument) -> Vec<ConfigDiff> {
        let diffs = self.document.diff(&document);
        self.document = document;
        self.dirty = false;
        self.loaded_at = Utc::now();
        debug!("配置文档已替换，差异数: {}", diffs.len());
        diffs
    }

    /// 检查顶层节是否都在允许集合中
    pub fn validate_sections(&self, allowed: &[&str]) -> ConfigResult<()> {
        self.document.validate_sections(allowed)
    }

    /// 配置文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 文件格式
    pub fn format(&self) -> ConfigFormat {
        self.format
    }

    /// 加载策略
    pub fn mode(&self) -> LoadMode {
        self.options.mode
    }

    /// 加载选项
    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// 内存中的配置文档
    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    /// 所有节名
    pub fn sections(&self) -> Vec<&str> {
        self.document.section_names().collect()
    }

    /// 键是否存在
    pub fn contains(&self, section: &str, key: &str) -> bool {
        self.document.contains(section, key)
    }

    /// 是否允许写回
    pub fn is_writable(&self) -> bool {
        self.writable && self.format.can_persist()
    }

    /// 是否有未保存的修改
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 最近一次加载时间
    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    fn ensure_writable(&self, format: ConfigFormat) -> ConfigResult<()> {
        if self.writable {
            Ok(())
        } else {
            Err(ConfigError::PersistenceUnavailable {
                format: format.name(),
            })
        }
    }
}

fn type_mismatch(
    section: &str,
    key: &str,
    expected: &'static str,
    actual: &ConfigValue,
) -> ConfigError {
    debug!("[{}].{} 实际类型为 {}", section, key, value_kind(actual));
    ConfigError::TypeMismatch {
        section: section.to_string(),
        key: key.to_string(),
        expected,
    }
}

fn write_document(document: &ConfigDocument, path: &Path, format: ConfigFormat) -> ConfigResult<()> {
    let content = format.encode(document)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}
