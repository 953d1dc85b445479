//! 配置数据结构定义
//!
//! 定义配置文档、加载策略以及节/键访问逻辑

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 配置值：字符串、数字、布尔、null、嵌套映射或序列
pub type ConfigValue = serde_json::Value;

/// 单个配置节：键到值的映射
pub type Section = BTreeMap<String, ConfigValue>;

/// 路径配置节
pub const PATHS_SECTION: &str = "paths";
/// 运行参数配置节
pub const SETTINGS_SECTION: &str = "settings";
/// 引擎参数配置节
pub const ENGINE_PARAMETERS_SECTION: &str = "engine_parameters";

/// 默认识别的配置节
pub const RECOGNIZED_SECTIONS: &[&str] =
    &[PATHS_SECTION, SETTINGS_SECTION, ENGINE_PARAMETERS_SECTION];

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// 加载策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// 文件缺失或为空时告警并使用空配置
    #[default]
    Lenient,
    /// 任何加载失败都返回错误，由入口决定是否终止进程
    Strict,
}

impl std::fmt::Display for LoadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadMode::Lenient => write!(f, "lenient"),
            LoadMode::Strict => write!(f, "strict"),
        }
    }
}

/// 加载选项
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// 加载策略
    pub mode: LoadMode,
    /// 是否启用 `${VAR}` 环境变量替换
    pub env_substitution: bool,
}

impl LoadOptions {
    /// 宽松模式
    pub fn lenient() -> Self {
        Self {
            mode: LoadMode::Lenient,
            env_substitution: false,
        }
    }

    /// 严格模式
    pub fn strict() -> Self {
        Self {
            mode: LoadMode::Strict,
            env_substitution: false,
        }
    }

    /// 设置是否启用环境变量替换
    pub fn with_env_substitution(mut self, enabled: bool) -> Self {
        self.env_substitution = enabled;
        self
    }
}

/// 配置文档：节名到键值映射的映射
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigDocument {
    sections: BTreeMap<String, Section>,
}

impl ConfigDocument {
    /// 创建空文档
    pub fn new() -> Self {
        Self::default()
    }

    /// 从通用值构建文档
    ///
    /// 顶层必须是映射，且每个顶层值也必须是映射；`null` 视为空文档。
    pub fn from_value(value: ConfigValue) -> Result<Self, String> {
        let top = match value {
            ConfigValue::Null => return Ok(Self::new()),
            ConfigValue::Object(map) => map,
            other => {
                return Err(format!(
                    "顶层必须是映射，实际为 {}",
                    value_kind(&other)
                ))
            }
        };

        let mut sections = BTreeMap::new();
        for (name, body) in top {
            match body {
                ConfigValue::Object(entries) => {
                    sections.insert(name, entries.into_iter().collect::<Section>());
                }
                // 空节（如 YAML 中只写了 `paths:`）
                ConfigValue::Null => {
                    sections.insert(name, Section::new());
                }
                other => {
                    return Err(format!(
                        "配置节 [{}] 必须是映射，实际为 {}",
                        name,
                        value_kind(&other)
                    ))
                }
            }
        }

        Ok(Self { sections })
    }

    /// 文档是否为空
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// 节数量
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// 获取配置节
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// 所有节名（有序）
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// 遍历所有节
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Section)> {
        self.sections.iter()
    }

    /// 读取 `document[section][key]`，节或键缺失时返回错误
    pub fn get(&self, section: &str, key: &str) -> ConfigResult<&ConfigValue> {
        let entries = self
            .sections
            .get(section)
            .ok_or_else(|| ConfigError::MissingSection {
                section: section.to_string(),
            })?;

        entries.get(key).ok_or_else(|| ConfigError::MissingKey {
            section: section.to_string(),
            key: key.to_string(),
        })
    }

    /// 写入 `document[section][key] = value`
    ///
    /// 与 `get` 不对称：写入时节不存在会被自动创建，而读取时节不存在是错误。
    /// 这是约定的行为，不要改成对称检查。
    pub fn set(&mut self, section: impl Into<String>, key: impl Into<String>, value: ConfigValue) {
        self.sections
            .entry(section.into())
            .or_default()
            .insert(key.into(), value);
    }

    /// 判断某个键是否存在
    pub fn contains(&self, section: &str, key: &str) -> bool {
        self.sections
            .get(section)
            .is_some_and(|entries| entries.contains_key(key))
    }

    /// 检查顶层节是否都在允许的集合中
    pub fn validate_sections(&self, allowed: &[&str]) -> ConfigResult<()> {
        match self
            .section_names()
            .find(|name| !allowed.contains(name))
        {
            Some(unknown) => Err(ConfigError::UnknownSection {
                section: unknown.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// 值类型的可读名称
pub fn value_kind(value: &ConfigValue) -> &'static str {
    match value {
        ConfigValue::Null => "null",
        ConfigValue::Bool(_) => "布尔",
        ConfigValue::Number(_) => "数字",
        ConfigValue::String(_) => "字符串",
        ConfigValue::Array(_) => "序列",
        ConfigValue::Object(_) => "映射",
    }
}
