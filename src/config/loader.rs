//! 配置加载器实现
//!
//! 提供多格式配置文件解析、宽松/严格加载策略、环境变量替换和错误处理功能

use crate::config::format::ConfigFormat;
use crate::config::types::{ConfigDocument, LoadMode, LoadOptions, DEFAULT_CONFIG_FILE};
use crate::error::{ConfigError, ConfigResult};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 配置加载器trait，定义配置加载接口
pub trait ConfigLoader: Send + Sync {
    /// 从文件加载配置
    ///
    /// # 参数
    /// * `path` - 配置文件路径
    ///
    /// # 返回
    /// * `ConfigResult<ConfigDocument>` - 加载的配置文档或错误
    fn load_from_file(&self, path: &Path) -> ConfigResult<ConfigDocument>;

    /// 从字符串加载配置
    ///
    /// # 参数
    /// * `content` - 配置文件内容
    /// * `format` - 内容格式
    ///
    /// # 返回
    /// * `ConfigResult<ConfigDocument>` - 加载的配置文档或错误
    fn load_from_string(&self, content: &str, format: ConfigFormat)
        -> ConfigResult<ConfigDocument>;
}

/// 文档加载器实现
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader {
    /// 加载选项
    options: LoadOptions,
}

impl DocumentLoader {
    /// 创建新的文档加载器
    ///
    /// # 参数
    /// * `options` - 加载选项（策略与环境变量替换）
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    /// 替换字符串中的环境变量
    ///
    /// # 参数
    /// * `content` - 要处理的字符串
    ///
    /// # 返回
    /// * `ConfigResult<String>` - 替换后的字符串或错误
    fn substitute_env_vars(&self, content: &str) -> ConfigResult<String> {
        if !self.options.env_substitution {
            return Ok(content.to_string());
        }

        // 匹配 ${VAR_NAME} 格式的环境变量
        let env_var_regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").map_err(|e| {
            ConfigError::Parse {
                path: PathBuf::new(),
                format: "env",
                message: format!("正则表达式错误: {}", e),
            }
        })?;

        let mut result = content.to_string();

        for captures in env_var_regex.captures_iter(content) {
            let full_match = &captures[0];
            let var_name = &captures[1];

            match std::env::var(var_name) {
                Ok(value) => {
                    result = result.replace(full_match, &value);
                }
                Err(_) => {
                    return Err(ConfigError::EnvVar {
                        var: var_name.to_string(),
                    });
                }
            }
        }

        Ok(result)
    }

    /// 解析配置内容
    fn parse_document(
        &self,
        content: &str,
        format: ConfigFormat,
        path: &Path,
    ) -> ConfigResult<ConfigDocument> {
        let processed_content = self.substitute_env_vars(content)?;

        if processed_content.trim().is_empty() {
            return self.empty_document(path);
        }

        let value = format.decode(&processed_content, path)?;
        let document = ConfigDocument::from_value(value).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            format: format.name(),
            message,
        })?;

        if document.is_empty() {
            return self.empty_document(path);
        }

        Ok(document)
    }

    /// 内容为空时按策略处理
    fn empty_document(&self, path: &Path) -> ConfigResult<ConfigDocument> {
        match self.options.mode {
            LoadMode::Lenient => {
                warn!("配置文件为空: {}，使用空配置", path.display());
                Ok(ConfigDocument::new())
            }
            LoadMode::Strict => Err(ConfigError::Empty {
                path: path.to_path_buf(),
            }),
        }
    }
}

impl ConfigLoader for DocumentLoader {
    fn load_from_file(&self, path: &Path) -> ConfigResult<ConfigDocument> {
        // 检查文件是否存在
        if !path.exists() {
            return match self.options.mode {
                LoadMode::Lenient => {
                    warn!("配置文件不存在: {}，使用空配置", path.display());
                    Ok(ConfigDocument::new())
                }
                LoadMode::Strict => Err(ConfigError::FileNotFound {
                    path: path.to_path_buf(),
                }),
            };
        }

        // 读取文件内容
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let format = ConfigFormat::from_path(path);
        let document = self.parse_document(&content, format, path)?;

        info!(
            "成功加载配置文件: {} ({}, {} 个配置节)",
            path.display(),
            format,
            document.len()
        );
        debug!("配置内容: {:?}", document);

        Ok(document)
    }

    fn load_from_string(
        &self,
        content: &str,
        format: ConfigFormat,
    ) -> ConfigResult<ConfigDocument> {
        let document = self.parse_document(content, format, Path::new("<string>"))?;

        debug!("成功解析配置字符串");

        Ok(document)
    }
}

/// 获取默认配置文件路径
///
/// 默认是工作目录下的 `config.toml`。只有工作目录中没有该文件、而用户配置目录
/// 下已经存在 `config-store/config.toml` 时才使用后者。
pub fn get_default_config_path() -> PathBuf {
    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return local;
    }

    dirs::config_dir()
        .map(|config_dir| config_dir.join(crate::APP_NAME).join(DEFAULT_CONFIG_FILE))
        .filter(|user_config| user_config.is_file())
        .unwrap_or(local)
}
