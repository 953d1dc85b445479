//! 配置文件格式
//!
//! 根据扩展名选择 TOML / YAML / JSON 的解析与序列化

use crate::config::types::{ConfigDocument, ConfigValue};
use crate::error::{ConfigError, ConfigResult};
use std::path::Path;

/// 支持的配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML（默认）
    Toml,
    /// YAML（需要 `yaml` 特性）
    Yaml,
    /// JSON
    Json,
}

impl ConfigFormat {
    /// 根据文件扩展名推断格式，未知扩展名按 TOML 处理
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }

    /// 格式名称
    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Json => "JSON",
        }
    }

    /// 当前构建是否能解析该格式
    pub fn is_available(&self) -> bool {
        match self {
            ConfigFormat::Yaml => cfg!(feature = "yaml"),
            ConfigFormat::Toml | ConfigFormat::Json => true,
        }
    }

    /// 当前构建是否能写回该格式
    pub fn can_persist(&self) -> bool {
        cfg!(feature = "persist") && self.is_available()
    }

    /// 将文本解析为通用值
    pub fn decode(&self, content: &str, path: &Path) -> ConfigResult<ConfigValue> {
        let parsed = match self {
            ConfigFormat::Toml => toml::from_str::<toml::Table>(content)
                .map_err(|e| e.to_string())
                .and_then(|table| toml_to_value(toml::Value::Table(table))),
            ConfigFormat::Json => {
                serde_json::from_str::<ConfigValue>(content).map_err(|e| e.to_string())
            }
            ConfigFormat::Yaml => decode_yaml(content)?,
        };

        parsed.map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            format: self.name(),
            message,
        })
    }

    /// 将文档序列化为文本
    ///
    /// 写回能力在调用时检查，而不是在构造时检查。
    pub fn encode(&self, document: &ConfigDocument) -> ConfigResult<String> {
        if !self.can_persist() {
            return Err(ConfigError::PersistenceUnavailable {
                format: self.name(),
            });
        }

        let rendered = match self {
            ConfigFormat::Toml => toml::to_string_pretty(document).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::to_string_pretty(document)
                .map(|mut text| {
                    text.push('\n');
                    text
                })
                .map_err(|e| e.to_string()),
            ConfigFormat::Yaml => encode_yaml(document)?,
        };

        rendered.map_err(|message| ConfigError::Serialize {
            format: self.name(),
            message,
        })
    }
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// TOML 值转换为通用值，日期时间按 RFC 3339 字符串保存
fn toml_to_value(value: toml::Value) -> Result<ConfigValue, String> {
    Ok(match value {
        toml::Value::String(text) => ConfigValue::String(text),
        toml::Value::Integer(int) => ConfigValue::from(int),
        toml::Value::Float(float) => serde_json::Number::from_f64(float)
            .map(ConfigValue::Number)
            .ok_or_else(|| format!("不支持非有限浮点数: {float}"))?,
        toml::Value::Boolean(flag) => ConfigValue::Bool(flag),
        toml::Value::Datetime(datetime) => ConfigValue::String(datetime.to_string()),
        toml::Value::Array(items) => ConfigValue::Array(
            items
                .into_iter()
                .map(toml_to_value)
                .collect::<Result<_, _>>()?,
        ),
        toml::Value::Table(table) => ConfigValue::Object(
            table
                .into_iter()
                .map(|(key, value)| toml_to_value(value).map(|value| (key, value)))
                .collect::<Result<_, _>>()?,
        ),
    })
}

#[cfg(feature = "yaml")]
fn decode_yaml(content: &str) -> ConfigResult<Result<ConfigValue, String>> {
    Ok(serde_yaml::from_str::<ConfigValue>(content).map_err(|e| e.to_string()))
}

#[cfg(not(feature = "yaml"))]
fn decode_yaml(_content: &str) -> ConfigResult<Result<ConfigValue, String>> {
    Err(ConfigError::FormatUnavailable { format: "YAML" })
}

#[cfg(feature = "yaml")]
fn encode_yaml(document: &ConfigDocument) -> ConfigResult<Result<String, String>> {
    Ok(serde_yaml::to_string(document).map_err(|e| e.to_string()))
}

#[cfg(not(feature = "yaml"))]
fn encode_yaml(_document: &ConfigDocument) -> ConfigResult<Result<String, String>> {
    Err(ConfigError::PersistenceUnavailable { format: "YAML" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("config.toml")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("config.YAML")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a/b/c.yml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("config.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("config")), ConfigFormat::Toml);
    }

    #[test]
    fn test_toml_decode_error_carries_parser_detail() {
        let path = PathBuf::from("broken.toml");
        let err = ConfigFormat::Toml
            .decode("[settings\nmax_iterations = ", &path)
            .unwrap_err();

        match err {
            ConfigError::Parse {
                path: p,
                format,
                message,
            } => {
                assert_eq!(p, path);
                assert_eq!(format, "TOML");
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_toml_encode_rejects_null() {
        let mut doc = ConfigDocument::new();
        doc.set("settings", "seed", ConfigValue::Null);

        let result = ConfigFormat::Toml.encode(&doc);
        if ConfigFormat::Toml.can_persist() {
            assert!(matches!(result, Err(ConfigError::Serialize { .. })));
        } else {
            assert!(matches!(result, Err(ConfigError::PersistenceUnavailable { .. })));
        }
    }

    #[cfg(feature = "persist")]
    #[test]
    fn test_toml_encode_nested_values() {
        let mut doc = ConfigDocument::new();
        doc.set("engine_parameters", "chamber_pressure", json!(2500000.0));
        doc.set("engine_parameters", "nozzle", json!({ "expansion_ratio": 40 }));
        doc.set("settings", "stages", json!([1, 2, 3]));

        let text = ConfigFormat::Toml.encode(&doc).unwrap();
        let value = ConfigFormat::Toml.decode(&text, Path::new("x.toml")).unwrap();
        let reparsed = ConfigDocument::from_value(value).unwrap();
        assert_eq!(reparsed, doc);
    }

    #[test]
    fn test_toml_datetime_decodes_as_string() {
        let value = ConfigFormat::Toml
            .decode(
                "[settings]\nstarted = 1979-05-27T07:32:00Z\nday = 1979-05-27\n",
                Path::new("config.toml"),
            )
            .unwrap();
        assert_eq!(
            value,
            json!({ "settings": { "started": "1979-05-27T07:32:00Z", "day": "1979-05-27" } })
        );
    }

    #[test]
    fn test_toml_non_finite_float_is_parse_error() {
        let err = ConfigFormat::Toml
            .decode("[settings]\nlimit = inf\n", Path::new("config.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref message, .. } if message.contains("inf")));
    }

    #[cfg(feature = "yaml")]
    #[test]
    fn test_yaml_decode_sections() {
        let value = ConfigFormat::Yaml
            .decode(
                "paths:\n  input_data: /data/in\nsettings:\n  debug_mode: true\n",
                Path::new("config.yaml"),
            )
            .unwrap();
        assert_eq!(
            value,
            json!({ "paths": { "input_data": "/data/in" }, "settings": { "debug_mode": true } })
        );
    }

    #[cfg(not(feature = "persist"))]
    #[test]
    fn test_encode_without_persist_capability() {
        let err = ConfigFormat::Json.encode(&ConfigDocument::new()).unwrap_err();
        assert!(matches!(err, ConfigError::PersistenceUnavailable { format: "JSON" }));
    }
}
