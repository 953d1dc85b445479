//! 配置差异计算
//!
//! 比较两个配置文档，供重载和热重载通知使用

use crate::config::types::{ConfigDocument, ConfigValue};
use std::fmt;

/// 配置差异类型
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigDiff {
    /// 配置节添加
    SectionAdded(String),
    /// 配置节移除
    SectionRemoved(String),
    /// 键添加
    KeyAdded {
        section: String,
        key: String,
        value: ConfigValue,
    },
    /// 键移除
    KeyRemoved { section: String, key: String },
    /// 键修改
    KeyModified {
        section: String,
        key: String,
        old: ConfigValue,
        new: ConfigValue,
    },
}

impl fmt::Display for ConfigDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigDiff::SectionAdded(section) => write!(f, "+ [{section}]"),
            ConfigDiff::SectionRemoved(section) => write!(f, "- [{section}]"),
            ConfigDiff::KeyAdded {
                section,
                key,
                value,
            } => write!(f, "+ {section}.{key} = {value}"),
            ConfigDiff::KeyRemoved { section, key } => write!(f, "- {section}.{key}"),
            ConfigDiff::KeyModified {
                section,
                key,
                old,
                new,
            } => write!(f, "~ {section}.{key}: {old} -> {new}"),
        }
    }
}

impl ConfigDocument {
    /// 计算从 `self` 到 `other` 的差异
    ///
    /// 新增的节只产生一条 `SectionAdded`，不再逐键展开。
    pub fn diff(&self, other: &ConfigDocument) -> Vec<ConfigDiff> {
        let mut diffs = Vec::new();

        // 检查新增和修改的节
        for (name, new_section) in other.iter() {
            let Some(old_section) = self.section(name) else {
                diffs.push(ConfigDiff::SectionAdded(name.clone()));
                continue;
            };

            for (key, new_value) in new_section {
                match old_section.get(key) {
                    Some(old_value) if old_value != new_value => {
                        diffs.push(ConfigDiff::KeyModified {
                            section: name.clone(),
                            key: key.clone(),
                            old: old_value.clone(),
                            new: new_value.clone(),
                        });
                    }
                    Some(_) => {}
                    None => diffs.push(ConfigDiff::KeyAdded {
                        section: name.clone(),
                        key: key.clone(),
                        value: new_value.clone(),
                    }),
                }
            }

            for key in old_section.keys() {
                if !new_section.contains_key(key) {
                    diffs.push(ConfigDiff::KeyRemoved {
                        section: name.clone(),
                        key: key.clone(),
                    });
                }
            }
        }

        // 检查删除的节
        for name in self.section_names() {
            if other.section(name).is_none() {
                diffs.push(ConfigDiff::SectionRemoved(name.to_string()));
            }
        }

        diffs
    }
}
