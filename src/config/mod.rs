//! 配置管理模块
//!
//! 提供配置文件加载、按节访问、内存修改、显式写回和热重载功能

pub mod diff;
pub mod format;
pub mod loader;
pub mod store;
pub mod types;
pub mod watcher;

// 重新导出主要类型
pub use diff::ConfigDiff;
pub use format::ConfigFormat;
pub use loader::{get_default_config_path, ConfigLoader, DocumentLoader};
pub use store::ConfigStore;
pub use types::{
    ConfigDocument, ConfigValue, LoadMode, LoadOptions, Section, DEFAULT_CONFIG_FILE,
    ENGINE_PARAMETERS_SECTION, PATHS_SECTION, RECOGNIZED_SECTIONS, SETTINGS_SECTION,
};
pub use watcher::{ConfigChangeEvent, ConfigWatcher};
