//! 配置存储集成测试
//!
//! 覆盖写入-加载往返、内存修改、显式保存与跨进程重新加载

use config_store::config::{ConfigFormat, ConfigStore, LoadOptions};
use config_store::error::ConfigError;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

const SAMPLE_TOML: &str = r#"
[paths]
input_data = "/data/experiment/input"
output_results = "/data/experiment/output"

[settings]
max_iterations = 1000
debug_mode = true
tolerance = 0.001
labels = ["baseline", "hot-fire"]

[engine_parameters]
chamber_pressure = 2500000.0

[engine_parameters.nozzle]
expansion_ratio = 40
"#;

const SAMPLE_YAML: &str = r#"
paths:
  input_data: /data/experiment/input
settings:
  max_iterations: 1000
  debug_mode: true
  seed: null
engine_parameters:
  chamber_pressure: 2500000.0
"#;

const SAMPLE_JSON: &str = r#"{
  "paths": { "input_data": "/data/experiment/input" },
  "settings": { "max_iterations": 1000, "debug_mode": true },
  "engine_parameters": { "chamber_pressure": 2500000.0 }
}"#;

/// 每个 (section, key) 都应原样读回
#[test]
fn test_round_trip_fidelity_all_formats() {
    let dir = TempDir::new().unwrap();

    for (file_name, content) in [
        ("config.toml", SAMPLE_TOML),
        ("config.yaml", SAMPLE_YAML),
        ("config.json", SAMPLE_JSON),
    ] {
        let path = dir.path().join(file_name);
        fs::write(&path, content).unwrap();

        let format = ConfigFormat::from_path(&path);
        let expected = format.decode(content, &path).unwrap();

        let store = ConfigStore::strict(&path).unwrap();
        for (section, entries) in expected.as_object().unwrap() {
            for (key, value) in entries.as_object().unwrap() {
                assert_eq!(
                    store.get(section, key).unwrap(),
                    value,
                    "{file_name}: [{section}].{key}"
                );
            }
        }
    }
}

#[test]
fn test_set_then_get_on_new_section() {
    let dir = TempDir::new().unwrap();
    let mut store = ConfigStore::lenient(dir.path().join("config.toml")).unwrap();

    let values = [
        json!("/tmp/run"),
        json!(7),
        json!(0.25),
        json!(false),
        json!(null),
        json!([1, 2, 3]),
        json!({ "a": { "b": 1 } }),
    ];

    for (index, value) in values.iter().enumerate() {
        let section = format!("section_{index}");
        store.set(section.as_str(), "value", value.clone());
        assert_eq!(store.get(&section, "value").unwrap(), value);
    }
}

#[test]
fn test_missing_section_and_key_errors() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, SAMPLE_TOML).unwrap();
    let store = ConfigStore::lenient(&path).unwrap();

    assert!(matches!(
        store.get("solver", "max_iterations"),
        Err(ConfigError::MissingSection { ref section }) if section == "solver"
    ));
    assert!(matches!(
        store.get("settings", "time_step"),
        Err(ConfigError::MissingKey { ref section, ref key }) if section == "settings" && key == "time_step"
    ));
}

#[test]
fn test_lenient_nonexistent_path() {
    let dir = TempDir::new().unwrap();
    let store = ConfigStore::lenient(dir.path().join("does-not-exist.yaml")).unwrap();

    assert!(store.document().is_empty());
    assert!(matches!(
        store.get("paths", "input_data"),
        Err(ConfigError::MissingSection { .. })
    ));
}

#[test]
fn test_lenient_malformed_content_is_catchable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    fs::write(&path, "paths: [unclosed\n  - nope: :").unwrap();

    let err = ConfigStore::lenient(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { format: "YAML", .. }));
}

#[test]
fn test_strict_load_failures_are_errors() {
    let dir = TempDir::new().unwrap();

    let missing = ConfigStore::strict(dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(missing, ConfigError::FileNotFound { .. }));

    let empty_path = dir.path().join("empty.yaml");
    fs::write(&empty_path, "").unwrap();
    let empty = ConfigStore::strict(&empty_path).unwrap_err();
    assert!(matches!(empty, ConfigError::Empty { .. }));

    let invalid_path = dir.path().join("invalid.json");
    fs::write(&invalid_path, "{ \"paths\": ").unwrap();
    let invalid = ConfigStore::strict(&invalid_path).unwrap_err();
    assert!(matches!(invalid, ConfigError::Parse { format: "JSON", .. }));

    for err in [missing, empty, invalid] {
        assert!(err.is_load_failure());
    }
}

/// 保存后重新打开应保留字符串、整数、浮点数与布尔值
#[test]
fn test_save_survives_restart() {
    let dir = TempDir::new().unwrap();

    for file_name in ["config.toml", "config.yaml", "config.json"] {
        let path = dir.path().join(file_name);

        let mut store = ConfigStore::lenient(&path).unwrap();
        store.set("paths", "output_results", "/results/run-42");
        store.set("settings", "max_iterations", 2000);
        store.set("engine_parameters", "chamber_pressure", 3.75e6);
        store.set("settings", "debug_mode", true);
        store.save().unwrap();
        drop(store);

        let reloaded = ConfigStore::strict(&path).unwrap();
        assert_eq!(
            reloaded.get_str("paths", "output_results").unwrap(),
            "/results/run-42",
            "{file_name}"
        );
        assert_eq!(reloaded.get_i64("settings", "max_iterations").unwrap(), 2000);
        assert_eq!(
            reloaded.get_f64("engine_parameters", "chamber_pressure").unwrap(),
            3.75e6
        );
        assert!(reloaded.get_bool("settings", "debug_mode").unwrap());
    }
}

#[test]
fn test_experiment_update_scenario() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");

    let mut store = ConfigStore::lenient(&path).unwrap();
    assert!(store.document().is_empty());

    store.set("settings", "max_iterations", 2000);
    store.set("paths", "input_data", "/new/experiment/data");
    store.save().unwrap();

    let reloaded = ConfigStore::open(&path, LoadOptions::lenient()).unwrap();
    assert_eq!(reloaded.get("settings", "max_iterations").unwrap(), &json!(2000));
    assert_eq!(
        reloaded.get("paths", "input_data").unwrap(),
        &json!("/new/experiment/data")
    );
}

#[test]
fn test_set_and_save_then_immediate_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, SAMPLE_TOML).unwrap();

    let mut store = ConfigStore::lenient(&path).unwrap();
    store.set_and_save("settings", "tolerance", 0.0001).unwrap();
    assert!(!store.is_dirty());

    let reloaded = ConfigStore::strict(&path).unwrap();
    assert_eq!(reloaded.get_f64("settings", "tolerance").unwrap(), 0.0001);
    // 其他值随整份文档一起写回
    assert_eq!(
        reloaded.get("engine_parameters", "nozzle").unwrap(),
        &json!({ "expansion_ratio": 40 })
    );
}

#[test]
fn test_toml_cannot_store_null() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    let mut store = ConfigStore::lenient(&path).unwrap();
    store.set("settings", "seed", json!(null));

    let err = store.save().unwrap_err();
    assert!(matches!(err, ConfigError::Serialize { format: "TOML", .. }));
    // 内存中的值保留
    assert!(store.contains("settings", "seed"));
    assert!(!path.exists());
}

#[test]
fn test_env_substitution_on_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "[paths]\ninput_data = \"${CONFIG_STORE_IT_ROOT}/input\"\n",
    )
    .unwrap();

    std::env::set_var("CONFIG_STORE_IT_ROOT", "/srv/lab");
    let store = ConfigStore::open(&path, LoadOptions::strict().with_env_substitution(true)).unwrap();
    std::env::remove_var("CONFIG_STORE_IT_ROOT");

    assert_eq!(store.get_str("paths", "input_data").unwrap(), "/srv/lab/input");

    // 未启用替换时保持原样
    let raw = ConfigStore::strict(&path).unwrap();
    assert_eq!(
        raw.get_str("paths", "input_data").unwrap(),
        "${CONFIG_STORE_IT_ROOT}/input"
    );
}

/// 日期时间读取为字符串，保存后仍是标量而不是子表
#[test]
fn test_toml_datetime_survives_save() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[settings]\nstarted = 1979-05-27T07:32:00Z\n").unwrap();

    let mut store = ConfigStore::strict(&path).unwrap();
    assert_eq!(
        store.get_str("settings", "started").unwrap(),
        "1979-05-27T07:32:00Z"
    );

    store.save().unwrap();

    let written = fs::read_to_string(&path).unwrap();
    assert!(!written.contains("[settings.started]"), "{written}");
    assert!(!written.contains("$__toml_private_datetime"), "{written}");

    let reloaded = ConfigStore::strict(&path).unwrap();
    assert_eq!(
        reloaded.get("settings", "started").unwrap(),
        &json!("1979-05-27T07:32:00Z")
    );
}
