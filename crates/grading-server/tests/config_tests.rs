use grading_scenario::ScenarioStore;
use grading_server::{LogFormat, ServerConfig};

#[test]
fn test_load_config_file_with_data_path() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("scenarios.json");
    let config_path = dir.path().join("grading.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[server]
bind = "127.0.0.1:0"
log_format = "json"

[engine]
data_path = "{}"

[engine.default_ladder]
grades = ["Senior", "Base"]
base = "Base"
"#,
            data.display()
        ),
    )
    .unwrap();

    let config = ServerConfig::load(&config_path).unwrap();
    assert_eq!(config.server.log_format, LogFormat::Json);
    assert_eq!(config.engine.data_path.as_deref(), Some(data.as_path()));

    let store = ScenarioStore::from_config(config.engine).unwrap();
    assert!(store.is_empty());
    assert!(store.resolve_ladder(None).is_ok());
}

#[test]
fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = ServerConfig::load(dir.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn test_unknown_table_rejected() {
    assert!(ServerConfig::from_toml_str("[metrics]\nenabled = true\n").is_err());
}
