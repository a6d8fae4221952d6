use std::{env, fs};

use gameshelf_config::AppConfig;
use gameshelf_config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("gameshelf.toml");

    let toml_content = r#"
[credentials]
issuer_url = "https://id.example.com/oauth/token"
client_id = "gameshelf"
client_secret = "s3cret"

[bootstrap]
network_retry_secs = 15
cache_retry_secs = 2

[jobs]
workers = 4
capacity = 16

[logging]
level = "debug"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses, missing keys fall back to defaults
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.jobs.workers, 4);
    assert_eq!(cfg.jobs.capacity, 16);
    assert_eq!(cfg.jobs.max_retries, 3);
    assert_eq!(cfg.bootstrap.network_retry_secs, 15);
    assert_eq!(cfg.bootstrap.persist_retry_secs, 3);
    assert_eq!(cfg.credentials.client_id, "gameshelf");
    assert_eq!(cfg.credentials.cache_key, "gameshelf:credential");
    assert_eq!(cfg.logging.level, "debug");

    // 2) Env override should win over file
    unsafe {
        env::set_var("GAMESHELF__JOBS__WORKERS", "9");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.jobs.workers, 9);
    unsafe {
        env::remove_var("GAMESHELF__JOBS__WORKERS");
    }

    // 3) Invalid config is rejected after merging
    let invalid_path = dir.path().join("invalid.toml");
    let invalid_toml = r#"
[jobs]
capacity = 0
"#;
    fs::write(&invalid_path, invalid_toml).expect("write invalid toml");
    let err = load_config(invalid_path.to_str()).expect_err("expected validation error");
    assert!(err.to_string().contains("jobs.capacity"));

    // 4) A missing file is not an error; defaults apply
    let missing = dir.path().join("missing.toml");
    let cfg_default = load_config(missing.to_str()).expect("defaults should load");
    assert_eq!(cfg_default.jobs.workers, 3);
}

#[test]
fn default_config_serializes_to_loadable_toml() {
    let rendered = toml::to_string(&AppConfig::default()).expect("serialize defaults");
    let parsed: AppConfig = toml::from_str(&rendered).expect("parse rendered defaults");
    assert_eq!(parsed.jobs.capacity, 100);
    assert_eq!(parsed.refresh.interval_secs, 240);
    assert!(parsed.validate().is_ok());
}
