//! Layered configuration: file values overridden by `MULTIBEACON__*` variables.

use multibeacon_core::{config::AppConfig, upstream::DispatchMode};
use serial_test::serial;
use std::path::PathBuf;

const TEST_CONFIG: &str = r#"
[dispatch]
mode = "sequential"
max_parallel = 2

[[upstreams.providers]]
name = "lighthouse"
address = "http://localhost:5052"

[logging]
format = "json"
"#;

struct TempConfig {
    path: PathBuf,
}

impl TempConfig {
    fn new(name: &str, content: &str) -> Self {
        let path = std::env::temp_dir()
            .join(format!("multibeacon-{name}-{}.toml", std::process::id()));
        std::fs::write(&path, content).unwrap();
        Self { path }
    }

    fn path(&self) -> &str {
        self.path.to_str().unwrap()
    }
}

impl Drop for TempConfig {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[test]
#[serial]
fn test_file_values_loaded() {
    let file = TempConfig::new("file", TEST_CONFIG);
    let config = AppConfig::from_file(file.path()).unwrap();

    assert_eq!(config.dispatch.mode, DispatchMode::Sequential);
    assert_eq!(config.dispatch.max_parallel, 2);
    assert_eq!(config.upstreams.providers[0].name, "lighthouse");
    assert_eq!(config.upstreams.providers[0].timeout_seconds, 10);
    assert_eq!(config.logging.format, "json");
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn test_environment_overrides_file() {
    let file = TempConfig::new("env", TEST_CONFIG);
    std::env::set_var("MULTIBEACON__DISPATCH__MODE", "parallel");
    std::env::set_var("MULTIBEACON__DISPATCH__MAX_PARALLEL", "5");
    std::env::set_var("MULTIBEACON__HTTP__MAX_RETRIES", "0");

    let config = AppConfig::from_file(file.path());

    std::env::remove_var("MULTIBEACON__DISPATCH__MODE");
    std::env::remove_var("MULTIBEACON__DISPATCH__MAX_PARALLEL");
    std::env::remove_var("MULTIBEACON__HTTP__MAX_RETRIES");

    let config = config.unwrap();
    assert_eq!(config.dispatch.mode, DispatchMode::Parallel);
    assert_eq!(config.dispatch.max_parallel, 5);
    assert_eq!(config.http.max_retries, 0);
    assert_eq!(config.upstreams.providers[0].name, "lighthouse");
}

#[test]
#[serial]
fn test_load_uses_config_path_variable() {
    let file = TempConfig::new("load", TEST_CONFIG);
    std::env::set_var("MULTIBEACON_CONFIG", file.path());

    let config = AppConfig::load();
    std::env::remove_var("MULTIBEACON_CONFIG");

    assert_eq!(config.unwrap().dispatch.max_parallel, 2);
}

#[test]
#[serial]
fn test_malformed_file_rejected() {
    let file = TempConfig::new("bad", "[dispatch\nmode = ");
    assert!(AppConfig::from_file(file.path()).is_err());
}

#[test]
#[serial]
fn test_unknown_dispatch_mode_rejected() {
    let file = TempConfig::new("mode", "[dispatch]\nmode = \"round_robin\"\n");
    assert!(AppConfig::from_file(file.path()).is_err());
}
