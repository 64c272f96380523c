use std::ffi::OsString;
use std::sync::Mutex;
use std::time::Duration;

use flowdbg_config::{ConfigError, FlowdbgConfig, FLOWDBG_CONFIG_ENV_VAR};
use tempfile::tempdir;

static ENV_LOCK: Mutex<()> = Mutex::new(());

struct EnvVarGuard {
    key: &'static str,
    prev: Option<OsString>,
}

impl EnvVarGuard {
    fn set(key: &'static str, value: &std::path::Path) -> Self {
        let prev = std::env::var_os(key);
        std::env::set_var(key, value);
        Self { key, prev }
    }

    fn unset(key: &'static str) -> Self {
        let prev = std::env::var_os(key);
        std::env::remove_var(key);
        Self { key, prev }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match &self.prev {
            Some(v) => std::env::set_var(self.key, v),
            None => std::env::remove_var(self.key),
        }
    }
}

#[test]
fn loads_overrides_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("flowdbg.toml");
    std::fs::write(
        &path,
        r#"
[logging]
level = "debug"
json = true

[debug]
suspend_timeout_ms = 250
max_sessions_per_tenant = 2
"#,
    )
    .unwrap();

    let config = FlowdbgConfig::load_from_path(&path).unwrap();
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
    assert!(config.logging.stderr);
    assert_eq!(config.debug.suspend_timeout(), Duration::from_millis(250));
    assert_eq!(config.debug.max_sessions_per_tenant, Some(2));
}

#[test]
fn missing_file_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let err = FlowdbgConfig::load_from_path(&path).unwrap_err();
    match err {
        ConfigError::Io { path: reported, .. } => {
            assert_eq!(reported, path.display().to_string());
        }
        other => panic!("expected io error, got {other:?}"),
    }
}

#[test]
fn env_var_selects_config_file() {
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK mutex poisoned");

    let dir = tempdir().unwrap();
    let path = dir.path().join("flowdbg.toml");
    std::fs::write(&path, "[debug]\nsuspend_timeout_ms = 1200\n").unwrap();
    let _env = EnvVarGuard::set(FLOWDBG_CONFIG_ENV_VAR, &path);

    let config = FlowdbgConfig::load_from_env();
    assert_eq!(config.debug.suspend_timeout_ms, 1200);
}

#[test]
fn env_var_with_invalid_file_falls_back_to_defaults() {
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK mutex poisoned");

    let dir = tempdir().unwrap();
    let path = dir.path().join("flowdbg.toml");
    std::fs::write(&path, "[debug\nsuspend_timeout_ms = ").unwrap();
    let _env = EnvVarGuard::set(FLOWDBG_CONFIG_ENV_VAR, &path);

    assert_eq!(FlowdbgConfig::load_from_env(), FlowdbgConfig::default());
}

#[test]
fn unset_env_var_yields_defaults() {
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK mutex poisoned");
    let _env = EnvVarGuard::unset(FLOWDBG_CONFIG_ENV_VAR);

    assert_eq!(FlowdbgConfig::load_from_env(), FlowdbgConfig::default());
}
