use std::sync::Arc;

use flowdbg_config::{global_log_buffer, init_tracing, LogBuffer, LoggingConfig, TracingSetup};
use tempfile::tempdir;

fn quiet(config: LoggingConfig) -> LoggingConfig {
    LoggingConfig {
        stderr: false,
        ..config
    }
}

#[test]
fn file_sink_appends_to_existing_log() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("flowdbg.log");
    std::fs::write(&path, "existing line\n").unwrap();

    let config = quiet(LoggingConfig {
        file: Some(path.clone()),
        ..Default::default()
    });
    let buffer = Arc::new(LogBuffer::new(16));
    let setup = TracingSetup::new(&config, Arc::clone(&buffer));
    assert!(setup.file_error().is_none());
    setup.scoped(|| tracing::info!("appended line"));

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("existing line\n"), "{text}");
    assert!(text.contains("appended line"), "{text}");
    assert!(buffer.contents().contains("appended line"));
}

#[test]
fn json_output_is_one_object_per_line() {
    let config = quiet(LoggingConfig {
        json: true,
        ..Default::default()
    });
    let buffer = Arc::new(LogBuffer::new(16));
    TracingSetup::new(&config, Arc::clone(&buffer))
        .scoped(|| tracing::info!(connection = "conn-7", "session opened"));

    let lines = buffer.last_lines(16);
    assert_eq!(lines.len(), 1, "{lines:?}");
    let value: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(value["level"], "INFO");
    assert_eq!(value["fields"]["message"], "session opened");
    assert_eq!(value["fields"]["connection"], "conn-7");
}

#[test]
fn unopenable_log_file_is_reported_and_other_sinks_keep_working() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing-dir").join("flowdbg.log");

    let config = quiet(LoggingConfig {
        file: Some(path.clone()),
        ..Default::default()
    });
    let buffer = Arc::new(LogBuffer::new(16));
    let setup = TracingSetup::new(&config, Arc::clone(&buffer));
    assert!(setup.file_error().is_some());
    setup.scoped(|| tracing::info!("still buffered"));

    let text = buffer.contents();
    assert!(text.contains("failed to open log file"), "{text}");
    assert!(text.contains("missing-dir"), "{text}");
    assert!(text.contains("still buffered"), "{text}");
    assert!(!path.exists());
}

#[test]
fn init_tracing_installs_global_subscriber_once() {
    let config = quiet(LoggingConfig::default());
    let buffer = init_tracing(&config);
    tracing::info!(target: "flowdbg.config", "global subscriber line");

    assert!(buffer.contents().contains("global subscriber line"));
    assert!(Arc::ptr_eq(&buffer, &init_tracing(&config)));
    assert!(Arc::ptr_eq(&buffer, &global_log_buffer()));
}
