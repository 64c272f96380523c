use flowdbg_config::json_schema;

#[test]
fn json_schema_describes_debug_section() {
    let schema = json_schema();
    let value = serde_json::to_value(schema).expect("schema serializes");

    let timeout = value
        .pointer("/definitions/DebugConfig/properties/suspend_timeout_ms")
        .expect("suspend_timeout_ms schema property exists");
    // `0` is accepted and means "use the default", so the schema must not forbid it.
    assert_eq!(timeout.get("minimum").and_then(|v| v.as_f64()), Some(0.0));
    assert_eq!(timeout.get("default"), Some(&serde_json::json!(5000)));
}

#[test]
fn json_schema_lists_top_level_sections() {
    let value = serde_json::to_value(json_schema()).expect("schema serializes");

    let properties = value
        .pointer("/properties")
        .and_then(|v| v.as_object())
        .expect("top-level properties");
    assert!(properties.contains_key("logging"));
    assert!(properties.contains_key("debug"));
}
