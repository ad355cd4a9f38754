//! External plugin host: phases, protocol, env shortcut, strict filters.

use apex_core::{convert, ApexError, Options, PluginPhase, PluginSpec};
use serial_test::serial;

#[test]
#[serial]
fn test_pre_parse_plugin_replaces_source() {
    let mut options = Options::default();
    options
        .plugins
        .push(PluginSpec::new("printf '# From Plugin'", vec![PluginPhase::PreParse]));
    let html = convert("original\n", &options).unwrap();
    assert!(html.contains("From Plugin</h1>"), "html: {html}");
    assert!(!html.contains("original"));
}

#[test]
#[serial]
fn test_post_render_plugin_sees_html() {
    let mut options = Options::default();
    options
        .plugins
        .push(PluginSpec::new("cat", vec![PluginPhase::PostRender]));
    let html = convert("hello\n", &options).unwrap();
    // `cat` echoes the protocol line back, proving what the plugin saw.
    assert!(html.contains("\"version\":1"), "html: {html}");
    assert!(html.contains("\"phase\":\"post_render\""));
    assert!(html.contains("<p>hello</p>"));
}

#[test]
#[serial]
fn test_failing_plugin_is_ignored() {
    let mut options = Options::default();
    options
        .plugins
        .push(PluginSpec::new("exit 7", vec![PluginPhase::PreParse]));
    let html = convert("survives\n", &options).unwrap();
    assert!(html.contains("survives"));
}

#[test]
#[serial]
fn test_strict_filter_aborts_conversion() {
    let mut options = Options::default();
    options.ast_filter_commands = vec!["exit 1".into()];
    options.ast_filter_strict = true;
    let err = convert("x\n", &options).unwrap_err();
    assert!(matches!(err, ApexError::FilterFailed { .. }));
}

#[test]
#[serial]
fn test_non_strict_filter_failure_keeps_html() {
    let mut options = Options::default();
    options.ast_filter_commands = vec!["exit 1".into()];
    options.ast_filter_strict = false;
    let html = convert("kept\n", &options).unwrap();
    assert!(html.contains("kept"));
}

#[test]
#[serial]
fn test_env_pre_parse_shortcut() {
    std::env::set_var(apex_core::plugins::PRE_PARSE_PLUGIN_ENV, "printf 'from env'");
    let html = convert("original\n", &Options::default()).unwrap();
    std::env::remove_var(apex_core::plugins::PRE_PARSE_PLUGIN_ENV);
    assert!(html.contains("from env"), "html: {html}");
}

#[test]
#[serial]
fn test_progress_callback_reports_stages() {
    use std::sync::{Arc, Mutex};

    let stages: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stages);

    let mut options = Options::default();
    options.progress_callback = Some(Arc::new(move |stage: &str, _percent: i32| {
        sink.lock().unwrap().push(stage.to_string());
    }));

    convert("# x\n", &options).unwrap();
    let seen = stages.lock().unwrap();
    assert!(seen.iter().any(|s| s.contains("Parsing")));
    assert!(seen.iter().any(|s| s.contains("Done")));
}
