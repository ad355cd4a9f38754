//! External plugin host.
//!
//! Plugins are shell commands that receive one JSON line on stdin:
//!
//! ```text
//! {"version":1,"plugin_id":"kbd","phase":"pre_parse","text":"..."}
//! ```
//!
//! and write replacement text (not JSON) to stdout. A plugin declares
//! the phases it participates in; a non-zero exit or unusable output is
//! ignored unless strict mode applies, in which case the whole
//! conversion aborts. The `APEX_PRE_PARSE_PLUGIN` environment variable
//! names a single pre-parse filter as a back-compat shortcut.

use std::io::Write;
use std::process::{Command, Stdio};

use log::{debug, warn};
use serde::Serialize;

use crate::error::ApexError;
use crate::options::Options;

pub const PRE_PARSE_PLUGIN_ENV: &str = "APEX_PRE_PARSE_PLUGIN";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginPhase {
    PreParse,
    Block,
    Inline,
    PostRender,
}

impl PluginPhase {
    fn as_str(self) -> &'static str {
        match self {
            PluginPhase::PreParse => "pre_parse",
            PluginPhase::Block => "block",
            PluginPhase::Inline => "inline",
            PluginPhase::PostRender => "post_render",
        }
    }

    /// Parse a phase name from a plugin declaration.
    pub fn parse(name: &str) -> Option<PluginPhase> {
        match name.trim() {
            "pre_parse" => Some(PluginPhase::PreParse),
            "block" => Some(PluginPhase::Block),
            "inline" => Some(PluginPhase::Inline),
            "post_render" => Some(PluginPhase::PostRender),
            _ => None,
        }
    }
}

/// One configured external plugin.
#[derive(Debug, Clone)]
pub struct PluginSpec {
    /// Shell command line, run through `sh -c`.
    pub command: String,
    /// Identifier reported on the protocol line; defaults to the first
    /// word of the command.
    pub id: Option<String>,
    pub phases: Vec<PluginPhase>,
}

impl PluginSpec {
    pub fn new(command: impl Into<String>, phases: Vec<PluginPhase>) -> Self {
        PluginSpec {
            command: command.into(),
            id: None,
            phases,
        }
    }

    fn plugin_id(&self) -> String {
        self.id.clone().unwrap_or_else(|| {
            self.command
                .split_whitespace()
                .next()
                .unwrap_or("plugin")
                .rsplit('/')
                .next()
                .unwrap_or("plugin")
                .to_string()
        })
    }
}

#[derive(Serialize)]
struct ProtocolLine<'a> {
    version: u32,
    plugin_id: &'a str,
    phase: &'a str,
    text: &'a str,
}

/// Run every plugin declared for `phase`, piping the text through each
/// in configuration order. Failures keep the input unchanged.
pub fn run_phase(text: String, phase: PluginPhase, options: &Options) -> String {
    let mut current = text;

    if phase == PluginPhase::PreParse {
        if let Ok(command) = std::env::var(PRE_PARSE_PLUGIN_ENV) {
            if !command.trim().is_empty() {
                let spec = PluginSpec::new(command, vec![PluginPhase::PreParse]);
                match pipe_through(&current, &spec, phase) {
                    Ok(replaced) => current = replaced,
                    Err(err) => warn!("pre-parse env plugin failed: {err}"),
                }
            }
        }
    }

    for spec in &options.plugins {
        if !spec.phases.contains(&phase) {
            continue;
        }
        match pipe_through(&current, spec, phase) {
            Ok(replaced) => current = replaced,
            Err(err) => warn!("plugin `{}` failed at {}: {err}", spec.command, phase.as_str()),
        }
    }

    current
}

/// Strict external filters: any failure aborts the conversion.
pub fn run_filters(html: String, options: &Options) -> Result<String, ApexError> {
    let mut current = html;

    for command in &options.ast_filter_commands {
        let spec = PluginSpec::new(command.clone(), vec![PluginPhase::PostRender]);
        match pipe_through(&current, &spec, PluginPhase::PostRender) {
            Ok(replaced) => current = replaced,
            Err(err) if options.ast_filter_strict => {
                return Err(ApexError::FilterFailed {
                    command: command.clone(),
                    reason: err,
                });
            }
            Err(err) => {
                warn!("filter `{command}` failed (non-strict): {err}");
            }
        }
    }

    Ok(current)
}

fn pipe_through(text: &str, spec: &PluginSpec, phase: PluginPhase) -> Result<String, String> {
    let plugin_id = spec.plugin_id();
    let line = ProtocolLine {
        version: 1,
        plugin_id: &plugin_id,
        phase: phase.as_str(),
        text,
    };
    let mut payload =
        serde_json::to_string(&line).map_err(|err| format!("protocol serialization: {err}"))?;
    payload.push('\n');

    let mut child = Command::new("sh")
        .arg("-c")
        .arg(&spec.command)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| format!("spawn: {err}"))?;

    if let Some(stdin) = child.stdin.take() {
        let mut stdin = stdin;
        if let Err(err) = stdin.write_all(payload.as_bytes()) {
            // A plugin may exit without reading; that is its choice.
            debug!("plugin stdin write: {err}");
        }
    }

    let output = child
        .wait_with_output()
        .map_err(|err| format!("wait: {err}"))?;

    if !output.status.success() {
        return Err(format!("exit status {}", output.status));
    }

    String::from_utf8(output.stdout).map_err(|_| "output was not UTF-8".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn options_with(spec: PluginSpec) -> Options {
        let mut options = Options::default();
        options.plugins.push(spec);
        options
    }

    #[test]
    fn protocol_line_escapes_control_characters() {
        let line = ProtocolLine {
            version: 1,
            plugin_id: "x",
            phase: "pre_parse",
            text: "a\tb\n\"c\"",
        };
        let json = serde_json::to_string(&line).unwrap();
        assert!(json.contains(r#"\t"#));
        assert!(json.contains(r#"\n"#));
        assert!(json.contains(r#"\"c\""#));
    }

    #[test]
    #[serial]
    fn plugin_replaces_text() {
        let spec = PluginSpec::new("printf replaced", vec![PluginPhase::PreParse]);
        let options = options_with(spec);
        let out = run_phase("input".to_string(), PluginPhase::PreParse, &options);
        assert_eq!(out, "replaced");
    }

    #[test]
    #[serial]
    fn failing_plugin_keeps_input() {
        let spec = PluginSpec::new("exit 3", vec![PluginPhase::Block]);
        let options = options_with(spec);
        let out = run_phase("input".to_string(), PluginPhase::Block, &options);
        assert_eq!(out, "input");
    }

    #[test]
    #[serial]
    fn phases_do_not_cross() {
        let spec = PluginSpec::new("printf nope", vec![PluginPhase::PostRender]);
        let options = options_with(spec);
        let out = run_phase("input".to_string(), PluginPhase::Inline, &options);
        assert_eq!(out, "input");
    }

    #[test]
    #[serial]
    fn strict_filter_failure_aborts() {
        let mut options = Options::default();
        options.ast_filter_commands = vec!["exit 1".to_string()];
        options.ast_filter_strict = true;
        let result = run_filters("<p>x</p>".to_string(), &options);
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn env_shortcut_runs_at_pre_parse() {
        std::env::set_var(PRE_PARSE_PLUGIN_ENV, "printf from-env");
        let out = run_phase("input".to_string(), PluginPhase::PreParse, &Options::default());
        std::env::remove_var(PRE_PARSE_PLUGIN_ENV);
        assert_eq!(out, "from-env");
    }
}
