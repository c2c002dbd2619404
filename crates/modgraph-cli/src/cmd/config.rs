//! `modgraph config`: show and edit the persisted graph configuration.

use std::io::Write;

use anyhow::{Context, bail};
use clap::{Args, Subcommand};
use modgraph_core::GraphConfig;
use modgraph_core::store::FileStore;
use serde_json::Value;

use crate::cmd::open_session;
use crate::output::{CliError, OutputMode, field, heading, render, render_error};

/// Arguments for `modgraph config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration.
    Show,
    /// Set one key (camelCase, as stored) to a JSON value.
    Set {
        key: String,
        /// JSON literal; anything that does not parse is taken as a string.
        value: String,
    },
    /// Forget the stored record and return to defaults.
    Reset,
    /// Print where the configuration is stored.
    Path,
}

/// Execute `modgraph config`.
///
/// # Errors
///
/// Returns an error if the store cannot be read or written, or the key or
/// value is rejected.
pub fn run_config(args: &ConfigArgs, output: OutputMode) -> anyhow::Result<()> {
    match &args.command {
        ConfigCommand::Show => {
            let session = open_session()?;
            render_config(output, session.config())
        }
        ConfigCommand::Set { key, value } => {
            let mut session = open_session()?;
            let updated = match apply(session.config(), key, value) {
                Ok(updated) => updated,
                Err(err) => {
                    render_error(
                        output,
                        &CliError::with_details(
                            format!("{err:#}"),
                            "run `modgraph config show` for the available keys",
                            "invalid_config",
                        ),
                    )?;
                    return Err(err);
                }
            };
            session.update_config(|config| *config = updated)?;
            render_config(output, session.config())
        }
        ConfigCommand::Reset => {
            let mut session = open_session()?;
            session.reset_config()?;
            render_config(output, session.config())
        }
        ConfigCommand::Path => {
            let store = FileStore::default_location()?;
            let path = store.path().display().to_string();
            render(output, &serde_json::json!({ "path": path }), |_, w| writeln!(w, "{path}"))
        }
    }
}

/// Return `config` with `key` replaced by the parsed `raw` value.
fn apply(config: &GraphConfig, key: &str, raw: &str) -> anyhow::Result<GraphConfig> {
    let mut record = serde_json::to_value(config)?;
    let fields = record.as_object_mut().context("config is not a JSON object")?;
    if !fields.contains_key(key) {
        bail!("unknown config key '{key}'");
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    fields.insert(key.to_string(), value);
    serde_json::from_value(record).with_context(|| format!("invalid value for '{key}': {raw}"))
}

fn render_config(output: OutputMode, config: &GraphConfig) -> anyhow::Result<()> {
    let record = serde_json::to_value(config)?;
    render(output, &record, render_config_human)
}

fn render_config_human(record: &Value, w: &mut dyn Write) -> std::io::Result<()> {
    heading(w, "Configuration")?;
    if let Some(fields) = record.as_object() {
        for (key, value) in fields {
            field(w, key, value.to_string())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use modgraph_core::LayoutInit;

    #[test]
    fn apply_parses_json_values() {
        let config = apply(&GraphConfig::default(), "hideMinDeps", "3").expect("apply");
        assert_eq!(config.hide_min_deps, 3);
        let config = apply(&config, "hideStd", "false").expect("apply");
        assert!(!config.hide_std);
    }

    #[test]
    fn apply_falls_back_to_strings() {
        let config = apply(&GraphConfig::default(), "layoutInit", "circle").expect("apply");
        assert_eq!(config.layout_init, LayoutInit::Circle);
    }

    #[test]
    fn apply_rejects_unknown_keys_and_bad_values() {
        assert!(apply(&GraphConfig::default(), "hide_std", "true").is_err());
        assert!(apply(&GraphConfig::default(), "hideMinDeps", "\"many\"").is_err());
    }

    #[test]
    fn human_config_lists_keys() {
        let record = serde_json::to_value(GraphConfig::default()).expect("serialize");
        let mut out = Vec::new();
        render_config_human(&record, &mut out).expect("render");
        let rendered = String::from_utf8(out).expect("utf8");
        assert!(rendered.contains("hideMinDeps  "));
        assert!(rendered.contains("layoutInit  "));
    }
}
