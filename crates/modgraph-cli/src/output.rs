//! Output modes and the render helpers every command shares.
//!
//! A command builds one serializable payload and hands it to [`render`] or
//! [`render_mode`] along with its human renderers. JSON always goes through
//! serde, so scripts see exactly the fields the payload declares.

use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

/// Environment variable selecting the default output mode.
pub const FORMAT_ENV: &str = "MODGRAPH_FORMAT";

/// Width of the right-aligned key column in [`field`].
const KEY_WIDTH: usize = 20;

/// Write `title` underlined to its own width.
pub fn heading(w: &mut dyn Write, title: &str) -> io::Result<()> {
    writeln!(w, "{title}\n{}", "=".repeat(title.chars().count().max(1)))
}

/// Write one `key  value` line with the key right-aligned.
pub fn field(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{key:>KEY_WIDTH$}  {}", value.as_ref())
}

/// How command results are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Headings and aligned fields for a terminal.
    Pretty,
    /// Tab-separated rows for pipes.
    Text,
    /// The payload as JSON.
    Json,
}

impl OutputMode {
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    /// Pick the mode from the command line, `MODGRAPH_FORMAT` and whether
    /// stdout is a terminal.
    #[must_use]
    pub fn resolve(format: Option<Self>, json: bool) -> Self {
        let env = std::env::var(FORMAT_ENV).ok();
        Self::pick(format, json, env.as_deref(), io::stdout().is_terminal())
    }

    /// `--format` wins, then `--json`, then a recognized env value; otherwise
    /// pretty on a terminal and text in a pipe.
    fn pick(format: Option<Self>, json: bool, env: Option<&str>, is_tty: bool) -> Self {
        format
            .or_else(|| json.then_some(Self::Json))
            .or_else(|| env.and_then(|value| <Self as ValueEnum>::from_str(value, true).ok()))
            .unwrap_or(if is_tty { Self::Pretty } else { Self::Text })
    }
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable error code (e.g. "not_a_dump").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    #[must_use]
    pub fn with_details(
        message: impl Into<String>,
        suggestion: impl Into<String>,
        error_code: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            suggestion: Some(suggestion.into()),
            error_code: Some(error_code.into()),
        }
    }
}

/// Render `value` as JSON, or through `text_fn` / `pretty_fn`.
///
/// # Errors
///
/// Returns an error if stdout cannot be written or the value cannot be
/// serialized.
pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text_fn(value, &mut out)?,
        OutputMode::Pretty => pretty_fn(value, &mut out)?,
    }
    Ok(())
}

/// [`render_mode`] with one renderer for both human modes.
///
/// # Errors
///
/// See [`render_mode`].
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl Fn(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    render_mode(mode, value, &human_fn, &human_fn)
}

/// Write `error` to stderr, as `{"error": ...}` in JSON mode.
///
/// # Errors
///
/// Returns an error if stderr cannot be written.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let mut out = io::stderr().lock();
    if mode.is_json() {
        serde_json::to_writer_pretty(&mut out, &serde_json::json!({ "error": error }))?;
        writeln!(out)?;
    } else {
        writeln!(out, "error: {}", error.message)?;
        if let Some(suggestion) = &error.suggestion {
            writeln!(out, "hint: {suggestion}")?;
        }
    }
    Ok(())
}
