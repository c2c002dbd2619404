//! Subcommand handlers and the dump loading they share.

pub mod config;
pub mod cycles;
pub mod graph;
pub mod inspect;
pub mod layout;
pub mod search;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::Args;
use modgraph_core::parser::is_dependants_file;
use modgraph_core::store::FileStore;
use modgraph_engine::Session;
use tracing::debug;

use crate::output::{CliError, OutputMode, render_error};

/// A dependency dump on disk.
#[derive(Args, Debug, Clone)]
pub struct DumpArgs {
    /// Path to a `dependencies.dump` or `dependants.dump` file.
    pub file: PathBuf,

    /// Treat the file as a dependants listing regardless of its name.
    #[arg(long)]
    pub dependants: bool,
}

impl DumpArgs {
    /// Whether the dump lists dependants, by flag or by file name.
    #[must_use]
    pub fn is_dependants(&self) -> bool {
        self.dependants
            || self
                .file
                .file_name()
                .is_some_and(|name| is_dependants_file(&name.to_string_lossy()))
    }
}

/// Open a session on the persisted config without loading anything.
///
/// # Errors
///
/// Returns an error if the store location cannot be resolved or read.
pub fn open_session() -> anyhow::Result<Session> {
    let store = FileStore::default_location().context("failed to locate config store")?;
    debug!(path = %store.path().display(), "using config store");
    Session::open(Box::new(store))
}

/// Open a session and load the dump named by `args`.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the text is not a
/// dependency dump, or the config store fails.
pub fn load_session(args: &DumpArgs, output: OutputMode) -> anyhow::Result<Session> {
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let mut session = open_session()?;
    if !session.load_text(&text, args.is_dependants())? {
        render_error(
            output,
            &CliError::with_details(
                format!("{} is not a dependency dump", args.file.display()),
                "pass the dump written by the compiler's dependency output",
                "not_a_dump",
            ),
        )?;
        bail!("not a dependency dump");
    }
    Ok(session)
}

/// Load the dump and freeze positions at their initial placement.
///
/// # Errors
///
/// See [`load_session`].
pub fn load_static(args: &DumpArgs, output: OutputMode) -> anyhow::Result<Session> {
    let mut session = load_session(args, output)?;
    session.stop_layout();
    Ok(session)
}
