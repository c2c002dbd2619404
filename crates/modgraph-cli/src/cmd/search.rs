//! `modgraph search`: find modules by label.

use std::io::Write;

use clap::Args;
use modgraph_engine::query::SearchResult;
use serde::Serialize;

use crate::cmd::{DumpArgs, load_static};
use crate::output::{OutputMode, render};

/// Arguments for `modgraph search`.
#[derive(Args, Debug)]
pub struct SearchArgs {
    #[command(flatten)]
    pub dump: DumpArgs,

    /// Case-insensitive label substring; an exact label selects that module.
    pub query: String,
}

#[derive(Debug, Serialize)]
struct Hit {
    path: String,
    label: String,
}

#[derive(Debug, Serialize)]
struct SearchOutput {
    exact: bool,
    hits: Vec<Hit>,
}

/// Execute `modgraph search`.
///
/// # Errors
///
/// Returns an error if the dump cannot be loaded or output fails.
pub fn run_search(args: &SearchArgs, output: OutputMode) -> anyhow::Result<()> {
    let mut session = load_static(&args.dump, output)?;
    let result = session.search(&args.query);
    let (exact, indices) = match result {
        SearchResult::Cleared => (false, Vec::new()),
        SearchResult::Exact(idx) => (true, vec![idx]),
        SearchResult::Matches(found) => (false, found),
    };
    let graph = session.graph();
    let hits = indices
        .into_iter()
        .map(|idx| Hit {
            path: graph.nodes[idx].path.clone(),
            label: graph.nodes[idx].label.clone(),
        })
        .collect();
    render(output, &SearchOutput { exact, hits }, render_search_human)
}

fn render_search_human(payload: &SearchOutput, w: &mut dyn Write) -> std::io::Result<()> {
    if payload.hits.is_empty() {
        writeln!(w, "No matching modules.")?;
        return Ok(());
    }
    for hit in &payload.hits {
        writeln!(w, "{}\t{}", hit.label, hit.path)?;
    }
    if payload.exact {
        writeln!(w, "(exact match)")?;
    }
    Ok(())
}
