//! `modgraph cycles`: list circular dependency groups.

use std::io::Write;

use anyhow::Context;
use clap::Args;
use modgraph_engine::cycles::cycle_groups;
use modgraph_engine::filter;
use serde::Serialize;

use crate::cmd::{DumpArgs, load_static};
use crate::output::{OutputMode, render};

/// Arguments for `modgraph cycles`.
#[derive(Args, Debug)]
pub struct CyclesArgs {
    #[command(flatten)]
    pub dump: DumpArgs,

    /// Ignore the configured filters and search the whole dump.
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
struct CyclesOutput {
    cycles: Vec<Vec<String>>,
}

/// Execute `modgraph cycles`.
///
/// # Errors
///
/// Returns an error if the dump cannot be loaded or output fails.
pub fn run_cycles(args: &CyclesArgs, output: OutputMode) -> anyhow::Result<()> {
    let session = load_static(&args.dump, output)?;
    let deps = session.dependencies().context("no dependency map loaded")?;
    let cycles = if args.all {
        cycle_groups(deps)
    } else {
        cycle_groups(&filter(deps, session.config()))
    };
    render(output, &CyclesOutput { cycles }, render_cycles_human)
}

fn render_cycles_human(payload: &CyclesOutput, w: &mut dyn Write) -> std::io::Result<()> {
    if payload.cycles.is_empty() {
        writeln!(w, "No dependency cycles found.")?;
        return Ok(());
    }

    writeln!(w, "Dependency cycles ({})", payload.cycles.len())?;
    for (idx, cycle) in payload.cycles.iter().enumerate() {
        writeln!(w, "\nCycle {} ({} modules):", idx + 1, cycle.len())?;
        for path in cycle {
            writeln!(w, "  - {path}")?;
        }
    }
    Ok(())
}
