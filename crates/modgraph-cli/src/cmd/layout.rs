//! `modgraph layout`: run the force simulation and print settled positions.

use std::io::Write;
use std::thread;
use std::time::Duration;

use clap::Args;
use modgraph_engine::layout::LayoutStatus;
use serde::Serialize;
use tracing::debug;

use crate::cmd::{DumpArgs, load_session};
use crate::output::{OutputMode, render_mode};

/// Arguments for `modgraph layout`.
#[derive(Args, Debug)]
pub struct LayoutArgs {
    #[command(flatten)]
    pub dump: DumpArgs,

    /// Give up polling after this many rounds.
    #[arg(long, default_value_t = 500)]
    pub max_polls: usize,

    /// Pause between polls, in milliseconds.
    #[arg(long, default_value_t = 10)]
    pub interval_ms: u64,
}

#[derive(Debug, Serialize)]
struct Position {
    path: String,
    x: f64,
    y: f64,
}

#[derive(Debug, Serialize)]
struct LayoutOutput {
    status: LayoutStatus,
    iterations: usize,
    positions: Vec<Position>,
}

/// Execute `modgraph layout`.
///
/// # Errors
///
/// Returns an error if the dump cannot be loaded or output fails.
pub fn run_layout(args: &LayoutArgs, output: OutputMode) -> anyhow::Result<()> {
    let mut session = load_session(&args.dump, output)?;
    let interval = Duration::from_millis(args.interval_ms);
    let mut status = session.poll_layout();
    for round in 0..args.max_polls {
        if status != LayoutStatus::Running {
            debug!(round, "layout finished polling");
            break;
        }
        thread::sleep(interval);
        status = session.poll_layout();
    }
    let iterations = session.layout_iterations();
    session.stop_layout();

    let positions = session
        .graph()
        .nodes
        .iter()
        .map(|node| Position {
            path: node.path.clone(),
            x: node.x,
            y: node.y,
        })
        .collect();
    let payload = LayoutOutput {
        status,
        iterations,
        positions,
    };
    render_mode(output, &payload, render_layout_text, render_layout_pretty)
}

fn render_layout_text(payload: &LayoutOutput, w: &mut dyn Write) -> std::io::Result<()> {
    for position in &payload.positions {
        writeln!(w, "{}\t{:.2}\t{:.2}", position.path, position.x, position.y)?;
    }
    Ok(())
}

fn render_layout_pretty(payload: &LayoutOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let status = match payload.status {
        LayoutStatus::Idle => "disabled",
        LayoutStatus::Running => "still moving",
        LayoutStatus::Settled => "settled",
    };
    writeln!(w, "Layout {status} after {} iterations", payload.iterations)?;
    for position in &payload.positions {
        writeln!(w, "  {:>9.1} {:>9.1}  {}", position.x, position.y, position.path)?;
    }
    Ok(())
}
