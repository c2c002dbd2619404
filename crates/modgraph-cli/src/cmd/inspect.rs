//! `modgraph inspect`: what a selected module reaches and what reaches it.

use std::io::Write;

use anyhow::bail;
use clap::Args;
use modgraph_engine::RenderableGraph;
use modgraph_engine::query::{ReachCounts, shortest_path};
use serde::Serialize;

use crate::cmd::{DumpArgs, load_static};
use crate::output::{CliError, OutputMode, field, heading, render, render_error};

/// Arguments for `modgraph inspect`.
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub dump: DumpArgs,

    /// Module path, or its exact label.
    pub node: String,

    /// Also report the shortest path from the module to this one.
    #[arg(long)]
    pub to: Option<String>,
}

#[derive(Debug, Serialize)]
struct Reached {
    path: String,
    distance: usize,
}

#[derive(Debug, Serialize)]
struct InspectOutput {
    path: String,
    label: String,
    cyclic: bool,
    counts: ReachCounts,
    max_distance: usize,
    reachable: Vec<Reached>,
    cycle_edges: Vec<[String; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path_to: Option<Vec<String>>,
}

/// Execute `modgraph inspect`.
///
/// # Errors
///
/// Returns an error if the dump cannot be loaded, the module is not in the
/// filtered graph, or output fails.
pub fn run_inspect(args: &InspectArgs, output: OutputMode) -> anyhow::Result<()> {
    let mut session = load_static(&args.dump, output)?;
    let Some(node) = resolve_index(session.graph(), &args.node) else {
        render_error(
            output,
            &CliError::with_details(
                format!("module '{}' is not in the graph", args.node),
                "check the path, or relax the filters with `modgraph config set`",
                "node_not_found",
            ),
        )?;
        bail!("node not found");
    };

    let to = args.to.as_deref().and_then(|target| resolve_index(session.graph(), target));
    let path = session.graph().nodes[node].path.clone();
    let Some(selection) = session.select(Some(&path)).cloned() else {
        bail!("selection failed");
    };
    let graph = session.graph();
    let path_of = |idx: usize| graph.nodes[idx].path.clone();

    let mut reachable: Vec<Reached> = selection
        .distances
        .iter()
        .filter(|&(&idx, _)| idx != node)
        .map(|(&idx, &distance)| Reached {
            path: path_of(idx),
            distance,
        })
        .collect();
    reachable.sort_by(|a, b| a.distance.cmp(&b.distance).then_with(|| a.path.cmp(&b.path)));

    let payload = InspectOutput {
        path: path_of(node),
        label: graph.nodes[node].label.clone(),
        cyclic: graph.nodes[node].cyclic,
        counts: selection.counts,
        max_distance: selection.max_distance,
        reachable,
        cycle_edges: selection
            .cycle_edges
            .iter()
            .map(|&edge| {
                let edge = graph.edges[edge];
                [path_of(edge.source), path_of(edge.target)]
            })
            .collect(),
        path_to: to.map(|to| {
            shortest_path(graph, node, to)
                .unwrap_or_default()
                .into_iter()
                .map(path_of)
                .collect()
        }),
    };
    render(output, &payload, render_inspect_human)
}

/// A node by path, else the first node whose label equals `query`.
fn resolve_index(graph: &RenderableGraph, query: &str) -> Option<usize> {
    graph
        .node_index(query)
        .or_else(|| graph.nodes.iter().position(|node| node.label == query))
}

fn render_inspect_human(payload: &InspectOutput, w: &mut dyn Write) -> std::io::Result<()> {
    let counts = &payload.counts;
    heading(w, &payload.label)?;
    field(w, "path", &payload.path)?;
    field(w, "in a cycle", if payload.cyclic { "yes" } else { "no" })?;
    field(
        w,
        "dependencies",
        format!("{} direct, {} total", counts.direct_dependencies, counts.total_dependencies),
    )?;
    field(
        w,
        "dependants",
        format!("{} direct, {} total", counts.direct_dependants, counts.total_dependants),
    )?;

    if !payload.reachable.is_empty() {
        writeln!(w, "\nReachable ({} hops max):", payload.max_distance)?;
        for reached in &payload.reachable {
            writeln!(w, "  {:>3}  {}", reached.distance, reached.path)?;
        }
    }
    if !payload.cycle_edges.is_empty() {
        writeln!(w, "\nCycle edges:")?;
        for [from, to] in &payload.cycle_edges {
            writeln!(w, "  {from} -> {to}")?;
        }
    }
    match &payload.path_to {
        Some(path) if path.is_empty() => writeln!(w, "\nNo path to the target module.")?,
        Some(path) => writeln!(w, "\nPath: {}", path.join(" -> "))?,
        None => {}
    }
    Ok(())
}
