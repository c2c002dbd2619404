//! `modgraph graph`: build the renderable graph for a dump.

use std::io::{self, Write};

use clap::Args;
use modgraph_engine::RenderableGraph;

use crate::cmd::{DumpArgs, load_static};
use crate::output::{OutputMode, field, heading, render_mode};

/// Arguments for `modgraph graph`.
#[derive(Args, Debug)]
pub struct GraphArgs {
    #[command(flatten)]
    pub dump: DumpArgs,

    /// Rows shown in the pretty node table, highest degree first.
    #[arg(long, default_value_t = 20)]
    pub top: usize,
}

/// Execute `modgraph graph`.
///
/// # Errors
///
/// Returns an error if the dump cannot be loaded or output fails.
pub fn run_graph(args: &GraphArgs, output: OutputMode) -> anyhow::Result<()> {
    let session = load_static(&args.dump, output)?;
    let top = args.top;
    render_mode(output, session.graph(), render_graph_text, |graph, w| {
        render_graph_pretty(graph, top, w)
    })
}

fn render_graph_text(graph: &RenderableGraph, w: &mut dyn Write) -> io::Result<()> {
    for node in &graph.nodes {
        writeln!(
            w,
            "node\t{}\t{}\t{:.2}\t{}\t{:.1}\t{:.1}",
            node.path,
            node.label,
            node.size,
            node.color.to_hex(),
            node.x,
            node.y
        )?;
    }
    for edge in &graph.edges {
        writeln!(
            w,
            "edge\t{}\t{}\t{}",
            graph.nodes[edge.source].path, graph.nodes[edge.target].path, edge.weight
        )?;
    }
    Ok(())
}

fn render_graph_pretty(graph: &RenderableGraph, top: usize, w: &mut dyn Write) -> io::Result<()> {
    let report = &graph.report;
    heading(w, "Dependency graph")?;
    field(w, "nodes", graph.len().to_string())?;
    field(w, "edges", graph.edges.len().to_string())?;
    field(w, "cluster edges", graph.cluster_edges.len().to_string())?;
    field(w, "cyclic nodes", graph.nodes.iter().filter(|node| node.cyclic).count().to_string())?;
    field(w, "max degree", graph.max_degree.to_string())?;
    field(
        w,
        "hidden",
        format!(
            "{} excluded, {} acyclic, {} below threshold",
            report.filter.excluded, report.filter.acyclic, report.filter.below_threshold
        ),
    )?;
    if let Some(prefix) = &report.stripped_prefix {
        field(w, "stripped prefix", prefix)?;
    }
    for pattern in &report.invalid_label_patterns {
        field(w, "invalid pattern", pattern)?;
    }

    if graph.is_empty() {
        writeln!(w, "\nNothing left to show with the current filters.")?;
        return Ok(());
    }

    let mut ranked: Vec<_> = graph.nodes.iter().collect();
    ranked.sort_by(|a, b| b.degree.cmp(&a.degree).then_with(|| a.label.cmp(&b.label)));
    writeln!(w)?;
    heading(w, "Nodes by degree")?;
    for node in ranked.into_iter().take(top) {
        let marker = if node.cyclic { " (cycle)" } else { "" };
        writeln!(
            w,
            "{:>5} {:>5}  {} {}{marker}",
            node.degree,
            node.direct_degree,
            node.color.to_hex(),
            node.label
        )?;
    }
    Ok(())
}
