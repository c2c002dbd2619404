//! Renderable graph construction.
//!
//! [`build`] is the pure pipeline function: it never touches the parsed map it
//! is given, and the only state it reads besides the config is the previous
//! graph, from which node positions are carried over.

use std::collections::HashMap;

use modgraph_core::model::MACRO_PREFIX;
use modgraph_core::{DependencyMap, GraphConfig, LayoutInit, NodeId};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::colors::{Rgb, assign_colors};
use crate::cycles::detect_cycles;
use crate::filter::{FilterReport, filter_with_report};
use crate::labels::resolve_labels;
use crate::layout::initial_positions;
use crate::metrics::{DegreeCalculator, SizeScale, metric_direction};

/// Base attraction of a dependency edge.
pub const EDGE_WEIGHT: f64 = 100.0;
/// Same-package neighbors each node is paired with, at most.
pub const MAX_CLUSTER_PAIRS: usize = 150;

/// How an edge is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeRenderType {
    Arrow,
}

/// A node as handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub path: String,
    /// Display label, `[macro] `-prefixed when configured.
    pub label: String,
    pub size: f64,
    pub color: Rgb,
    pub x: f64,
    pub y: f64,
    /// Degree under the configured size metric.
    pub degree: usize,
    pub direct_degree: usize,
    pub package_path: Vec<String>,
    pub is_macro: bool,
    /// Lies on at least one directed cycle of the filtered map.
    pub cyclic: bool,
}

/// A directed edge between two entries of [`RenderableGraph::nodes`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RenderEdge {
    pub source: usize,
    pub target: usize,
    pub weight: f64,
    #[serde(rename = "type")]
    pub render_type: EdgeRenderType,
}

/// Undirected same-package attraction, used by the layout only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClusterEdge {
    pub a: usize,
    pub b: usize,
    pub weight: f64,
}

/// What the pipeline dropped or could not apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub filter: FilterReport,
    /// Enabled custom label patterns that failed to compile.
    pub invalid_label_patterns: Vec<String>,
    /// Prefix removed from labels no rule resolved.
    pub stripped_prefix: Option<String>,
}

/// Output of [`build`]: nodes, edges and the graph-level attributes the
/// renderer and layout need.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderableGraph {
    pub nodes: Vec<RenderNode>,
    pub edges: Vec<RenderEdge>,
    pub cluster_edges: Vec<ClusterEdge>,
    pub max_degree: usize,
    pub min_radius: f64,
    pub max_radius: f64,
    /// Deepest package path among the nodes.
    pub max_package_depth: usize,
    pub layout_init: Option<LayoutInit>,
    /// Edges point from owner to dependency.
    pub edges_toward_dependencies: bool,
    pub report: BuildReport,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl RenderableGraph {
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Position of the node for `path` in [`RenderableGraph::nodes`].
    #[must_use]
    pub fn node_index(&self, path: &str) -> Option<usize> {
        self.index.get(path).copied()
    }

    #[must_use]
    pub fn node(&self, path: &str) -> Option<&RenderNode> {
        self.node_index(path).map(|idx| &self.nodes[idx])
    }

    /// Directed edge view. Node `i` of the result is `nodes[i]`.
    #[must_use]
    pub fn to_digraph(&self) -> DiGraph<usize, f64> {
        let mut graph = DiGraph::with_capacity(self.nodes.len(), self.edges.len());
        for idx in 0..self.nodes.len() {
            graph.add_node(idx);
        }
        for edge in &self.edges {
            graph.add_edge(NodeIndex::new(edge.source), NodeIndex::new(edge.target), edge.weight);
        }
        graph
    }

    /// Edges the force simulation pulls along: weighted dependency edges
    /// plus clustering edges.
    #[must_use]
    pub fn layout_edges(&self) -> Vec<(usize, usize)> {
        self.edges
            .iter()
            .filter(|edge| edge.weight > 0.0)
            .map(|edge| (edge.source, edge.target))
            .chain(
                self.cluster_edges
                    .iter()
                    .filter(|edge| edge.weight > 0.0)
                    .map(|edge| (edge.a, edge.b)),
            )
            .collect()
    }

    /// Paths in node order.
    pub fn paths(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.iter().map(|node| node.path.as_str())
    }
}

/// Run the full pipeline on a copy of `deps`.
///
/// Nodes keep their position from `previous` unless `previous` is `None` or
/// was built with another `layoutInit`; all other nodes get their initial
/// placement.
#[must_use]
#[instrument(skip_all, fields(nodes = deps.len(), edges = deps.edge_count()))]
pub fn build(deps: &DependencyMap, config: &GraphConfig, previous: Option<&RenderableGraph>) -> RenderableGraph {
    let mut labeled = deps.clone();
    let labels = resolve_labels(&mut labeled, config);
    let colors = assign_colors(&labeled);
    let (filtered, filter_report) = filter_with_report(&labeled, config);
    let cyclic = detect_cycles(&filtered);

    let order = render_order(&filtered);
    let slot: HashMap<NodeId, usize> = order.iter().enumerate().map(|(idx, &id)| (id, idx)).collect();

    let mut graph: DiGraph<NodeId, ()> = DiGraph::with_capacity(order.len(), filtered.edge_count());
    for &id in &order {
        graph.add_node(id);
    }

    let max_deps = filtered.ids().map(|id| filtered.dependency_count(id)).max().unwrap_or(0);
    let mut edges = Vec::with_capacity(filtered.edge_count());
    for (owner, dependency) in filtered.edges() {
        let (from, to) = if config.visual_dependencies {
            (owner, dependency)
        } else {
            (dependency, owner)
        };
        let (source, target) = (slot[&from], slot[&to]);
        graph.add_edge(NodeIndex::new(source), NodeIndex::new(target), ());
        edges.push(RenderEdge {
            source,
            target,
            weight: edge_weight(config, filtered.dependency_count(to), max_deps),
            render_type: EdgeRenderType::Arrow,
        });
    }

    let direction = metric_direction(config.visual_size, config.visual_dependencies);
    let mut degrees = DegreeCalculator::new(&graph, direction, config.visual_size.is_recursive());
    let measured: Vec<(usize, usize)> = graph
        .node_indices()
        .map(|idx| (degrees.degree(idx), degrees.direct(idx)))
        .collect();
    let max_degree = measured.iter().map(|&(degree, _)| degree).max().unwrap_or(0);
    let scale = SizeScale::new(config.visual_size_min, config.visual_size_max, max_degree);

    let mut nodes: Vec<RenderNode> = order
        .iter()
        .zip(&measured)
        .map(|(&id, &(degree, direct_degree))| {
            let node = filtered.node(id);
            let label = if config.smart_labels_show_macro && node.is_macro {
                format!("{MACRO_PREFIX}{}", node.label())
            } else {
                node.label().to_string()
            };
            RenderNode {
                path: node.path.clone(),
                label,
                size: scale.radius(degree),
                color: colors.get(&id).copied().unwrap_or_default(),
                x: 0.0,
                y: 0.0,
                degree,
                direct_degree,
                package_path: node.package_path().to_vec(),
                is_macro: node.is_macro,
                cyclic: cyclic.contains(&id),
            }
        })
        .collect();

    let cluster_edges = if config.layout_package_forces > 0.0 {
        cluster_edges(&filtered, &slot, config.layout_package_forces)
    } else {
        Vec::new()
    };

    let reuse = previous.filter(|prev| prev.layout_init == Some(config.layout_init));
    let placed = initial_positions(&nodes, config.layout_init);
    let mut kept = 0usize;
    for (node, (x, y)) in nodes.iter_mut().zip(placed) {
        match reuse.and_then(|prev| prev.node(&node.path)) {
            Some(old) => {
                node.x = old.x;
                node.y = old.y;
                kept += 1;
            }
            None => {
                node.x = x;
                node.y = y;
            }
        }
    }

    let index = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.path.clone(), idx))
        .collect();
    let max_package_depth = nodes.iter().map(|node| node.package_path.len()).max().unwrap_or(0);

    debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        cluster_edges = cluster_edges.len(),
        max_degree,
        kept_positions = kept,
        "graph built"
    );

    RenderableGraph {
        nodes,
        edges,
        cluster_edges,
        max_degree,
        min_radius: scale.min(),
        max_radius: scale.max(),
        max_package_depth,
        layout_init: Some(config.layout_init),
        edges_toward_dependencies: config.visual_dependencies,
        report: BuildReport {
            filter: filter_report,
            invalid_label_patterns: labels.invalid_patterns,
            stripped_prefix: labels.stripped_prefix,
        },
        index,
    }
}

/// Owner first, then its dependencies, each node once.
fn render_order(deps: &DependencyMap) -> Vec<NodeId> {
    let mut seen = vec![false; deps.capacity()];
    let mut order = Vec::with_capacity(deps.len());
    for owner in deps.ids() {
        for id in std::iter::once(owner).chain(deps.dependencies(owner)) {
            if !seen[id.index()] {
                seen[id.index()] = true;
                order.push(id);
            }
        }
    }
    order
}

#[allow(clippy::cast_precision_loss)]
fn edge_weight(config: &GraphConfig, target_deps: usize, max_deps: usize) -> f64 {
    if !config.layout_forces {
        return 0.0;
    }
    if config.layout_forces_relative {
        EDGE_WEIGHT * (target_deps as f64 + 1.0) / (max_deps as f64 + 1.0)
    } else {
        EDGE_WEIGHT
    }
}

/// Pair every node with up to [`MAX_CLUSTER_PAIRS`] later nodes sharing each
/// of its package prefixes.
fn cluster_edges(deps: &DependencyMap, slot: &HashMap<NodeId, usize>, weight: f64) -> Vec<ClusterEdge> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of: HashMap<String, usize> = HashMap::new();
    for (id, node) in deps.nodes() {
        let package = node.package_path();
        for depth in (1..=package.len()).rev() {
            let key = package[..depth].join("/");
            let group = *group_of.entry(key).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[group].push(slot[&id]);
        }
    }

    let mut edges = Vec::new();
    for members in &groups {
        let last = members.len().saturating_sub(1);
        for i in 0..last {
            for j in i..last.min(MAX_CLUSTER_PAIRS + i) {
                edges.push(ClusterEdge {
                    a: members[i],
                    b: members[j + 1],
                    weight,
                });
            }
        }
    }
    edges
}
