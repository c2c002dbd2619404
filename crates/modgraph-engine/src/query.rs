//! Interactive queries on a built graph: selection, hover paths, search.
//!
//! All queries follow the rendered edge direction. Counts are reported in
//! dependency terms, so they are swapped back when the graph was built with
//! edges pointing toward dependants.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use petgraph::Direction;
use petgraph::algo::dijkstra;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::build::RenderableGraph;

/// Reachability counts around the selected node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReachCounts {
    pub direct_dependencies: usize,
    pub total_dependencies: usize,
    pub direct_dependants: usize,
    pub total_dependants: usize,
}

/// Everything derived from selecting one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub node: usize,
    /// Hop distance of every node reachable from the selection (itself at 0).
    pub distances: BTreeMap<usize, usize>,
    pub max_distance: usize,
    /// Edge indices on a shortest cycle back into the selection through each
    /// of its out-neighbors.
    pub cycle_edges: BTreeSet<usize>,
    pub counts: ReachCounts,
}

impl Selection {
    /// Gray level used to shade a reachable node: nearer is darker.
    /// `None` for the selection itself and unreachable nodes.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn shade(&self, node: usize) -> Option<u8> {
        let distance = *self.distances.get(&node).filter(|&&d| d > 0)?;
        let ratio = distance as f64 / self.max_distance.max(1) as f64;
        Some(ratio.mul_add(120.0, 100.0).floor() as u8)
    }
}

/// Result of a label search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "nodes", rename_all = "lowercase")]
pub enum SearchResult {
    /// Empty query: nothing highlighted.
    Cleared,
    /// Exactly one label matched and equals the query verbatim.
    Exact(usize),
    /// Every node whose label contains the query, ignoring case.
    Matches(Vec<usize>),
}

/// Compute the selection state for `node`. `None` if it is out of range.
#[must_use]
#[instrument(skip(graph), fields(nodes = graph.len()))]
pub fn select(graph: &RenderableGraph, node: usize) -> Option<Selection> {
    if node >= graph.len() {
        return None;
    }
    let digraph = graph.to_digraph();
    let start = NodeIndex::new(node);

    let distances: BTreeMap<usize, usize> = dijkstra(&digraph, start, None, |_| 1usize)
        .into_iter()
        .map(|(idx, distance)| (idx.index(), distance))
        .collect();
    let max_distance = distances.values().copied().max().unwrap_or(0);

    let edge_index = edge_lookup(graph);
    let mut cycle_edges = BTreeSet::new();
    let neighbors: BTreeSet<usize> = digraph
        .neighbors_directed(start, Direction::Outgoing)
        .map(NodeIndex::index)
        .collect();
    for neighbor in neighbors {
        if let Some(back) = bfs_path(&digraph, neighbor, node) {
            let cycle: Vec<usize> = std::iter::once(node).chain(back).collect();
            cycle_edges.extend(path_edge_indices(&edge_index, &cycle));
        }
    }

    let outgoing = reach(&digraph, start, Direction::Outgoing);
    let incoming = reach(&digraph, start, Direction::Incoming);
    let counts = if graph.edges_toward_dependencies {
        ReachCounts {
            direct_dependencies: outgoing.0,
            total_dependencies: outgoing.1,
            direct_dependants: incoming.0,
            total_dependants: incoming.1,
        }
    } else {
        ReachCounts {
            direct_dependencies: incoming.0,
            total_dependencies: incoming.1,
            direct_dependants: outgoing.0,
            total_dependants: outgoing.1,
        }
    };

    debug!(
        node = graph.nodes[node].path.as_str(),
        reachable = distances.len() - 1,
        cycle_edges = cycle_edges.len(),
        "selection computed"
    );

    Some(Selection {
        node,
        distances,
        max_distance,
        cycle_edges,
        counts,
    })
}

/// A shortest node path from `from` to `to`, both included.
#[must_use]
pub fn shortest_path(graph: &RenderableGraph, from: usize, to: usize) -> Option<Vec<usize>> {
    if from >= graph.len() || to >= graph.len() {
        return None;
    }
    bfs_path(&graph.to_digraph(), from, to)
}

/// Edge indices along a shortest path, for hover highlighting.
#[must_use]
pub fn highlight_path(graph: &RenderableGraph, from: usize, to: usize) -> Vec<usize> {
    shortest_path(graph, from, to)
        .map(|path| path_edge_indices(&edge_lookup(graph), &path))
        .unwrap_or_default()
}

/// Case-insensitive substring search over node labels.
#[must_use]
pub fn search(graph: &RenderableGraph, query: &str) -> SearchResult {
    if query.is_empty() {
        return SearchResult::Cleared;
    }
    let needle = query.to_lowercase();
    let matches: Vec<usize> = graph
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, node)| node.label.to_lowercase().contains(&needle))
        .map(|(idx, _)| idx)
        .collect();

    match matches.as_slice() {
        [only] if graph.nodes[*only].label == query => SearchResult::Exact(*only),
        _ => SearchResult::Matches(matches),
    }
}

/// `(direct, total)` neighbors and reachable nodes, excluding `start`.
fn reach(graph: &DiGraph<usize, f64>, start: NodeIndex, direction: Direction) -> (usize, usize) {
    let direct: BTreeSet<NodeIndex> = graph
        .neighbors_directed(start, direction)
        .filter(|&idx| idx != start)
        .collect();

    let mut seen = BTreeSet::from([start]);
    let mut queue = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        for next in graph.neighbors_directed(current, direction) {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
    }
    (direct.len(), seen.len() - 1)
}

fn bfs_path(graph: &DiGraph<usize, f64>, from: usize, to: usize) -> Option<Vec<usize>> {
    let (from, to) = (NodeIndex::new(from), NodeIndex::new(to));
    let mut parent: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut seen = BTreeSet::from([from]);
    let mut queue = VecDeque::from([from]);

    while let Some(current) = queue.pop_front() {
        if current == to {
            let mut path = vec![to.index()];
            let mut cursor = to;
            while let Some(&prev) = parent.get(&cursor) {
                path.push(prev.index());
                cursor = prev;
            }
            path.reverse();
            return Some(path);
        }
        for next in graph.neighbors_directed(current, Direction::Outgoing) {
            if seen.insert(next) {
                parent.insert(next, current);
                queue.push_back(next);
            }
        }
    }
    None
}

fn edge_lookup(graph: &RenderableGraph) -> HashMap<(usize, usize), usize> {
    graph
        .edges
        .iter()
        .enumerate()
        .map(|(idx, edge)| ((edge.source, edge.target), idx))
        .collect()
}

fn path_edge_indices(lookup: &HashMap<(usize, usize), usize>, path: &[usize]) -> Vec<usize> {
    path.windows(2)
        .filter_map(|pair| lookup.get(&(pair[0], pair[1])).copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::build;
    use modgraph_core::{GraphConfig, parse};

    const CYCLE: &str = "a.hx:\n\tb.hx\nb.hx:\n\tc.hx\nc.hx:\n\ta.hx\nd.hx:\n\ta.hx\n";

    fn cycle_graph(config: &GraphConfig) -> RenderableGraph {
        build(&parse(CYCLE, false), config, None)
    }

    fn idx(graph: &RenderableGraph, path: &str) -> usize {
        graph.node_index(path).expect("node")
    }

    #[test]
    fn selection_distances_and_counts() {
        let graph = cycle_graph(&GraphConfig::default());
        let a = idx(&graph, "a.hx");
        let selection = select(&graph, a).expect("select");

        assert_eq!(selection.distances[&a], 0);
        assert_eq!(selection.distances[&idx(&graph, "b.hx")], 1);
        assert_eq!(selection.distances[&idx(&graph, "c.hx")], 2);
        assert!(!selection.distances.contains_key(&idx(&graph, "d.hx")));
        assert_eq!(selection.max_distance, 2);
        assert_eq!(
            selection.counts,
            ReachCounts {
                direct_dependencies: 1,
                total_dependencies: 2,
                direct_dependants: 2,
                total_dependants: 3,
            }
        );
    }

    #[test]
    fn cycle_edges_close_the_loop() {
        let graph = cycle_graph(&GraphConfig::default());
        let selection = select(&graph, idx(&graph, "a.hx")).expect("select");
        assert_eq!(selection.cycle_edges.len(), 3);
        let d = idx(&graph, "d.hx");
        assert!(selection.cycle_edges.iter().all(|&edge| graph.edges[edge].source != d));
    }

    #[test]
    fn counts_are_swapped_for_dependant_edges() {
        let config = GraphConfig {
            visual_dependencies: false,
            ..GraphConfig::default()
        };
        let graph = cycle_graph(&config);
        let selection = select(&graph, idx(&graph, "a.hx")).expect("select");
        assert_eq!(selection.counts.direct_dependencies, 1);
        assert_eq!(selection.counts.total_dependants, 3);
    }

    #[test]
    fn selecting_out_of_range_is_none() {
        let graph = cycle_graph(&GraphConfig::default());
        assert!(select(&graph, graph.len()).is_none());
    }

    #[test]
    fn shades_grow_lighter_with_distance() {
        let graph = cycle_graph(&GraphConfig::default());
        let selection = select(&graph, idx(&graph, "a.hx")).expect("select");
        assert_eq!(selection.shade(idx(&graph, "a.hx")), None);
        assert_eq!(selection.shade(idx(&graph, "b.hx")), Some(160));
        assert_eq!(selection.shade(idx(&graph, "c.hx")), Some(220));
    }

    #[test]
    fn shortest_path_and_highlight() {
        let graph = cycle_graph(&GraphConfig::default());
        let (a, b, c, d) = (
            idx(&graph, "a.hx"),
            idx(&graph, "b.hx"),
            idx(&graph, "c.hx"),
            idx(&graph, "d.hx"),
        );
        assert_eq!(shortest_path(&graph, d, c), Some(vec![d, a, b, c]));
        assert_eq!(shortest_path(&graph, a, d), None);
        assert_eq!(shortest_path(&graph, a, a), Some(vec![a]));
        assert_eq!(highlight_path(&graph, d, b).len(), 2);
    }

    #[test]
    fn search_matches_case_insensitively() {
        let graph = build(
            &parse("src/Player.hx:\n\tsrc/PlayerState.hx\n\tsrc/Enemy.hx\n", false),
            &GraphConfig::default(),
            None,
        );
        assert_eq!(search(&graph, ""), SearchResult::Cleared);
        match search(&graph, "player") {
            SearchResult::Matches(found) => assert_eq!(found.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(search(&graph, "Enemy"), SearchResult::Exact(idx(&graph, "src/Enemy.hx")));
        assert_eq!(search(&graph, "enemy"), SearchResult::Matches(vec![idx(&graph, "src/Enemy.hx")]));
        assert_eq!(search(&graph, "zzz"), SearchResult::Matches(Vec::new()));
    }
}
