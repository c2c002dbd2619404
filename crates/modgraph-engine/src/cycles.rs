//! Cycle detection over a [`DependencyMap`].
//!
//! # Algorithm
//!
//! An iterative three-color DFS runs from every unvisited node in map order.
//! Reaching a node that is still on the current path (gray) closes a cycle,
//! and every node from that node's position on the path to the top becomes a
//! witness. Finished (black) nodes are never re-entered, so each node is
//! expanded once.
//!
//! The DFS alone misses a node whose only cycle runs through an already
//! finished node (`A → B → A` plus `A → C → B`: `C` is reached after `B` is
//! black). The witnesses are therefore completed with the members of every
//! strongly connected component that is cyclic, which is exactly the set of
//! nodes lying on at least one directed cycle.

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeSet, HashMap};

use modgraph_core::{DependencyMap, NodeId};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    White,
    Gray,
    Black,
}

struct Frame {
    node: NodeId,
    children: Vec<NodeId>,
    cursor: usize,
}

/// Every node that lies on at least one directed cycle.
#[must_use]
#[instrument(skip_all, fields(nodes = deps.len()))]
pub fn detect_cycles(deps: &DependencyMap) -> BTreeSet<NodeId> {
    let mut cyclic = dfs_witnesses(deps);
    let witnesses = cyclic.len();

    let (graph, _) = dependency_graph(deps);
    for component in cyclic_components(&graph) {
        if component.iter().any(|idx| cyclic.contains(&graph[*idx])) {
            cyclic.extend(component.iter().map(|idx| graph[*idx]));
        }
    }

    debug!(witnesses, cyclic = cyclic.len(), "cycle detection finished");
    cyclic
}

/// Cyclic nodes grouped per strongly connected component.
///
/// Each group is a sorted list of paths; groups are sorted too. A self-loop
/// is reported as a one-element group.
#[must_use]
pub fn cycle_groups(deps: &DependencyMap) -> Vec<Vec<String>> {
    let (graph, _) = dependency_graph(deps);
    let mut groups: Vec<Vec<String>> = cyclic_components(&graph)
        .into_iter()
        .map(|component| {
            let mut paths: Vec<String> = component
                .into_iter()
                .map(|idx| deps.node(graph[idx]).path.clone())
                .collect();
            paths.sort_unstable();
            paths
        })
        .collect();
    groups.sort_unstable();
    groups
}

/// Build a petgraph view of `deps`. Node weights are the map's ids.
#[must_use]
pub fn dependency_graph(deps: &DependencyMap) -> (DiGraph<NodeId, ()>, HashMap<NodeId, NodeIndex>) {
    let mut graph = DiGraph::with_capacity(deps.len(), deps.edge_count());
    let mut index = HashMap::with_capacity(deps.len());
    for id in deps.ids() {
        index.insert(id, graph.add_node(id));
    }
    for (from, to) in deps.edges() {
        if let (Some(&a), Some(&b)) = (index.get(&from), index.get(&to)) {
            graph.add_edge(a, b, ());
        }
    }
    (graph, index)
}

fn dfs_witnesses(deps: &DependencyMap) -> BTreeSet<NodeId> {
    let mut marks = vec![Mark::White; deps.capacity()];
    let mut path_pos: Vec<Option<usize>> = vec![None; deps.capacity()];
    let mut path: Vec<NodeId> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut witnesses = BTreeSet::new();

    for root in deps.ids() {
        if marks[root.index()] != Mark::White {
            continue;
        }
        enter(deps, root, &mut marks, &mut path_pos, &mut path, &mut stack);

        while let Some(frame) = stack.last_mut() {
            if let Some(&child) = frame.children.get(frame.cursor) {
                frame.cursor += 1;
                match marks[child.index()] {
                    Mark::White => {
                        enter(deps, child, &mut marks, &mut path_pos, &mut path, &mut stack);
                    }
                    Mark::Gray => {
                        if let Some(start) = path_pos[child.index()] {
                            witnesses.extend(path[start..].iter().copied());
                        }
                    }
                    Mark::Black => {}
                }
            } else {
                let node = frame.node;
                stack.pop();
                path.pop();
                marks[node.index()] = Mark::Black;
                path_pos[node.index()] = None;
            }
        }
    }

    witnesses
}

fn enter(
    deps: &DependencyMap,
    node: NodeId,
    marks: &mut [Mark],
    path_pos: &mut [Option<usize>],
    path: &mut Vec<NodeId>,
    stack: &mut Vec<Frame>,
) {
    marks[node.index()] = Mark::Gray;
    path_pos[node.index()] = Some(path.len());
    path.push(node);
    stack.push(Frame {
        node,
        children: deps.dependencies(node).collect(),
        cursor: 0,
    });
}

fn cyclic_components(graph: &DiGraph<NodeId, ()>) -> Vec<Vec<NodeIndex>> {
    tarjan_scc(graph)
        .into_iter()
        .filter(|component| {
            component.len() > 1
                || component
                    .first()
                    .is_some_and(|node| graph.find_edge(*node, *node).is_some())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use modgraph_core::parse;

    fn cyclic_paths(text: &str) -> Vec<String> {
        let deps = parse(text, false);
        detect_cycles(&deps)
            .into_iter()
            .map(|id| deps.node(id).path.clone())
            .collect()
    }

    #[test]
    fn three_node_cycle_plus_tail() {
        let text = "a.hx:\n\tb.hx\nb.hx:\n\tc.hx\nc.hx:\n\ta.hx\nd.hx:\n\ta.hx\n";
        assert_eq!(cyclic_paths(text), vec!["a.hx", "b.hx", "c.hx"]);
    }

    #[test]
    fn acyclic_graph_has_no_cycles() {
        let text = "a.hx:\n\tb.hx\n\tc.hx\nb.hx:\n\tc.hx\n";
        assert!(cyclic_paths(text).is_empty());
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let text = "a.hx:\n\ta.hx\n\tb.hx\n";
        assert_eq!(cyclic_paths(text), vec!["a.hx"]);
    }

    #[test]
    fn cycle_through_finished_node_is_found() {
        // The DFS finishes b before reaching c, so c is only found through
        // its strongly connected component.
        let text = "a.hx:\n\tb.hx\n\tc.hx\nb.hx:\n\ta.hx\nc.hx:\n\tb.hx\n";
        assert_eq!(cyclic_paths(text), vec!["a.hx", "b.hx", "c.hx"]);
    }

    #[test]
    fn child_only_nodes_are_part_of_the_universe() {
        let mut deps = DependencyMap::new();
        let a = deps.intern("a.hx", false);
        let b = deps.intern("b.hx", false);
        deps.add_edge(a, b);
        deps.add_edge(b, a);
        assert_eq!(detect_cycles(&deps).len(), 2);
    }

    #[test]
    fn groups_are_sorted_per_component() {
        let text = "x.hx:\n\ty.hx\ny.hx:\n\tx.hx\nb.hx:\n\ta.hx\na.hx:\n\tb.hx\n\tx.hx\nz.hx:\n\tz.hx\n";
        let deps = parse(text, false);
        assert_eq!(
            cycle_groups(&deps),
            vec![
                vec!["a.hx".to_string(), "b.hx".to_string()],
                vec!["x.hx".to_string(), "y.hx".to_string()],
                vec!["z.hx".to_string()],
            ]
        );
    }

    #[test]
    fn removed_nodes_are_ignored() {
        let mut deps = parse("a.hx:\n\tb.hx\nb.hx:\n\ta.hx\n", false);
        let b = deps.get("b.hx").expect("b");
        deps.remove(b);
        assert!(detect_cycles(&deps).is_empty());
    }
}
