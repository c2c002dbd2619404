//! Degree metrics and size interpolation.
//!
//! A *direct* degree is the number of neighbors in one direction. A
//! *recursive* degree is the sum of direct degrees over every node reachable
//! from the start in that direction, the start itself included once.

use std::collections::HashMap;

use modgraph_core::SizeMetric;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};

/// Walk direction on the rendered graph for `metric`.
///
/// Rendered edges point toward dependencies when
/// `edges_toward_dependencies` is set and toward dependants otherwise.
#[must_use]
pub const fn metric_direction(metric: SizeMetric, edges_toward_dependencies: bool) -> Direction {
    if metric.follows_dependencies() == edges_toward_dependencies {
        Direction::Outgoing
    } else {
        Direction::Incoming
    }
}

/// Degree of every node, memoized per node for one evaluation.
pub struct DegreeCalculator<'g, N, E> {
    graph: &'g DiGraph<N, E>,
    direction: Direction,
    recursive: bool,
    memo: HashMap<NodeIndex, usize>,
}

impl<'g, N, E> DegreeCalculator<'g, N, E> {
    #[must_use]
    pub fn new(graph: &'g DiGraph<N, E>, direction: Direction, recursive: bool) -> Self {
        Self {
            graph,
            direction,
            recursive,
            memo: HashMap::new(),
        }
    }

    /// Neighbor count of `node` in the calculator's direction.
    #[must_use]
    pub fn direct(&self, node: NodeIndex) -> usize {
        self.graph.neighbors_directed(node, self.direction).count()
    }

    /// Direct or recursive degree of `node`, depending on configuration.
    pub fn degree(&mut self, node: NodeIndex) -> usize {
        if !self.recursive {
            return self.direct(node);
        }
        if let Some(&degree) = self.memo.get(&node) {
            return degree;
        }

        let graph = self.graph;
        let mut total = 0;
        match self.direction {
            Direction::Outgoing => {
                let mut dfs = Dfs::new(graph, node);
                while let Some(visited) = dfs.next(graph) {
                    total += self.direct(visited);
                }
            }
            Direction::Incoming => {
                let reversed = Reversed(graph);
                let mut dfs = Dfs::new(reversed, node);
                while let Some(visited) = dfs.next(reversed) {
                    total += self.direct(visited);
                }
            }
        }

        self.memo.insert(node, total);
        total
    }
}

/// Degree of every node of `graph`.
#[must_use]
pub fn compute_degrees<N, E>(
    graph: &DiGraph<N, E>,
    direction: Direction,
    recursive: bool,
) -> HashMap<NodeIndex, usize> {
    let mut calc = DegreeCalculator::new(graph, direction, recursive);
    graph
        .node_indices()
        .map(|idx| (idx, calc.degree(idx)))
        .collect()
}

/// Linear map from degree to radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeScale {
    min: f64,
    max: f64,
    max_degree: usize,
}

impl SizeScale {
    /// Bounds given in reverse order are swapped.
    #[must_use]
    pub fn new(min: f64, max: f64, max_degree: usize) -> Self {
        let (min, max) = if min > max { (max, min) } else { (min, max) };
        Self { min, max, max_degree }
    }

    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    /// Radius for `degree`. Every node gets the minimum when the largest
    /// degree is zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn radius(&self, degree: usize) -> f64 {
        if self.max_degree == 0 {
            return self.min;
        }
        let ratio = degree as f64 / self.max_degree as f64;
        ratio.mul_add(self.max - self.min, self.min)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// a → b → c, a → c
    fn sample() -> (DiGraph<&'static str, ()>, [NodeIndex; 3]) {
        let mut graph = DiGraph::new();
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        let c = graph.add_node("c");
        graph.add_edge(a, b, ());
        graph.add_edge(b, c, ());
        graph.add_edge(a, c, ());
        (graph, [a, b, c])
    }

    #[test]
    fn direct_degrees_in_both_directions() {
        let (graph, [a, b, c]) = sample();
        let out = compute_degrees(&graph, Direction::Outgoing, false);
        assert_eq!((out[&a], out[&b], out[&c]), (2, 1, 0));
        let inc = compute_degrees(&graph, Direction::Incoming, false);
        assert_eq!((inc[&a], inc[&b], inc[&c]), (0, 1, 2));
    }

    #[test]
    fn recursive_degree_sums_reachable_direct_degrees() {
        let (graph, [a, b, c]) = sample();
        let out = compute_degrees(&graph, Direction::Outgoing, true);
        assert_eq!(out[&a], 3);
        assert_eq!(out[&b], 1);
        assert_eq!(out[&c], 0);
        let inc = compute_degrees(&graph, Direction::Incoming, true);
        assert_eq!(inc[&c], 3);
        assert_eq!(inc[&b], 1);
    }

    #[test]
    fn recursive_degree_terminates_on_cycles() {
        let mut graph: DiGraph<(), ()> = DiGraph::new();
        let a = graph.add_node(());
        let b = graph.add_node(());
        graph.add_edge(a, b, ());
        graph.add_edge(b, a, ());
        let mut calc = DegreeCalculator::new(&graph, Direction::Outgoing, true);
        assert_eq!(calc.degree(a), 2);
        assert_eq!(calc.degree(a), 2);
    }

    #[test]
    fn metric_direction_depends_on_edge_orientation() {
        assert_eq!(metric_direction(SizeMetric::Dependencies, true), Direction::Outgoing);
        assert_eq!(metric_direction(SizeMetric::DependantsRec, true), Direction::Incoming);
        assert_eq!(metric_direction(SizeMetric::Dependencies, false), Direction::Incoming);
        assert_eq!(metric_direction(SizeMetric::Dependants, false), Direction::Outgoing);
    }

    #[test]
    fn size_scale_interpolates_linearly() {
        let scale = SizeScale::new(2.0, 12.0, 10);
        assert!((scale.radius(0) - 2.0).abs() < 1e-9);
        assert!((scale.radius(5) - 7.0).abs() < 1e-9);
        assert!((scale.radius(10) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn size_scale_guards_zero_and_reversed_bounds() {
        let flat = SizeScale::new(2.0, 15.0, 0);
        assert!((flat.radius(3) - 2.0).abs() < 1e-9);

        let reversed = SizeScale::new(15.0, 2.0, 4);
        assert!((reversed.min() - 2.0).abs() < 1e-9);
        assert!((reversed.radius(4) - 15.0).abs() < 1e-9);
    }
}
