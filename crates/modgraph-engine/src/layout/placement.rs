//! Initial node positions per [`LayoutInit`] scheme.
//!
//! - `bubble`: nodes are packed into nested rings, one ring per package
//!   level, so packages start out as visual clusters.
//! - `circle`: every node on one ring, in node order.
//! - `topdown`: a single column at `x = 10`, ordered by size.

use std::collections::HashMap;
use std::f64::consts::TAU;

use modgraph_core::LayoutInit;

use crate::build::RenderNode;

/// Column used by the `topdown` scheme.
pub const TOPDOWN_X: f64 = 10.0;
/// Vertical distance per unit of node size in the `topdown` scheme.
pub const TOPDOWN_SPACING: f64 = 60.0;

/// Gap kept around every node when packing.
const PADDING: f64 = 1.0;
/// Extra ring length so neighbors on a ring do not touch.
const RING_SLACK: f64 = 1.15;

/// One position per node, in node order.
#[must_use]
pub fn initial_positions(nodes: &[RenderNode], init: LayoutInit) -> Vec<(f64, f64)> {
    match init {
        LayoutInit::Bubble => bubble(nodes),
        LayoutInit::Circle => circle(nodes),
        LayoutInit::Topdown => nodes
            .iter()
            .map(|node| (TOPDOWN_X, node.size * TOPDOWN_SPACING))
            .collect(),
    }
}

#[allow(clippy::cast_precision_loss)]
fn circle(nodes: &[RenderNode]) -> Vec<(f64, f64)> {
    let count = nodes.len();
    let circumference: f64 = nodes.iter().map(|node| 2.0 * (node.size + PADDING)).sum();
    let radius = (circumference * RING_SLACK / TAU).max(1.0);
    (0..count)
        .map(|i| {
            let angle = TAU * i as f64 / count as f64;
            (radius * angle.cos(), radius * angle.sin())
        })
        .collect()
}

fn bubble(nodes: &[RenderNode]) -> Vec<(f64, f64)> {
    let mut root = Bubble::default();
    for (idx, node) in nodes.iter().enumerate() {
        root.insert(&node.package_path, idx);
    }

    let mut positions = vec![(0.0, 0.0); nodes.len()];
    for (idx, x, y) in root.pack(nodes).spots {
        positions[idx] = (x, y);
    }
    positions
}

/// A package level: its own nodes plus sub-packages, in insertion order.
#[derive(Debug, Default)]
struct Bubble {
    members: Vec<usize>,
    children: Vec<Bubble>,
    index: HashMap<String, usize>,
}

/// A packed group: enclosing radius and member offsets from its center.
struct Packed {
    radius: f64,
    spots: Vec<(usize, f64, f64)>,
}

impl Bubble {
    fn insert(&mut self, segments: &[String], member: usize) {
        let Some((first, rest)) = segments.split_first() else {
            self.members.push(member);
            return;
        };
        let slot = if let Some(&slot) = self.index.get(first) {
            slot
        } else {
            self.children.push(Self::default());
            self.index.insert(first.clone(), self.children.len() - 1);
            self.children.len() - 1
        };
        self.children[slot].insert(rest, member);
    }

    fn pack(&self, nodes: &[RenderNode]) -> Packed {
        let items = self
            .members
            .iter()
            .map(|&idx| Packed {
                radius: nodes[idx].size + PADDING,
                spots: vec![(idx, 0.0, 0.0)],
            })
            .chain(self.children.iter().map(|child| child.pack(nodes)))
            .collect();
        ring(items)
    }
}

/// Place `items` around one ring, each taking an arc proportional to its
/// diameter.
fn ring(mut items: Vec<Packed>) -> Packed {
    if items.len() <= 1 {
        return items.pop().unwrap_or(Packed {
            radius: 0.0,
            spots: Vec::new(),
        });
    }

    let circumference: f64 = items.iter().map(|item| 2.0 * item.radius).sum();
    let largest = items.iter().map(|item| item.radius).fold(0.0, f64::max);
    if circumference <= f64::EPSILON {
        return Packed {
            radius: 0.0,
            spots: items.into_iter().flat_map(|item| item.spots).collect(),
        };
    }
    let ring_radius = (circumference * RING_SLACK / TAU).max(largest);

    let mut spots = Vec::new();
    let mut angle = 0.0;
    for item in items {
        let share = 2.0 * item.radius / circumference * TAU;
        let theta = share.mul_add(0.5, angle);
        angle += share;
        let (dx, dy) = (ring_radius * theta.cos(), ring_radius * theta.sin());
        spots.extend(item.spots.into_iter().map(|(idx, x, y)| (idx, x + dx, y + dy)));
    }

    Packed {
        radius: ring_radius + largest,
        spots,
    }
}
