//! Dependency map: an arena of modules keyed by normalized path.
//!
//! # Overview
//!
//! Every module path seen in a dependency dump becomes exactly one
//! [`DependencyNode`] stored in an arena owned by the [`DependencyMap`].
//! Nodes are addressed by [`NodeId`], which doubles as insertion order, so
//! iteration over the map is deterministic.
//!
//! ## Edge Direction
//!
//! An entry `A → {B, C}` means "A uses/imports B and C". The parser can
//! invert this when the dump lists dependants instead of dependencies.
//!
//! ## Removal
//!
//! Filter passes remove nodes from a clone of the parsed map. A removed node
//! keeps its arena slot (ids stay stable) but is no longer a key, and every
//! edge pointing at it is dropped, so every referenced node is always a key.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

/// Marker prefix the compiler emits for modules loaded in a macro context.
pub const MACRO_PREFIX: &str = "[macro] ";

/// Arena handle of a [`DependencyNode`]. Ordered by insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in its map's arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A single module, identified by its normalized file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    /// Normalized path (forward slashes). Unique within a map.
    pub path: String,
    /// `true` when any occurrence carried the `[macro] ` prefix.
    pub is_macro: bool,
    label: Option<String>,
    package_path: Vec<String>,
}

impl DependencyNode {
    fn new(path: String, is_macro: bool) -> Self {
        Self {
            path,
            is_macro,
            label: None,
            package_path: Vec::new(),
        }
    }

    /// The resolved label, or the raw path while unresolved.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.path)
    }

    /// Whether a label has been assigned since the last reset.
    #[must_use]
    pub const fn has_label(&self) -> bool {
        self.label.is_some()
    }

    /// Assign a label and derive the package path from it.
    pub fn set_label(&mut self, label: String) {
        self.package_path = package_path_of(&label);
        self.label = Some(label);
    }

    /// Forget the label so it can be resolved again under a new config.
    pub fn clear_label(&mut self) {
        self.label = None;
        self.package_path.clear();
    }

    /// Label segments minus the final one (`a/b/C` → `[a, b]`).
    #[must_use]
    pub fn package_path(&self) -> &[String] {
        &self.package_path
    }
}

/// Split a label on `/` and drop the final segment.
#[must_use]
pub fn package_path_of(label: &str) -> Vec<String> {
    let mut parts: Vec<String> = label.split('/').map(str::to_string).collect();
    parts.pop();
    parts
}

/// Replace backslashes so Windows and Unix spellings collide.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Mapping from every module to the set of modules it directly depends on.
#[derive(Debug, Clone, Default)]
pub struct DependencyMap {
    nodes: Vec<DependencyNode>,
    registry: HashMap<String, NodeId>,
    /// `None` marks a node removed by a filter pass.
    edges: Vec<Option<BTreeSet<NodeId>>>,
}

impl DependencyMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or create the node for `path`, returning its id.
    ///
    /// The path is normalized first. A node that was removed is revived with
    /// an empty dependency set.
    pub fn intern(&mut self, path: &str, is_macro: bool) -> NodeId {
        let path = normalize_path(path);
        if let Some(&id) = self.registry.get(&path) {
            let slot = &mut self.edges[id.0];
            if slot.is_none() {
                *slot = Some(BTreeSet::new());
            }
            self.nodes[id.0].is_macro |= is_macro;
            return id;
        }

        let id = NodeId(self.nodes.len());
        self.registry.insert(path.clone(), id);
        self.nodes.push(DependencyNode::new(path, is_macro));
        self.edges.push(Some(BTreeSet::new()));
        id
    }

    /// Record that `from` directly depends on `to`.
    pub fn add_edge(&mut self, from: NodeId, to: NodeId) {
        if self.contains(to) {
            if let Some(children) = self.edges[from.0].as_mut() {
                children.insert(to);
            }
        }
    }

    /// Id of the live node at `path` (normalized before lookup).
    #[must_use]
    pub fn get(&self, path: &str) -> Option<NodeId> {
        self.registry
            .get(&normalize_path(path))
            .copied()
            .filter(|id| self.contains(*id))
    }

    /// Whether `id` is currently a key of the map.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.edges.get(id.0).is_some_and(Option::is_some)
    }

    /// The node stored under `id` (live or removed).
    ///
    /// # Panics
    ///
    /// Panics if `id` does not come from this map or one of its clones.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &DependencyNode {
        &self.nodes[id.0]
    }

    /// Mutable access to the node stored under `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not come from this map or one of its clones.
    pub fn node_mut(&mut self, id: NodeId) -> &mut DependencyNode {
        &mut self.nodes[id.0]
    }

    /// Live node ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(idx, _)| NodeId(idx))
    }

    /// Live nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &DependencyNode)> + '_ {
        self.ids().map(|id| (id, &self.nodes[id.0]))
    }

    /// Direct dependencies of `id` (empty for removed nodes).
    pub fn dependencies(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .get(id.0)
            .and_then(Option::as_ref)
            .into_iter()
            .flatten()
            .copied()
    }

    /// Number of direct dependencies of `id`.
    #[must_use]
    pub fn dependency_count(&self, id: NodeId) -> usize {
        self.edges
            .get(id.0)
            .and_then(Option::as_ref)
            .map_or(0, BTreeSet::len)
    }

    /// All `(from, to)` edges in insertion order of `from`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.ids()
            .flat_map(move |from| self.dependencies(from).map(move |to| (from, to)))
    }

    /// Reverse adjacency: for every live node, the nodes depending on it.
    #[must_use]
    pub fn dependants_index(&self) -> HashMap<NodeId, Vec<NodeId>> {
        let mut index: HashMap<NodeId, Vec<NodeId>> = HashMap::with_capacity(self.len());
        for (from, to) in self.edges() {
            index.entry(to).or_default().push(from);
        }
        index
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.iter().filter(|slot| slot.is_some()).count()
    }

    /// `true` when no live node remains.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of edges between live nodes.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.iter().flatten().map(BTreeSet::len).sum()
    }

    /// Size of the arena, i.e. one past the largest id ever handed out.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Remove `id` as a key and as a dependency of every other node.
    pub fn remove(&mut self, id: NodeId) {
        if let Some(slot) = self.edges.get_mut(id.0) {
            *slot = None;
        }
        for children in self.edges.iter_mut().flatten() {
            children.remove(&id);
        }
    }

    /// Keep only the nodes for which `keep` returns `true`.
    ///
    /// Rejected nodes lose their entry and every edge pointing at them.
    pub fn retain(&mut self, mut keep: impl FnMut(NodeId, &DependencyNode) -> bool) {
        let rejected: BTreeSet<NodeId> = self
            .nodes()
            .filter(|(id, node)| !keep(*id, node))
            .map(|(id, _)| id)
            .collect();
        if rejected.is_empty() {
            return;
        }
        for id in &rejected {
            self.edges[id.0] = None;
        }
        for children in self.edges.iter_mut().flatten() {
            children.retain(|child| !rejected.contains(child));
        }
    }

    /// Keep only the edges for which `keep(from, to)` returns `true`.
    pub fn retain_edges(&mut self, mut keep: impl FnMut(NodeId, NodeId) -> bool) {
        for (idx, slot) in self.edges.iter_mut().enumerate() {
            if let Some(children) = slot {
                children.retain(|child| keep(NodeId(idx), *child));
            }
        }
    }

    /// Edge set spelled with paths, for structural comparison across parses.
    #[must_use]
    pub fn path_edges(&self) -> BTreeSet<(String, String)> {
        self.edges()
            .map(|(from, to)| (self.node(from).path.clone(), self.node(to).path.clone()))
            .collect()
    }

    /// Live node paths, for structural comparison across parses.
    #[must_use]
    pub fn path_set(&self) -> BTreeSet<String> {
        self.nodes().map(|(_, node)| node.path.clone()).collect()
    }
}
