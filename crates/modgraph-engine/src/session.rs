//! Long-lived graph session.
//!
//! A [`Session`] owns everything that outlives one pipeline run: the config
//! store, the last good dependency map, the current graph, the selection and
//! the running layout. Every user config change goes through
//! [`Session::update_config`], which persists the record and recomputes.
//! Loading a dump only adjusts the in-memory direction flag.

use anyhow::{Context, Result};
use modgraph_core::parser::looks_like_dependencies;
use modgraph_core::store::{CONFIG_KEY, ConfigStore, load_config, save_config};
use modgraph_core::{DependencyMap, GraphConfig, parse};
use tracing::{debug, info, instrument, warn};

use crate::build::{RenderableGraph, build};
use crate::layout::{LayoutSession, LayoutSettings, LayoutStatus};
use crate::query::{SearchResult, Selection, search, select};

pub struct Session {
    store: Box<dyn ConfigStore>,
    config: GraphConfig,
    base: Option<DependencyMap>,
    graph: RenderableGraph,
    selected: Option<String>,
    selection: Option<Selection>,
    layout: LayoutSession,
}

impl Session {
    /// Open a session on `store`, loading the persisted config.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn open(store: Box<dyn ConfigStore>) -> Result<Self> {
        let config = load_config(store.as_ref()).context("failed to load config")?;
        Ok(Self {
            store,
            config,
            base: None,
            graph: RenderableGraph::default(),
            selected: None,
            selection: None,
            layout: LayoutSession::new(),
        })
    }

    #[must_use]
    pub const fn config(&self) -> &GraphConfig {
        &self.config
    }

    #[must_use]
    pub const fn graph(&self) -> &RenderableGraph {
        &self.graph
    }

    /// The last accepted dependency map, unfiltered.
    #[must_use]
    pub const fn dependencies(&self) -> Option<&DependencyMap> {
        self.base.as_ref()
    }

    #[must_use]
    pub const fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    #[must_use]
    pub fn selected_path(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    #[must_use]
    pub const fn layout_status(&self) -> LayoutStatus {
        self.layout.status()
    }

    /// Simulation steps merged into the current positions.
    #[must_use]
    pub const fn layout_iterations(&self) -> usize {
        self.layout.iterations()
    }

    /// Parse `text` and make it the current graph.
    ///
    /// Text that yields fewer than two modules is rejected (returns `false`)
    /// and the previous graph stays. An accepted dependants listing flips
    /// `visualDependencies` off so arrows keep pointing the way the dump does.
    /// The flip is not persisted; only [`Session::update_config`] writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout cannot start.
    #[instrument(skip(self, text), fields(bytes = text.len()))]
    pub fn load_text(&mut self, text: &str, is_dependants: bool) -> Result<bool> {
        let deps = parse(text, is_dependants);
        if !looks_like_dependencies(&deps) {
            warn!(nodes = deps.len(), "input is not a dependency dump, keeping previous graph");
            return Ok(false);
        }
        info!(nodes = deps.len(), edges = deps.edge_count(), "dependency map loaded");
        self.base = Some(deps);
        self.config.visual_dependencies = !is_dependants;
        self.recompute()?;
        Ok(true)
    }

    /// Rebuild the graph from the current map and config, carrying positions
    /// over, and restart the layout.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout worker cannot start.
    pub fn recompute(&mut self) -> Result<()> {
        self.rebuild(false)
    }

    /// Rebuild with fresh initial positions.
    ///
    /// # Errors
    ///
    /// Returns an error if the layout worker cannot start.
    pub fn reset_positions(&mut self) -> Result<()> {
        self.rebuild(true)
    }

    /// Mutate the config, normalize and persist it, then recompute.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails or the layout cannot start.
    pub fn update_config(&mut self, change: impl FnOnce(&mut GraphConfig)) -> Result<()> {
        change(&mut self.config);
        let report = self.config.validate();
        for field in &report.adjusted {
            warn!(field, "config value out of range, adjusted");
        }
        save_config(self.store.as_mut(), &self.config).context("failed to save config")?;
        self.recompute()
    }

    /// Forget the persisted record and go back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails or the layout cannot start.
    pub fn reset_config(&mut self) -> Result<()> {
        self.store.remove(CONFIG_KEY).context("failed to clear config")?;
        self.config = GraphConfig::default();
        self.recompute()
    }

    /// Select the node at `path`, or clear the selection with `None`.
    /// Unknown paths clear it too.
    pub fn select(&mut self, path: Option<&str>) -> Option<&Selection> {
        self.selection = path
            .and_then(|path| self.graph.node_index(path))
            .and_then(|idx| select(&self.graph, idx));
        self.selected = self
            .selection
            .as_ref()
            .map(|selection| self.graph.nodes[selection.node].path.clone());
        self.selection.as_ref()
    }

    /// Search labels; an exact single hit becomes the selection, anything
    /// else clears it.
    pub fn search(&mut self, query: &str) -> SearchResult {
        let result = search(&self.graph, query);
        let exact = match &result {
            SearchResult::Exact(idx) => Some(self.graph.nodes[*idx].path.clone()),
            _ => None,
        };
        self.select(exact.as_deref());
        result
    }

    /// Merge layout progress into the graph.
    pub fn poll_layout(&mut self) -> LayoutStatus {
        self.layout.poll(&mut self.graph)
    }

    /// Poll until the layout settles or `max_polls` is spent.
    pub fn wait_layout(&mut self, max_polls: usize) -> LayoutStatus {
        self.layout.wait(&mut self.graph, max_polls)
    }

    pub fn stop_layout(&mut self) {
        self.layout.stop();
    }

    fn rebuild(&mut self, reset: bool) -> Result<()> {
        let Some(base) = &self.base else {
            debug!("nothing loaded, skipping rebuild");
            return Ok(());
        };

        self.layout.stop();
        let previous = (!reset).then_some(&self.graph);
        self.graph = build(base, &self.config, previous);

        let selected = self.selected.take();
        if self.select(selected.as_deref()).is_none() && selected.is_some() {
            debug!(path = selected.as_deref(), "selected node vanished, selection cleared");
        }

        self.layout
            .start(&self.graph, &LayoutSettings::from_config(&self.config))
            .context("failed to start layout")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modgraph_core::StoreError;
    use modgraph_core::store::MemoryStore;

    const CYCLE: &str = "a.hx:\n\tb.hx\nb.hx:\n\tc.hx\nc.hx:\n\ta.hx\nd.hx:\n\ta.hx\n";

    fn session() -> Session {
        let mut session = Session::open(Box::new(MemoryStore::new())).expect("open");
        session
            .update_config(|config| config.layout_enable = false)
            .expect("disable layout");
        session
    }

    #[test]
    fn rejects_non_dependency_text() {
        let mut session = session();
        assert!(session.load_text(CYCLE, false).expect("load"));
        assert!(!session.load_text("hello world", false).expect("load"));
        assert_eq!(session.graph().len(), 4);
    }

    #[test]
    fn dependants_listing_flips_direction() {
        let mut session = session();
        assert!(session.load_text(CYCLE, true).expect("load"));
        assert!(!session.config().visual_dependencies);
        assert!(session.load_text(CYCLE, false).expect("load"));
        assert!(session.config().visual_dependencies);
    }

    #[test]
    fn loading_a_dump_leaves_the_store_untouched() {
        let mut session = Session::open(Box::new(MemoryStore::new())).expect("open");
        session.config.layout_enable = false;
        assert!(session.load_text(CYCLE, true).expect("load"));
        assert!(!session.config().visual_dependencies);
        assert!(session.store.get(CONFIG_KEY).expect("get").is_none());
    }

    struct ReadOnlyStore;

    impl ConfigStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::NoConfigDir)
        }

        fn remove(&mut self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::NoConfigDir)
        }
    }

    #[test]
    fn read_only_store_still_loads_dependants() {
        let mut session = Session::open(Box::new(ReadOnlyStore)).expect("open");
        session.config.layout_enable = false;
        assert!(session.load_text(CYCLE, true).expect("load"));
        assert_eq!(session.graph().len(), 4);
        assert!(!session.graph().edges_toward_dependencies);
        assert!(session.update_config(|config| config.hide_std = false).is_err());
    }

    #[test]
    fn selection_survives_recompute_until_node_vanishes() {
        let mut session = session();
        session.load_text(CYCLE, false).expect("load");
        assert!(session.select(Some("d.hx")).is_some());

        session.update_config(|config| config.layout_package_forces = 0.0).expect("update");
        assert_eq!(session.selected_path(), Some("d.hx"));

        session.update_config(|config| config.show_only_circular = true).expect("update");
        assert!(session.selection().is_none());
        assert_eq!(session.selected_path(), None);
    }

    #[test]
    fn config_changes_are_persisted() {
        let mut session = session();
        session.update_config(|config| config.hide_min_deps = -9).expect("update");
        assert_eq!(session.config().hide_min_deps, -1);

        let raw = session.store.get(CONFIG_KEY).expect("get").expect("record");
        let stored: GraphConfig = serde_json::from_str(&raw).expect("parse");
        assert_eq!(&stored, session.config());

        session.reset_config().expect("reset");
        assert!(session.store.get(CONFIG_KEY).expect("get").is_none());
        assert!(session.config().layout_enable);
        session.stop_layout();
    }

    #[test]
    fn exact_search_selects() {
        let mut session = session();
        session.load_text(CYCLE, false).expect("load");
        assert!(matches!(session.search("b.hx"), SearchResult::Exact(_)));
        assert_eq!(session.selected_path(), Some("b.hx"));
        assert!(matches!(session.search(".hx"), SearchResult::Matches(_)));
        assert!(session.selection().is_none());
    }

    #[test]
    fn reset_positions_replaces_moved_nodes() {
        let mut session = session();
        session.load_text(CYCLE, false).expect("load");
        let original = session.graph().nodes[0].clone();
        session.graph.nodes[0].x += 500.0;
        session.recompute().expect("recompute");
        assert!((session.graph().nodes[0].x - original.x - 500.0).abs() < 1e-9);
        session.reset_positions().expect("reset");
        assert!((session.graph().nodes[0].x - original.x).abs() < 1e-9);
    }
}
