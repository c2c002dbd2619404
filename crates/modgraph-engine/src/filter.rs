//! Node filtering.
//!
//! Three passes run in a fixed order on a working copy of the map, each one
//! seeing the output of the previous:
//!
//! 1. **Exclusion**: standard library, `import.hx` shims and enabled custom
//!    patterns, all matched against the normalized path.
//! 2. **Cycle-only**: with `showOnlyCircular`, every node not on a cycle.
//! 3. **Thresholds**: nodes whose transitive dependency (or dependant) count
//!    is at most `hideMinDeps` (or `hideMinDependants`). Counts are taken on
//!    the pass input, before any removal.
//!
//! Removing a node drops it as a key and from every dependency set, so the
//! output still satisfies "every referenced node is a key".

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::LazyLock;

use modgraph_core::{DependencyMap, GraphConfig, NodeId};
use regex::Regex;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::cycles::detect_cycles;
use crate::labels::STD_PATTERN;

/// `import.hx` shims.
pub const IMPORT_PATTERN: &str = r".+/import\.hx$";

static STD_RULE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(STD_PATTERN).ok());
static IMPORT_RULE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(IMPORT_PATTERN).ok());

/// How many nodes and edges each pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    pub excluded: usize,
    pub acyclic: usize,
    pub below_threshold: usize,
    pub edges_before: usize,
    pub edges_after: usize,
}

impl FilterReport {
    /// Total nodes removed by all passes.
    #[must_use]
    pub const fn removed(&self) -> usize {
        self.excluded + self.acyclic + self.below_threshold
    }
}

/// Path patterns a node is hidden by.
#[derive(Debug, Clone, Default)]
pub struct ExclusionRules {
    rules: Vec<Regex>,
}

impl ExclusionRules {
    /// Compile the exclusions enabled in `config`. Custom patterns that do not
    /// compile never match.
    #[must_use]
    pub fn from_config(config: &GraphConfig) -> Self {
        let mut rules = Vec::new();
        if config.hide_std {
            rules.extend(STD_RULE.iter().cloned());
        }
        if config.hide_import {
            rules.extend(IMPORT_RULE.iter().cloned());
        }
        for rule in config.hide_custom.iter().filter(|rule| rule.enabled) {
            match rule.compile() {
                Some(regex) => rules.push(regex),
                None => warn!(pattern = rule.pattern.as_str(), "hide rule does not compile, ignoring"),
            }
        }
        Self { rules }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Whether any rule matches `path`.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.rules.iter().any(|rule| rule.is_match(path))
    }
}

/// Apply every enabled pass and return the filtered copy.
#[must_use]
pub fn filter(deps: &DependencyMap, config: &GraphConfig) -> DependencyMap {
    filter_with_report(deps, config).0
}

/// [`filter`] plus a per-pass account of what was removed.
#[must_use]
#[instrument(skip_all, fields(nodes = deps.len()))]
pub fn filter_with_report(deps: &DependencyMap, config: &GraphConfig) -> (DependencyMap, FilterReport) {
    let mut working = deps.clone();
    let mut report = FilterReport {
        edges_before: deps.edge_count(),
        ..FilterReport::default()
    };

    let exclusions = ExclusionRules::from_config(config);
    if !exclusions.is_empty() {
        let before = working.len();
        working.retain(|_, node| !exclusions.matches(&node.path));
        report.excluded = before - working.len();
    }

    if config.show_only_circular {
        let cyclic = detect_cycles(&working);
        let before = working.len();
        working.retain(|id, _| cyclic.contains(&id));
        report.acyclic = before - working.len();
    }

    if config.thresholds_enabled() {
        let doomed = below_thresholds(&working, config);
        report.below_threshold = doomed.len();
        working.retain(|id, _| !doomed.contains(&id));
    }

    report.edges_after = working.edge_count();
    debug!(
        excluded = report.excluded,
        acyclic = report.acyclic,
        below_threshold = report.below_threshold,
        edges_before = report.edges_before,
        edges_after = report.edges_after,
        "filter passes finished"
    );
    (working, report)
}

fn below_thresholds(deps: &DependencyMap, config: &GraphConfig) -> BTreeSet<NodeId> {
    let mut reach = Reachability::new(deps);
    let mut doomed = BTreeSet::new();

    for id in deps.ids() {
        let mut remove = false;
        if config.hide_min_deps > -1 {
            remove = count_as_i64(reach.count(id, Walk::Dependencies)) <= config.hide_min_deps;
        }
        if !remove && config.hide_min_dependants > -1 {
            remove = count_as_i64(reach.count(id, Walk::Dependants)) <= config.hide_min_dependants;
        }
        if remove {
            doomed.insert(id);
        }
    }
    doomed
}

fn count_as_i64(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Direction of a reachability walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Walk {
    /// Follow edges toward dependencies.
    Dependencies,
    /// Follow edges backward toward dependants.
    Dependants,
}

/// Memoized transitive reachability counts for one map.
///
/// The start node never counts as reachable from itself, even on a cycle.
pub struct Reachability<'a> {
    deps: &'a DependencyMap,
    dependants: HashMap<NodeId, Vec<NodeId>>,
    cache: HashMap<(NodeId, Walk), usize>,
}

impl<'a> Reachability<'a> {
    #[must_use]
    pub fn new(deps: &'a DependencyMap) -> Self {
        Self {
            deps,
            dependants: deps.dependants_index(),
            cache: HashMap::new(),
        }
    }

    /// Number of distinct nodes reachable from `start` walking `walk`.
    pub fn count(&mut self, start: NodeId, walk: Walk) -> usize {
        if let Some(&count) = self.cache.get(&(start, walk)) {
            return count;
        }

        let mut visited = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut count = 0;
        while let Some(current) = queue.pop_front() {
            let next: Vec<NodeId> = match walk {
                Walk::Dependencies => self.deps.dependencies(current).collect(),
                Walk::Dependants => self.dependants.get(&current).cloned().unwrap_or_default(),
            };
            for node in next {
                if visited.insert(node) {
                    count += 1;
                    queue.push_back(node);
                }
            }
        }

        self.cache.insert((start, walk), count);
        count
    }
}
