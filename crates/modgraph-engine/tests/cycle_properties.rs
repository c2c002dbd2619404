//! Property tests: cycle detection and filtering agree with brute force.

use std::collections::BTreeSet;

use proptest::prelude::*;

use modgraph_core::{DependencyMap, GraphConfig, NodeId};
use modgraph_engine::cycles::detect_cycles;
use modgraph_engine::filter::filter;

fn arb_map() -> impl Strategy<Value = DependencyMap> {
    (1usize..10).prop_flat_map(|n| {
        prop::collection::vec((0..n, 0..n), 0..(n * 3)).prop_map(move |edges| {
            let mut deps = DependencyMap::new();
            let ids: Vec<NodeId> = (0..n).map(|i| deps.intern(&format!("m{i}.hx"), false)).collect();
            for (from, to) in edges {
                deps.add_edge(ids[from], ids[to]);
            }
            deps
        })
    })
}

/// Nodes reachable from `start` in one or more steps.
fn reachable(deps: &DependencyMap, start: NodeId) -> BTreeSet<NodeId> {
    let mut seen = BTreeSet::new();
    let mut stack: Vec<NodeId> = deps.dependencies(start).collect();
    while let Some(node) = stack.pop() {
        if seen.insert(node) {
            stack.extend(deps.dependencies(node));
        }
    }
    seen
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    #[test]
    fn cyclic_nodes_are_exactly_self_reachable(deps in arb_map()) {
        let expected: BTreeSet<NodeId> = deps
            .ids()
            .filter(|&id| reachable(&deps, id).contains(&id))
            .collect();
        prop_assert_eq!(detect_cycles(&deps), expected);
    }

    #[test]
    fn cycle_only_filter_keeps_closed_subgraph(deps in arb_map()) {
        let config = GraphConfig {
            show_only_circular: true,
            ..GraphConfig::default()
        };
        let out = filter(&deps, &config);
        let cyclic = detect_cycles(&deps);
        prop_assert_eq!(out.ids().collect::<BTreeSet<_>>(), cyclic);
        for (from, to) in out.edges() {
            prop_assert!(out.contains(from) && out.contains(to));
        }
    }

    #[test]
    fn thresholds_only_remove_nodes(deps in arb_map(), min_deps in -1i64..4, min_dependants in -1i64..4) {
        let config = GraphConfig {
            hide_min_deps: min_deps,
            hide_min_dependants: min_dependants,
            ..GraphConfig::default()
        };
        let out = filter(&deps, &config);
        prop_assert!(out.path_set().is_subset(&deps.path_set()));
        prop_assert!(out.path_edges().is_subset(&deps.path_edges()));
        if min_deps >= 0 {
            for id in out.ids() {
                let mut others = reachable(&deps, id);
                others.remove(&id);
                prop_assert!(i64::try_from(others.len()).unwrap_or(i64::MAX) > min_deps);
            }
        }
    }
}
