//! End-to-end pipeline scenarios: parse, build, query.

use std::collections::BTreeSet;

use modgraph_core::{GraphConfig, LayoutInit, parse};
use modgraph_engine::build::build;
use modgraph_engine::cycles::{cycle_groups, detect_cycles};
use modgraph_engine::filter::filter;
use modgraph_engine::query::{SearchResult, search, select};

const CYCLE: &str = "a.hx:\n\tb.hx\nb.hx:\n\tc.hx\nc.hx:\n\ta.hx\nd.hx:\n\ta.hx\n";

const PROJECT: &str = "\
/home/dev/game/src/game/Main.hx:
\t/home/dev/game/src/game/Player.hx
\t/usr/share/haxe/std/haxe/ds/StringMap.hx
\t/usr/share/haxe/std/haxe/ds/IntMap.hx
\t/home/dev/game/src/game/import.hx
/home/dev/game/src/game/Player.hx:
\t[macro] /home/dev/game/src/game/Macros.hx
\t/home/dev/game/haxe_libraries/tink_core/2.1.0/haxelib/tink/core/Future.hx
";

fn no_hiding() -> GraphConfig {
    GraphConfig {
        hide_std: false,
        hide_import: false,
        ..GraphConfig::default()
    }
}

#[test]
fn three_node_cycle_is_detected_and_isolated() {
    let deps = parse(CYCLE, false);
    let cyclic: BTreeSet<String> = detect_cycles(&deps)
        .into_iter()
        .map(|id| deps.node(id).path.clone())
        .collect();
    assert_eq!(
        cyclic,
        BTreeSet::from(["a.hx".to_string(), "b.hx".to_string(), "c.hx".to_string()])
    );
    assert_eq!(cycle_groups(&deps).len(), 1);

    let config = GraphConfig {
        show_only_circular: true,
        ..GraphConfig::default()
    };
    let graph = build(&deps, &config, None);
    assert_eq!(graph.len(), 3);
    assert_eq!(graph.edges.len(), 3);
    assert!(graph.nodes.iter().all(|node| node.cyclic));
}

#[test]
fn realistic_dump_gets_smart_labels() {
    let graph = build(&parse(PROJECT, false), &no_hiding(), None);
    let label = |path: &str| graph.node(path).expect(path).label.clone();

    assert_eq!(label("/home/dev/game/src/game/Main.hx"), "game/Main");
    assert_eq!(label("/usr/share/haxe/std/haxe/ds/StringMap.hx"), "haxe/ds/StringMap");
    assert_eq!(
        label("/home/dev/game/haxe_libraries/tink_core/2.1.0/haxelib/tink/core/Future.hx"),
        "tink/core/Future"
    );
    assert_eq!(label("/home/dev/game/src/game/Macros.hx"), "[macro] game/Macros");
}

#[test]
fn default_config_hides_std_and_import_shims() {
    let graph = build(&parse(PROJECT, false), &GraphConfig::default(), None);
    let paths: Vec<&str> = graph.paths().collect();
    assert_eq!(paths.len(), 4);
    assert!(paths.iter().all(|path| !path.contains("/std/") && !path.ends_with("import.hx")));
    assert_eq!(graph.report.filter.excluded, 3);
}

#[test]
fn shared_package_shares_color_and_colors_are_stable() {
    let deps = parse(PROJECT, false);
    let first = build(&deps, &no_hiding(), None);
    let color = |path: &str| first.node(path).expect(path).color;
    assert_eq!(
        color("/usr/share/haxe/std/haxe/ds/StringMap.hx"),
        color("/usr/share/haxe/std/haxe/ds/IntMap.hx")
    );
    assert_ne!(
        color("/usr/share/haxe/std/haxe/ds/StringMap.hx"),
        color("/home/dev/game/src/game/Main.hx")
    );

    let second = build(&deps, &no_hiding(), None);
    for (a, b) in first.nodes.iter().zip(&second.nodes) {
        assert_eq!(a.color, b.color);
    }

    // Filtering other nodes out does not recolor survivors.
    let filtered = build(&deps, &GraphConfig::default(), None);
    for node in &filtered.nodes {
        assert_eq!(node.color, first.node(&node.path).expect("node").color);
    }
}

#[test]
fn disabled_filters_keep_the_parse_result() {
    let deps = parse(PROJECT, false);
    let out = filter(&deps, &no_hiding());
    assert_eq!(out.path_set(), deps.path_set());
    assert_eq!(out.path_edges(), deps.path_edges());
}

#[test]
fn min_deps_threshold_scenario() {
    let deps = parse("a.hx:\n\tb.hx\n", false);
    let config = GraphConfig {
        hide_min_deps: 0,
        ..GraphConfig::default()
    };
    let graph = build(&deps, &config, None);
    assert_eq!(graph.paths().collect::<Vec<_>>(), vec!["a.hx"]);
    assert!(graph.edges.is_empty());
}

#[test]
fn every_edge_endpoint_is_a_node() {
    let graph = build(&parse(PROJECT, false), &GraphConfig::default(), None);
    for edge in &graph.edges {
        assert!(edge.source < graph.len());
        assert!(edge.target < graph.len());
    }
    for edge in &graph.cluster_edges {
        assert!(edge.a < graph.len() && edge.b < graph.len());
    }
}

#[test]
fn sizes_stay_within_bounds() {
    for layout_init in [LayoutInit::Bubble, LayoutInit::Circle, LayoutInit::Topdown] {
        let config = GraphConfig {
            layout_init,
            visual_size_min: 20.0,
            visual_size_max: 4.0,
            ..GraphConfig::default()
        };
        let graph = build(&parse(CYCLE, false), &config, None);
        assert!((graph.min_radius - 4.0).abs() < 1e-9);
        assert!((graph.max_radius - 20.0).abs() < 1e-9);
        for node in &graph.nodes {
            assert!(node.size >= 4.0 - 1e-9 && node.size <= 20.0 + 1e-9);
            assert!(node.x.is_finite() && node.y.is_finite());
        }
    }
}

#[test]
fn select_then_search_round() {
    let graph = build(&parse(CYCLE, false), &GraphConfig::default(), None);
    let SearchResult::Exact(d) = search(&graph, "d.hx") else {
        panic!("expected an exact match");
    };
    let selection = select(&graph, d).expect("select");
    assert_eq!(selection.counts.total_dependencies, 3);
    assert_eq!(selection.counts.total_dependants, 0);
    assert!(selection.cycle_edges.is_empty());
}

#[test]
fn graph_serializes_for_consumers() {
    let graph = build(&parse(CYCLE, false), &GraphConfig::default(), None);
    let value = serde_json::to_value(&graph).expect("serialize");
    let node = &value["nodes"][0];
    for key in ["label", "size", "color", "x", "y"] {
        assert!(node.get(key).is_some(), "missing node field {key}");
    }
    let edge = &value["edges"][0];
    assert_eq!(edge["type"], "arrow");
    assert!(edge["weight"].is_number());
    assert!(node["color"].as_str().is_some_and(|c| c.starts_with('#') && c.len() == 7));
}
