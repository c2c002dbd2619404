//! Structural properties of the dependency-dump parser.

use proptest::prelude::*;

use modgraph_core::parser::parse;

/// A small path alphabet so generated dumps reference the same modules often.
fn arb_path() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!["src", "lib", "C:\\proj\\src", "haxe/std"]),
        prop::sample::select(vec!["a", "b", "pkg/c", "pkg/d", "pkg\\e"]),
        any::<bool>(),
    )
        .prop_map(|(root, file, is_macro)| {
            let sep = if root.contains('\\') { '\\' } else { '/' };
            let prefix = if is_macro { "[macro] " } else { "" };
            format!("{prefix}{root}{sep}{file}.hx")
        })
}

fn arb_dump() -> impl Strategy<Value = String> {
    prop::collection::vec(
        (arb_path(), prop::collection::vec(arb_path(), 0..5), any::<bool>()),
        0..8,
    )
    .prop_map(|owners| {
        let mut text = String::new();
        for (owner, children, crlf) in owners {
            let eol = if crlf { "\r\n" } else { "\n" };
            text.push_str(&owner);
            text.push(':');
            text.push_str(eol);
            for child in children {
                text.push('\t');
                text.push_str(&child);
                text.push_str(eol);
            }
        }
        text
    })
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(256))]

    #[test]
    fn every_referenced_node_is_a_key(text in arb_dump(), invert in any::<bool>()) {
        let deps = parse(&text, invert);
        for (from, to) in deps.edges() {
            prop_assert!(deps.contains(from));
            prop_assert!(deps.contains(to));
        }
    }

    #[test]
    fn parsing_twice_is_isomorphic(text in arb_dump()) {
        let first = parse(&text, false);
        let second = parse(&text, false);
        prop_assert_eq!(first.path_set(), second.path_set());
        prop_assert_eq!(first.path_edges(), second.path_edges());
    }

    #[test]
    fn inverting_reverses_every_edge(text in arb_dump()) {
        let forward = parse(&text, false);
        let inverted = parse(&text, true);
        let reversed: std::collections::BTreeSet<(String, String)> = forward
            .path_edges()
            .into_iter()
            .map(|(from, to)| (to, from))
            .collect();
        prop_assert_eq!(forward.path_set(), inverted.path_set());
        prop_assert_eq!(reversed, inverted.path_edges());
    }

    #[test]
    fn paths_never_keep_backslashes(text in arb_dump()) {
        let deps = parse(&text, false);
        for (_, node) in deps.nodes() {
            prop_assert!(!node.path.contains('\\'));
            prop_assert!(!node.path.starts_with("[macro] "));
        }
    }
}
