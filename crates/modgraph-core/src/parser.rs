//! Parser for indented adjacency dumps.
//!
//! # Format
//!
//! ```text
//! src/Main.hx:
//! 	src/pkg/Util.hx
//! 	[macro] src/pkg/Build.hx
//! src/pkg/Util.hx:
//! ```
//!
//! A line without a leading tab names an *owner*; its final character (the
//! `:` delimiter) is dropped. Each following tab-indented line names one
//! dependency of that owner. Lines may end in `\n` or `\r\n`; blank lines are
//! skipped. A leading `[macro] ` marks a node loaded in a macro context.
//!
//! The format carries no direction marker. Dumps listing *dependants* are
//! parsed with `invert = true`, usually decided by [`is_dependants_file`].

use tracing::{debug, instrument};

use crate::model::{DependencyMap, MACRO_PREFIX};

/// Fewer nodes than this means the text was not a dependency dump.
pub const MIN_NODES: usize = 2;

/// Parse `text` into a [`DependencyMap`].
///
/// With `invert`, every `(owner, dependency)` pair is recorded as
/// `dependency → owner`. Never fails: empty input yields an empty map, and an
/// indented line with no preceding owner is ignored.
#[instrument(skip(text), fields(bytes = text.len()))]
#[must_use]
pub fn parse(text: &str, invert: bool) -> DependencyMap {
    let mut deps = DependencyMap::new();
    let mut owner = None;

    for line in text.lines() {
        // `lines()` already strips `\n` and `\r\n`.
        if line.is_empty() {
            continue;
        }

        if let Some(child) = line.strip_prefix('\t') {
            let Some(owner) = owner else {
                debug!(line, "dependency line without owner, skipping");
                continue;
            };
            let (path, is_macro) = split_macro(child);
            let child = deps.intern(path, is_macro);
            if invert {
                deps.add_edge(child, owner);
            } else {
                deps.add_edge(owner, child);
            }
        } else {
            let (path, is_macro) = split_macro(strip_delimiter(line));
            owner = Some(deps.intern(path, is_macro));
        }
    }

    debug!(
        nodes = deps.len(),
        edges = deps.edge_count(),
        invert,
        "parsed dependency dump"
    );
    deps
}

/// Whether a dump file name denotes a dependants listing.
#[must_use]
pub fn is_dependants_file(name: &str) -> bool {
    name.contains("dependants")
}

/// Heuristic rejecting accidental pastes that are not dependency dumps.
#[must_use]
pub fn looks_like_dependencies(deps: &DependencyMap) -> bool {
    deps.len() >= MIN_NODES
}

fn strip_delimiter(line: &str) -> &str {
    let mut chars = line.chars();
    chars.next_back();
    chars.as_str()
}

fn split_macro(path: &str) -> (&str, bool) {
    path.strip_prefix(MACRO_PREFIX)
        .map_or((path, false), |rest| (rest, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CYCLE: &str = "a.hx:\n\tb.hx\nb.hx:\n\tc.hx\nc.hx:\n\ta.hx\n";

    #[test]
    fn empty_input_yields_empty_map() {
        assert!(parse("", false).is_empty());
        assert!(parse("\n\r\n\n", false).is_empty());
    }

    #[test]
    fn owners_and_children_become_keys() {
        let deps = parse("src/Main.hx:\n\tsrc/Util.hx\n", false);
        assert_eq!(deps.len(), 2);
        let main = deps.get("src/Main.hx").expect("owner");
        let util = deps.get("src/Util.hx").expect("child");
        assert_eq!(deps.dependencies(main).collect::<Vec<_>>(), vec![util]);
        assert_eq!(deps.dependency_count(util), 0);
    }

    #[test]
    fn crlf_lines_are_accepted() {
        let deps = parse("a.hx:\r\n\tb.hx\r\n", false);
        assert!(deps.get("a.hx").is_some());
        assert!(deps.get("b.hx").is_some());
        assert_eq!(deps.edge_count(), 1);
    }

    #[test]
    fn three_cycle_scenario() {
        let deps = parse(CYCLE, false);
        assert_eq!(deps.len(), 3);
        let edges = deps.path_edges();
        for (from, to) in [("a.hx", "b.hx"), ("b.hx", "c.hx"), ("c.hx", "a.hx")] {
            assert!(edges.contains(&(from.to_string(), to.to_string())));
        }
    }

    #[test]
    fn invert_records_dependants() {
        let deps = parse("lib/A.hx:\n\tlib/B.hx\n", true);
        let a = deps.get("lib/A.hx").expect("a");
        let b = deps.get("lib/B.hx").expect("b");
        assert_eq!(deps.dependencies(b).collect::<Vec<_>>(), vec![a]);
        assert_eq!(deps.dependency_count(a), 0);
    }

    #[test]
    fn backslashes_collide_with_forward_slashes() {
        let deps = parse("C:\\proj\\src\\A.hx:\n\tC:/proj/src/B.hx\nC:/proj/src/A.hx:\n\tC:\\proj\\src\\B.hx\n", false);
        assert_eq!(deps.len(), 2);
        assert_eq!(deps.edge_count(), 1);
    }

    #[test]
    fn macro_prefix_is_stripped_and_flagged() {
        let deps = parse("src/Main.hx:\n\t[macro] src/Build.hx\n", false);
        let build = deps.get("src/Build.hx").expect("macro node");
        assert!(deps.node(build).is_macro);
        let main = deps.get("src/Main.hx").expect("owner");
        assert!(!deps.node(main).is_macro);
    }

    #[test]
    fn orphan_dependency_line_is_ignored() {
        let deps = parse("\tstray.hx\na.hx:\n\tb.hx\n", false);
        assert!(deps.get("stray.hx").is_none());
        assert_eq!(deps.len(), 2);
    }

    #[test]
    fn owner_without_dependencies_is_kept() {
        let deps = parse("lonely.hx:\n", false);
        assert_eq!(deps.len(), 1);
        assert!(!looks_like_dependencies(&deps));
    }

    #[test]
    fn dependants_file_detection() {
        assert!(is_dependants_file("dump/cpp/dependants.txt"));
        assert!(!is_dependants_file("dump/cpp/dependencies.txt"));
    }
}
