//! Human-readable node labels.
//!
//! # Rule Order
//!
//! The first rule whose capture group 1 matches non-empty wins:
//!
//! 1. user rules (`smartLabelsCustom`, enabled, in user order)
//! 2. standard library (`…/haxe…/std/<label>.hx`)
//! 3. sources (`…src/<label>.hx`)
//! 4. package managers (haxelib, `haxe_modules`, `haxelib_system`)
//!
//! A path without any `/` is its own label. Whatever is still unlabeled gets
//! the common directory prefix of all unlabeled paths stripped (when
//! `smartLabelsPrefix` is on), in map insertion order so the result is
//! reproducible.

use std::sync::LazyLock;

use modgraph_core::{DependencyMap, GraphConfig, NodeId};
use regex::Regex;
use tracing::{debug, warn};

/// Standard-library modules. Also used by the `hideStd` exclusion.
pub const STD_PATTERN: &str = r".+haxe[0-9a-f_]*(?:/.+)?/std/(.+)\.hx$";
/// Anything below a `src/` folder.
pub const SRC_PATTERN: &str = r".+src/(.+)\.hx$";
/// Package-manager install layouts.
pub const HAXELIB_PATTERNS: [&str; 3] = [
    r".+haxe_libraries/.+/.+/haxelib/(.+)\.hx$",
    r".+haxe_modules/.+/(.+)\.hx$",
    r".+haxelib_system/(.+)\.hx$",
];
/// Extension stripped from prefix-derived labels.
pub const SOURCE_EXTENSION: &str = ".hx";

static STD_RULE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(STD_PATTERN).ok());
static SRC_RULE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(SRC_PATTERN).ok());
static HAXELIB_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    HAXELIB_PATTERNS
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .collect()
});

/// Compiled, ordered label rules for one config evaluation.
#[derive(Debug, Clone, Default)]
pub struct LabelRules {
    rules: Vec<Regex>,
    invalid: Vec<String>,
}

impl LabelRules {
    /// Compile the rules enabled in `config`. Invalid user patterns are
    /// skipped and remembered in [`LabelRules::invalid_patterns`].
    #[must_use]
    pub fn from_config(config: &GraphConfig) -> Self {
        let mut rules = Vec::new();
        let mut invalid = Vec::new();

        for rule in config.smart_labels_custom.iter().filter(|rule| rule.enabled) {
            match rule.compile() {
                Some(regex) => rules.push(regex),
                None => {
                    warn!(pattern = rule.pattern.as_str(), "label rule does not compile, ignoring");
                    invalid.push(rule.pattern.clone());
                }
            }
        }
        if config.smart_labels_std {
            rules.extend(STD_RULE.iter().cloned());
        }
        if config.smart_labels_src {
            rules.extend(SRC_RULE.iter().cloned());
        }
        if config.smart_labels_haxelib {
            rules.extend(HAXELIB_RULES.iter().cloned());
        }

        Self { rules, invalid }
    }

    /// Label for `path` from the first matching rule, or the path itself when
    /// it has no directory part.
    #[must_use]
    pub fn label_for(&self, path: &str) -> Option<String> {
        self.rules
            .iter()
            .find_map(|rule| {
                rule.captures(path)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str())
                    .filter(|label| !label.is_empty())
                    .map(str::to_string)
            })
            .or_else(|| (!path.contains('/')).then(|| path.to_string()))
    }

    /// Enabled user patterns that failed to compile.
    #[must_use]
    pub fn invalid_patterns(&self) -> &[String] {
        &self.invalid
    }
}

/// What [`resolve_labels`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelOutcome {
    /// Nodes labeled by a rule.
    pub by_rule: usize,
    /// Directory prefix stripped from the remaining nodes, if any.
    pub stripped_prefix: Option<String>,
    /// Enabled user patterns that failed to compile.
    pub invalid_patterns: Vec<String>,
}

/// Reset and assign the label of every live node in `deps`.
pub fn resolve_labels(deps: &mut DependencyMap, config: &GraphConfig) -> LabelOutcome {
    let rules = LabelRules::from_config(config);
    let ids: Vec<NodeId> = deps.ids().collect();
    let mut unlabeled = Vec::new();

    for &id in &ids {
        let node = deps.node_mut(id);
        node.clear_label();
        match rules.label_for(&node.path) {
            Some(label) => node.set_label(label),
            None => unlabeled.push(id),
        }
    }

    let prefix = directory_part(&common_prefix(
        unlabeled.iter().map(|&id| deps.node(id).path.as_str()),
    ))
    .to_string();
    let strip = !prefix.is_empty() && config.smart_labels_prefix;

    for &id in &unlabeled {
        let node = deps.node_mut(id);
        let label = if strip {
            strip_label(&node.path, &prefix)
        } else {
            node.path.clone()
        };
        node.set_label(label);
    }

    debug!(
        by_rule = ids.len() - unlabeled.len(),
        by_prefix = if strip { unlabeled.len() } else { 0 },
        prefix = prefix.as_str(),
        "labels resolved"
    );

    LabelOutcome {
        by_rule: ids.len() - unlabeled.len(),
        stripped_prefix: strip.then_some(prefix),
        invalid_patterns: rules.invalid,
    }
}

/// Longest `/`-segment-wise prefix shared by all `paths`.
///
/// Starts from the first path and drops trailing segments until each later
/// path starts with it. Returns an empty string for no input or as soon as
/// nothing is shared.
pub fn common_prefix<'a>(paths: impl IntoIterator<Item = &'a str>) -> String {
    let mut paths = paths.into_iter();
    let Some(mut prefix) = paths.next() else {
        return String::new();
    };

    for path in paths {
        while !path.starts_with(prefix) {
            prefix = drop_last_segment(prefix);
            if prefix.is_empty() {
                break;
            }
        }
        if prefix.is_empty() {
            break;
        }
    }
    prefix.to_string()
}

/// `a/b/c` → `a/b/`, `a/b/` → `a/`, `a` → ``.
fn drop_last_segment(prefix: &str) -> &str {
    let trimmed = prefix.strip_suffix('/').unwrap_or(prefix);
    trimmed.rfind('/').map_or("", |idx| &prefix[..=idx])
}

/// Cut a prefix back to a directory boundary so no label ends up empty.
/// The result is either empty or ends with `/`.
fn directory_part(prefix: &str) -> &str {
    prefix.rfind('/').map_or("", |idx| &prefix[..=idx])
}

fn strip_label(path: &str, prefix: &str) -> String {
    let rest = path.strip_prefix(prefix).unwrap_or(path);
    let rest = rest.strip_suffix(SOURCE_EXTENSION).unwrap_or(rest);
    if rest.is_empty() {
        path.to_string()
    } else {
        rest.to_string()
    }
}
