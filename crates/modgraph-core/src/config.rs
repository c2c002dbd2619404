//! Typed graph configuration with explicit defaults.
//!
//! The record is persisted as a single JSON object (camelCase keys). Every
//! field carries a serde default, so records written by older versions load
//! with the missing fields backfilled. [`GraphConfig::validate`] normalizes
//! out-of-range values once at load time.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Which degree drives node size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SizeMetric {
    /// Direct dependency count.
    Dependencies,
    /// Dependency count summed over everything reachable.
    DependenciesRec,
    /// Direct dependant count.
    Dependants,
    /// Dependant count summed over everything that reaches the node.
    DependantsRec,
}

impl SizeMetric {
    /// `true` when the metric follows dependency edges (outgoing).
    #[must_use]
    pub const fn follows_dependencies(self) -> bool {
        matches!(self, Self::Dependencies | Self::DependenciesRec)
    }

    /// `true` for the transitive variants.
    #[must_use]
    pub const fn is_recursive(self) -> bool {
        matches!(self, Self::DependenciesRec | Self::DependantsRec)
    }
}

/// Initial placement scheme for nodes without a prior position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutInit {
    /// Hierarchical circle packing keyed by package path.
    Bubble,
    /// Uniform placement on a circle.
    Circle,
    /// Column placement ordered by node size.
    Topdown,
}

/// A user-supplied regular expression that can be toggled off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegexRule {
    /// Pattern source. Persisted as `reg`.
    #[serde(rename = "reg")]
    pub pattern: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl RegexRule {
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            enabled: true,
        }
    }

    /// Compile the pattern. An invalid pattern yields `None` and the rule
    /// never matches.
    #[must_use]
    pub fn compile(&self) -> Option<Regex> {
        Regex::new(&self.pattern).ok()
    }
}

/// Flat configuration record driving the whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphConfig {
    /// Edges point toward dependencies (`true`) or toward dependants.
    #[serde(default = "default_true")]
    pub visual_dependencies: bool,
    #[serde(default = "default_visual_size")]
    pub visual_size: SizeMetric,
    #[serde(default = "default_visual_size_min")]
    pub visual_size_min: f64,
    #[serde(default = "default_visual_size_max")]
    pub visual_size_max: f64,
    /// Shade everything reachable from the selection by hop distance.
    #[serde(default = "default_true")]
    pub visual_all_paths: bool,
    /// Highlight edges closing a cycle through the selection.
    #[serde(default = "default_true")]
    pub visual_cycles: bool,
    #[serde(default = "default_labels_density")]
    pub visual_labels_density: f64,

    /// Run the force simulation after every rebuild.
    #[serde(default = "default_true")]
    pub layout_enable: bool,
    #[serde(default = "default_layout_init")]
    pub layout_init: LayoutInit,
    /// Dependency edges attract their endpoints.
    #[serde(default = "default_true")]
    pub layout_forces: bool,
    /// Scale edge attraction by the target's dependency count.
    #[serde(default = "default_true")]
    pub layout_forces_relative: bool,
    /// Weight of same-package clustering edges; `0` disables them.
    #[serde(default = "default_package_forces")]
    pub layout_package_forces: f64,
    #[serde(default = "default_force_power")]
    pub layout_force_power: f64,
    #[serde(default = "default_force_slowdown")]
    pub layout_force_slowdown: f64,

    #[serde(default = "default_true")]
    pub hide_std: bool,
    /// Hide `import.hx` shims.
    #[serde(default = "default_true")]
    pub hide_import: bool,
    #[serde(default)]
    pub hide_custom: Vec<RegexRule>,
    /// Hide nodes with at most this many transitive dependencies; `-1` disables.
    #[serde(default = "default_threshold")]
    pub hide_min_deps: i64,
    /// Hide nodes with at most this many transitive dependants; `-1` disables.
    #[serde(default = "default_threshold")]
    pub hide_min_dependants: i64,
    #[serde(default)]
    pub show_only_circular: bool,

    #[serde(default = "default_true")]
    pub smart_labels_std: bool,
    #[serde(default = "default_true")]
    pub smart_labels_src: bool,
    #[serde(default = "default_true")]
    pub smart_labels_haxelib: bool,
    /// Strip the common prefix from labels no rule resolved.
    #[serde(default = "default_true")]
    pub smart_labels_prefix: bool,
    #[serde(default = "default_true")]
    pub smart_labels_show_macro: bool,
    #[serde(default)]
    pub smart_labels_custom: Vec<RegexRule>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            visual_dependencies: default_true(),
            visual_size: default_visual_size(),
            visual_size_min: default_visual_size_min(),
            visual_size_max: default_visual_size_max(),
            visual_all_paths: default_true(),
            visual_cycles: default_true(),
            visual_labels_density: default_labels_density(),
            layout_enable: default_true(),
            layout_init: default_layout_init(),
            layout_forces: default_true(),
            layout_forces_relative: default_true(),
            layout_package_forces: default_package_forces(),
            layout_force_power: default_force_power(),
            layout_force_slowdown: default_force_slowdown(),
            hide_std: default_true(),
            hide_import: default_true(),
            hide_custom: Vec::new(),
            hide_min_deps: default_threshold(),
            hide_min_dependants: default_threshold(),
            show_only_circular: false,
            smart_labels_std: default_true(),
            smart_labels_src: default_true(),
            smart_labels_haxelib: default_true(),
            smart_labels_prefix: default_true(),
            smart_labels_show_macro: default_true(),
            smart_labels_custom: Vec::new(),
        }
    }
}

/// Outcome of [`GraphConfig::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Field names whose values were reset or clamped.
    pub adjusted: Vec<&'static str>,
    /// Patterns of enabled rules that fail to compile (kept, but inert).
    pub invalid_patterns: Vec<String>,
}

impl ValidationReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.adjusted.is_empty() && self.invalid_patterns.is_empty()
    }
}

impl GraphConfig {
    /// Normalize out-of-range values in place.
    ///
    /// Thresholds below `-1` become `-1`, non-finite numbers fall back to
    /// their defaults and negative radii or weights clamp to `0`. Invalid
    /// regex rules stay in the record so the user can fix them.
    pub fn validate(&mut self) -> ValidationReport {
        let mut report = ValidationReport::default();
        let defaults = Self::default();

        for (name, value, default, floor) in [
            ("visualSizeMin", &mut self.visual_size_min, defaults.visual_size_min, 0.0),
            ("visualSizeMax", &mut self.visual_size_max, defaults.visual_size_max, 0.0),
            ("visualLabelsDensity", &mut self.visual_labels_density, defaults.visual_labels_density, 0.0),
            ("layoutPackageForces", &mut self.layout_package_forces, defaults.layout_package_forces, 0.0),
            ("layoutForcePower", &mut self.layout_force_power, defaults.layout_force_power, 0.0),
            ("layoutForceSlowdown", &mut self.layout_force_slowdown, defaults.layout_force_slowdown, f64::MIN_POSITIVE),
        ] {
            if !value.is_finite() {
                *value = default;
                report.adjusted.push(name);
            } else if *value < floor {
                *value = floor;
                report.adjusted.push(name);
            }
        }

        for (name, value) in [
            ("hideMinDeps", &mut self.hide_min_deps),
            ("hideMinDependants", &mut self.hide_min_dependants),
        ] {
            if *value < -1 {
                *value = -1;
                report.adjusted.push(name);
            }
        }

        report.invalid_patterns = self
            .hide_custom
            .iter()
            .chain(&self.smart_labels_custom)
            .filter(|rule| rule.enabled && rule.compile().is_none())
            .map(|rule| rule.pattern.clone())
            .collect();

        report
    }

    /// Whether the reachability-threshold pass is active.
    #[must_use]
    pub const fn thresholds_enabled(&self) -> bool {
        self.hide_min_deps > -1 || self.hide_min_dependants > -1
    }
}

const fn default_true() -> bool {
    true
}

const fn default_visual_size() -> SizeMetric {
    SizeMetric::DependantsRec
}

const fn default_visual_size_min() -> f64 {
    2.0
}

const fn default_visual_size_max() -> f64 {
    15.0
}

const fn default_labels_density() -> f64 {
    1.0
}

const fn default_layout_init() -> LayoutInit {
    LayoutInit::Bubble
}

const fn default_package_forces() -> f64 {
    1.0
}

const fn default_force_power() -> f64 {
    1.0
}

const fn default_force_slowdown() -> f64 {
    10.0
}

const fn default_threshold() -> i64 {
    -1
}
