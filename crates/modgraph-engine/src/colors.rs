//! Package-based node coloring.
//!
//! Nodes are grouped into a trie by the segments of their package path (a
//! node without a package sits under the empty segment, so top-level modules
//! still spread over the palette). Each trie level gets its own palette:
//!
//! - top level: dark, well separated hues
//! - nested levels: lighter variations around the parent's hue
//!
//! A level that holds no nodes of its own and at most one sub-package passes
//! its color down unchanged, so a lone chain like `com/example/...` does not
//! burn palette entries.
//!
//! Every palette is drawn from a fresh RNG seeded with the same constant, so
//! colors are reproducible across runs and independent of filtering.

use std::collections::HashMap;

use modgraph_core::{DependencyMap, NodeId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Serialize, Serializer};

/// Seed phrase for every palette.
pub const PALETTE_SEED: &str = "consistencyplsthx";

const HUE_SPREAD: f64 = 18.0;

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from hue (degrees), saturation and value in `0.0..=1.0`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::many_single_char_names)]
    pub fn from_hsv(hue: f64, saturation: f64, value: f64) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let s = saturation.clamp(0.0, 1.0);
        let v = value.clamp(0.0, 1.0);
        let c = v * s;
        let x = c * (1.0 - (h % 2.0 - 1.0).abs());
        let m = v - c;
        let (r, g, b) = match h as u8 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let channel = |f: f64| ((f + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::new(channel(r), channel(g), channel(b))
    }

    /// Hue in degrees (`0.0` for grays).
    #[must_use]
    pub fn hue(self) -> f64 {
        let r = f64::from(self.r) / 255.0;
        let g = f64::from(self.g) / 255.0;
        let b = f64::from(self.b) / 255.0;
        let max = r.max(g).max(b);
        let delta = max - r.min(g).min(b);
        if delta <= f64::EPSILON {
            return 0.0;
        }
        let sector = if (max - r).abs() <= f64::EPSILON {
            ((g - b) / delta).rem_euclid(6.0)
        } else if (max - g).abs() <= f64::EPSILON {
            (b - r) / delta + 2.0
        } else {
            (r - g) / delta + 4.0
        };
        sector * 60.0
    }

    /// CSS hex notation, `#rrggbb`.
    #[must_use]
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::new(0x80, 0x80, 0x80)
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

fn seeded_rng() -> StdRng {
    StdRng::from_seed(*blake3::hash(PALETTE_SEED.as_bytes()).as_bytes())
}

/// Seeded palette generators.
pub struct Palette;

impl Palette {
    /// `count` dark colors with evenly spread, jittered hues.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn dark(count: usize) -> Vec<Rgb> {
        let mut rng = seeded_rng();
        let step = 360.0 / count.max(1) as f64;
        (0..count)
            .map(|i| {
                let hue = (i as f64).mul_add(step, rng.gen_range(0.0..step * 0.5));
                Rgb::from_hsv(hue, rng.gen_range(0.55..=1.0), rng.gen_range(0.35..=0.6))
            })
            .collect()
    }

    /// `count` lighter colors within a few degrees of `hue`.
    #[must_use]
    pub fn around_hue(hue: f64, count: usize) -> Vec<Rgb> {
        let mut rng = seeded_rng();
        (0..count)
            .map(|_| {
                Rgb::from_hsv(
                    hue + rng.gen_range(-HUE_SPREAD..=HUE_SPREAD),
                    rng.gen_range(0.4..=0.9),
                    rng.gen_range(0.55..=0.9),
                )
            })
            .collect()
    }
}

/// One level of the package trie, children in insertion order.
#[derive(Debug, Default)]
struct ColorBucket {
    nodes: Vec<NodeId>,
    children: Vec<(String, ColorBucket)>,
    index: HashMap<String, usize>,
}

impl ColorBucket {
    fn descend(&mut self, segments: &[String]) -> &mut Self {
        let Some((first, rest)) = segments.split_first() else {
            return self;
        };
        let slot = if let Some(&slot) = self.index.get(first) {
            slot
        } else {
            self.children.push((first.clone(), Self::default()));
            self.index.insert(first.clone(), self.children.len() - 1);
            self.children.len() - 1
        };
        self.children[slot].1.descend(rest)
    }

    fn paint(&self, color: Rgb, out: &mut HashMap<NodeId, Rgb>) {
        for &id in &self.nodes {
            out.insert(id, color);
        }
        if self.nodes.is_empty() && self.children.len() <= 1 {
            for (_, child) in &self.children {
                child.paint(color, out);
            }
        } else {
            let palette = Palette::around_hue(color.hue(), self.children.len());
            for ((_, child), color) in self.children.iter().zip(palette.into_iter().rev()) {
                child.paint(color, out);
            }
        }
    }
}

/// Color every live node of `deps` by its package path.
///
/// Labels must already be resolved, since package paths derive from them.
#[must_use]
pub fn assign_colors(deps: &DependencyMap) -> HashMap<NodeId, Rgb> {
    let empty = [String::new()];
    let mut root = ColorBucket::default();
    for (id, node) in deps.nodes() {
        let package = node.package_path();
        let segments = if package.is_empty() { &empty[..] } else { package };
        root.descend(segments).nodes.push(id);
    }

    let mut out = HashMap::with_capacity(deps.len());
    let palette = Palette::dark(root.children.len());
    for ((_, bucket), color) in root.children.iter().zip(palette.into_iter().rev()) {
        bucket.paint(color, &mut out);
    }
    out
}
