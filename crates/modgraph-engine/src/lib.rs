#![forbid(unsafe_code)]
//! modgraph-engine library.
//!
//! Turns a parsed [`modgraph_core::DependencyMap`] into a
//! [`build::RenderableGraph`] under a [`modgraph_core::GraphConfig`].
//!
//! ## Pipeline
//!
//! ```text
//! DependencyMap (parse result, never mutated)
//!        ↓  clone
//! labels::resolve_labels      ordered regex rules + common-prefix strip
//!        ↓
//! colors::assign_colors       seeded palette per package-path trie level
//!        ↓
//! filter::filter              exclusions → cycle-only → reachability thresholds
//!        ↓
//! build::build                nodes/edges, metrics::DegreeCalculator sizes,
//!                             clustering edges, layout::placement positions
//!        ↓
//! RenderableGraph  ──→  layout::LayoutSession (background force simulation)
//!                  ──→  query::select / query::search (on user selection)
//! ```
//!
//! [`session::Session`] ties the stages together and owns the running
//! simulation.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` for fallible entry points.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod build;
pub mod colors;
pub mod cycles;
pub mod filter;
pub mod labels;
pub mod layout;
pub mod metrics;
pub mod query;
pub mod session;

pub use build::{ClusterEdge, RenderEdge, RenderNode, RenderableGraph, build};
pub use cycles::detect_cycles;
pub use filter::filter;
pub use session::Session;
