#![forbid(unsafe_code)]
//! modgraph-core library.
//!
//! Parses compiler dependency dumps into a [`model::DependencyMap`] and owns
//! the typed [`config::GraphConfig`] together with its key-value persistence.
//!
//! # Conventions
//!
//! - **Errors**: Library errors are `thiserror` enums ([`error::StoreError`]);
//!   application-level code uses `anyhow::Result`.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod store;

pub use config::{GraphConfig, LayoutInit, RegexRule, SizeMetric};
pub use error::StoreError;
pub use model::{DependencyMap, DependencyNode, NodeId};
pub use parser::parse;
