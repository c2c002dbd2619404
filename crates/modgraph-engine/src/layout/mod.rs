//! Node placement: deterministic initial positions and the background force
//! simulation that refines them.

pub mod placement;
pub mod simulation;

pub use placement::initial_positions;
pub use simulation::{LayoutSession, LayoutSettings, LayoutStatus};
