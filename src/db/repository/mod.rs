//! Repository layer: entity-scoped database operations.

mod patient;
mod visit;

pub use patient::*;
pub use visit::*;
