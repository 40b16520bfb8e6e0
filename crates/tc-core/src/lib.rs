//! tc-core: stable foundation for the thermocircuit engine.
//!
//! Contains:
//! - units (uom SI types + constructors + variable unit tags)
//! - numeric (Real + tolerances + float helpers)
//! - ids (stable compact IDs for registry/graph objects)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{TcError, TcResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
