//! tc-graph: variable registry and connection graph for thermocircuit.
//!
//! Provides:
//! - A flat registry of named scalar variables with unit metadata
//! - Component declarations (explicit and implicit) with fixed schemas
//! - Source -> destination bindings with validation
//! - An incremental builder that freezes into an immutable [`SystemGraph`]
//!
//! # Example
//!
//! ```
//! use tc_core::Unit;
//! use tc_graph::SystemBuilder;
//!
//! let mut builder = SystemBuilder::new();
//! let r = builder
//!     .add_explicit(
//!         "R1",
//!         &[("T_in", Unit::Kelvin), ("T_out", Unit::Kelvin)],
//!         &[("q", Unit::Watt)],
//!     )
//!     .unwrap();
//! let n = builder
//!     .add_implicit("n1", &[("q_0", Unit::Watt)], &[("T", Unit::Kelvin)])
//!     .unwrap();
//! let t_hot = builder.add_external("T_hot", Unit::Kelvin).unwrap();
//!
//! let q = builder.output(r, "q").unwrap();
//! builder.connect(q, &[builder.input(n, "q_0").unwrap()]).unwrap();
//! builder.bind_external(t_hot, builder.input(r, "T_in").unwrap()).unwrap();
//! let t = builder.state(n, "T").unwrap();
//! builder.connect(t, &[builder.input(r, "T_out").unwrap()]).unwrap();
//!
//! let graph = builder.build().unwrap();
//! assert_eq!(graph.components().len(), 2);
//! ```

pub mod builder;
pub mod error;
pub mod graph;
pub mod registry;
pub(crate) mod validate;

// Re-exports for ergonomics
pub use builder::SystemBuilder;
pub use error::{GraphError, GraphResult};
pub use graph::{ComponentDecl, ComponentKind, External, Source, SystemGraph};
pub use registry::{VarRole, Variable, VariableRegistry};
