//! Graph-specific error types.

use tc_core::{CompId, VarId};
use thiserror::Error;

pub type GraphResult<T> = Result<T, GraphError>;

/// Graph construction and validation errors.
///
/// All of these are configuration problems: they are detected before any
/// evaluation and are fatal to the build.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Two components share the same instance name.
    #[error("Duplicate component name '{name}'")]
    DuplicateComponent { name: String },

    /// Two externals share the same name.
    #[error("Duplicate external name '{name}'")]
    DuplicateExternal { name: String },

    /// A component declared two variables with the same name.
    #[error("Variable name collision: component {comp} already declares '{name}'")]
    NameCollision { comp: CompId, name: String },

    /// A connection destination is not an input variable.
    #[error("Connection destination '{dest}' is not an input variable")]
    NotAnInput { dest: String },

    /// A connection source is neither an output nor a state variable.
    #[error("Connection source '{src}' is not an output or state variable")]
    NotASource { src: String },

    /// An input already has a binding; inputs take exactly one source.
    #[error("Input '{dest}' is already bound to a source")]
    DuplicateBinding { dest: String },

    /// An input was never connected to anything.
    #[error("Input '{name}' is unbound")]
    UnboundInput { name: String },

    /// Lookup by name or ID failed.
    #[error("Unknown {what}: '{name}'")]
    Unknown { what: &'static str, name: String },

    /// A declaration's variable lists are internally inconsistent.
    #[error("Inconsistent declaration for component {comp}: {what}")]
    Inconsistent { comp: CompId, what: &'static str },

    /// A stored ID points outside its table.
    #[error("Dangling {what} reference: {id}")]
    DanglingRef { what: &'static str, id: VarId },
}
