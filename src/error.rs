use thiserror::Error;

use crate::core::Label;
use crate::nested::Order;

/// Failures raised by the nested set engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NestedSetError {
    #[error("Can't union a {found} set into a {expected} set")]
    OrderConflict { expected: Order, found: Order },

    #[error("Nested set references itself through one of its children")]
    CycleDetected,
}

/// A required field of a provider is missing or malformed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Malformed field '{field}': {reason}")]
    Malformed { field: &'static str, reason: String },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JavaInfoError {
    #[error("Couldn't construct JavaInfo.\n{0}")]
    Construction(#[from] ConstructionError),

    #[error("Couldn't merge transitive jars.\n{0}")]
    NestedSet(#[from] NestedSetError),
}

impl JavaInfoError {
    /// True for the failures caused by a self-referential closure.
    pub fn is_cycle(&self) -> bool {
        matches!(self, JavaInfoError::NestedSet(NestedSetError::CycleDetected))
    }
}

/// Why a single target of a [`TargetGraph`](crate::TargetGraph) has no provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("Target '{label}':\n{source}")]
    Provider {
        label: Label,
        #[source]
        source: JavaInfoError,
    },

    #[error("Target '{label}' depends on failed target '{failed}'")]
    Dependency { label: Label, failed: Label },

    #[error("Target '{label}' is part of a dependency cycle")]
    Cycle { label: Label },

    #[error("Target '{label}' panicked: {message}")]
    Panic { label: Label, message: String },
}

impl EvalError {
    /// Label of the target this error is reported for.
    pub fn label(&self) -> &Label {
        match self {
            EvalError::Provider { label, .. }
            | EvalError::Dependency { label, .. }
            | EvalError::Cycle { label }
            | EvalError::Panic { label, .. } => label,
        }
    }
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Couldn't build evaluation thread pool.\n{0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
