#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod core;
mod error;
pub mod graph;
pub mod nested;
pub mod provider;
mod utils;

pub use crate::core::{Artifact, Hash32, Label};
pub use crate::error::*;
pub use crate::graph::{
    Diagnostics, EvalConfig, Evaluation, Relation, Target, TargetExecution, TargetGraph, TargetId,
};
pub use crate::nested::{NestedSet, NestedSetBuilder, Order};
pub use crate::provider::{
    AnnotationProcessing, CompilationInfo, JavaInfo, JavaInfoBuilder, JavaInfoSummary, OutputJar,
    OutputJars, Provider, ProviderKind,
};
#[cfg(feature = "logging")]
pub use crate::utils::init_logging;
