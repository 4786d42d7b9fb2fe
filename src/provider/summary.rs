use serde::Serialize;

use crate::core::{Artifact, Label};
use crate::nested::NestedSet;
use crate::provider::JavaInfo;
use crate::provider::outputs::OutputJars;

/// Serializable view of a [`JavaInfo`] for tools outside of the build, such
/// as IDE integrations. Nested sets serialize as their flattened sequence.
#[derive(Debug, Serialize)]
pub struct JavaInfoSummary<'a> {
    pub label: &'a Label,
    pub neverlink: bool,
    pub compile_jars: &'a NestedSet<Artifact>,
    pub full_compile_jars: &'a NestedSet<Artifact>,
    pub source_jars: &'a [Artifact],
    pub runtime_output_jars: &'a [Artifact],
    pub transitive_compile_time_jars: &'a NestedSet<Artifact>,
    pub transitive_runtime_jars: &'a NestedSet<Artifact>,
    pub transitive_source_jars: &'a NestedSet<Artifact>,
    pub transitive_exports: &'a NestedSet<Label>,
    pub outputs: &'a OutputJars,
}

impl<'a> JavaInfoSummary<'a> {
    pub(crate) fn new(info: &'a JavaInfo) -> Self {
        Self {
            label: info.label(),
            neverlink: info.neverlink(),
            compile_jars: info.compile_jars(),
            full_compile_jars: info.full_compile_jars(),
            source_jars: info.source_jars(),
            runtime_output_jars: info.runtime_output_jars(),
            transitive_compile_time_jars: info.transitive_compile_time_jars(),
            transitive_runtime_jars: info.transitive_runtime_jars(),
            transitive_source_jars: info.transitive_source_jars(),
            transitive_exports: info.transitive_exports(),
            outputs: info.outputs(),
        }
    }
}
