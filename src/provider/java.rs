use crate::core::{Artifact, Blake3Hasher, Hash32, Label, digest_of};
use crate::nested::NestedSet;
use crate::provider::JavaInfoBuilder;
use crate::provider::outputs::{AnnotationProcessing, CompilationInfo, OutputJars};
use crate::provider::summary::JavaInfoSummary;

/// Everything a Java or Java-like target exposes to the targets that depend
/// on it.
///
/// A `JavaInfo` is built once per target by [`JavaInfoBuilder`] from the
/// target's own jars and the `JavaInfo`s of its dependencies, and is never
/// modified afterwards. Transitive fields are [`NestedSet`] handles, callers
/// flatten them when and if they need the full sequence.
#[derive(Debug, Clone)]
pub struct JavaInfo {
    pub(crate) label: Label,
    pub(crate) output_jar: Artifact,
    pub(crate) compile_jar: Artifact,
    pub(crate) source_jar: Option<Artifact>,
    pub(crate) neverlink: bool,
    pub(crate) source_jars: Vec<Artifact>,
    pub(crate) runtime_output_jars: Vec<Artifact>,
    pub(crate) compile_jars: NestedSet<Artifact>,
    pub(crate) full_compile_jars: NestedSet<Artifact>,
    pub(crate) transitive_compile_time_jars: NestedSet<Artifact>,
    pub(crate) transitive_runtime_jars: NestedSet<Artifact>,
    pub(crate) transitive_source_jars: NestedSet<Artifact>,
    pub(crate) transitive_exports: NestedSet<Label>,
    pub(crate) outputs: OutputJars,
    pub(crate) annotation_processing: Option<AnnotationProcessing>,
    pub(crate) compilation_info: Option<CompilationInfo>,
}

impl JavaInfo {
    pub fn builder<'a>() -> JavaInfoBuilder<'a> {
        JavaInfoBuilder::new()
    }

    /// Identifier of the target owning this provider. This is what consumers
    /// see in `transitive_exports` when the target is exported.
    pub fn label(&self) -> &Label {
        &self.label
    }

    /// The jar produced by compiling the target.
    pub fn output_jar(&self) -> &Artifact {
        &self.output_jar
    }

    /// The jar dependents compile against, the output jar unless an
    /// interface jar was given.
    pub fn compile_jar(&self) -> &Artifact {
        &self.compile_jar
    }

    pub fn source_jar(&self) -> Option<&Artifact> {
        self.source_jar.as_ref()
    }

    /// Whether the target is only available at compile time.
    pub fn neverlink(&self) -> bool {
        self.neverlink
    }

    /// Source jars of this target only, not of its dependencies.
    pub fn source_jars(&self) -> &[Artifact] {
        &self.source_jars
    }

    /// Runtime jars created by this target.
    pub fn runtime_output_jars(&self) -> &[Artifact] {
        &self.runtime_output_jars
    }

    /// Jars needed by this target directly at compile time. They can be
    /// interface jars.
    pub fn compile_jars(&self) -> &NestedSet<Artifact> {
        &self.compile_jars
    }

    /// Like [`compile_jars`](Self::compile_jars), but always the full jars.
    pub fn full_compile_jars(&self) -> &NestedSet<Artifact> {
        &self.full_compile_jars
    }

    /// Jars required to build this target, transitively.
    pub fn transitive_compile_time_jars(&self) -> &NestedSet<Artifact> {
        &self.transitive_compile_time_jars
    }

    /// Same set as [`transitive_compile_time_jars`](Self::transitive_compile_time_jars).
    pub fn transitive_deps(&self) -> &NestedSet<Artifact> {
        &self.transitive_compile_time_jars
    }

    /// Jars required on the runtime classpath of this target, transitively.
    pub fn transitive_runtime_jars(&self) -> &NestedSet<Artifact> {
        &self.transitive_runtime_jars
    }

    /// Same set as [`transitive_runtime_jars`](Self::transitive_runtime_jars).
    pub fn transitive_runtime_deps(&self) -> &NestedSet<Artifact> {
        &self.transitive_runtime_jars
    }

    /// Source jars of this target and all of its dependencies.
    pub fn transitive_source_jars(&self) -> &NestedSet<Artifact> {
        &self.transitive_source_jars
    }

    /// Labels exported by this target, transitively.
    pub fn transitive_exports(&self) -> &NestedSet<Label> {
        &self.transitive_exports
    }

    pub fn outputs(&self) -> &OutputJars {
        &self.outputs
    }

    /// Binary dependency report written by the compiler, if any.
    pub fn jdeps(&self) -> Option<&Artifact> {
        self.outputs.jdeps.as_ref()
    }

    pub fn annotation_processing(&self) -> Option<&AnnotationProcessing> {
        self.annotation_processing.as_ref()
    }

    pub fn compilation_info(&self) -> Option<&CompilationInfo> {
        self.compilation_info.as_ref()
    }

    /// A serializable view with every jar set flattened.
    pub fn summary(&self) -> JavaInfoSummary<'_> {
        JavaInfoSummary::new(self)
    }

    /// Renders [`summary`](Self::summary) as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.summary())
    }

    /// Structural fingerprint of the whole provider.
    ///
    /// Providers built from identical inputs have equal digests, so an
    /// external cache can use it to recognise a provider it already holds.
    pub fn digest(&self) -> Hash32 {
        let mut hasher = Blake3Hasher::default();

        hasher
            .update(digest_of(&self.label).as_bytes())
            .update(digest_of(&self.output_jar).as_bytes())
            .update(digest_of(&self.compile_jar).as_bytes())
            .update(digest_of(&self.source_jar).as_bytes())
            .update(&[self.neverlink as u8])
            .update(digest_of(&self.outputs).as_bytes());

        for set in [
            &self.transitive_compile_time_jars,
            &self.transitive_runtime_jars,
            &self.transitive_source_jars,
        ] {
            hasher.update(set.digest().as_bytes());
        }
        hasher.update(self.transitive_exports.digest().as_bytes());

        match &self.annotation_processing {
            Some(info) => {
                hasher
                    .update(&[1, info.enabled as u8])
                    .update(digest_of(&info.processor_classnames).as_bytes())
                    .update(info.processor_classpath.digest().as_bytes())
                    .update(digest_of(&info.class_jar).as_bytes())
                    .update(digest_of(&info.source_jar).as_bytes())
                    .update(info.transitive_class_jars.digest().as_bytes())
                    .update(info.transitive_source_jars.digest().as_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }

        match &self.compilation_info {
            Some(info) => {
                hasher
                    .update(&[1])
                    .update(info.compilation_classpath.digest().as_bytes())
                    .update(info.runtime_classpath.digest().as_bytes())
                    .update(digest_of(&info.boot_classpath).as_bytes())
                    .update(digest_of(&info.javac_options).as_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }

        hasher.into()
    }
}
