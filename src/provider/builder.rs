use crate::core::{Artifact, Label};
use crate::error::{ConstructionError, JavaInfoError};
use crate::nested::{NestedSet, NestedSetBuilder, Order};
use crate::provider::JavaInfo;
use crate::provider::outputs::{AnnotationProcessing, CompilationInfo, OutputJar, OutputJars};

/// Builds a [`JavaInfo`] from the jars of a target and the providers of its
/// relations.
///
/// * `deps` are the compile time dependencies of the target.
/// * `runtime_deps` are only needed at runtime and stay out of the compile
///   time closure.
/// * `exports` are made available to the dependents of the target, as if
///   they depended on them directly.
///
/// # Example
///
/// ```rust
/// use javainfo::{Artifact, JavaInfo};
///
/// let dep = JavaInfo::builder()
///     .output_jar(Artifact::derived("libdep.jar", "//dep"))
///     .build()?;
///
/// let lib = JavaInfo::builder()
///     .output_jar(Artifact::derived("liblib.jar", "//lib"))
///     .dep(&dep)
///     .build()?;
///
/// assert_eq!(lib.transitive_compile_time_jars().len(), 2);
/// # Ok::<(), javainfo::JavaInfoError>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct JavaInfoBuilder<'a> {
    label: Option<Label>,
    output_jar: Option<Artifact>,
    compile_jar: Option<Artifact>,
    source_jar: Option<Artifact>,
    neverlink: bool,
    deps: Vec<&'a JavaInfo>,
    runtime_deps: Vec<&'a JavaInfo>,
    exports: Vec<&'a JavaInfo>,
    jdeps: Option<Artifact>,
    outputs: Option<OutputJars>,
    annotation_processing: Option<AnnotationProcessing>,
    compilation_info: Option<CompilationInfo>,
}

impl<'a> JavaInfoBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label of the owning target. Defaults to the owner of the output jar,
    /// or to its path when the jar isn't generated by any target.
    pub fn label(mut self, label: impl Into<Label>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The jar created by compiling the target. Required.
    pub fn output_jar(mut self, jar: Artifact) -> Self {
        self.output_jar = Some(jar);
        self
    }

    /// A jar dependents compile against in lieu of the output jar, typically
    /// an interface jar.
    pub fn compile_jar(mut self, jar: impl Into<Option<Artifact>>) -> Self {
        self.compile_jar = jar.into();
        self
    }

    /// The source jar the output jar was compiled from.
    pub fn source_jar(mut self, jar: impl Into<Option<Artifact>>) -> Self {
        self.source_jar = jar.into();
        self
    }

    /// Only use the target for compilation, never at runtime.
    pub fn neverlink(mut self, neverlink: bool) -> Self {
        self.neverlink = neverlink;
        self
    }

    pub fn dep(mut self, dep: &'a JavaInfo) -> Self {
        self.deps.push(dep);
        self
    }

    pub fn deps(mut self, deps: impl IntoIterator<Item = &'a JavaInfo>) -> Self {
        self.deps.extend(deps);
        self
    }

    pub fn runtime_dep(mut self, dep: &'a JavaInfo) -> Self {
        self.runtime_deps.push(dep);
        self
    }

    pub fn runtime_deps(mut self, deps: impl IntoIterator<Item = &'a JavaInfo>) -> Self {
        self.runtime_deps.extend(deps);
        self
    }

    pub fn export(mut self, export: &'a JavaInfo) -> Self {
        self.exports.push(export);
        self
    }

    pub fn exports(mut self, exports: impl IntoIterator<Item = &'a JavaInfo>) -> Self {
        self.exports.extend(exports);
        self
    }

    /// Binary `deps.proto` for the output jar. Not inspected.
    pub fn jdeps(mut self, jdeps: impl Into<Option<Artifact>>) -> Self {
        self.jdeps = jdeps.into();
        self
    }

    /// Replaces the output record derived from the jars given to this builder.
    pub fn outputs(mut self, outputs: OutputJars) -> Self {
        self.outputs = Some(outputs);
        self
    }

    pub fn annotation_processing(mut self, info: AnnotationProcessing) -> Self {
        self.annotation_processing = Some(info);
        self
    }

    pub fn compilation_info(mut self, info: CompilationInfo) -> Self {
        self.compilation_info = Some(info);
        self
    }

    pub fn build(self) -> Result<JavaInfo, JavaInfoError> {
        let output_jar = self
            .output_jar
            .ok_or(ConstructionError::MissingField("output_jar"))?;

        check_path("output_jar", &output_jar)?;
        if let Some(jar) = &self.compile_jar {
            check_path("compile_jar", jar)?;
        }
        if let Some(jar) = &self.source_jar {
            check_path("source_jar", jar)?;
        }

        let compile_jar = self.compile_jar.unwrap_or_else(|| output_jar.clone());
        let source_jars: Vec<Artifact> = self.source_jar.iter().cloned().collect();
        let label = self
            .label
            .or_else(|| output_jar.owner().cloned())
            .unwrap_or_else(|| Label::new(output_jar.path()));

        // Only deps and exports are visible to the compiler.
        let mut compile_time = NestedSetBuilder::new(Order::Topological);
        compile_time
            .add_direct(compile_jar.clone())
            .add_all_transitive(self.deps.iter().map(|dep| &dep.transitive_compile_time_jars))?
            .add_all_transitive(
                self.exports
                    .iter()
                    .map(|dep| &dep.transitive_compile_time_jars),
            )?;

        let mut runtime = NestedSetBuilder::new(Order::Topological);
        if !self.neverlink {
            runtime.add_direct(output_jar.clone());
        }
        runtime
            .add_all_transitive(self.deps.iter().map(|dep| &dep.transitive_runtime_jars))?
            .add_all_transitive(
                self.runtime_deps
                    .iter()
                    .map(|dep| &dep.transitive_runtime_jars),
            )?
            .add_all_transitive(self.exports.iter().map(|dep| &dep.transitive_runtime_jars))?;

        let mut sources = NestedSetBuilder::new(Order::Preorder);
        sources
            .add_all(source_jars.iter().cloned())
            .add_all_transitive(self.deps.iter().map(|dep| &dep.transitive_source_jars))?
            .add_all_transitive(
                self.runtime_deps
                    .iter()
                    .map(|dep| &dep.transitive_source_jars),
            )?
            .add_all_transitive(self.exports.iter().map(|dep| &dep.transitive_source_jars))?;

        // Only exports propagate labels, deps and runtime_deps never do.
        let mut exports = NestedSetBuilder::new(Order::Unordered);
        exports
            .add_all(self.exports.iter().map(|dep| dep.label.clone()))
            .add_all_transitive(self.exports.iter().map(|dep| &dep.transitive_exports))?;

        let outputs = self.outputs.unwrap_or_else(|| OutputJars {
            jars: vec![OutputJar {
                class_jar: output_jar.clone(),
                compile_jar: Some(compile_jar.clone()),
                source_jars: source_jars.clone(),
            }],
            jdeps: self.jdeps.clone(),
        });

        let info = JavaInfo {
            compile_jars: NestedSet::leaf(Order::Topological, [compile_jar.clone()]),
            full_compile_jars: NestedSet::leaf(Order::Topological, [output_jar.clone()]),
            runtime_output_jars: vec![output_jar.clone()],
            transitive_compile_time_jars: compile_time.build(),
            transitive_runtime_jars: runtime.build(),
            transitive_source_jars: sources.build(),
            transitive_exports: exports.build(),
            label,
            output_jar,
            compile_jar,
            source_jar: source_jars.first().cloned(),
            neverlink: self.neverlink,
            source_jars,
            outputs,
            annotation_processing: self.annotation_processing,
            compilation_info: self.compilation_info,
        };

        tracing::debug!(
            label = %info.label,
            output_jar = %info.output_jar,
            deps = self.deps.len(),
            runtime_deps = self.runtime_deps.len(),
            exports = self.exports.len(),
            neverlink = info.neverlink,
            "constructed JavaInfo"
        );

        Ok(info)
    }
}

fn check_path(field: &'static str, jar: &Artifact) -> Result<(), ConstructionError> {
    if jar.path().as_str().is_empty() {
        return Err(ConstructionError::Malformed {
            field,
            reason: "artifact path is empty".into(),
        });
    }
    Ok(())
}
