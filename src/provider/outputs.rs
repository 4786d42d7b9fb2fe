//! Records produced by the compilation step and carried by a [`JavaInfo`]
//! without interpretation.
//!
//! [`JavaInfo`]: crate::JavaInfo

use serde::{Deserialize, Serialize};

use crate::core::Artifact;
use crate::nested::NestedSet;

/// Jars created by a single compilation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputJar {
    /// The full class jar.
    pub class_jar: Artifact,
    /// The jar used in lieu of `class_jar` at compile time, usually an
    /// interface jar.
    pub compile_jar: Option<Artifact>,
    /// Jars with the sources `class_jar` was compiled from.
    pub source_jars: Vec<Artifact>,
}

/// Every output jar of a target plus its dependency report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputJars {
    pub jars: Vec<OutputJar>,
    /// Binary `deps.proto` written by the compiler, never read here.
    pub jdeps: Option<Artifact>,
}

impl OutputJars {
    /// Every class jar, in declaration order.
    pub fn class_jars(&self) -> impl Iterator<Item = &Artifact> {
        self.jars.iter().map(|jar| &jar.class_jar)
    }

    /// Every source jar of every output, in declaration order.
    pub fn source_jars(&self) -> impl Iterator<Item = &Artifact> {
        self.jars.iter().flat_map(|jar| jar.source_jars.iter())
    }
}

/// Result of running annotation processors during compilation.
#[derive(Debug, Clone)]
pub struct AnnotationProcessing {
    pub enabled: bool,
    pub processor_classnames: Vec<String>,
    pub processor_classpath: NestedSet<Artifact>,
    /// Jar with the classes generated by the processors.
    pub class_jar: Option<Artifact>,
    /// Jar with the sources generated by the processors.
    pub source_jar: Option<Artifact>,
    pub transitive_class_jars: NestedSet<Artifact>,
    pub transitive_source_jars: NestedSet<Artifact>,
}

/// How the compiler was invoked for a target.
#[derive(Debug, Clone)]
pub struct CompilationInfo {
    pub compilation_classpath: NestedSet<Artifact>,
    pub runtime_classpath: NestedSet<Artifact>,
    pub boot_classpath: Vec<Artifact>,
    pub javac_options: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_jars_iterators() {
        let outputs = OutputJars {
            jars: vec![
                OutputJar {
                    class_jar: Artifact::source("a.jar"),
                    compile_jar: None,
                    source_jars: vec![Artifact::source("a-src.jar")],
                },
                OutputJar {
                    class_jar: Artifact::source("b.jar"),
                    compile_jar: Some(Artifact::source("b-ijar.jar")),
                    source_jars: vec![],
                },
            ],
            jdeps: None,
        };

        let class: Vec<_> = outputs.class_jars().map(|a| a.path().as_str()).collect();
        assert_eq!(class, ["a.jar", "b.jar"]);
        let sources: Vec<_> = outputs.source_jars().map(|a| a.path().as_str()).collect();
        assert_eq!(sources, ["a-src.jar"]);
    }
}
