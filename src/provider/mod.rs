//! Providers: what a build-graph node hands to the nodes depending on it.
//!
//! The set of provider kinds is closed. [`JavaInfo`] is the aggregate one,
//! the others are the records it carries, exposed on their own so that
//! consumers interested in a single record don't need the aggregate.

mod builder;
mod java;
mod outputs;
mod summary;

use std::fmt::{self, Display};
use std::sync::Arc;

pub use crate::provider::builder::JavaInfoBuilder;
pub use crate::provider::java::JavaInfo;
pub use crate::provider::outputs::{AnnotationProcessing, CompilationInfo, OutputJar, OutputJars};
pub use crate::provider::summary::JavaInfoSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    Java,
    Outputs,
    AnnotationProcessing,
    Compilation,
}

impl ProviderKind {
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Java => "JavaInfo",
            ProviderKind::Outputs => "JavaOutputInfo",
            ProviderKind::AnnotationProcessing => "JavaAnnotationProcessingInfo",
            ProviderKind::Compilation => "JavaCompilationInfo",
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone)]
pub enum Provider {
    Java(Arc<JavaInfo>),
    Outputs(OutputJars),
    AnnotationProcessing(AnnotationProcessing),
    Compilation(CompilationInfo),
}

impl Provider {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::Java(_) => ProviderKind::Java,
            Provider::Outputs(_) => ProviderKind::Outputs,
            Provider::AnnotationProcessing(_) => ProviderKind::AnnotationProcessing,
            Provider::Compilation(_) => ProviderKind::Compilation,
        }
    }

    pub fn as_java(&self) -> Option<&Arc<JavaInfo>> {
        match self {
            Provider::Java(info) => Some(info),
            _ => None,
        }
    }

    /// The aggregate provider followed by every record it carries.
    pub fn all(info: &Arc<JavaInfo>) -> Vec<Provider> {
        let mut providers = vec![
            Provider::Java(Arc::clone(info)),
            Provider::Outputs(info.outputs().clone()),
        ];

        if let Some(record) = info.annotation_processing() {
            providers.push(Provider::AnnotationProcessing(record.clone()));
        }
        if let Some(record) = info.compilation_info() {
            providers.push(Provider::Compilation(record.clone()));
        }

        providers
    }
}

impl From<JavaInfo> for Provider {
    fn from(value: JavaInfo) -> Self {
        Provider::Java(Arc::new(value))
    }
}

impl From<Arc<JavaInfo>> for Provider {
    fn from(value: Arc<JavaInfo>) -> Self {
        Provider::Java(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Artifact;
    use crate::nested::{NestedSet, Order};

    #[test]
    fn test_all_providers() {
        let info = Arc::new(
            JavaInfo::builder()
                .output_jar(Artifact::derived("lib.jar", "//lib"))
                .compilation_info(CompilationInfo {
                    compilation_classpath: NestedSet::empty(Order::Topological),
                    runtime_classpath: NestedSet::empty(Order::Topological),
                    boot_classpath: vec![],
                    javac_options: vec!["-source".into(), "17".into()],
                })
                .build()
                .unwrap(),
        );

        let kinds: Vec<_> = Provider::all(&info).iter().map(Provider::kind).collect();
        assert_eq!(
            kinds,
            [
                ProviderKind::Java,
                ProviderKind::Outputs,
                ProviderKind::Compilation
            ]
        );
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(ProviderKind::Java.to_string(), "JavaInfo");
        let provider = Provider::from(
            JavaInfo::builder()
                .output_jar(Artifact::source("a.jar"))
                .build()
                .unwrap(),
        );
        assert_eq!(provider.kind(), ProviderKind::Java);
        assert!(provider.as_java().is_some());
    }
}
