//! A build graph of Java targets and its evaluation.
//!
//! A [`TargetGraph`] declares targets and the relations between them. It
//! knows nothing about compilation: every [`Target`] already carries the jars
//! its compilation produced. Evaluating the graph builds one [`JavaInfo`] per
//! target, each exactly once, from the providers of its relations.
//!
//! [`JavaInfo`]: crate::JavaInfo

mod diagnostics;
mod executor;

use std::fmt::{self, Display};

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::core::{Artifact, Label};

pub use crate::graph::diagnostics::{Diagnostics, TargetExecution};
pub use crate::graph::executor::{EvalConfig, Evaluation};

/// How a target uses one of its dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// Needed to compile the target.
    Dep,
    /// Needed only when running the target.
    RuntimeDep,
    /// Re-exported to whoever depends on the target.
    Export,
}

impl Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Relation::Dep => "deps",
            Relation::RuntimeDep => "runtime_deps",
            Relation::Export => "exports",
        })
    }
}

/// The declared outputs of a single target.
#[derive(Debug, Clone)]
pub struct Target {
    pub label: Label,
    pub output_jar: Option<Artifact>,
    pub compile_jar: Option<Artifact>,
    pub source_jar: Option<Artifact>,
    pub neverlink: bool,
    pub jdeps: Option<Artifact>,
}

impl Target {
    pub fn new(label: impl Into<Label>) -> Self {
        Self {
            label: label.into(),
            output_jar: None,
            compile_jar: None,
            source_jar: None,
            neverlink: false,
            jdeps: None,
        }
    }

    pub fn output_jar(mut self, jar: Artifact) -> Self {
        self.output_jar = Some(jar);
        self
    }

    pub fn compile_jar(mut self, jar: Artifact) -> Self {
        self.compile_jar = Some(jar);
        self
    }

    pub fn source_jar(mut self, jar: Artifact) -> Self {
        self.source_jar = Some(jar);
        self
    }

    pub fn neverlink(mut self, neverlink: bool) -> Self {
        self.neverlink = neverlink;
        self
    }

    pub fn jdeps(mut self, jdeps: Artifact) -> Self {
        self.jdeps = Some(jdeps);
        self
    }
}

/// A lightweight, copyable reference to a target of a [`TargetGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub(crate) NodeIndex);

impl TargetId {
    /// Returns the underlying `NodeIndex` of the target in the graph.
    pub fn index(&self) -> NodeIndex {
        self.0
    }
}

/// Targets connected by relations. Edges point from a dependency to the
/// target using it.
#[derive(Debug, Default, Clone)]
pub struct TargetGraph {
    pub(crate) graph: DiGraph<Target, Relation>,
}

impl TargetGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_target(&mut self, target: Target) -> TargetId {
        TargetId(self.graph.add_node(target))
    }

    /// Declares that `target` uses `dependency` as `relation`. Relations of a
    /// kind keep the order in which they were declared.
    pub fn add_relation(&mut self, target: TargetId, relation: Relation, dependency: TargetId) {
        self.graph.add_edge(dependency.0, target.0, relation);
    }

    pub fn add_dep(&mut self, target: TargetId, dependency: TargetId) {
        self.add_relation(target, Relation::Dep, dependency);
    }

    pub fn add_runtime_dep(&mut self, target: TargetId, dependency: TargetId) {
        self.add_relation(target, Relation::RuntimeDep, dependency);
    }

    pub fn add_export(&mut self, target: TargetId, dependency: TargetId) {
        self.add_relation(target, Relation::Export, dependency);
    }

    pub fn target(&self, id: TargetId) -> Option<&Target> {
        self.graph.node_weight(id.0)
    }

    pub fn find(&self, label: &Label) -> Option<TargetId> {
        self.graph
            .node_indices()
            .find(|&index| &self.graph[index].label == label)
            .map(TargetId)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn targets(&self) -> impl Iterator<Item = TargetId> + '_ {
        self.graph.node_indices().map(TargetId)
    }

    /// Dependencies of `target` under `relation`, in declaration order.
    pub fn relations(&self, target: TargetId, relation: Relation) -> Vec<TargetId> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(target.0, Direction::Incoming)
            .filter(|edge| *edge.weight() == relation)
            .map(|edge| (edge.id(), TargetId(edge.source())))
            .collect();

        // Edge indices grow with insertion, petgraph iterates newest first.
        edges.sort_by_key(|(edge, _)| *edge);
        edges.into_iter().map(|(_, dependency)| dependency).collect()
    }

    /// Builds the provider of every target, see [`Evaluation`].
    pub fn evaluate(&self, config: &EvalConfig) -> Result<Evaluation, crate::GraphError> {
        executor::evaluate(self, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relations_keep_declaration_order() {
        let mut graph = TargetGraph::new();
        let top = graph.add_target(Target::new("//top"));
        let a = graph.add_target(Target::new("//a"));
        let b = graph.add_target(Target::new("//b"));
        let c = graph.add_target(Target::new("//c"));

        graph.add_dep(top, b);
        graph.add_export(top, c);
        graph.add_dep(top, a);
        graph.add_runtime_dep(top, c);

        assert_eq!(graph.relations(top, Relation::Dep), [b, a]);
        assert_eq!(graph.relations(top, Relation::Export), [c]);
        assert_eq!(graph.relations(top, Relation::RuntimeDep), [c]);
        assert!(graph.relations(a, Relation::Dep).is_empty());
    }

    #[test]
    fn test_find() {
        let mut graph = TargetGraph::new();
        let a = graph.add_target(Target::new("//a"));
        assert_eq!(graph.find(&Label::new("//a")), Some(a));
        assert_eq!(graph.find(&Label::new("//missing")), None);
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.target(a).map(|t| t.label.as_str()), Some("//a"));
    }
}
