use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError, channel};
use std::time::{Duration, Instant};

use petgraph::graph::NodeIndex;
use tracing::Level;
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::error::{EvalError, GraphError};
use crate::graph::diagnostics::{Diagnostics, TargetExecution};
use crate::graph::{Relation, Target, TargetGraph, TargetId};
use crate::provider::JavaInfo;

/// Options for [`TargetGraph::evaluate`].
#[derive(Debug, Clone, Default)]
pub struct EvalConfig {
    /// Worker threads used to build providers. `None` uses the global rayon
    /// pool.
    pub threads: Option<usize>,
    /// Report progress through the `tracing-indicatif` layer, if installed.
    pub progress: bool,
}

impl EvalConfig {
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    pub fn progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }
}

type TargetResult = Result<Arc<JavaInfo>, EvalError>;

/// The outcome of evaluating a [`TargetGraph`]: a provider or an error for
/// every target.
#[derive(Debug)]
pub struct Evaluation {
    pub(crate) results: HashMap<NodeIndex, TargetResult>,
    pub diagnostics: Diagnostics,
}

impl Evaluation {
    pub fn result(&self, id: TargetId) -> Option<&TargetResult> {
        self.results.get(&id.0)
    }

    pub fn provider(&self, id: TargetId) -> Option<&Arc<JavaInfo>> {
        self.results.get(&id.0).and_then(|result| result.as_ref().ok())
    }

    pub fn error(&self, id: TargetId) -> Option<&EvalError> {
        self.results.get(&id.0).and_then(|result| result.as_ref().err())
    }

    /// Every error, ordered by target.
    pub fn failures(&self) -> Vec<&EvalError> {
        let mut failures: Vec<_> = self
            .results
            .iter()
            .filter_map(|(index, result)| result.as_ref().err().map(|err| (*index, err)))
            .collect();
        failures.sort_by_key(|(index, _)| *index);
        failures.into_iter().map(|(_, err)| err).collect()
    }

    pub fn is_success(&self) -> bool {
        self.results.values().all(Result::is_ok)
    }
}

/// (index, result, start, duration)
type Completion = (NodeIndex, TargetResult, Instant, Duration);

pub(crate) fn evaluate(graph: &TargetGraph, config: &EvalConfig) -> Result<Evaluation, GraphError> {
    match config.threads {
        Some(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|i| format!("javainfo-{i}"))
                .build()?;
            Ok(pool.install(|| run(graph, config)))
        }
        None => Ok(run(graph, config)),
    }
}

/// Builds providers in dependency order. Targets are handed to the rayon
/// pool as soon as every target they relate to is done, the calling thread
/// only collects results and unlocks dependents.
fn run(graph: &TargetGraph, config: &EvalConfig) -> Evaluation {
    let site = &graph.graph;
    let total = site.node_count();

    let mut results: HashMap<NodeIndex, TargetResult> = HashMap::with_capacity(total);
    let mut execution_times = HashMap::new();

    if total == 0 {
        return Evaluation {
            results,
            diagnostics: Diagnostics::default(),
        };
    }

    let root_span = tracing::span!(Level::INFO, "evaluating_targets", targets = total);
    if config.progress
        && let Ok(style) = crate::utils::style_evaluation()
    {
        root_span.pb_set_style(&style);
        root_span.pb_set_length(total as u64);
        root_span.pb_set_message("Building providers...");
    }
    let _enter = root_span.enter();

    // Number of relations still pending for each target.
    let mut pending: HashMap<NodeIndex, usize> = site
        .node_indices()
        .map(|index| {
            let count = site
                .neighbors_directed(index, petgraph::Direction::Incoming)
                .count();
            (index, count)
        })
        .collect();

    // Targets decided without running anything: cycles and failed dependencies.
    let mut settled: VecDeque<(NodeIndex, TargetResult)> = cyclic_targets(graph)
        .into_iter()
        .map(|index| {
            let label = site[index].label.clone();
            tracing::warn!(target = %label, "target is part of a dependency cycle");
            (index, Err(EvalError::Cycle { label }))
        })
        .collect();

    let mut in_flight = 0usize;

    rayon::scope(|s| {
        let (sender, receiver) = channel::<Completion>();

        let schedule = |results: &HashMap<NodeIndex, TargetResult>,
                            settled: &mut VecDeque<(NodeIndex, TargetResult)>,
                            in_flight: &mut usize,
                            index: NodeIndex| {
            let relations = match collect_relations(graph, results, index) {
                Ok(relations) => relations,
                Err(err) => {
                    settled.push_back((index, Err(err)));
                    return;
                }
            };

            let target = &site[index];
            let sender = sender.clone();
            *in_flight += 1;

            s.spawn(move |_| {
                let span = tracing::span!(Level::INFO, "target", label = %target.label);
                let _enter = span.enter();

                let start = Instant::now();
                let result = match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    build(target, &relations)
                })) {
                    Ok(result) => result,
                    Err(panic) => {
                        let message = if let Some(s) = panic.downcast_ref::<&str>() {
                            s.to_string()
                        } else if let Some(s) = panic.downcast_ref::<String>() {
                            s.clone()
                        } else {
                            String::from("unknown payload")
                        };

                        Err(EvalError::Panic {
                            label: target.label.clone(),
                            message,
                        })
                    }
                };

                // The coordinator may have stopped listening already.
                let _ = sender.send((index, result, start, start.elapsed()));
            });
        };

        // Seed targets without relations.
        for index in site.node_indices() {
            if pending.get(&index) == Some(&0) {
                schedule(&results, &mut settled, &mut in_flight, index);
            }
        }

        let mut completed = 0;
        while completed < total {
            let (index, result) = match settled.pop_front() {
                Some(done) => done,
                None if in_flight > 0 => {
                    let Some((index, result, start, duration)) = next_completion(&receiver)
                    else {
                        break;
                    };
                    in_flight -= 1;
                    execution_times.insert(TargetId(index), TargetExecution { start, duration });
                    (index, result)
                }
                // Nothing left can become ready.
                None => break,
            };

            if results.contains_key(&index) {
                continue;
            }

            if let Err(err) = &result {
                tracing::warn!("{err}");
            }

            results.insert(index, result);
            completed += 1;
            root_span.pb_inc(1);

            // Unlock dependents
            for dependent in site.neighbors_directed(index, petgraph::Direction::Outgoing) {
                if results.contains_key(&dependent) {
                    continue;
                }
                if let Some(count) = pending.get_mut(&dependent) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        schedule(&results, &mut settled, &mut in_flight, dependent);
                    }
                }
            }
        }
    });

    tracing::info!(
        targets = total,
        failed = results.values().filter(|result| result.is_err()).count(),
        "evaluation complete"
    );

    Evaluation {
        results,
        diagnostics: Diagnostics { execution_times },
    }
}

/// Waits for the next finished target without starving the pool, the
/// coordinator itself runs on a pool thread. `None` once every sender is gone.
fn next_completion(receiver: &Receiver<Completion>) -> Option<Completion> {
    loop {
        match receiver.try_recv() {
            Ok(done) => return Some(done),
            Err(TryRecvError::Disconnected) => return None,
            Err(TryRecvError::Empty) => {}
        }

        // Run queued targets here instead of blocking the thread.
        if matches!(rayon::yield_now(), Some(rayon::Yield::Executed)) {
            continue;
        }

        // Nothing queued: a blocking `recv` would park the only thread of a
        // one-thread pool and the targets spawned later could never run, so
        // wait briefly and poll the queue again.
        match receiver.recv_timeout(Duration::from_millis(1)) {
            Ok(done) => return Some(done),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}

/// Every target on a dependency cycle, including self-references.
fn cyclic_targets(graph: &TargetGraph) -> Vec<NodeIndex> {
    let site = &graph.graph;
    let mut cyclic: Vec<NodeIndex> = petgraph::algo::tarjan_scc(site)
        .into_iter()
        .filter(|component| {
            component.len() > 1 || site.contains_edge(component[0], component[0])
        })
        .flatten()
        .collect();

    cyclic.sort();
    cyclic
}

struct Relations {
    deps: Vec<Arc<JavaInfo>>,
    runtime_deps: Vec<Arc<JavaInfo>>,
    exports: Vec<Arc<JavaInfo>>,
}

/// Providers of every relation of `index`, or the error for the first
/// failed one.
fn collect_relations(
    graph: &TargetGraph,
    results: &HashMap<NodeIndex, TargetResult>,
    index: NodeIndex,
) -> Result<Relations, EvalError> {
    let id = TargetId(index);
    let label = &graph.graph[index].label;
    let mut seen = HashSet::new();

    let mut resolve = |relation: Relation| -> Result<Vec<Arc<JavaInfo>>, EvalError> {
        graph
            .relations(id, relation)
            .into_iter()
            .filter(|dependency| seen.insert((relation, *dependency)))
            .map(|dependency| match results.get(&dependency.0) {
                Some(Ok(info)) => Ok(Arc::clone(info)),
                _ => Err(EvalError::Dependency {
                    label: label.clone(),
                    failed: graph.graph[dependency.0].label.clone(),
                }),
            })
            .collect()
    };

    Ok(Relations {
        deps: resolve(Relation::Dep)?,
        runtime_deps: resolve(Relation::RuntimeDep)?,
        exports: resolve(Relation::Export)?,
    })
}

fn build(target: &Target, relations: &Relations) -> TargetResult {
    let mut builder = JavaInfo::builder()
        .label(target.label.clone())
        .compile_jar(target.compile_jar.clone())
        .source_jar(target.source_jar.clone())
        .neverlink(target.neverlink)
        .jdeps(target.jdeps.clone())
        .deps(relations.deps.iter().map(Arc::as_ref))
        .runtime_deps(relations.runtime_deps.iter().map(Arc::as_ref))
        .exports(relations.exports.iter().map(Arc::as_ref));

    if let Some(jar) = &target.output_jar {
        builder = builder.output_jar(jar.clone());
    }

    builder
        .build()
        .map(Arc::new)
        .map_err(|source| EvalError::Provider {
            label: target.label.clone(),
            source,
        })
}
