use std::collections::HashMap;
use std::fmt::{self, Write};
use std::time::{Duration, Instant};

use crate::graph::{TargetGraph, TargetId};

/// When a provider was built and how long it took.
#[derive(Debug, Clone, Copy)]
pub struct TargetExecution {
    pub start: Instant,
    pub duration: Duration,
}

/// Evaluation metrics.
///
/// Returned as part of an [`Evaluation`](crate::Evaluation). Only targets
/// whose provider was actually built have an entry, targets skipped because
/// of a cycle or a failed dependency don't.
#[derive(Debug, Default)]
pub struct Diagnostics {
    pub execution_times: HashMap<TargetId, TargetExecution>,
}

impl Diagnostics {
    /// Sum of the time spent building providers, across all threads.
    pub fn total(&self) -> Duration {
        self.execution_times.values().map(|exec| exec.duration).sum()
    }

    /// The target that took the longest to build.
    pub fn slowest(&self) -> Option<(TargetId, Duration)> {
        self.execution_times
            .iter()
            .map(|(id, exec)| (*id, exec.duration))
            .max_by_key(|(id, duration)| (*duration, std::cmp::Reverse(*id)))
    }

    /// Renders the target graph as a Mermaid diagram, color-coded by build
    /// duration.
    ///
    /// * **Green**: Fast
    /// * **Yellow**: Moderate
    /// * **Red**: Slow
    /// * **Grey**: Not built
    pub fn render_mermaid(&self, graph: &TargetGraph) -> String {
        let mut f = String::new();
        // Writing into a String can't fail.
        let _ = self.write_mermaid(graph, &mut f);
        f
    }

    fn write_mermaid(&self, graph: &TargetGraph, f: &mut String) -> fmt::Result {
        writeln!(f, "graph LR")?;

        let times = &self.execution_times;
        let (min_time, max_time) = times
            .values()
            .map(|exec| exec.duration.as_secs_f64())
            .fold(None, |range, secs| match range {
                None => Some((secs, secs)),
                Some((min, max)) => Some((f64::min(min, secs), f64::max(max, secs))),
            })
            .unwrap_or((0.0, 0.0));

        // All targets took the same time
        let span = if (max_time - min_time).abs() < f64::EPSILON {
            1.0
        } else {
            max_time - min_time
        };

        for index in graph.graph.node_indices() {
            let name = graph.graph[index].label.as_str().replace('"', "#quot;");

            let (extra, color) = match times.get(&TargetId(index)) {
                Some(exec) => {
                    let t = (exec.duration.as_secs_f64() - min_time) / span;
                    (format!("{:.2?}", exec.duration), gradient(t))
                }
                None => ("Not built".to_string(), "#D3D3D3".to_string()),
            };

            writeln!(f, "    {}[\"{}\\n{}\"]", index.index(), name, extra)?;
            writeln!(f, "    style {} fill:{}", index.index(), color)?;
        }

        for edge in graph.graph.edge_indices() {
            if let Some((source, target)) = graph.graph.edge_endpoints(edge) {
                writeln!(
                    f,
                    "    {} -- \"{}\" --> {}",
                    source.index(),
                    graph.graph[edge],
                    target.index()
                )?;
            }
        }

        Ok(())
    }
}

/// Green at 0.0, yellow at 0.5, red at 1.0.
fn gradient(t: f64) -> String {
    let t = t.clamp(0.0, 1.0);
    let (r, g) = if t < 0.5 {
        ((255.0 * t * 2.0) as u8, 255)
    } else {
        (255, (255.0 * (1.0 - (t - 0.5) * 2.0)) as u8)
    };

    format!("#{r:02X}{g:02X}00")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Target;

    #[test]
    fn test_gradient() {
        assert_eq!(gradient(0.0), "#00FF00");
        assert_eq!(gradient(0.5), "#FFFF00");
        assert_eq!(gradient(1.0), "#FF0000");
        assert_eq!(gradient(7.0), "#FF0000");
    }

    #[test]
    fn test_render_mermaid() {
        let mut graph = TargetGraph::new();
        let dep = graph.add_target(Target::new("//dep"));
        let lib = graph.add_target(Target::new("//lib"));
        graph.add_export(lib, dep);

        let now = Instant::now();
        let mut diagnostics = Diagnostics::default();
        diagnostics.execution_times.insert(
            dep,
            TargetExecution {
                start: now,
                duration: Duration::from_millis(3),
            },
        );

        let mermaid = diagnostics.render_mermaid(&graph);
        assert!(mermaid.starts_with("graph LR\n"));
        assert!(mermaid.contains("    0[\"//dep\\n3.00ms\"]"));
        assert!(mermaid.contains("    style 0 fill:#00FF00"));
        assert!(mermaid.contains("    1[\"//lib\\nNot built\"]"));
        assert!(mermaid.contains("    style 1 fill:#D3D3D3"));
        assert!(mermaid.contains("    0 -- \"exports\" --> 1"));
    }

    #[test]
    fn test_slowest() {
        let now = Instant::now();
        let mut diagnostics = Diagnostics::default();
        assert_eq!(diagnostics.slowest(), None);

        for (index, millis) in [(0, 5), (1, 9), (2, 2)] {
            diagnostics.execution_times.insert(
                TargetId(petgraph::graph::NodeIndex::new(index)),
                TargetExecution {
                    start: now,
                    duration: Duration::from_millis(millis),
                },
            );
        }

        assert_eq!(
            diagnostics.slowest(),
            Some((
                TargetId(petgraph::graph::NodeIndex::new(1)),
                Duration::from_millis(9)
            ))
        );
        assert_eq!(diagnostics.total(), Duration::from_millis(16));
    }
}
