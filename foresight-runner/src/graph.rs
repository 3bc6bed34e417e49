//! The pipeline as an explicit task graph.
//!
//! Two independent fetch leaves joined by a barrier into the merge. The
//! graph carries ordering only; retry policy and timers live in whatever
//! scheduler walks it. `ready_after` is the query such a scheduler needs:
//! given what has completed, what may start now.

use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

/// Identifier of one task unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskId {
    FetchSec,
    FetchFred,
    Merge,
}

impl TaskId {
    pub fn name(&self) -> &'static str {
        match self {
            TaskId::FetchSec => "fetch_sec",
            TaskId::FetchFred => "fetch_fred",
            TaskId::Merge => "merge",
        }
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One task unit and its dependencies.
#[derive(Debug, Clone)]
pub struct TaskNode {
    pub id: TaskId,
    pub depends_on: Vec<TaskId>,
}

/// Errors from graph validation.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("task graph contains a cycle")]
    Cycle,

    #[error("task {task} depends on undeclared task {dependency}")]
    UnknownDependency { task: TaskId, dependency: TaskId },
}

/// A directed acyclic graph of task units.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: Vec<TaskNode>,
}

impl TaskGraph {
    pub fn new(nodes: Vec<TaskNode>) -> Self {
        Self { nodes }
    }

    /// The standard pipeline shape: `fetch_sec` and `fetch_fred` in
    /// parallel, then `merge` once both have completed.
    pub fn standard() -> Self {
        Self::new(vec![
            TaskNode {
                id: TaskId::FetchSec,
                depends_on: vec![],
            },
            TaskNode {
                id: TaskId::FetchFred,
                depends_on: vec![],
            },
            TaskNode {
                id: TaskId::Merge,
                depends_on: vec![TaskId::FetchSec, TaskId::FetchFred],
            },
        ])
    }

    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    /// Tasks whose dependencies are all in `completed` and which are not
    /// themselves completed.
    pub fn ready_after(&self, completed: &[TaskId]) -> Vec<TaskId> {
        let done: HashSet<TaskId> = completed.iter().copied().collect();
        self.nodes
            .iter()
            .filter(|node| !done.contains(&node.id))
            .filter(|node| node.depends_on.iter().all(|dep| done.contains(dep)))
            .map(|node| node.id)
            .collect()
    }

    /// A dependency-respecting execution order (Kahn's algorithm).
    ///
    /// Declaration order breaks ties, so the result is deterministic.
    pub fn topo_order(&self) -> Result<Vec<TaskId>, GraphError> {
        let declared: HashSet<TaskId> = self.nodes.iter().map(|n| n.id).collect();
        for node in &self.nodes {
            for dep in &node.depends_on {
                if !declared.contains(dep) {
                    return Err(GraphError::UnknownDependency {
                        task: node.id,
                        dependency: *dep,
                    });
                }
            }
        }

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut done: Vec<TaskId> = Vec::new();

        while order.len() < self.nodes.len() {
            let ready = self.ready_after(&done);
            if ready.is_empty() {
                return Err(GraphError::Cycle);
            }
            for id in ready {
                order.push(id);
                done.push(id);
            }
        }

        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_graph_runs_merge_last() {
        let graph = TaskGraph::standard();
        let order = graph.topo_order().unwrap();

        assert_eq!(order.len(), 3);
        assert_eq!(order.last(), Some(&TaskId::Merge));
    }

    #[test]
    fn fetches_are_ready_immediately_merge_is_not() {
        let graph = TaskGraph::standard();

        let ready = graph.ready_after(&[]);
        assert_eq!(ready, [TaskId::FetchSec, TaskId::FetchFred]);

        // One fetch done is not enough to release the merge.
        assert_eq!(graph.ready_after(&[TaskId::FetchSec]), [TaskId::FetchFred]);

        // Both done: the barrier opens.
        assert_eq!(
            graph.ready_after(&[TaskId::FetchSec, TaskId::FetchFred]),
            [TaskId::Merge]
        );

        // Everything done: nothing left.
        assert!(graph
            .ready_after(&[TaskId::FetchSec, TaskId::FetchFred, TaskId::Merge])
            .is_empty());
    }

    #[test]
    fn cycle_is_rejected() {
        let graph = TaskGraph::new(vec![
            TaskNode {
                id: TaskId::FetchSec,
                depends_on: vec![TaskId::Merge],
            },
            TaskNode {
                id: TaskId::Merge,
                depends_on: vec![TaskId::FetchSec],
            },
        ]);

        assert!(matches!(graph.topo_order(), Err(GraphError::Cycle)));
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let graph = TaskGraph::new(vec![TaskNode {
            id: TaskId::Merge,
            depends_on: vec![TaskId::FetchFred],
        }]);

        assert!(matches!(
            graph.topo_order(),
            Err(GraphError::UnknownDependency { .. })
        ));
    }
}
