// src/dag/graph.rs

use std::collections::{BTreeMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{Result, TaskwatchError};
use crate::types::TaskName;

/// In-memory dependency graph keyed by task name.
///
/// Each entry lists the direct dependencies of a task (its `after` list) in
/// declaration order.
#[derive(Debug, Clone, Default)]
pub struct TaskGraph {
    deps: BTreeMap<TaskName, Vec<TaskName>>,
}

impl TaskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(name, after)` pairs.
    pub fn from_tasks<'a, I>(tasks: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [TaskName])>,
    {
        let deps = tasks
            .into_iter()
            .map(|(name, after)| (name.to_string(), after.to_vec()))
            .collect();
        Self { deps }
    }

    pub fn insert(&mut self, name: impl Into<TaskName>, after: Vec<TaskName>) {
        self.deps.insert(name.into(), after);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.deps.contains_key(name)
    }

    /// All task names, sorted.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.deps.keys().map(|s| s.as_str())
    }

    /// Immediate dependencies of a task (the tasks listed in its `after`).
    pub fn dependencies_of(&self, name: &str) -> &[TaskName] {
        self.deps.get(name).map(|d| d.as_slice()).unwrap_or(&[])
    }

    /// Check that every dependency exists, no task depends on itself, and
    /// the graph has no cycles.
    pub fn validate(&self) -> Result<()> {
        for (name, after) in self.deps.iter() {
            for dep in after {
                if dep == name {
                    return Err(TaskwatchError::ConfigError(format!(
                        "task '{}' cannot depend on itself in `after`",
                        name
                    )));
                }
                if !self.deps.contains_key(dep) {
                    return Err(TaskwatchError::ConfigError(format!(
                        "task '{}' has unknown dependency '{}' in `after`",
                        name, dep
                    )));
                }
            }
        }

        // Edge direction: dep -> task
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in self.deps.keys() {
            graph.add_node(name.as_str());
        }
        for (name, after) in self.deps.iter() {
            for dep in after {
                graph.add_edge(dep.as_str(), name.as_str(), ());
            }
        }

        // A topological sort will fail if there is a cycle.
        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(TaskwatchError::DagCycle(format!(
                "cycle detected in task graph involving task '{}'",
                cycle.node_id()
            ))),
        }
    }

    /// Execution order for `requested`: each task is preceded by its
    /// dependencies, requested tasks keep their relative order, and no task
    /// appears twice.
    pub fn plan(&self, requested: &[TaskName]) -> Result<Vec<TaskName>> {
        self.validate()?;

        let mut visited: HashSet<&str> = HashSet::new();
        let mut order = Vec::new();
        for name in requested {
            if !self.deps.contains_key(name) {
                return Err(TaskwatchError::TaskNotFound(name.clone()));
            }
            self.visit(name, &mut visited, &mut order);
        }
        Ok(order)
    }

    fn visit<'a>(&'a self, name: &'a str, visited: &mut HashSet<&'a str>, order: &mut Vec<TaskName>) {
        if !visited.insert(name) {
            return;
        }
        for dep in self.dependencies_of(name) {
            self.visit(dep, visited, order);
        }
        order.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(spec: &[(&str, &[&str])]) -> TaskGraph {
        let mut g = TaskGraph::new();
        for (name, after) in spec {
            g.insert(*name, after.iter().map(|s| s.to_string()).collect());
        }
        g
    }

    fn names(v: &[&str]) -> Vec<TaskName> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn plan_runs_dependencies_first_and_once() {
        let g = graph(&[
            ("fmt", &[]),
            ("lint", &["fmt"]),
            ("build", &["fmt", "lint"]),
            ("test", &["build"]),
        ]);

        assert_eq!(
            g.plan(&names(&["test"])).unwrap(),
            names(&["fmt", "lint", "build", "test"])
        );
        assert_eq!(
            g.plan(&names(&["lint", "build"])).unwrap(),
            names(&["fmt", "lint", "build"])
        );
    }

    #[test]
    fn plan_keeps_requested_order_for_independent_tasks() {
        let g = graph(&[("a", &[]), ("b", &[]), ("c", &[])]);
        assert_eq!(g.plan(&names(&["c", "a"])).unwrap(), names(&["c", "a"]));
    }

    #[test]
    fn unknown_requested_task_is_not_found() {
        let g = graph(&[("a", &[])]);
        assert!(matches!(
            g.plan(&names(&["missing"])),
            Err(TaskwatchError::TaskNotFound(name)) if name == "missing"
        ));
    }

    #[test]
    fn validate_rejects_cycles_and_bad_references() {
        let cyclic = graph(&[("a", &["b"]), ("b", &["a"])]);
        match cyclic.validate() {
            Err(TaskwatchError::DagCycle(msg)) => assert!(msg.contains("cycle detected")),
            other => panic!("expected DagCycle, got {other:?}"),
        }

        let unknown = graph(&[("a", &["nope"])]);
        match unknown.validate() {
            Err(TaskwatchError::ConfigError(msg)) => assert!(msg.contains("unknown dependency")),
            other => panic!("expected ConfigError, got {other:?}"),
        }

        let selfish = graph(&[("a", &["a"])]);
        assert!(matches!(selfish.validate(), Err(TaskwatchError::ConfigError(_))));
    }
}
