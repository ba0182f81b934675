//! Level-order dependency grouping.
//!
//! Partitions subtasks into ordered groups so that every subtask's
//! dependencies sit in strictly earlier groups. Dependencies on IDs outside
//! the input set count as satisfied. When a round finds nothing eligible
//! (a cycle), every remaining subtask is forced into one group so grouping
//! always terminates, in at most `n` groups.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use crate::domain::models::SubTask;
use crate::services::execution_plan::{ExecutionGroup, ExecutionPlan, UnresolvedDependency};

/// Anything with an ID and prerequisite IDs.
pub trait Dependent {
    fn id(&self) -> &str;
    fn dependencies(&self) -> &[String];
}

impl Dependent for SubTask {
    fn id(&self) -> &str {
        &self.id
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
}

impl Dependent for (String, Vec<String>) {
    fn id(&self) -> &str {
        &self.0
    }

    fn dependencies(&self) -> &[String] {
        &self.1
    }
}

/// Groups subtasks into dependency-respecting execution levels.
#[derive(Debug, Clone, Default)]
pub struct DependencyGrouper;

impl DependencyGrouper {
    pub fn new() -> Self {
        Self
    }

    /// Partition `items` into ordered groups.
    ///
    /// Within a group, members keep their input order.
    pub fn group<T: Dependent>(&self, items: &[T]) -> Vec<ExecutionGroup> {
        let known: HashSet<&str> = items.iter().map(Dependent::id).collect();
        let mut completed: HashSet<&str> = HashSet::new();
        let mut remaining: Vec<&T> = items.iter().collect();
        let mut groups = Vec::new();

        while !remaining.is_empty() {
            let (eligible, blocked): (Vec<&T>, Vec<&T>) = std::mem::take(&mut remaining)
                .into_iter()
                .partition(|&item| {
                    item.dependencies()
                        .iter()
                        .all(|dep| completed.contains(dep.as_str()) || !known.contains(dep.as_str()))
                });

            let level = groups.len();
            let (members, rest, forced) = if eligible.is_empty() {
                (blocked, Vec::new(), true)
            } else {
                (eligible, blocked, false)
            };

            completed.extend(members.iter().map(|&item| item.id()));
            let ids = members.iter().map(|&item| item.id().to_string()).collect();
            groups.push(if forced {
                ExecutionGroup::forced(level, ids)
            } else {
                ExecutionGroup::new(level, ids)
            });
            remaining = rest;
        }

        groups
    }

    /// Dependencies that reference IDs not present in `items`.
    pub fn unresolved_dependencies<T: Dependent>(&self, items: &[T]) -> Vec<UnresolvedDependency> {
        let known: HashSet<&str> = items.iter().map(Dependent::id).collect();
        items
            .iter()
            .flat_map(|item| {
                item.dependencies()
                    .iter()
                    .filter(|dep| !known.contains(dep.as_str()))
                    .map(|dep| UnresolvedDependency {
                        sub_task_id: item.id().to_string(),
                        missing: dep.clone(),
                    })
            })
            .collect()
    }

    /// Find one dependency cycle among known IDs, if any.
    ///
    /// Returned path starts and ends at the same ID: `a -> b -> a`.
    pub fn detect_cycle<T: Dependent>(&self, items: &[T]) -> Option<Vec<String>> {
        let graph: HashMap<&str, &[String]> = items
            .iter()
            .map(|item| (item.id(), item.dependencies()))
            .collect();

        let mut visited = HashSet::new();
        let mut on_stack = HashSet::new();
        let mut path = Vec::new();

        for item in items {
            if !visited.contains(item.id())
                && detect_cycle_util(item.id(), &graph, &mut visited, &mut on_stack, &mut path)
            {
                return Some(path.into_iter().map(str::to_string).collect());
            }
        }
        None
    }

    /// Build an [`ExecutionPlan`] for a task's subtasks.
    ///
    /// `estimated_time` assumes each group needs `ceil(len / concurrency)`
    /// rounds of `per_sub_task` each.
    pub fn build_plan(
        &self,
        sub_tasks: &[SubTask],
        concurrency: usize,
        per_sub_task: Duration,
    ) -> ExecutionPlan {
        let parallel_groups = self.group(sub_tasks);
        let dependencies: BTreeMap<String, Vec<String>> = sub_tasks
            .iter()
            .map(|s| (s.id.clone(), s.dependencies.clone()))
            .collect();

        let concurrency = concurrency.max(1);
        let rounds: usize = parallel_groups
            .iter()
            .map(|g| g.len().div_ceil(concurrency))
            .sum();
        let estimated_time = per_sub_task.saturating_mul(u32::try_from(rounds).unwrap_or(u32::MAX));

        ExecutionPlan {
            parallel_groups,
            dependencies,
            estimated_time,
            unresolved_dependencies: self.unresolved_dependencies(sub_tasks),
        }
    }
}

fn detect_cycle_util<'a>(
    node: &'a str,
    graph: &HashMap<&'a str, &'a [String]>,
    visited: &mut HashSet<&'a str>,
    on_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> bool {
    visited.insert(node);
    on_stack.insert(node);
    path.push(node);

    if let Some(neighbors) = graph.get(node) {
        for neighbor in neighbors.iter() {
            let Some((&neighbor, _)) = graph.get_key_value(neighbor.as_str()) else {
                continue;
            };
            if !visited.contains(neighbor) {
                if detect_cycle_util(neighbor, graph, visited, on_stack, path) {
                    return true;
                }
            } else if on_stack.contains(neighbor) {
                if let Some(start) = path.iter().position(|&id| id == neighbor) {
                    path.drain(0..start);
                    path.push(neighbor);
                    return true;
                }
            }
        }
    }

    on_stack.remove(node);
    path.pop();
    false
}

/// Convenience wrapper returning plain ID groups.
pub fn group_by_dependencies<T: Dependent>(items: &[T]) -> Vec<Vec<String>> {
    DependencyGrouper::new()
        .group(items)
        .into_iter()
        .map(|g| g.sub_task_ids)
        .collect()
}
