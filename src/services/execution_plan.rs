//! Execution Plan for group-sequential subtask execution
//!
//! Subtasks are organized into ordered groups. Groups run one after another;
//! members of a group run concurrently.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// A group of subtasks that may run concurrently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionGroup {
    /// Position in the plan (0-indexed)
    pub level: usize,

    /// Subtask IDs in input order
    pub sub_task_ids: Vec<String>,

    /// True when the group was formed by breaking a dependency cycle, i.e.
    /// some members have unmet dependencies
    #[serde(default)]
    pub forced: bool,
}

impl ExecutionGroup {
    pub fn new(level: usize, sub_task_ids: Vec<String>) -> Self {
        Self {
            level,
            sub_task_ids,
            forced: false,
        }
    }

    pub(crate) fn forced(level: usize, sub_task_ids: Vec<String>) -> Self {
        Self {
            level,
            sub_task_ids,
            forced: true,
        }
    }

    pub fn len(&self) -> usize {
        self.sub_task_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sub_task_ids.is_empty()
    }
}

/// A dependency on an ID that is not part of the subtask set.
///
/// Such dependencies are treated as already satisfied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnresolvedDependency {
    pub sub_task_id: String,
    pub missing: String,
}

/// Derived execution plan for one task. Not persisted on its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionPlan {
    /// Groups in execution order
    pub parallel_groups: Vec<ExecutionGroup>,

    /// Copy of the dependency map the plan was built from
    pub dependencies: BTreeMap<String, Vec<String>>,

    /// Advisory wall-clock estimate
    pub estimated_time: Duration,

    /// Dependencies that referenced unknown subtask IDs
    #[serde(default)]
    pub unresolved_dependencies: Vec<UnresolvedDependency>,
}

impl ExecutionPlan {
    /// Create an empty execution plan
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get the total number of groups in the plan
    pub fn total_groups(&self) -> usize {
        self.parallel_groups.len()
    }

    /// Get the total number of subtasks across all groups
    pub fn total_sub_tasks(&self) -> usize {
        self.parallel_groups.iter().map(ExecutionGroup::len).sum()
    }

    pub fn get_group(&self, level: usize) -> Option<&ExecutionGroup> {
        self.parallel_groups.get(level)
    }

    pub fn is_empty(&self) -> bool {
        self.parallel_groups.is_empty()
    }

    /// Group indices produced by the cycle-break fallback.
    pub fn forced_groups(&self) -> Vec<usize> {
        self.parallel_groups
            .iter()
            .filter(|g| g.forced)
            .map(|g| g.level)
            .collect()
    }

    /// Group IDs as plain vectors, in order.
    pub fn group_ids(&self) -> Vec<Vec<String>> {
        self.parallel_groups
            .iter()
            .map(|g| g.sub_task_ids.clone())
            .collect()
    }

    /// Get all subtask IDs in the plan, in execution order
    pub fn all_sub_task_ids(&self) -> Vec<String> {
        self.parallel_groups
            .iter()
            .flat_map(|group| group.sub_task_ids.iter())
            .cloned()
            .collect()
    }

    /// Validate the plan structure
    ///
    /// Checks that:
    /// - Groups are numbered sequentially from 0
    /// - No group is empty
    /// - No subtask ID appears twice
    /// - Outside forced groups, every known dependency sits in an earlier group
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();

        for (idx, group) in self.parallel_groups.iter().enumerate() {
            if group.level != idx {
                return Err(format!(
                    "Group {} has incorrect level number {}",
                    idx, group.level
                ));
            }

            if group.is_empty() {
                return Err(format!("Group {} is empty", idx));
            }

            if !group.forced {
                for id in &group.sub_task_ids {
                    let deps = self.dependencies.get(id).map(Vec::as_slice).unwrap_or(&[]);
                    for dep in deps {
                        if self.dependencies.contains_key(dep) && !seen.contains(dep) {
                            return Err(format!(
                                "Subtask {} in group {} depends on {} which is not in an earlier group",
                                id, idx, dep
                            ));
                        }
                    }
                }
            }

            for id in &group.sub_task_ids {
                if !seen.insert(id.clone()) {
                    return Err(format!("Duplicate subtask ID found: {}", id));
                }
            }
        }

        Ok(())
    }
}
