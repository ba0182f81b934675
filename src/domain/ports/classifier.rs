//! Task classifier port.

use crate::domain::models::Classification;

/// Labels a task description with a type and complexity.
///
/// The labels only select a fallback decomposition template, so any
/// implementation (keyword heuristics, a model) can be swapped in without
/// touching the scheduler.
pub trait TaskClassifier: Send + Sync {
    fn classify(&self, description: &str) -> Classification;
}
