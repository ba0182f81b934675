pub mod subtask_executor;
pub mod task_coordinator;

pub use subtask_executor::SubtaskExecutor;
pub use task_coordinator::{PlanPreview, TaskCoordinator};
