//! Core services: scheduling primitives, the task store and planning helpers.

pub mod agent_assigner;
pub mod concurrency_limiter;
pub mod dependency_grouper;
pub mod execution_plan;
pub mod fallback_templates;
pub mod keyword_classifier;
pub mod observer_bus;
pub mod result_aggregator;
pub mod task_store;

pub use agent_assigner::AgentAssigner;
pub use concurrency_limiter::{ConcurrencyLimiter, LimiterError};
pub use dependency_grouper::{group_by_dependencies, Dependent, DependencyGrouper};
pub use execution_plan::{ExecutionGroup, ExecutionPlan, UnresolvedDependency};
pub use keyword_classifier::KeywordClassifier;
pub use observer_bus::{ChannelListener, Subscription, TaskListener, TaskObserverBus};
pub use result_aggregator::aggregate;
pub use task_store::TaskStore;
