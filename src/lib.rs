//! Taskloom - dependency-aware task orchestrator
//!
//! Taskloom decomposes a natural-language task into subtasks, binds an agent
//! to each, runs them in dependency-ordered groups under a concurrency
//! limit and aggregates their outputs into a report.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and port traits
//! - **Service Layer** (`services`): scheduling primitives, task store, observer bus
//! - **Application Layer** (`application`): subtask execution and task coordination
//! - **Adapters** (`adapters`): persistence, LLM, discovery and sandbox implementations
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use taskloom::adapters::InMemoryTaskPersistence;
//! use taskloom::cli::service::build_coordinator;
//! use taskloom::domain::models::{Config, Task};
//! use taskloom::services::TaskStore;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let store = TaskStore::new(Arc::new(InMemoryTaskPersistence::new()));
//!     let coordinator = build_coordinator(&config, store, true)?;
//!
//!     let id = coordinator.submit(Task::new("Research tide tables")).await;
//!     let task = coordinator.run(id).await?;
//!     println!("{}", task.result.unwrap_or_default());
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{SubtaskExecutor, TaskCoordinator};
pub use domain::models::{
    Agent, AgentStatus, Config, LogEntry, SubTask, SubTaskStatus, Task, TaskStatus,
};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{
    ConcurrencyLimiter, DependencyGrouper, ExecutionPlan, TaskObserverBus, TaskStore,
};
