//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces external collaborators implement:
//! - TaskClassifier: type/complexity labelling
//! - Decomposer: splitting a description into subtask seeds
//! - AgentGenerator / AgentDiscovery: producing agents for subtasks
//! - PrimaryExecutor / SandboxExecutor: running agent code
//! - TaskPersistence: snapshotting all tasks
//!
//! The orchestration core only depends on these traits.

pub mod agent_provider;
pub mod classifier;
pub mod decomposer;
pub mod executor;
pub mod task_persistence;

pub use agent_provider::{AgentDiscovery, AgentGenerator};
pub use classifier::TaskClassifier;
pub use decomposer::Decomposer;
pub use executor::{ExecutionOutput, ExecutionRequest, PrimaryExecutor, SandboxExecutor, SandboxOutcome};
pub use task_persistence::TaskPersistence;
