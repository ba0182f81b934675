//! Adapters implementing the domain ports.

pub mod github;
pub mod llm;
pub mod memory;
pub mod offline;
pub mod sandbox;
pub mod sqlite;
pub mod templates;

pub use github::GithubAgentDiscovery;
pub use llm::{LlmClient, LlmDecomposer, LlmExecutor};
pub use memory::InMemoryTaskPersistence;
pub use offline::{OfflineDecomposer, OfflineExecutor};
pub use sandbox::ProcessSandbox;
pub use sqlite::SqliteTaskPersistence;
pub use templates::TemplateAgentGenerator;
