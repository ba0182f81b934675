pub mod agent;
pub mod classification;
pub mod config;
pub mod subtask;
pub mod task;

pub use agent::{Agent, AgentResult, AgentSource, AgentStatus, Skill};
pub use classification::{Classification, Complexity, TaskType};
pub use config::{
    Config, DiscoveryConfig, LlmConfig, LoggingConfig, OrchestrationConfig, PersistenceBackend,
    PersistenceConfig, SandboxConfig,
};
pub use subtask::{SubTask, SubTaskSeed, SubTaskStatus};
pub use task::{LogEntry, LogLevel, Task, TaskStatus};
