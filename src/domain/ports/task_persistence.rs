//! Persistence port for task snapshots.

use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Task;

/// Stores the full set of tasks.
///
/// `save` is called after every mutation and must be an idempotent
/// overwrite of the whole snapshot.
#[async_trait]
pub trait TaskPersistence: Send + Sync {
    async fn save(&self, tasks: &HashMap<Uuid, Task>) -> DomainResult<()>;

    async fn load(&self) -> DomainResult<HashMap<Uuid, Task>>;
}
