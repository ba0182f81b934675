//! In-process persistence for tests and `backend: memory`.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::Task;
use crate::domain::ports::TaskPersistence;

#[derive(Clone, Default)]
pub struct InMemoryTaskPersistence {
    snapshot: Arc<RwLock<HashMap<Uuid, Task>>>,
    saves: Arc<AtomicUsize>,
}

impl InMemoryTaskPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> HashMap<Uuid, Task> {
        self.snapshot.read().await.clone()
    }
}

#[async_trait]
impl TaskPersistence for InMemoryTaskPersistence {
    async fn save(&self, tasks: &HashMap<Uuid, Task>) -> DomainResult<()> {
        *self.snapshot.write().await = tasks.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self) -> DomainResult<HashMap<Uuid, Task>> {
        Ok(self.snapshot.read().await.clone())
    }
}
