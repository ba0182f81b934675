//! Task store: the single owner of all task state.
//!
//! Every mutation goes through [`TaskStore::update`], which applies the
//! change to a working copy, commits it only if the closure succeeds,
//! notifies the observer bus with the committed snapshot and then persists
//! the full task set. Persistence failures are logged and swallowed.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::Task;
use crate::domain::ports::TaskPersistence;
use crate::services::observer_bus::TaskObserverBus;

/// Explicit context object replacing module-level task state.
#[derive(Clone)]
pub struct TaskStore {
    tasks: Arc<RwLock<HashMap<Uuid, Task>>>,
    bus: TaskObserverBus,
    persistence: Arc<dyn TaskPersistence>,
    /// Serializes snapshot writes so a later save never carries older state.
    persist_gate: Arc<Mutex<()>>,
}

impl TaskStore {
    pub fn new(persistence: Arc<dyn TaskPersistence>) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            bus: TaskObserverBus::new(),
            persistence,
            persist_gate: Arc::new(Mutex::new(())),
        }
    }

    pub fn bus(&self) -> &TaskObserverBus {
        &self.bus
    }

    /// Load persisted tasks. Returns how many were restored.
    pub async fn init(&self) -> DomainResult<usize> {
        let loaded = self.persistence.load().await?;
        let count = loaded.len();
        *self.tasks.write().await = loaded;
        info!(count, "Task store initialized");
        Ok(count)
    }

    /// Flush a final snapshot and drop every listener.
    pub async fn dispose(&self) {
        self.persist().await;
        self.bus.clear();
        debug!("Task store disposed");
    }

    /// Register a new task and return its ID.
    pub async fn create(&self, task: Task) -> Uuid {
        let id = task.id;
        {
            let mut tasks = self.tasks.write().await;
            self.bus.notify(&task);
            tasks.insert(id, task);
        }
        self.persist().await;
        id
    }

    pub async fn get(&self, id: Uuid) -> Option<Task> {
        self.tasks.read().await.get(&id).cloned()
    }

    /// All tasks, oldest first.
    pub async fn list(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.tasks.read().await.values().cloned().collect();
        tasks.sort_by_key(|t| t.created_at);
        tasks
    }

    /// Apply `mutate` to a task as one transaction.
    ///
    /// If `mutate` fails the stored task is left untouched and nothing is
    /// notified or persisted.
    pub async fn update<R, F>(&self, id: Uuid, mutate: F) -> DomainResult<R>
    where
        F: FnOnce(&mut Task) -> DomainResult<R>,
    {
        let value = {
            let mut tasks = self.tasks.write().await;
            let stored = tasks.get_mut(&id).ok_or(DomainError::TaskNotFound(id))?;

            let mut working = stored.clone();
            let value = mutate(&mut working)?;
            *stored = working;

            // Notified under the lock so observers see updates in commit order.
            self.bus.notify(stored);
            value
        };

        self.persist().await;
        Ok(value)
    }

    async fn persist(&self) {
        let _gate = self.persist_gate.lock().await;
        let snapshot = self.tasks.read().await.clone();
        if let Err(err) = self.persistence.save(&snapshot).await {
            warn!(error = %err, "Failed to persist task snapshot");
        }
    }
}

impl std::fmt::Debug for TaskStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStore").field("bus", &self.bus).finish_non_exhaustive()
    }
}
