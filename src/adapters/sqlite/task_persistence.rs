use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

use super::connection::{create_pool, ConnectionError, PoolConfig};
use super::migrations::{all_embedded_migrations, Migrator};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{PersistenceConfig, Task};
use crate::domain::ports::TaskPersistence;

/// Whole-snapshot task persistence backed by the `task_snapshots` table.
///
/// Each task is stored as one JSON row; `save` replaces every row inside a
/// single transaction so a crash never leaves a half-written snapshot.
#[derive(Clone)]
pub struct SqliteTaskPersistence {
    pool: SqlitePool,
}

impl SqliteTaskPersistence {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open the configured database and bring its schema up to date.
    pub async fn connect(config: &PersistenceConfig) -> anyhow::Result<Self> {
        let pool = create_pool(
            &config.path,
            PoolConfig {
                max_connections: config.max_connections,
                ..PoolConfig::default()
            },
        )
        .await?;
        Self::from_pool(pool).await
    }

    /// Run migrations on an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> anyhow::Result<Self> {
        let applied = Migrator::new(pool.clone())
            .run(&all_embedded_migrations())
            .await?;
        if applied > 0 {
            debug!(applied, "Applied schema migrations");
        }
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl From<ConnectionError> for DomainError {
    fn from(err: ConnectionError) -> Self {
        DomainError::DatabaseError(err.to_string())
    }
}

#[async_trait]
impl TaskPersistence for SqliteTaskPersistence {
    async fn save(&self, tasks: &HashMap<Uuid, Task>) -> DomainResult<()> {
        let updated_at = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM task_snapshots")
            .execute(&mut *tx)
            .await?;

        for (id, task) in tasks {
            let body = serde_json::to_string(task)?;
            sqlx::query("INSERT INTO task_snapshots (id, body, updated_at) VALUES (?, ?, ?)")
                .bind(id.to_string())
                .bind(body)
                .bind(&updated_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load(&self) -> DomainResult<HashMap<Uuid, Task>> {
        let rows = sqlx::query("SELECT id, body FROM task_snapshots")
            .fetch_all(&self.pool)
            .await?;

        let mut tasks = HashMap::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let body: String = row.get("body");
            match serde_json::from_str::<Task>(&body) {
                Ok(task) => {
                    tasks.insert(task.id, task);
                }
                Err(err) => warn!(id = %id, error = %err, "Skipping unreadable task snapshot"),
            }
        }
        Ok(tasks)
    }
}
