//! SQLite persistence adapter.

pub mod connection;
pub mod migrations;
pub mod task_persistence;

pub use connection::{create_pool, create_test_pool, ConnectionError, PoolConfig};
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};
pub use task_persistence::SqliteTaskPersistence;
