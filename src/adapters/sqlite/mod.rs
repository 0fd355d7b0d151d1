//! SQLite adapters for the durable acknowledgement store.

pub mod connection;
pub mod migrations;
pub mod state_store;

pub use connection::{create_pool, create_test_pool, PoolConfig};
pub use migrations::{all_migrations, Migration, Migrator};
pub use state_store::{PersistedContainerState, PersistedTaskState, SqliteStateStore};
