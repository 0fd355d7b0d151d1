//! SQLite-backed acknowledgement store.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::domain::errors::StoreError;
use crate::domain::models::{ContainerRecord, ContainerStatus, TaskRecord, TaskStatus};
use crate::domain::ports::StateStore;

use super::connection::{create_pool, PoolConfig};
use super::migrations::{all_migrations, Migrator};

/// Durable write-through store for acknowledged task and container
/// statuses.
pub struct SqliteStateStore {
    pool: SqlitePool,
}

/// Persisted acknowledgement state for one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskState {
    pub arn: String,
    pub known_status: TaskStatus,
    pub sent_status: TaskStatus,
}

/// Persisted acknowledgement state for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedContainerState {
    pub task_arn: String,
    pub name: String,
    pub runtime_id: Option<String>,
    pub sent_status: ContainerStatus,
}

impl SqliteStateStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) and migrate a store at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = create_pool(database_url, Some(PoolConfig::default())).await?;
        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        Migrator::new(self.pool.clone()).run(all_migrations()).await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub async fn load_task(&self, arn: &str) -> Result<Option<PersistedTaskState>, StoreError> {
        let row = sqlx::query(
            "SELECT arn, known_status, sent_status FROM task_states WHERE arn = ?",
        )
        .bind(arn)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(PersistedTaskState {
                arn: row.get("arn"),
                known_status: parse_task_status(&row.get::<String, _>("known_status"))?,
                sent_status: parse_task_status(&row.get::<String, _>("sent_status"))?,
            })
        })
        .transpose()
    }

    pub async fn load_container(
        &self,
        task_arn: &str,
        name: &str,
    ) -> Result<Option<PersistedContainerState>, StoreError> {
        let row = sqlx::query(
            "SELECT task_arn, name, runtime_id, sent_status
             FROM container_states WHERE task_arn = ? AND name = ?",
        )
        .bind(task_arn)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| {
            Ok(PersistedContainerState {
                task_arn: row.get("task_arn"),
                name: row.get("name"),
                runtime_id: row.get("runtime_id"),
                sent_status: parse_container_status(&row.get::<String, _>("sent_status"))?,
            })
        })
        .transpose()
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn save_task(&self, task: &TaskRecord) -> Result<(), StoreError> {
        let known = task.known_status().await;
        let sent = task.sent_status().await;
        sqlx::query(
            "INSERT INTO task_states (arn, known_status, sent_status, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(arn) DO UPDATE SET
                 known_status = excluded.known_status,
                 sent_status = excluded.sent_status,
                 updated_at = excluded.updated_at",
        )
        .bind(task.arn())
        .bind(known.as_str())
        .bind(sent.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_container(
        &self,
        task_arn: &str,
        container: &ContainerRecord,
    ) -> Result<(), StoreError> {
        let sent = container.sent_status().await;
        sqlx::query(
            "INSERT INTO container_states (task_arn, name, runtime_id, sent_status, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(task_arn, name) DO UPDATE SET
                 runtime_id = excluded.runtime_id,
                 sent_status = excluded.sent_status,
                 updated_at = excluded.updated_at",
        )
        .bind(task_arn)
        .bind(container.name())
        .bind(container.runtime_id())
        .bind(sent.as_str())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn parse_task_status(s: &str) -> Result<TaskStatus, StoreError> {
    TaskStatus::from_str(s).ok_or_else(|| StoreError::Decode(format!("unknown task status: {s}")))
}

fn parse_container_status(s: &str) -> Result<ContainerStatus, StoreError> {
    ContainerStatus::from_str(s)
        .ok_or_else(|| StoreError::Decode(format!("unknown container status: {s}")))
}
