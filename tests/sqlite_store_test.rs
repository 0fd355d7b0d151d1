//! Round-trip tests for the SQLite acknowledgement store: persisted sent
//! statuses must survive a close-and-reopen cycle.

use std::path::PathBuf;

use muster::adapters::sqlite::SqliteStateStore;
use muster::domain::models::{ContainerRecord, ContainerStatus, TaskRecord, TaskStatus};
use muster::domain::ports::StateStore;

struct TempDatabase {
    path: PathBuf,
}

impl TempDatabase {
    fn new() -> Self {
        let path = std::env::temp_dir().join(format!("muster-store-{}.db", uuid::Uuid::new_v4()));
        Self { path }
    }

    fn url(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }
}

impl Drop for TempDatabase {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.path.display(), suffix));
        }
    }
}

#[tokio::test]
async fn sent_statuses_survive_a_restart() {
    let db = TempDatabase::new();

    {
        let store = SqliteStateStore::connect(&db.url()).await.unwrap();
        let task = TaskRecord::new("arn:task/durable", TaskStatus::Running);
        task.advance_sent_status(TaskStatus::Running).await;
        store.save_task(&task).await.unwrap();

        let container = ContainerRecord::new("web").with_runtime_id("runtime-1");
        container.advance_sent_status(ContainerStatus::Running).await;
        store.save_container("arn:task/durable", &container).await.unwrap();
        store.close().await;
    }

    let reopened = SqliteStateStore::connect(&db.url()).await.unwrap();
    let task = reopened
        .load_task("arn:task/durable")
        .await
        .unwrap()
        .expect("task persisted");
    assert!(task.sent_status >= TaskStatus::Running);

    let container = reopened
        .load_container("arn:task/durable", "web")
        .await
        .unwrap()
        .expect("container persisted");
    assert!(container.sent_status >= ContainerStatus::Running);
    reopened.close().await;
}

#[tokio::test]
async fn later_saves_overwrite_earlier_ones() {
    let db = TempDatabase::new();
    let store = SqliteStateStore::connect(&db.url()).await.unwrap();

    let task = TaskRecord::new("arn:task/durable", TaskStatus::Running);
    task.advance_sent_status(TaskStatus::Running).await;
    store.save_task(&task).await.unwrap();

    task.set_known_status(TaskStatus::Stopped).await;
    task.advance_sent_status(TaskStatus::Stopped).await;
    store.save_task(&task).await.unwrap();

    let loaded = store
        .load_task("arn:task/durable")
        .await
        .unwrap()
        .expect("task persisted");
    assert_eq!(loaded.sent_status, TaskStatus::Stopped);
    assert_eq!(loaded.known_status, TaskStatus::Stopped);
    store.close().await;
}
