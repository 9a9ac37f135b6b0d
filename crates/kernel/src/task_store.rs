// Copyright (C) 2025 Launchpad Contributors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The durable half of the Task Tracker, behind a `TaskStore` trait so the in-memory
//! default and the `fjall`-backed implementation are interchangeable. Both hand writes off
//! to a dedicated writer thread and reply through a `oneshot` channel, since `store`/
//! `terminated` are specified to return a future even though neither backend is async.

use launchpad_common::error::TaskStoreError;
use launchpad_common::model::{Task, TaskId};

/// Durable storage for task records, keyed by task id.
pub trait TaskStore: Send + Sync {
    /// Load every task record present at startup.
    fn load_all(&self) -> Result<Vec<Task>, TaskStoreError>;

    /// Durably write `task`. The returned receiver resolves once the write lands (or
    /// fails); the caller does not block the calling thread waiting for it.
    fn store(&self, task: Task) -> oneshot::Receiver<Result<(), TaskStoreError>>;

    /// Durably delete the record for `task_id`.
    fn delete(&self, task_id: TaskId) -> oneshot::Receiver<Result<(), TaskStoreError>>;
}

/// Default, always-available backend: an in-memory map with no restart survival. Writes
/// resolve immediately; the oneshot round trip exists only to satisfy the trait's async-ish
/// contract uniformly across backends.
pub struct InMemoryTaskStore {
    tasks: std::sync::Mutex<std::collections::HashMap<TaskId, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: std::sync::Mutex::new(std::collections::HashMap::new()),
        }
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskStore for InMemoryTaskStore {
    fn load_all(&self) -> Result<Vec<Task>, TaskStoreError> {
        Ok(self.tasks.lock().unwrap().values().cloned().collect())
    }

    fn store(&self, task: Task) -> oneshot::Receiver<Result<(), TaskStoreError>> {
        let (tx, rx) = oneshot::channel();
        self.tasks
            .lock()
            .unwrap()
            .insert(task.task_id.clone(), task);
        let _ = tx.send(Ok(()));
        rx
    }

    fn delete(&self, task_id: TaskId) -> oneshot::Receiver<Result<(), TaskStoreError>> {
        let (tx, rx) = oneshot::channel();
        self.tasks.lock().unwrap().remove(&task_id);
        let _ = tx.send(Ok(()));
        rx
    }
}

#[cfg(feature = "fjall-store")]
pub use fjall_backend::FjallTaskStore;

#[cfg(feature = "fjall-store")]
mod fjall_backend {
    use std::path::Path;

    use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
    use flume::Sender;
    use tracing::error;

    use super::*;

    enum Job {
        Store(Task, oneshot::Sender<Result<(), TaskStoreError>>),
        Delete(TaskId, oneshot::Sender<Result<(), TaskStoreError>>),
    }

    /// `fjall`-backed durable store: one partition, one entry per task id, serialized JSON
    /// values. All writes go through a single background thread so the keyspace is only
    /// ever touched from one place, mirroring the writer-thread-plus-channel shape used
    /// throughout this codebase for anything that would otherwise block an actor.
    pub struct FjallTaskStore {
        keyspace: Keyspace,
        partition: PartitionHandle,
        job_tx: Sender<Job>,
    }

    impl FjallTaskStore {
        pub fn open(data_dir: impl AsRef<Path>) -> Result<Self, TaskStoreError> {
            let keyspace = Config::new(data_dir.as_ref())
                .open()
                .map_err(|e| TaskStoreError::Backend(e.to_string()))?;
            let partition = keyspace
                .open_partition("tasks", PartitionCreateOptions::default())
                .map_err(|e| TaskStoreError::Backend(e.to_string()))?;

            let (job_tx, job_rx) = flume::unbounded::<Job>();
            let writer_partition = partition.clone();
            std::thread::Builder::new()
                .name("task-store-writer".to_string())
                .spawn(move || {
                    for job in job_rx.iter() {
                        match job {
                            Job::Store(task, reply) => {
                                let result = store_one(&writer_partition, &task);
                                if reply.send(result).is_err() {
                                    error!("task store caller gone before store completed");
                                }
                            }
                            Job::Delete(task_id, reply) => {
                                let result = writer_partition
                                    .remove(task_id.as_bytes())
                                    .map_err(|e| TaskStoreError::Backend(e.to_string()));
                                if reply.send(result).is_err() {
                                    error!("task store caller gone before delete completed");
                                }
                            }
                        }
                    }
                })
                .expect("failed to spawn task store writer thread");

            Ok(Self {
                keyspace,
                partition,
                job_tx,
            })
        }
    }

    fn store_one(partition: &PartitionHandle, task: &Task) -> Result<(), TaskStoreError> {
        let bytes =
            serde_json::to_vec(task).map_err(|e| TaskStoreError::Backend(e.to_string()))?;
        partition
            .insert(task.task_id.as_bytes(), bytes)
            .map_err(|e| TaskStoreError::Backend(e.to_string()))
    }

    impl TaskStore for FjallTaskStore {
        fn load_all(&self) -> Result<Vec<Task>, TaskStoreError> {
            let mut tasks = Vec::new();
            for entry in self.partition.iter() {
                let (_, value) = entry.map_err(|e| TaskStoreError::Backend(e.to_string()))?;
                let task: Task =
                    serde_json::from_slice(&value).map_err(|e| TaskStoreError::Backend(e.to_string()))?;
                tasks.push(task);
            }
            Ok(tasks)
        }

        fn store(&self, task: Task) -> oneshot::Receiver<Result<(), TaskStoreError>> {
            let (tx, rx) = oneshot::channel();
            if self.job_tx.send(Job::Store(task, tx)).is_err() {
                // Writer thread is gone; nothing to await on, report synchronously.
                let (tx2, rx2) = oneshot::channel();
                let _ = tx2.send(Err(TaskStoreError::WriterGone));
                return rx2;
            }
            rx
        }

        fn delete(&self, task_id: TaskId) -> oneshot::Receiver<Result<(), TaskStoreError>> {
            let (tx, rx) = oneshot::channel();
            if self.job_tx.send(Job::Delete(task_id, tx)).is_err() {
                let (tx2, rx2) = oneshot::channel();
                let _ = tx2.send(Err(TaskStoreError::WriterGone));
                return rx2;
            }
            rx
        }
    }

    impl Drop for FjallTaskStore {
        fn drop(&mut self) {
            let _ = self.keyspace.persist(fjall::PersistMode::SyncAll);
        }
    }

}
