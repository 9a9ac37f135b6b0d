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

//! Authoritative in-memory map of live tasks per app, backed by a pluggable `TaskStore`.
//! `created`/removal from the map are synchronous; `store`/`terminated` hand the durable
//! write to the store and return its future. This is consulted by the Offer Processor
//! around persistence, not by launchers directly — a launcher keeps its own working view
//! of the tasks it cares about.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use launchpad_common::error::TaskStoreError;
use launchpad_common::model::{AppId, Task, TaskId};

use crate::task_store::TaskStore;

pub struct TaskTracker {
    store: Arc<dyn TaskStore>,
    tasks: Mutex<HashMap<AppId, HashMap<TaskId, Task>>>,
}

impl TaskTracker {
    /// Load every durably-stored task and index it by app for startup recovery.
    pub fn new(store: Arc<dyn TaskStore>) -> Result<Self, TaskStoreError> {
        let mut tasks: HashMap<AppId, HashMap<TaskId, Task>> = HashMap::new();
        for task in store.load_all()? {
            tasks
                .entry(task.app_id.clone())
                .or_default()
                .insert(task.task_id.clone(), task);
        }
        Ok(Self {
            store,
            tasks: Mutex::new(tasks),
        })
    }

    /// Current in-memory set of tasks for `app_id`.
    pub fn get_tasks(&self, app_id: &AppId) -> Vec<Task> {
        self.tasks
            .lock()
            .unwrap()
            .get(app_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Whether any task exists for `app_id`.
    pub fn contains(&self, app_id: &AppId) -> bool {
        self.tasks
            .lock()
            .unwrap()
            .get(app_id)
            .is_some_and(|m| !m.is_empty())
    }

    /// Synchronous in-memory add, before the durable write has even been attempted.
    pub fn created(&self, task: Task) {
        self.tasks
            .lock()
            .unwrap()
            .entry(task.app_id.clone())
            .or_default()
            .insert(task.task_id.clone(), task);
    }

    /// Durably persist `task`. Resolves via the returned receiver.
    pub fn store(&self, task: Task) -> oneshot::Receiver<Result<(), TaskStoreError>> {
        self.store.store(task)
    }

    /// Remove `task_id` from both the in-memory map and durable storage. Used both for
    /// rollback on persistence/driver failure and for genuine task termination.
    pub fn terminated(
        &self,
        app_id: &AppId,
        task_id: &TaskId,
    ) -> oneshot::Receiver<Result<(), TaskStoreError>> {
        if let Some(map) = self.tasks.lock().unwrap().get_mut(app_id) {
            map.remove(task_id);
        }
        self.store.delete(task_id.clone())
    }
}
