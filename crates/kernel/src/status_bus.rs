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

//! Per-app broadcast of task status updates. Whatever delivers status telemetry from the
//! driver calls `publish`; each app's launcher, if currently subscribed, gets the update
//! routed to its mailbox. Status updates are eventually consistent with the Task Tracker:
//! a launcher's own task map may transiently disagree with what's durably stored.

use std::collections::HashMap;
use std::sync::Mutex;

use launchpad_common::model::{AppId, TaskId, TaskState, TaskStatus};
use tracing::trace;

use crate::launcher::LauncherHandle;

/// One status observation for a single task.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusUpdate {
    pub app_id: AppId,
    pub task_id: TaskId,
    pub state: TaskState,
    pub status: TaskStatus,
}

/// Routes status updates to whichever launcher currently owns the app they're for.
pub struct StatusBus {
    subscribers: Mutex<HashMap<AppId, LauncherHandle>>,
}

impl StatusBus {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Register (or replace) the launcher that should receive status updates for its app.
    pub fn subscribe(&self, launcher: LauncherHandle) {
        self.subscribers
            .lock()
            .unwrap()
            .insert(launcher.app_id().clone(), launcher);
    }

    pub fn unsubscribe(&self, app_id: &AppId) {
        self.subscribers.lock().unwrap().remove(app_id);
    }

    /// Route one status update to its app's subscriber, if any is currently registered.
    pub fn publish(&self, update: StatusUpdate) {
        let subscribers = self.subscribers.lock().unwrap();
        let Some(target) = subscribers.get(&update.app_id) else {
            trace!(app_id = %update.app_id, "status update for app with no subscribed launcher");
            return;
        };
        target.status_update(update);
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new()
    }
}
