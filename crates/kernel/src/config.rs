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

//! Every recognized configuration option, independent of how the daemon reads it in (file,
//! environment, CLI flag). The daemon is responsible for merging those sources; this struct
//! is just the result.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scheduler::AppSchedulerConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStoreBackend {
    #[default]
    Memory,
    Fjall,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub offer_matching_timeout_ms: u64,
    pub save_tasks_to_launch_timeout_ms: u64,
    pub task_launch_notification_timeout_ms: u64,
    pub decline_offer_duration_ms: i64,
    pub min_launch_delay_ms: u64,
    pub max_launch_delay_ms: u64,
    pub launch_delay_factor: f64,
    pub stats_log_interval_seconds: u64,
    pub task_store_backend: TaskStoreBackend,
    /// Required when `task_store_backend` is `fjall`.
    pub task_store_data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            offer_matching_timeout_ms: 1_000,
            save_tasks_to_launch_timeout_ms: 2_000,
            task_launch_notification_timeout_ms: 30_000,
            decline_offer_duration_ms: 5_000,
            min_launch_delay_ms: 5_000,
            max_launch_delay_ms: 3_600_000,
            launch_delay_factor: 1.15,
            stats_log_interval_seconds: 60,
            task_store_backend: TaskStoreBackend::Memory,
            task_store_data_dir: None,
        }
    }
}

impl Config {
    pub fn scheduler_config(&self) -> AppSchedulerConfig {
        AppSchedulerConfig {
            min_launch_delay: Duration::from_millis(self.min_launch_delay_ms),
            max_launch_delay: Duration::from_millis(self.max_launch_delay_ms),
            launch_delay_factor: self.launch_delay_factor,
            offer_matching_timeout: Duration::from_millis(self.offer_matching_timeout_ms),
            save_tasks_to_launch_timeout: Duration::from_millis(self.save_tasks_to_launch_timeout_ms),
            task_launch_notification_timeout: Duration::from_millis(
                self.task_launch_notification_timeout_ms,
            ),
            decline_offer_duration: self.decline_offer_duration_ms,
        }
    }
}
