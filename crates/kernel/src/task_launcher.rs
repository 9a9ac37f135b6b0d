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

//! Thin adapter over the outbound driver talking to the resource master. The offer
//! processor never talks to the driver directly; it goes through this trait so tests can
//! substitute a deterministic double.

use launchpad_common::model::{LaunchSpec, OfferId};

/// `launchTasks`/`declineOffer` as the offer processor needs them. Implementations must not
/// block the calling thread on I/O; a real adapter would hand the call to its own
/// connection-handling thread and block only that thread.
pub trait TaskLauncher: Send + Sync {
    /// Ask the driver to launch `tasks` against `offer_id`. Returns `true` iff the driver
    /// accepted the batch; any driver failure or absence is reported as `false`.
    fn launch_tasks(&self, offer_id: &OfferId, tasks: &[LaunchSpec]) -> bool;

    /// Decline `offer_id`, optionally asking the master not to resend it for
    /// `refuse_millis`.
    fn decline_offer(&self, offer_id: &OfferId, refuse_millis: Option<i64>);
}

/// A `TaskLauncher` that always accepts launches and logs declines, useful for a daemon
/// wired without a real driver connection.
pub struct LoggingTaskLauncher;

impl TaskLauncher for LoggingTaskLauncher {
    fn launch_tasks(&self, offer_id: &OfferId, tasks: &[LaunchSpec]) -> bool {
        tracing::info!(offer_id, task_count = tasks.len(), "launching tasks");
        true
    }

    fn decline_offer(&self, offer_id: &OfferId, refuse_millis: Option<i64>) {
        tracing::debug!(offer_id, ?refuse_millis, "declining offer");
    }
}

#[cfg(test)]
pub use mock::MockTaskLauncher;
