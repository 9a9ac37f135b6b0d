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

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::resources::Resources;

/// Hierarchical path identifying an application, e.g. `/group/app`.
pub type AppId = String;

/// Globally unique id for a task, with the owning app's id embedded.
pub type TaskId = String;

/// Id of an offer as handed out by the resource master for this round.
pub type OfferId = String;

/// A placement constraint an app's tasks must satisfy. Evaluated by the injected task
/// factory; the core only needs to compare constraint sets for equality when deciding
/// whether a new `App` definition is an upgrade, and to know whether a set is non-empty
/// (status updates only revive offers for constrained apps).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub field: String,
    pub operator: String,
    pub value: String,
}

/// `lastScalingAt`/`lastConfigChangeAt` bookkeeping. Not consulted by the core's matching
/// logic, but carried along so an upgrade can be detected and so the admin API's snapshot
/// reflects it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub last_scaling_at: i64,
    pub last_config_change_at: i64,
}

/// An application's desired-state definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct App {
    pub id: AppId,
    pub instances: u32,
    pub version: i64,
    pub version_info: VersionInfo,
    pub constraints: Vec<Constraint>,
    /// Opaque command/definition fields that make two otherwise-identical-id apps differ.
    /// A real system would carry the full app spec here (image, command, env, resources);
    /// the core only needs to know whether this bag changed between two definitions.
    pub definition: BTreeMap<String, String>,
}

impl App {
    /// Two apps with the same `id` but a different `definition` or `constraints`
    /// constitute a configuration change rather than a pure scale.
    pub fn is_upgrade(&self, other: &App) -> bool {
        debug_assert_eq!(self.id, other.id);
        self.definition != other.definition || self.constraints != other.constraints
    }

    pub fn has_constraints(&self) -> bool {
        !self.constraints.is_empty()
    }
}

/// Terminal reasons a task's lifecycle can end in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalReason {
    Finished,
    Failed,
    Killed,
    Lost,
}

/// The lifecycle state of a task as last reported by the status event bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Staging,
    Running,
    Terminal(TerminalReason),
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Terminal(_))
    }
}

/// A status payload as reported by the (out-of-scope) status telemetry stream. Opaque to
/// the core beyond its terminal/non-terminal classification.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub message: Option<String>,
    pub raw: Option<serde_json::Value>,
}

/// A record of one launched (or launching) task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub app_id: AppId,
    pub version: i64,
    pub staged_at: Option<i64>,
    pub state: TaskState,
    pub status: TaskStatus,
}

impl Task {
    pub fn new_staging(task_id: TaskId, app_id: AppId, version: i64, staged_at: i64) -> Self {
        Self {
            task_id,
            app_id,
            version,
            staged_at: Some(staged_at),
            state: TaskState::Staging,
            status: TaskStatus::default(),
        }
    }
}

/// Resources advertised by the resource master for one offer round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub resources: Resources,
    pub attributes: BTreeMap<String, String>,
    pub hostname: String,
    pub slave_id: String,
}

/// What the task factory hands back alongside the task record: enough information for the
/// task launcher adapter to build a driver-level launch request. Kept generic (a command
/// string plus consumed resources) since the concrete launch wire format is the driver's
/// concern, not the core's.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LaunchSpec {
    pub task_id: TaskId,
    pub resources: Resources,
    pub description: String,
}

/// The callback pair a launcher hands out alongside a matched task: `accept()` once the
/// task launcher has confirmed the launch with the driver, or `reject(reason)` if it
/// never makes it that far. Implemented by the launcher itself (see `launchpad_kernel`),
/// kept as a trait here so the offer matcher manager and offer processor, which live in
/// the same crate as the launcher, don't need a dependency cycle back through it.
pub trait TaskSource: Send {
    fn accept(self: Box<Self>);
    fn reject(self: Box<Self>, reason: String);
}

/// One task matched against an offer, paired with the launch spec the driver needs and the
/// callback that reports the outcome back to the originating launcher.
pub struct TaskWithSource {
    pub launch_spec: LaunchSpec,
    pub task: Task,
    pub source: Box<dyn TaskSource>,
}

impl fmt::Debug for TaskWithSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskWithSource")
            .field("launch_spec", &self.launch_spec)
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

/// The merged result of fanning one offer out across the subscribed launchers.
#[derive(Debug)]
pub struct MatchedTasks {
    pub offer_id: OfferId,
    pub tasks: Vec<TaskWithSource>,
    pub resend_this_offer: bool,
}

impl MatchedTasks {
    pub fn empty(offer_id: OfferId, resend_this_offer: bool) -> Self {
        Self {
            offer_id,
            tasks: Vec::new(),
            resend_this_offer,
        }
    }
}

/// Snapshot reply describing one app's launcher for the admin `list()` operation.
#[derive(Clone, Debug, PartialEq)]
pub struct QueuedTaskCount {
    pub app: App,
    pub tasks_left_to_launch: u32,
    pub task_launches_in_flight: u32,
    pub tasks_launched_or_running: u32,
    pub back_off_until: Option<Instant>,
}
