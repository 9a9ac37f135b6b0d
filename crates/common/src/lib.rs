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

//! Data model and error types shared between the `kernel` launch pipeline and the
//! `daemon` binary that wires it up.

pub mod error;
pub mod model;
pub mod resources;

pub use error::TaskStoreError;
pub use model::{
    App, AppId, MatchedTasks, Offer, OfferId, QueuedTaskCount, Task, TaskId, TaskState,
    TaskStatus, TaskWithSource, VersionInfo,
};
pub use resources::Resources;
