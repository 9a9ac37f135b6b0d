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

use thiserror::Error;

/// Failures from the Task Tracker's durable half. Reported back over the same channel the
/// `store`/`terminated` future is delivered on, never panicked.
#[derive(Debug, Error, Clone)]
pub enum TaskStoreError {
    #[error("storage error: {0}")]
    Backend(String),
    #[error("task store writer thread gone")]
    WriterGone,
}
