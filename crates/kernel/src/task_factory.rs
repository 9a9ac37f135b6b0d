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

//! Pure function from `(app, offer, running tasks)` to an optional `(launch spec, task
//! record)`: constraint evaluation plus resource carving, with no side effects and no
//! dependency on the clock beyond what's passed in.

use launchpad_common::model::{App, LaunchSpec, Offer, Task};
use launchpad_common::resources::Resources;

/// Encapsulates constraint evaluation and resource carving for one app. Implementations
/// must be pure: same inputs, same answer, no hidden state.
pub trait TaskFactory: Send + Sync {
    /// Attempt to carve one new task for `app` out of `offer`, given the app's currently
    /// known `running` tasks (for uniqueness-style constraints). Returns `None` if the
    /// offer doesn't fit or a constraint isn't satisfied.
    fn new_task(
        &self,
        app: &App,
        offer: &Offer,
        running: &[Task],
        task_id: String,
        staged_at: i64,
    ) -> Option<(LaunchSpec, Task)>;
}

/// Reads `cpus`/`memMb`/`diskMb` out of the app's opaque `definition` bag (defaulting to a
/// modest footprint when absent), and supports two placement constraint operators:
/// `CLUSTER` (the offer's attribute must equal the constraint value) and `UNIQUE` (at most
/// one running task per distinct attribute value).
#[derive(Default)]
pub struct DefaultTaskFactory;

impl DefaultTaskFactory {
    fn required_resources(app: &App) -> Resources {
        let field = |key: &str, default: f64| -> f64 {
            app.definition
                .get(key)
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(default)
        };
        Resources::new(field("cpus", 0.1), field("memMb", 32.0), field("diskMb", 0.0))
    }

    fn satisfies_constraints(app: &App, offer: &Offer, running: &[Task]) -> bool {
        app.constraints.iter().all(|c| match c.operator.as_str() {
            "CLUSTER" => offer.attributes.get(&c.field).map(|v| v == &c.value) == Some(true),
            "UNIQUE" => {
                let Some(offer_value) = offer.attributes.get(&c.field) else {
                    return false;
                };
                !running.iter().any(|t| t.status.raw.as_ref().is_some_and(|raw| {
                    raw.get(&c.field).and_then(|v| v.as_str()) == Some(offer_value.as_str())
                }))
            }
            _ => true,
        })
    }
}

impl TaskFactory for DefaultTaskFactory {
    fn new_task(
        &self,
        app: &App,
        offer: &Offer,
        running: &[Task],
        task_id: String,
        staged_at: i64,
    ) -> Option<(LaunchSpec, Task)> {
        if !Self::satisfies_constraints(app, offer, running) {
            return None;
        }
        let needed = Self::required_resources(app);
        if !offer.resources.covers(&needed) {
            return None;
        }

        let launch_spec = LaunchSpec {
            task_id: task_id.clone(),
            resources: needed,
            description: format!("{} v{}", app.id, app.version),
        };
        let task = Task::new_staging(task_id, app.id.clone(), app.version, staged_at);
        Some((launch_spec, task))
    }
}
