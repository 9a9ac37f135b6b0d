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

//! Fans one offer out across every currently-subscribed launcher, sequentially, so each
//! launcher's task factory sees the resources consumed by the ones dispatched before it in
//! the same round.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use launchpad_common::model::{AppId, MatchedTasks, Offer};

use crate::clock::Clock;
use crate::launcher::LauncherHandle;

/// Something `matchOffer` can be dispatched to. Implemented by `OfferMatcherManager`;
/// extracted as a trait so the offer processor can be tested against a double that
/// simulates slow matches or match failures without spinning up real launcher threads.
pub trait OfferMatching: Send + Sync {
    fn match_offer(&self, deadline: Instant, offer: Offer) -> MatchedTasks;
}

pub struct OfferMatcherManager {
    clock: Arc<dyn Clock>,
    subscribers: Mutex<HashMap<AppId, LauncherHandle>>,
}

impl OfferMatcherManager {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            subscribers: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe (or replace the existing registration for) a launcher. Idempotent.
    pub fn subscribe(&self, launcher: LauncherHandle) {
        self.subscribers
            .lock()
            .unwrap()
            .insert(launcher.app_id().clone(), launcher);
    }

    /// Unsubscribe a launcher. Idempotent; unsubscribing an app with no current
    /// registration is a no-op.
    pub fn unsubscribe(&self, app_id: &AppId) {
        self.subscribers.lock().unwrap().remove(app_id);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

impl OfferMatching for OfferMatcherManager {
    fn match_offer(&self, deadline: Instant, offer: Offer) -> MatchedTasks {
        // A snapshot at round start: subscribe/unsubscribe calls that land mid-round are
        // only observed by the *next* round, never duplicated or missed within this one.
        let snapshot: Vec<LauncherHandle> = self.subscribers.lock().unwrap().values().cloned().collect();

        let mut remaining = offer.resources;
        let mut tasks = Vec::new();
        for launcher in snapshot {
            if self.clock.now() >= deadline {
                break;
            }
            let view = Offer {
                resources: remaining,
                ..offer.clone()
            };
            let matched = launcher.match_offer(deadline, view);
            for task_with_source in matched {
                remaining = remaining.saturating_sub(&task_with_source.launch_spec.resources);
                tasks.push(task_with_source);
            }
        }

        MatchedTasks {
            offer_id: offer.id,
            tasks,
            resend_this_offer: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::launcher::{LauncherDeps, LoggingOfferReviver};
    use crate::rate_limiter::RateLimiter;
    use crate::task_factory::DefaultTaskFactory;
    use crate::timer::TimerHandle;
    use launchpad_common::model::{App, VersionInfo};
    use launchpad_common::resources::Resources;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn app(id: &str, instances: u32) -> App {
        App {
            id: id.to_string(),
            instances,
            version: 1,
            version_info: VersionInfo::default(),
            constraints: vec![],
            definition: [("cpus".to_string(), "1".to_string()), ("memMb".to_string(), "512".to_string())]
                .into_iter()
                .collect(),
        }
    }

    fn offer(cpus: f64, mem_mb: f64) -> Offer {
        Offer {
            id: "offer-1".to_string(),
            resources: Resources::new(cpus, mem_mb, 0.0),
            attributes: BTreeMap::new(),
            hostname: "host-1".to_string(),
            slave_id: "slave-1".to_string(),
        }
    }

    fn spawn_launcher_for_test(
        app: App,
        manager: Arc<OfferMatcherManager>,
        clock: Arc<MockClock>,
    ) -> LauncherHandle {
        let deps = LauncherDeps {
            task_factory: Arc::new(DefaultTaskFactory),
            rate_limiter: Arc::new(RateLimiter::new(
                Duration::from_millis(0),
                Duration::from_secs(3600),
                1.15,
            )),
            clock: clock.clone(),
            timers: TimerHandle::spawn("test-manager-timer", clock),
            manager,
            offer_reviver: Arc::new(LoggingOfferReviver),
            launch_notification_timeout: Duration::from_secs(5),
        };
        crate::launcher::spawn_launcher(app, deps)
    }

    #[test]
    fn sequential_dispatch_threads_consumed_resources_across_subscribers() {
        let clock = MockClock::new();
        let manager = Arc::new(OfferMatcherManager::new(clock.clone()));
        let a = spawn_launcher_for_test(app("/a", 1), manager.clone(), clock.clone());
        let b = spawn_launcher_for_test(app("/b", 1), manager.clone(), clock.clone());
        a.add_tasks(app("/a", 1), 1);
        b.add_tasks(app("/b", 1), 1);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(manager.subscriber_count(), 2);

        // Offer only has enough for one task (1 cpu, 512mb); whichever launcher goes first
        // in the snapshot consumes it all, leaving nothing for the other.
        let matched = manager.match_offer(clock.now() + Duration::from_secs(1), offer(1.0, 512.0));
        assert_eq!(matched.tasks.len(), 1);
    }

    #[test]
    fn unsubscribed_launcher_is_not_dispatched_to() {
        let clock = MockClock::new();
        let manager = Arc::new(OfferMatcherManager::new(clock.clone()));
        let a = spawn_launcher_for_test(app("/a", 1), manager.clone(), clock.clone());
        a.add_tasks(app("/a", 1), 1);
        std::thread::sleep(Duration::from_millis(20));
        manager.unsubscribe(&"/a".to_string());

        let matched = manager.match_offer(clock.now() + Duration::from_secs(1), offer(4.0, 4096.0));
        assert!(matched.tasks.is_empty());
    }

    #[test]
    fn expired_deadline_before_round_starts_yields_empty_match() {
        let clock = MockClock::new();
        let manager = Arc::new(OfferMatcherManager::new(clock.clone()));
        let a = spawn_launcher_for_test(app("/a", 1), manager.clone(), clock.clone());
        a.add_tasks(app("/a", 1), 1);
        std::thread::sleep(Duration::from_millis(20));

        let past_deadline = clock.now() - Duration::from_secs(1);
        let matched = manager.match_offer(past_deadline, offer(4.0, 4096.0));
        assert!(matched.tasks.is_empty());
    }
}
