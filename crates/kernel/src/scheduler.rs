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

//! The administrative surface: `add`/`purge`/`count`/`list`/`process_offer`. This is what a
//! REST layer (out of scope here) would sit on top of; it owns the launcher registry and
//! wires together the rate limiter, offer matcher manager, and offer processor.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use launchpad_common::model::{App, AppId, Offer, QueuedTaskCount};
use thiserror::Error;
use tracing::instrument;

use crate::clock::Clock;
use crate::launcher::{spawn_launcher, LauncherDeps, LauncherHandle, LauncherMsg, OfferReviver};
use crate::offer_matcher_manager::{OfferMatcherManager, OfferMatching};
use crate::offer_processor::{OfferProcessor, OfferProcessorConfig};
use crate::rate_limiter::RateLimiter;
use crate::status_bus::{StatusBus, StatusUpdate};
use crate::task_factory::TaskFactory;
use crate::task_launcher::TaskLauncher;
use crate::task_tracker::TaskTracker;
use crate::timer::TimerHandle;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("unknown app: {0}")]
    UnknownApp(AppId),
}

/// Every timeout/backoff knob the launch pipeline needs, independent of how it got read in
/// (CLI, config file, defaults).
pub struct AppSchedulerConfig {
    pub min_launch_delay: Duration,
    pub max_launch_delay: Duration,
    pub launch_delay_factor: f64,
    pub offer_matching_timeout: Duration,
    pub save_tasks_to_launch_timeout: Duration,
    pub task_launch_notification_timeout: Duration,
    pub decline_offer_duration: i64,
}

pub struct AppScheduler {
    clock: Arc<dyn Clock>,
    task_factory: Arc<dyn TaskFactory>,
    rate_limiter: Arc<RateLimiter>,
    manager: Arc<OfferMatcherManager>,
    offer_reviver: Arc<dyn OfferReviver>,
    timers: TimerHandle<LauncherMsg>,
    launch_notification_timeout: Duration,
    launchers: Mutex<HashMap<AppId, LauncherHandle>>,
    offer_processor: OfferProcessor,
    status_bus: StatusBus,
}

impl AppScheduler {
    pub fn new(
        clock: Arc<dyn Clock>,
        task_factory: Arc<dyn TaskFactory>,
        offer_reviver: Arc<dyn OfferReviver>,
        task_tracker: Arc<TaskTracker>,
        task_launcher: Arc<dyn TaskLauncher>,
        config: AppSchedulerConfig,
    ) -> Self {
        let manager = Arc::new(OfferMatcherManager::new(clock.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(
            config.min_launch_delay,
            config.max_launch_delay,
            config.launch_delay_factor,
        ));
        let offer_processor = OfferProcessor::new(
            manager.clone() as Arc<dyn OfferMatching>,
            task_tracker,
            task_launcher,
            clock.clone(),
            OfferProcessorConfig {
                offer_matching_timeout: config.offer_matching_timeout,
                save_tasks_to_launch_timeout: config.save_tasks_to_launch_timeout,
                decline_offer_duration: config.decline_offer_duration,
            },
        );

        Self {
            clock,
            task_factory,
            rate_limiter,
            manager,
            offer_reviver,
            timers: TimerHandle::spawn("launcher-timers", clock.clone()),
            launch_notification_timeout: config.task_launch_notification_timeout,
            launchers: Mutex::new(HashMap::new()),
            offer_processor,
            status_bus: StatusBus::new(),
        }
    }

    fn launcher_deps(&self) -> LauncherDeps {
        LauncherDeps {
            task_factory: self.task_factory.clone(),
            rate_limiter: self.rate_limiter.clone(),
            clock: self.clock.clone(),
            timers: self.timers.clone(),
            manager: self.manager.clone(),
            offer_reviver: self.offer_reviver.clone(),
            launch_notification_timeout: self.launch_notification_timeout,
        }
    }

    /// Enqueue `count` launches for `app`, spawning its launcher on first sight.
    #[instrument(skip(self, app), fields(app_id = %app.id))]
    pub fn add(&self, app: App, count: u32) -> QueuedTaskCount {
        let fallback = QueuedTaskCount {
            app: app.clone(),
            tasks_left_to_launch: count,
            task_launches_in_flight: 0,
            tasks_launched_or_running: 0,
            back_off_until: None,
        };
        let handle = {
            let mut launchers = self.launchers.lock().unwrap();
            launchers
                .entry(app.id.clone())
                .or_insert_with(|| {
                    let handle = spawn_launcher(app.clone(), self.launcher_deps());
                    self.status_bus.subscribe(handle.clone());
                    handle
                })
                .clone()
        };
        handle.add_tasks(app, count).unwrap_or(fallback)
    }

    /// Stop any launcher for `app_id`, draining its in-flight launches gracefully.
    #[instrument(skip(self))]
    pub fn purge(&self, app_id: &AppId) -> Result<(), SchedulerError> {
        let mut launchers = self.launchers.lock().unwrap();
        let handle = launchers
            .remove(app_id)
            .ok_or_else(|| SchedulerError::UnknownApp(app_id.clone()))?;
        self.status_bus.unsubscribe(app_id);
        handle.stop();
        Ok(())
    }

    /// Route one task status observation (from the driver adapter) to its app's launcher.
    #[instrument(skip(self, update), fields(app_id = %update.app_id, task_id = %update.task_id))]
    pub fn status_update(&self, update: StatusUpdate) {
        self.status_bus.publish(update);
    }

    /// Current `tasksLeftToLaunch` for `app_id`.
    #[instrument(skip(self))]
    pub fn count(&self, app_id: &AppId) -> Result<u32, SchedulerError> {
        let launchers = self.launchers.lock().unwrap();
        let handle = launchers
            .get(app_id)
            .ok_or_else(|| SchedulerError::UnknownApp(app_id.clone()))?;
        Ok(handle.query().map(|q| q.tasks_left_to_launch).unwrap_or(0))
    }

    /// Snapshot over every currently-registered launcher.
    pub fn list(&self) -> Vec<QueuedTaskCount> {
        let launchers: Vec<LauncherHandle> = self.launchers.lock().unwrap().values().cloned().collect();
        launchers.into_iter().filter_map(|h| h.query()).collect()
    }

    /// Drive one offer through the match -> persist -> launch pipeline.
    #[instrument(skip(self, offer), fields(offer_id = %offer.id))]
    pub fn process_offer(&self, offer: Offer) {
        self.offer_processor.process_offer(offer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::launcher::LoggingOfferReviver;
    use crate::task_factory::DefaultTaskFactory;
    use crate::task_launcher::MockTaskLauncher;
    use crate::task_store::InMemoryTaskStore;
    use launchpad_common::model::VersionInfo;
    use launchpad_common::resources::Resources;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    fn app(id: &str, instances: u32) -> App {
        App {
            id: id.to_string(),
            instances,
            version: 1,
            version_info: VersionInfo::default(),
            constraints: vec![],
            definition: [("cpus".to_string(), "0.5".to_string()), ("memMb".to_string(), "128".to_string())]
                .into_iter()
                .collect(),
        }
    }

    fn scheduler() -> AppScheduler {
        AppScheduler::new(
            MockClock::new(),
            Arc::new(DefaultTaskFactory),
            Arc::new(LoggingOfferReviver),
            Arc::new(TaskTracker::new(Arc::new(InMemoryTaskStore::new())).unwrap()),
            Arc::new(MockTaskLauncher::accepting()),
            AppSchedulerConfig {
                min_launch_delay: Duration::from_millis(0),
                max_launch_delay: Duration::from_secs(3600),
                launch_delay_factor: 1.15,
                offer_matching_timeout: Duration::from_millis(500),
                save_tasks_to_launch_timeout: Duration::from_millis(500),
                task_launch_notification_timeout: Duration::from_secs(5),
                decline_offer_duration: 5_000,
            },
        )
    }

    #[test]
    fn add_then_count_reflects_queued_launches() {
        let scheduler = scheduler();
        scheduler.add(app("/app", 3), 3);
        assert_eq!(scheduler.count(&"/app".to_string()).unwrap(), 3);
    }

    #[test]
    fn count_on_unknown_app_is_an_error() {
        let scheduler = scheduler();
        assert_eq!(
            scheduler.count(&"/missing".to_string()),
            Err(SchedulerError::UnknownApp("/missing".to_string()))
        );
    }

    #[test]
    fn purge_removes_app_from_subsequent_queries() {
        let scheduler = scheduler();
        scheduler.add(app("/app", 1), 1);
        scheduler.purge(&"/app".to_string()).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(
            scheduler.count(&"/app".to_string()),
            Err(SchedulerError::UnknownApp("/app".to_string()))
        );
    }

    #[test]
    fn purge_unknown_app_is_an_error_and_mutates_nothing() {
        let scheduler = scheduler();
        scheduler.add(app("/app", 1), 1);
        assert!(scheduler.purge(&"/missing".to_string()).is_err());
        assert_eq!(scheduler.count(&"/app".to_string()).unwrap(), 1);
    }

    #[test]
    fn end_to_end_offer_gets_a_task_launched() {
        let scheduler = scheduler();
        scheduler.add(app("/app", 1), 1);
        std::thread::sleep(Duration::from_millis(20));

        scheduler.process_offer(Offer {
            id: "offer-1".to_string(),
            resources: Resources::new(4.0, 4096.0, 0.0),
            attributes: BTreeMap::new(),
            hostname: "host-1".to_string(),
            slave_id: "slave-1".to_string(),
        });
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(scheduler.count(&"/app".to_string()).unwrap(), 0);
        let listed = scheduler.list();
        assert_eq!(listed.len(), 1);
    }

    #[test]
    fn rejected_launch_raises_back_off_and_unsubscribes_until_it_elapses() {
        let clock = MockClock::new();
        let launcher = Arc::new(MockTaskLauncher::rejecting());
        let scheduler = AppScheduler::new(
            clock.clone(),
            Arc::new(DefaultTaskFactory),
            Arc::new(LoggingOfferReviver),
            Arc::new(TaskTracker::new(Arc::new(InMemoryTaskStore::new())).unwrap()),
            launcher.clone(),
            AppSchedulerConfig {
                min_launch_delay: Duration::from_secs(60),
                max_launch_delay: Duration::from_secs(3600),
                launch_delay_factor: 1.15,
                offer_matching_timeout: Duration::from_millis(500),
                save_tasks_to_launch_timeout: Duration::from_millis(500),
                task_launch_notification_timeout: Duration::from_secs(5),
                decline_offer_duration: 5_000,
            },
        );
        scheduler.add(app("/app", 1), 1);
        std::thread::sleep(Duration::from_millis(20));

        let before = clock.now();
        let offer = |id: &str| Offer {
            id: id.to_string(),
            resources: Resources::new(4.0, 4096.0, 0.0),
            attributes: BTreeMap::new(),
            hostname: "host-1".to_string(),
            slave_id: "slave-1".to_string(),
        };

        scheduler.process_offer(offer("offer-1"));
        std::thread::sleep(Duration::from_millis(20));

        let listed = scheduler.list();
        assert_eq!(listed.len(), 1);
        let back_off_until = listed[0]
            .back_off_until
            .expect("a rejected launch should raise a back-off deadline");
        assert!(back_off_until > before);
        assert_eq!(launcher.launched.lock().unwrap().len(), 1);

        // Still within the back-off window: the launcher stays unsubscribed, so a second
        // offer is never even dispatched to it.
        scheduler.process_offer(offer("offer-2"));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(
            launcher.launched.lock().unwrap().len(),
            1,
            "no launch attempt should happen while backed off"
        );

        // Once the back-off deadline elapses the recheck timer re-subscribes the launcher,
        // and the next offer is dispatched to it again.
        clock.advance(Duration::from_secs(61));
        std::thread::sleep(Duration::from_millis(100));
        scheduler.process_offer(offer("offer-3"));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(
            launcher.launched.lock().unwrap().len(),
            2,
            "launcher should resubscribe once the back-off elapses"
        );
    }

    #[test]
    fn status_update_for_unknown_app_does_not_panic() {
        let scheduler = scheduler();
        scheduler.status_update(StatusUpdate {
            app_id: "/ghost".to_string(),
            task_id: "ghost.1".to_string(),
            state: launchpad_common::model::TaskState::Terminal(
                launchpad_common::model::TerminalReason::Finished,
            ),
            status: launchpad_common::model::TaskStatus::default(),
        });
    }

    #[test]
    fn status_update_routes_to_subscribed_app_launcher() {
        let scheduler = scheduler();
        scheduler.add(app("/app", 1), 1);
        std::thread::sleep(Duration::from_millis(20));

        scheduler.status_update(StatusUpdate {
            app_id: "/app".to_string(),
            task_id: "app.1".to_string(),
            state: launchpad_common::model::TaskState::Terminal(
                launchpad_common::model::TerminalReason::Finished,
            ),
            status: launchpad_common::model::TaskStatus::default(),
        });
        std::thread::sleep(Duration::from_millis(20));

        // The launcher is still alive and responsive after processing the update.
        assert_eq!(scheduler.count(&"/app".to_string()).unwrap(), 1);
    }
}
