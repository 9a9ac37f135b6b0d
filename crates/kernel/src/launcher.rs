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

//! The per-app launcher: a single-threaded actor owning one app's launch intent. Every
//! state mutation happens on the actor's own thread as messages are drained from its
//! mailbox in arrival order, so nothing here needs a lock.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use flume::{Receiver, Sender};
use launchpad_common::model::{
    App, AppId, LaunchSpec, QueuedTaskCount, Task, TaskId, TaskSource, TaskState, TaskWithSource,
    TerminalReason,
};

use crate::clock::Clock;
use crate::offer_matcher_manager::OfferMatcherManager;
use crate::rate_limiter::{DelayUpdate, RateLimiter};
use crate::status_bus::StatusUpdate;
use crate::task_factory::TaskFactory;
use crate::timer::TimerHandle;

/// Reason synthesized onto a `TaskLaunchRejected` when the launch-notification timer fires
/// before the driver acknowledges a task one way or the other.
pub const LAUNCH_NOTIFICATION_TIMEOUT_REASON: &str = "launch-notification-timeout";

/// Called when a terminal status update lands for an app with placement constraints: the
/// constraint that blocked another offer earlier might now be satisfiable. Re-soliciting
/// offers from the resource master is the driver's job and out of scope here; the default
/// implementation just logs so the hook is observable in tests and daemon logs alike.
pub trait OfferReviver: Send + Sync {
    fn revive_offers(&self, app_id: &AppId);
}

pub struct LoggingOfferReviver;

impl OfferReviver for LoggingOfferReviver {
    fn revive_offers(&self, app_id: &AppId) {
        tracing::debug!(app_id, "reviving offers after constraint-relevant status update");
    }
}

/// Messages a launcher's mailbox accepts. Processed strictly in arrival order.
pub enum LauncherMsg {
    MatchOffer {
        deadline: Instant,
        offer: launchpad_common::model::Offer,
        reply: oneshot::Sender<Vec<TaskWithSource>>,
    },
    AddTasks {
        app: App,
        count: u32,
        reply: oneshot::Sender<QueuedTaskCount>,
    },
    Query {
        reply: oneshot::Sender<QueuedTaskCount>,
    },
    Stop,
    TaskLaunchAccepted {
        task_id: TaskId,
    },
    TaskLaunchRejected {
        task_id: TaskId,
        reason: String,
    },
    StatusUpdate(StatusUpdate),
    DelayUpdate(DelayUpdate),
    RecheckBackOff,
}

/// Dependencies shared across every launcher, handed in at spawn time.
pub struct LauncherDeps {
    pub task_factory: Arc<dyn TaskFactory>,
    pub rate_limiter: Arc<RateLimiter>,
    pub clock: Arc<dyn Clock>,
    pub timers: TimerHandle<LauncherMsg>,
    pub manager: Arc<OfferMatcherManager>,
    pub offer_reviver: Arc<dyn OfferReviver>,
    pub launch_notification_timeout: Duration,
}

/// A cheap-to-clone reference to a running launcher's mailbox.
#[derive(Clone)]
pub struct LauncherHandle {
    app_id: AppId,
    sender: Sender<LauncherMsg>,
}

impl LauncherHandle {
    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    /// Ask this launcher to match `offer`, never waiting past `deadline` for its reply.
    pub fn match_offer(
        &self,
        deadline: Instant,
        offer: launchpad_common::model::Offer,
    ) -> Vec<TaskWithSource> {
        let (reply, rx) = oneshot::channel();
        if self
            .sender
            .send(LauncherMsg::MatchOffer {
                deadline,
                offer,
                reply,
            })
            .is_err()
        {
            return Vec::new();
        }
        rx.recv_deadline(deadline).unwrap_or_default()
    }

    pub fn add_tasks(&self, app: App, count: u32) -> Option<QueuedTaskCount> {
        let (reply, rx) = oneshot::channel();
        self.sender
            .send(LauncherMsg::AddTasks { app, count, reply })
            .ok()?;
        rx.recv().ok()
    }

    pub fn query(&self) -> Option<QueuedTaskCount> {
        let (reply, rx) = oneshot::channel();
        self.sender.send(LauncherMsg::Query { reply }).ok()?;
        rx.recv().ok()
    }

    pub fn stop(&self) {
        let _ = self.sender.send(LauncherMsg::Stop);
    }

    pub fn status_update(&self, update: StatusUpdate) {
        let _ = self.sender.send(LauncherMsg::StatusUpdate(update));
    }

    pub fn delay_update(&self, update: DelayUpdate) {
        let _ = self.sender.send(LauncherMsg::DelayUpdate(update));
    }
}

enum Phase {
    WaitingForInitialDelay,
    Active,
    WaitingForInFlight,
}

struct LauncherActor {
    app: App,
    tasks_to_launch: u32,
    tasks_map: HashMap<TaskId, Task>,
    in_flight: HashSet<TaskId>,
    back_off_until: Option<Instant>,
    registered: bool,
    phase: Phase,
    stash: Vec<LauncherMsg>,
}

static TASK_SEQ: AtomicU64 = AtomicU64::new(0);

fn next_task_id(app_id: &AppId) -> TaskId {
    let seq = TASK_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}.{}", app_id.trim_start_matches('/'), seq)
}

fn now_epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// A `TaskSource` addressed back to the launcher that handed the task out.
struct LauncherTaskSource {
    task_id: TaskId,
    sender: Sender<LauncherMsg>,
}

impl TaskSource for LauncherTaskSource {
    fn accept(self: Box<Self>) {
        let _ = self.sender.send(LauncherMsg::TaskLaunchAccepted {
            task_id: self.task_id,
        });
    }

    fn reject(self: Box<Self>, reason: String) {
        let _ = self.sender.send(LauncherMsg::TaskLaunchRejected {
            task_id: self.task_id,
            reason,
        });
    }
}

/// Spawn a launcher for `app` on its own OS thread and return a handle to its mailbox.
pub fn spawn_launcher(app: App, deps: LauncherDeps) -> LauncherHandle {
    let (sender, receiver) = flume::unbounded();
    let handle = LauncherHandle {
        app_id: app.id.clone(),
        sender: sender.clone(),
    };
    let worker_handle = handle.clone();
    std::thread::Builder::new()
        .name(format!("launcher-{}", app.id))
        .spawn(move || run(app, receiver, sender, deps, worker_handle))
        .expect("failed to spawn launcher thread");
    handle
}

fn run(
    app: App,
    receiver: Receiver<LauncherMsg>,
    self_sender: Sender<LauncherMsg>,
    deps: LauncherDeps,
    self_handle: LauncherHandle,
) {
    let mut actor = LauncherActor {
        app,
        tasks_to_launch: 0,
        tasks_map: HashMap::new(),
        in_flight: HashSet::new(),
        back_off_until: None,
        registered: false,
        phase: Phase::WaitingForInitialDelay,
        stash: Vec::new(),
    };

    let initial = deps.rate_limiter.get_delay(&*deps.clock, &actor.app.id);
    let _ = self_sender.send(LauncherMsg::DelayUpdate(initial));

    for msg in receiver.iter() {
        if matches!(actor.phase, Phase::WaitingForInitialDelay) {
            if let LauncherMsg::DelayUpdate(update) = &msg {
                if update.app_id == actor.app.id {
                    let update = update.clone();
                    actor.phase = Phase::Active;
                    handle_delay_update(&mut actor, &deps, &self_handle, update);
                    let stashed = std::mem::take(&mut actor.stash);
                    for stashed_msg in stashed {
                        dispatch(&mut actor, &deps, &self_handle, stashed_msg);
                        if matches!(actor.phase, Phase::WaitingForInFlight) && actor.in_flight.is_empty() {
                            return;
                        }
                    }
                    continue;
                }
            }
            actor.stash.push(msg);
            continue;
        }

        dispatch(&mut actor, &deps, &self_handle, msg);
        if matches!(actor.phase, Phase::WaitingForInFlight) && actor.in_flight.is_empty() {
            return;
        }
    }
}

fn dispatch(
    actor: &mut LauncherActor,
    deps: &LauncherDeps,
    self_handle: &LauncherHandle,
    msg: LauncherMsg,
) {
    if matches!(actor.phase, Phase::WaitingForInFlight) {
        match msg {
            LauncherMsg::TaskLaunchAccepted { task_id } => task_launch_accepted(actor, task_id),
            LauncherMsg::TaskLaunchRejected { task_id, reason } => {
                task_launch_rejected(actor, deps, self_handle, task_id, reason)
            }
            LauncherMsg::MatchOffer { reply, .. } => {
                let _ = reply.send(Vec::new());
            }
            LauncherMsg::Query { reply } => {
                let _ = reply.send(snapshot(actor));
            }
            _ => {}
        }
        return;
    }

    match msg {
        LauncherMsg::MatchOffer {
            deadline,
            offer,
            reply,
        } => {
            let result = match_offer(actor, deps, self_handle, deadline, offer);
            let _ = reply.send(result);
        }
        LauncherMsg::AddTasks { app, count, reply } => {
            add_tasks(actor, deps, self_handle, app, count);
            let _ = reply.send(snapshot(actor));
        }
        LauncherMsg::Query { reply } => {
            let _ = reply.send(snapshot(actor));
        }
        LauncherMsg::Stop => {
            actor.phase = Phase::WaitingForInFlight;
            manage_subscription(actor, deps, self_handle);
        }
        LauncherMsg::TaskLaunchAccepted { task_id } => task_launch_accepted(actor, task_id),
        LauncherMsg::TaskLaunchRejected { task_id, reason } => {
            task_launch_rejected(actor, deps, self_handle, task_id, reason)
        }
        LauncherMsg::StatusUpdate(update) => status_update(actor, deps, self_handle, update),
        LauncherMsg::DelayUpdate(update) => {
            if update.app_id == actor.app.id {
                handle_delay_update(actor, deps, self_handle, update);
            }
        }
        LauncherMsg::RecheckBackOff => manage_subscription(actor, deps, self_handle),
    }
}

fn should_launch_tasks(actor: &LauncherActor, clock: &dyn Clock) -> bool {
    actor.tasks_to_launch > 0
        && actor
            .back_off_until
            .map_or(true, |until| clock.now() >= until)
}

fn manage_subscription(actor: &mut LauncherActor, deps: &LauncherDeps, self_handle: &LauncherHandle) {
    let should = matches!(actor.phase, Phase::Active) && should_launch_tasks(actor, &*deps.clock);
    if should && !actor.registered {
        deps.manager.subscribe(self_handle.clone());
        actor.registered = true;
    } else if !should && actor.registered {
        deps.manager.unsubscribe(&actor.app.id);
        actor.registered = false;
    }
}

fn match_offer(
    actor: &mut LauncherActor,
    deps: &LauncherDeps,
    self_handle: &LauncherHandle,
    deadline: Instant,
    offer: launchpad_common::model::Offer,
) -> Vec<TaskWithSource> {
    if deps.clock.now() >= deadline || !should_launch_tasks(actor, &*deps.clock) {
        return Vec::new();
    }

    let running: Vec<Task> = actor.tasks_map.values().cloned().collect();
    let task_id = next_task_id(&actor.app.id);
    let Some((launch_spec, task)): Option<(LaunchSpec, Task)> = deps.task_factory.new_task(
        &actor.app,
        &offer,
        &running,
        task_id.clone(),
        now_epoch_millis(),
    ) else {
        return Vec::new();
    };

    actor.tasks_map.insert(task_id.clone(), task.clone());
    actor.in_flight.insert(task_id.clone());
    actor.tasks_to_launch = actor.tasks_to_launch.saturating_sub(1);
    manage_subscription(actor, deps, self_handle);

    deps.timers.schedule_after(
        deps.launch_notification_timeout,
        self_handle.sender.clone(),
        LauncherMsg::TaskLaunchRejected {
            task_id: task_id.clone(),
            reason: LAUNCH_NOTIFICATION_TIMEOUT_REASON.to_string(),
        },
    );

    let source = Box::new(LauncherTaskSource {
        task_id,
        sender: self_handle.sender.clone(),
    });
    vec![TaskWithSource {
        launch_spec,
        task,
        source,
    }]
}

fn add_tasks(
    actor: &mut LauncherActor,
    deps: &LauncherDeps,
    self_handle: &LauncherHandle,
    new_app: App,
    count: u32,
) {
    if new_app != actor.app {
        let upgrade = actor.app.is_upgrade(&new_app);
        actor.app = new_app;
        actor.tasks_to_launch = count;
        if upgrade {
            if actor.registered {
                deps.manager.unsubscribe(&actor.app.id);
                actor.registered = false;
            }
            actor.back_off_until = None;
            actor.phase = Phase::WaitingForInitialDelay;
            let update = deps.rate_limiter.reset(&*deps.clock, &actor.app.id);
            let _ = self_handle.sender.send(LauncherMsg::DelayUpdate(update));
            return;
        }
    } else {
        actor.tasks_to_launch += count;
    }
    manage_subscription(actor, deps, self_handle);
}

fn task_launch_accepted(actor: &mut LauncherActor, task_id: TaskId) {
    actor.in_flight.remove(&task_id);
}

fn task_launch_rejected(
    actor: &mut LauncherActor,
    deps: &LauncherDeps,
    self_handle: &LauncherHandle,
    task_id: TaskId,
    _reason: String,
) {
    if !actor.in_flight.remove(&task_id) {
        // Stale launch-notification-timeout fire (or a duplicate rejection) for a task
        // that already settled; nothing left to roll back.
        return;
    }
    actor.tasks_map.remove(&task_id);
    actor.tasks_to_launch += 1;
    let delay_update = deps.rate_limiter.notify_failure(&*deps.clock, &actor.app.id);
    handle_delay_update(actor, deps, self_handle, delay_update);
}

fn status_update(
    actor: &mut LauncherActor,
    deps: &LauncherDeps,
    self_handle: &LauncherHandle,
    update: StatusUpdate,
) {
    let Some(task) = actor.tasks_map.get_mut(&update.task_id) else {
        tracing::debug!(task_id = %update.task_id, "status update for unknown task, dropping");
        return;
    };

    if let TaskState::Terminal(reason) = update.state {
        actor.tasks_map.remove(&update.task_id);
        if actor.app.has_constraints() {
            deps.offer_reviver.revive_offers(&actor.app.id);
        }
        if matches!(reason, TerminalReason::Failed | TerminalReason::Lost) {
            let delay_update = deps.rate_limiter.notify_failure(&*deps.clock, &actor.app.id);
            handle_delay_update(actor, deps, self_handle, delay_update);
        }
        return;
    }

    task.state = update.state;
    task.status = update.status;
}

fn handle_delay_update(
    actor: &mut LauncherActor,
    deps: &LauncherDeps,
    self_handle: &LauncherHandle,
    update: DelayUpdate,
) {
    if Some(update.delay_until) != actor.back_off_until {
        actor.back_off_until = Some(update.delay_until);
        if update.delay_until > deps.clock.now() {
            deps.timers.schedule_at(
                update.delay_until,
                self_handle.sender.clone(),
                LauncherMsg::RecheckBackOff,
            );
        }
    }
    manage_subscription(actor, deps, self_handle);
}

fn snapshot(actor: &LauncherActor) -> QueuedTaskCount {
    let in_flight = actor.in_flight.len() as u32;
    let total = actor.tasks_map.len() as u32;
    QueuedTaskCount {
        app: actor.app.clone(),
        tasks_left_to_launch: actor.tasks_to_launch,
        task_launches_in_flight: in_flight,
        tasks_launched_or_running: total.saturating_sub(in_flight),
        back_off_until: actor.back_off_until,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::task_factory::DefaultTaskFactory;
    use launchpad_common::model::{
        Constraint, Offer, TerminalReason, TaskState, TaskStatus, VersionInfo,
    };
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
            definition: BTreeMap::new(),
        }
    }

    fn offer() -> Offer {
        Offer {
            id: "offer-1".to_string(),
            resources: Resources::new(4.0, 4096.0, 0.0),
            attributes: BTreeMap::new(),
            hostname: "host-1".to_string(),
            slave_id: "slave-1".to_string(),
        }
    }

    fn spawn_test_launcher(app: App) -> (LauncherHandle, Arc<OfferMatcherManager>, Arc<MockClock>) {
        let clock = MockClock::new();
        let manager = Arc::new(OfferMatcherManager::new(clock.clone()));
        let deps = LauncherDeps {
            task_factory: Arc::new(DefaultTaskFactory),
            rate_limiter: Arc::new(RateLimiter::new(
                Duration::from_millis(0),
                Duration::from_secs(3600),
                1.15,
            )),
            clock: clock.clone(),
            timers: TimerHandle::spawn("test-launcher-timer", clock.clone()),
            manager: manager.clone(),
            offer_reviver: Arc::new(LoggingOfferReviver),
            launch_notification_timeout: Duration::from_millis(50),
        };
        let handle = spawn_launcher(app, deps);
        (handle, manager, clock)
    }

    #[derive(Default)]
    struct CountingOfferReviver {
        calls: std::sync::Mutex<Vec<AppId>>,
    }

    impl OfferReviver for CountingOfferReviver {
        fn revive_offers(&self, app_id: &AppId) {
            self.calls.lock().unwrap().push(app_id.clone());
        }
    }

    fn spawn_test_launcher_with_reviver(
        app: App,
        reviver: Arc<CountingOfferReviver>,
    ) -> (LauncherHandle, Arc<OfferMatcherManager>, Arc<MockClock>) {
        let clock = MockClock::new();
        let manager = Arc::new(OfferMatcherManager::new(clock.clone()));
        let deps = LauncherDeps {
            task_factory: Arc::new(DefaultTaskFactory),
            rate_limiter: Arc::new(RateLimiter::new(
                Duration::from_millis(0),
                Duration::from_secs(3600),
                1.15,
            )),
            clock: clock.clone(),
            timers: TimerHandle::spawn("test-launcher-timer-reviver", clock.clone()),
            manager: manager.clone(),
            offer_reviver: reviver,
            launch_notification_timeout: Duration::from_millis(50),
        };
        let handle = spawn_launcher(app, deps);
        (handle, manager, clock)
    }

    #[test]
    fn matches_and_decrements_tasks_to_launch() {
        let (handle, _manager, clock) = spawn_test_launcher(app("/app", 3));
        let snap = handle.add_tasks(app("/app", 3), 3).unwrap();
        assert_eq!(snap.tasks_left_to_launch, 3);

        let deadline = clock.now() + Duration::from_secs(1);
        let matched = handle.match_offer(deadline, offer());
        assert_eq!(matched.len(), 1);

        let snap = handle.query().unwrap();
        assert_eq!(snap.tasks_left_to_launch, 2);
        assert_eq!(snap.task_launches_in_flight, 1);
    }

    #[test]
    fn rejecting_an_in_flight_task_restores_the_slot() {
        let (handle, _manager, clock) = spawn_test_launcher(app("/app", 1));
        handle.add_tasks(app("/app", 1), 1);
        let deadline = clock.now() + Duration::from_secs(1);
        let matched = handle.match_offer(deadline, offer());
        assert_eq!(matched.len(), 1);
        let task_id = matched[0].task.task_id.clone();

        matched.into_iter().next().unwrap().source.reject("driver unavailable".to_string());
        std::thread::sleep(Duration::from_millis(20));

        let snap = handle.query().unwrap();
        assert_eq!(snap.tasks_left_to_launch, 1);
        assert_eq!(snap.task_launches_in_flight, 0);
        let _ = task_id;
    }

    #[test]
    fn accepting_clears_in_flight_without_restoring_slot() {
        let (handle, _manager, clock) = spawn_test_launcher(app("/app", 1));
        handle.add_tasks(app("/app", 1), 1);
        let deadline = clock.now() + Duration::from_secs(1);
        let matched = handle.match_offer(deadline, offer());
        matched.into_iter().next().unwrap().source.accept();
        std::thread::sleep(Duration::from_millis(20));

        let snap = handle.query().unwrap();
        assert_eq!(snap.tasks_left_to_launch, 0);
        assert_eq!(snap.task_launches_in_flight, 0);
    }

    #[test]
    fn terminal_status_for_unconstrained_app_does_not_panic() {
        let (handle, _manager, clock) = spawn_test_launcher(app("/app", 1));
        handle.add_tasks(app("/app", 1), 1);
        let deadline = clock.now() + Duration::from_secs(1);
        let matched = handle.match_offer(deadline, offer());
        let task_id = matched[0].task.task_id.clone();
        matched.into_iter().next().unwrap().source.accept();

        handle.status_update(StatusUpdate {
            app_id: "/app".to_string(),
            task_id,
            state: TaskState::Terminal(TerminalReason::Finished),
            status: TaskStatus::default(),
        });
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(handle.query().unwrap().tasks_launched_or_running, 0);
    }

    #[test]
    fn terminal_status_for_constrained_app_revives_offers() {
        let reviver = Arc::new(CountingOfferReviver::default());
        let mut constrained = app("/app", 1);
        constrained.constraints = vec![Constraint {
            field: "rack".to_string(),
            operator: "UNIQUE".to_string(),
            value: String::new(),
        }];
        let (handle, _manager, clock) =
            spawn_test_launcher_with_reviver(constrained, reviver.clone());
        handle.add_tasks(
            {
                let mut a = app("/app", 1);
                a.constraints = vec![Constraint {
                    field: "rack".to_string(),
                    operator: "UNIQUE".to_string(),
                    value: String::new(),
                }];
                a
            },
            1,
        );
        let deadline = clock.now() + Duration::from_secs(1);
        let matched = handle.match_offer(deadline, offer());
        let task_id = matched[0].task.task_id.clone();
        matched.into_iter().next().unwrap().source.accept();

        handle.status_update(StatusUpdate {
            app_id: "/app".to_string(),
            task_id,
            state: TaskState::Terminal(TerminalReason::Finished),
            status: TaskStatus::default(),
        });
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(reviver.calls.lock().unwrap().as_slice(), ["/app".to_string()]);
    }

    #[test]
    fn upgrade_resets_backoff_and_resubscribes() {
        let (handle, manager, _clock) = spawn_test_launcher(app("/app", 1));
        handle.add_tasks(app("/app", 1), 1);
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(manager.subscriber_count(), 1);

        let mut upgraded = app("/app", 1);
        upgraded
            .definition
            .insert("cmd".to_string(), "sleep 5".to_string());
        let snap = handle.add_tasks(upgraded.clone(), 2).unwrap();

        assert_eq!(snap.app.definition.get("cmd").map(String::as_str), Some("sleep 5"));
        assert_eq!(snap.tasks_left_to_launch, 2);
        assert!(snap.back_off_until.is_none());
    }

    #[test]
    fn no_match_when_no_tasks_wanted() {
        let (handle, _manager, clock) = spawn_test_launcher(app("/app", 0));
        let deadline = clock.now() + Duration::from_secs(1);
        let matched = handle.match_offer(deadline, offer());
        assert!(matched.is_empty());
    }

    #[test]
    fn stale_launch_notification_timeout_after_accept_does_not_reopen_slot() {
        let (handle, _manager, clock) = spawn_test_launcher(app("/app", 1));
        handle.add_tasks(app("/app", 1), 1);
        let deadline = clock.now() + Duration::from_secs(1);
        let matched = handle.match_offer(deadline, offer());
        matched.into_iter().next().unwrap().source.accept();

        // Outlive the launch-notification timeout (50ms); its synthetic rejection fires
        // for a task that's already settled and must be ignored as stale.
        std::thread::sleep(Duration::from_millis(150));

        let after = handle.query().unwrap();
        assert_eq!(after.tasks_left_to_launch, 0);
        assert_eq!(after.task_launches_in_flight, 0);
    }
}
