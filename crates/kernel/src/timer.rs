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

//! A dedicated timer thread that delivers a one-shot message into a target mailbox at a
//! given instant, as judged by the injected `Clock` rather than real wall-clock time --
//! the same rule every other deadline in this crate follows. Used for the
//! launch-notification timeout and the backoff recheck timer.
//!
//! There is no explicit cancellation: a launcher that no longer cares about a scheduled
//! fire (because the task already got an accept/reject, or backoff was re-armed) simply
//! ignores the message when it arrives, the same tolerance the spec calls out for stale
//! launch-notification-timeout fires.

use std::sync::Arc;
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use tracing::{error, trace};

use crate::clock::Clock;

struct TimerRequest<M> {
    fire_at: Instant,
    target: Sender<M>,
    message: M,
}

/// Handle for scheduling one-shot timers on the shared timer thread.
#[derive(Clone)]
pub struct TimerHandle<M> {
    request_tx: Sender<TimerRequest<M>>,
    clock: Arc<dyn Clock>,
}

impl<M: Send + 'static> TimerHandle<M> {
    /// Spawn the timer thread and return a handle for scheduling against it. `clock` is
    /// consulted both for computing `schedule_after`'s deadline and for deciding, on the
    /// timer thread, whether a pending entry has fired.
    pub fn spawn(thread_name: &'static str, clock: Arc<dyn Clock>) -> Self {
        let (request_tx, request_rx) = flume::unbounded();
        let thread_clock = clock.clone();
        std::thread::Builder::new()
            .name(thread_name.to_string())
            .spawn(move || timer_thread_loop(request_rx, thread_clock))
            .expect("failed to spawn timer thread");
        Self { request_tx, clock }
    }

    /// Schedule `message` to be delivered to `target` at `fire_at`, an instant from the
    /// same `Clock` this handle was spawned with.
    pub fn schedule_at(&self, fire_at: Instant, target: Sender<M>, message: M) {
        if self
            .request_tx
            .send(TimerRequest {
                fire_at,
                target,
                message,
            })
            .is_err()
        {
            error!("timer thread gone, dropping scheduled timer");
        }
    }

    /// Schedule `message` to be delivered to `target` after `delay`, measured from the
    /// injected clock's current time.
    pub fn schedule_after(&self, delay: Duration, target: Sender<M>, message: M) {
        self.schedule_at(self.clock.now() + delay, target, message);
    }
}

fn timer_thread_loop<M: Send>(request_rx: Receiver<TimerRequest<M>>, clock: Arc<dyn Clock>) {
    let mut pending: Vec<TimerRequest<M>> = Vec::new();
    loop {
        let wait = next_wait(&pending, &*clock);
        match request_rx.recv_timeout(wait) {
            Ok(request) => pending.push(request),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                trace!("timer thread shutting down, no senders remain");
                return;
            }
        }

        // Drain anything else that queued up without blocking.
        while let Ok(request) = request_rx.try_recv() {
            pending.push(request);
        }

        let now = clock.now();
        let mut i = 0;
        while i < pending.len() {
            if pending[i].fire_at <= now {
                let fired = pending.swap_remove(i);
                if fired.target.send(fired.message).is_err() {
                    trace!("timer target mailbox closed, dropping fired timer");
                }
            } else {
                i += 1;
            }
        }
    }
}

/// How long to block waiting for new requests before we need to re-check expirations.
/// Capped at 50ms so a clock that's been mocked far past a pending `fire_at` is noticed
/// promptly instead of this thread sleeping in real time for however far the mock jumped.
fn next_wait<M>(pending: &[TimerRequest<M>], clock: &dyn Clock) -> Duration {
    let Some(soonest) = pending.iter().map(|r| r.fire_at).min() else {
        return Duration::from_millis(50);
    };
    let now = clock.now();
    if soonest <= now {
        Duration::from_millis(0)
    } else {
        (soonest - now).min(Duration::from_millis(50))
    }
}
