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

//! Per-app exponential backoff. Every failed launch attempt for an app pushes its
//! `backOffUntil` further out; a fresh app definition (an upgrade or a brand new `add`)
//! resets it back to the floor.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use launchpad_common::model::AppId;

use crate::clock::Clock;

/// A `delayUpdate(app, until)` push from the rate limiter to whichever launcher asked.
#[derive(Clone, Debug, PartialEq)]
pub struct DelayUpdate {
    pub app_id: AppId,
    pub delay_until: Instant,
}

struct Entry {
    current_delay: Duration,
    delay_until: Instant,
}

/// Exponential backoff, keyed per app. `get_delay` both reads and arms the floor delay for
/// apps it has never seen; `notify_failure` grows the delay toward the ceiling;
/// `reset` (called on upgrade or re-add) drops an app back to the floor.
pub struct RateLimiter {
    min_delay: Duration,
    max_delay: Duration,
    factor: f64,
    entries: Mutex<HashMap<AppId, Entry>>,
}

impl RateLimiter {
    pub fn new(min_delay: Duration, max_delay: Duration, factor: f64) -> Self {
        Self {
            min_delay,
            max_delay,
            factor,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Current backoff deadline for `app_id`, creating a floor entry if this is the first
    /// time we've heard of the app.
    pub fn get_delay(&self, clock: &dyn Clock, app_id: &AppId) -> DelayUpdate {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(app_id.clone()).or_insert_with(|| Entry {
            current_delay: self.min_delay,
            delay_until: clock.now(),
        });
        DelayUpdate {
            app_id: app_id.clone(),
            delay_until: entry.delay_until,
        }
    }

    /// Grow the backoff for `app_id` after a launch failure and return the new deadline.
    pub fn notify_failure(&self, clock: &dyn Clock, app_id: &AppId) -> DelayUpdate {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(app_id.clone()).or_insert_with(|| Entry {
            current_delay: self.min_delay,
            delay_until: clock.now(),
        });
        let next_delay_millis = (entry.current_delay.as_millis() as f64 * self.factor) as u64;
        entry.current_delay = Duration::from_millis(next_delay_millis).min(self.max_delay);
        entry.delay_until = clock.now() + entry.current_delay;
        DelayUpdate {
            app_id: app_id.clone(),
            delay_until: entry.delay_until,
        }
    }

    /// Reset `app_id` back to the floor delay, e.g. on upgrade or a fresh `add`.
    pub fn reset(&self, clock: &dyn Clock, app_id: &AppId) -> DelayUpdate {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            app_id.clone(),
            Entry {
                current_delay: self.min_delay,
                delay_until: clock.now(),
            },
        );
        DelayUpdate {
            app_id: app_id.clone(),
            delay_until: clock.now(),
        }
    }

    pub fn forget(&self, app_id: &AppId) {
        self.entries.lock().unwrap().remove(app_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Duration::from_secs(5), Duration::from_secs(3600), 1.15)
    }

    #[test]
    fn unknown_app_gets_floor_delay_immediately() {
        let clock = MockClock::new();
        let rl = limiter();
        let update = rl.get_delay(&*clock, &"/app".to_string());
        assert!(update.delay_until <= clock.now());
    }

    #[test]
    fn repeated_failures_grow_the_delay() {
        let clock = MockClock::new();
        let rl = limiter();
        let first = rl.notify_failure(&*clock, &"/app".to_string());
        let second = rl.notify_failure(&*clock, &"/app".to_string());
        assert!(second.delay_until > first.delay_until);
    }

    #[test]
    fn delay_never_exceeds_ceiling() {
        let clock = MockClock::new();
        let rl = limiter();
        let app = "/app".to_string();
        let mut last = rl.get_delay(&*clock, &app).delay_until;
        for _ in 0..200 {
            let update = rl.notify_failure(&*clock, &app);
            assert!(update.delay_until - clock.now() <= Duration::from_secs(3600));
            last = update.delay_until;
        }
        let _ = last;
    }

    #[test]
    fn reset_drops_back_to_floor() {
        let clock = MockClock::new();
        let rl = limiter();
        let app = "/app".to_string();
        rl.notify_failure(&*clock, &app);
        rl.notify_failure(&*clock, &app);
        let reset = rl.reset(&*clock, &app);
        assert!(reset.delay_until <= clock.now());
    }
}
