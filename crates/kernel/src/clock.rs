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

//! Monotonic time as a first-class, injectable dependency. Every deadline and backoff
//! comparison in this crate goes through a `Clock` rather than calling `Instant::now()`
//! directly, so tests can advance time deterministically (see scenario B/C in the test
//! suite: "advance the clock by an hour before returning the match").

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A source of monotonic time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The real clock, backed by `std::time::Instant`.
#[derive(Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that can be advanced manually, for deterministic tests of deadline and backoff
/// behavior. Offsets are tracked as signed milliseconds from the instant the clock was
/// created, since `Instant` itself cannot be constructed from an arbitrary point.
pub struct MockClock {
    epoch: Instant,
    offset_millis: AtomicI64,
}

impl MockClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            epoch: Instant::now(),
            offset_millis: AtomicI64::new(0),
        })
    }

    pub fn advance(&self, by: Duration) {
        self.offset_millis
            .fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        let offset = self.offset_millis.load(Ordering::SeqCst);
        if offset >= 0 {
            self.epoch + Duration::from_millis(offset as u64)
        } else {
            self.epoch - Duration::from_millis((-offset) as u64)
        }
    }
}
