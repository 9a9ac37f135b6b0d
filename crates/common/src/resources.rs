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

use serde::{Deserialize, Serialize};

/// The resource quantities carried by an offer, and consumed (in whole or in part) by a
/// launched task. Kept deliberately small: this core doesn't need to understand every
/// resource dimension a real master might advertise, just enough to let the offer matcher
/// manager account for what earlier launchers in a round have already spent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    pub cpus: f64,
    pub mem_mb: f64,
    pub disk_mb: f64,
}

impl Resources {
    pub fn new(cpus: f64, mem_mb: f64, disk_mb: f64) -> Self {
        Self {
            cpus,
            mem_mb,
            disk_mb,
        }
    }

    /// True if `self` has at least as much of every dimension as `other`.
    pub fn covers(&self, other: &Resources) -> bool {
        self.cpus >= other.cpus && self.mem_mb >= other.mem_mb && self.disk_mb >= other.disk_mb
    }

    /// Subtract `other` from `self`, clamping each dimension at zero.
    pub fn saturating_sub(&self, other: &Resources) -> Resources {
        Resources {
            cpus: (self.cpus - other.cpus).max(0.0),
            mem_mb: (self.mem_mb - other.mem_mb).max(0.0),
            disk_mb: (self.disk_mb - other.disk_mb).max(0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn covers_is_per_dimension() {
        let offer = Resources::new(2.0, 1024.0, 4096.0);
        assert!(offer.covers(&Resources::new(1.0, 512.0, 1024.0)));
        assert!(!offer.covers(&Resources::new(3.0, 512.0, 1024.0)));
    }

    #[test]
    fn saturating_sub_clamps_at_zero() {
        let offer = Resources::new(1.0, 256.0, 0.0);
        let remaining = offer.saturating_sub(&Resources::new(2.0, 100.0, 50.0));
        assert_eq!(
            remaining,
            Resources {
                cpus: 0.0,
                mem_mb: 156.0,
                disk_mb: 0.0
            }
        );
    }
}
