use std::cmp::Ordering;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// A timestamp carried in musical ticks and elapsed seconds at once.
///
/// Both fields describe the same instant under the song's tempo map. Ordering uses
/// ticks when both sides are active (seconds break ties between sub-tick instants)
/// and falls back to seconds otherwise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DualTime {
    pub ticks: i64,
    pub seconds: f64,
}

impl DualTime {
    /// Sentinel for unset/cleared slots.
    pub const INACTIVE: DualTime = DualTime {
        ticks: -1,
        seconds: -1.0,
    };

    pub const ZERO: DualTime = DualTime {
        ticks: 0,
        seconds: 0.0,
    };

    pub const fn new(ticks: i64, seconds: f64) -> Self {
        Self { ticks, seconds }
    }

    pub fn is_active(&self) -> bool {
        self.ticks >= 0
    }
}

impl Default for DualTime {
    fn default() -> Self {
        Self::INACTIVE
    }
}

impl PartialEq for DualTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for DualTime {}

impl PartialOrd for DualTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DualTime {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.is_active() && other.is_active() {
            self.ticks
                .cmp(&other.ticks)
                .then(self.seconds.total_cmp(&other.seconds))
        } else {
            self.seconds.total_cmp(&other.seconds)
        }
    }
}

impl Add for DualTime {
    type Output = DualTime;

    fn add(self, rhs: DualTime) -> DualTime {
        DualTime {
            ticks: self.ticks + rhs.ticks,
            seconds: self.seconds + rhs.seconds,
        }
    }
}

impl Sub for DualTime {
    type Output = DualTime;

    fn sub(self, rhs: DualTime) -> DualTime {
        DualTime {
            ticks: self.ticks - rhs.ticks,
            seconds: self.seconds - rhs.seconds,
        }
    }
}
