use fret_model::{DualTime, SyncTrack};
use log::debug;

use crate::parameters::OverdriveParameters;

/// Slack for comparing the meter against the activation threshold.
const METER_EPSILON: f64 = 1e-9;

/// Span during which whammying eligible sustains fills the meter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhammyWindow {
    pub start: DualTime,
    pub end: DualTime,
}

/// Overdrive meter with whammy gain.
///
/// The meter is accrued lazily: callers advance it between boundary instants,
/// and ask for the next instant where its rate changes (whammy expiry or the
/// meter running dry while active).
#[derive(Debug, Clone)]
pub struct OverdriveTracker {
    params: OverdriveParameters,
    amount: f64,
    active: bool,
    whammy: Option<WhammyWindow>,
    last_update: DualTime,
}

impl OverdriveTracker {
    pub fn new(params: OverdriveParameters) -> Self {
        Self {
            params,
            amount: 0.0,
            active: false,
            whammy: None,
            last_update: DualTime::ZERO,
        }
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn whammy(&self) -> Option<WhammyWindow> {
        self.whammy
    }

    /// Accrue drain and whammy gain from the last update to `to`.
    pub fn advance(&mut self, sync: &SyncTrack, to: DualTime) {
        if to <= self.last_update {
            return;
        }
        let from = self.last_update;
        self.last_update = to;

        let mut delta = 0.0;
        if let Some(window) = self.whammy {
            let start = from.max(window.start);
            let end = to.min(window.end);
            if start < end {
                delta += sync.beats_between(start, end) * self.params.whammy_gain_per_beat;
            }
        }
        if self.active {
            delta -= sync.beats_between(from, to) * self.params.drain_per_beat;
        }
        self.amount = (self.amount + delta).clamp(0.0, 1.0);
    }

    /// Credit a completed overdrive phrase.
    pub fn award_phrase(&mut self) {
        self.amount = (self.amount + self.params.phrase_gain).min(1.0);
    }

    pub fn can_activate(&self) -> bool {
        !self.active && self.amount + METER_EPSILON >= self.params.activation_threshold
    }

    /// Start overdrive. Returns whether it was started.
    pub fn activate(&mut self) -> bool {
        if !self.can_activate() {
            return false;
        }
        self.active = true;
        debug!("overdrive activated at {:.3}", self.amount);
        true
    }

    /// Instant at which an active meter runs dry under the current rate.
    ///
    /// The projection only holds until the next whammy boundary; callers process
    /// that boundary first and re-project.
    pub fn projected_end(&self, sync: &SyncTrack, now: DualTime) -> Option<DualTime> {
        if !self.active {
            return None;
        }
        let whammying = self
            .whammy
            .is_some_and(|w| w.start <= now && now < w.end);
        let gain = if whammying {
            self.params.whammy_gain_per_beat
        } else {
            0.0
        };
        let rate = self.params.drain_per_beat - gain;
        if rate <= 0.0 {
            return None;
        }
        Some(sync.time_after_beats(now, self.amount / rate))
    }

    /// Stop overdrive and empty the meter.
    pub fn end(&mut self) {
        self.active = false;
        self.amount = 0.0;
        debug!("overdrive ended");
    }

    /// Open a whammy window on a fresh press.
    ///
    /// The window ends at `press + whammy_time` or at `eligible_end`, whichever
    /// comes first. Without an eligible sustain no window opens.
    pub fn press_whammy(
        &mut self,
        sync: &SyncTrack,
        press: DualTime,
        eligible_end: Option<DualTime>,
    ) {
        self.whammy = eligible_end.and_then(|held_end| {
            let timed = sync.time_at_seconds(press.seconds + self.params.whammy_time);
            let end = timed.min(held_end);
            (press < end).then_some(WhammyWindow { start: press, end })
        });
    }

    /// Re-derive the window end after the set of eligible sustains changed.
    ///
    /// A later eligible end extends the window up to the press allowance; the end
    /// only retreats when nothing eligible remains.
    pub fn refresh_whammy(&mut self, sync: &SyncTrack, now: DualTime, eligible_end: Option<DualTime>) {
        let Some(window) = self.whammy.as_mut() else {
            return;
        };
        match eligible_end {
            Some(held_end) => {
                let timed = sync.time_at_seconds(window.start.seconds + self.params.whammy_time);
                window.end = window.end.max(timed.min(held_end));
            }
            None => {
                window.end = window.end.min(now);
            }
        }
        if window.end <= now {
            self.whammy = None;
        }
    }

    /// Stop gain on release: the window ends now, or at `held_end` (the latest
    /// end among whammied sustains) if that comes first.
    pub fn release_whammy(&mut self, now: DualTime, held_end: Option<DualTime>) {
        let Some(window) = self.whammy.as_mut() else {
            return;
        };
        let limit = held_end.map_or(now, |end| end.min(now));
        window.end = window.end.min(limit);
        if window.end <= now {
            self.whammy = None;
        }
    }

    /// Close a window whose end has been reached.
    pub fn expire_whammy(&mut self, now: DualTime) {
        if self.whammy.is_some_and(|w| w.end <= now) {
            self.whammy = None;
        }
    }
}
