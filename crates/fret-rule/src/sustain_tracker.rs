use fret_model::{DualTime, SustainState, Track};
use serde::{Deserialize, Serialize};

/// A sustain being held and scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSustain {
    pub sustain_index: usize,
    pub overdrive_index: Option<usize>,
    /// Beatline index at `base_position`, used as a walking hint
    pub base_beat_index: usize,
    /// Score has been committed up to here; only moves forward
    pub base_position: DualTime,
    pub whammy_start: Option<DualTime>,
}

/// Visual record of a sustain that was not (fully) held. Never scored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeadSustain {
    pub start_time: DualTime,
    pub end_time: DualTime,
    pub lane_mask: u16,
}

/// Scoring rates in effect for a commit or a pending-score query.
#[derive(Debug, Clone, Copy)]
pub struct SustainRate {
    pub multiplier: u32,
    pub points_per_beat: u32,
}

/// Active and dead sustains plus the score committed from them.
///
/// Score accrues continuously but is only committed at boundaries (multiplier
/// changes, sustain ends, drops), so the total at any instant does not depend on
/// how often the host polls.
#[derive(Debug, Clone, Default)]
pub struct SustainTracker {
    active: Vec<ActiveSustain>,
    dead: Vec<DeadSustain>,
    committed: u64,
}

impl SustainTracker {
    pub fn active(&self) -> &[ActiveSustain] {
        &self.active
    }

    pub fn dead(&self) -> &[DeadSustain] {
        &self.dead
    }

    pub(crate) fn active_mut(&mut self) -> &mut [ActiveSustain] {
        &mut self.active
    }

    pub(crate) fn dead_mut(&mut self) -> &mut Vec<DeadSustain> {
        &mut self.dead
    }

    pub fn committed(&self) -> u64 {
        self.committed
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Begin holding sustain `index` from `start`.
    pub fn start(&mut self, track: &mut Track, index: usize, start: DualTime) {
        let sustain = &mut track.sustains[index];
        sustain.state = SustainState::Active;
        self.active.push(ActiveSustain {
            sustain_index: index,
            overdrive_index: sustain.overdrive_index,
            base_beat_index: track.sync.beat_index_at(start.ticks, 0),
            base_position: start,
            whammy_start: None,
        });
    }

    /// Record a sustain that will never be held.
    pub fn record_dead(&mut self, start: DualTime, end: DualTime, lane_mask: u16) {
        if start < end {
            self.dead.push(DeadSustain {
                start_time: start,
                end_time: end,
                lane_mask,
            });
        }
    }

    fn points(
        track: &Track,
        sustain: &ActiveSustain,
        until: DualTime,
        rate: SustainRate,
    ) -> u64 {
        let end = track.sustains[sustain.sustain_index].end_time;
        let until = until.min(end);
        if until <= sustain.base_position {
            return 0;
        }
        let lanes = track.sustains[sustain.sustain_index].lane_count.max(1);
        let sync = &track.sync;
        let hint = sustain.base_beat_index;
        let beats =
            sync.beat_at_from(until.ticks, hint) - sync.beat_at_from(sustain.base_position.ticks, hint);
        (rate.multiplier as f64 * rate.points_per_beat as f64 * beats * lanes as f64)
            .round()
            .max(0.0) as u64
    }

    /// Score accrued since the last commit, up to `now`.
    pub fn pending(&self, track: &Track, now: DualTime, rate: SustainRate) -> u64 {
        self.active
            .iter()
            .map(|s| Self::points(track, s, now, rate))
            .sum()
    }

    fn commit_one(&mut self, track: &Track, slot: usize, now: DualTime, rate: SustainRate) -> u64 {
        let sustain = &self.active[slot];
        let points = Self::points(track, sustain, now, rate);
        let end = track.sustains[sustain.sustain_index].end_time;
        let target = now.min(end);
        let sustain = &mut self.active[slot];
        if target > sustain.base_position {
            sustain.base_beat_index = track
                .sync
                .beat_index_at(target.ticks, sustain.base_beat_index);
            sustain.base_position = target;
        }
        self.committed += points;
        points
    }

    /// Commit every active sustain up to `now` at `rate`. Returns points added.
    pub fn commit_all(&mut self, track: &Track, now: DualTime, rate: SustainRate) -> u64 {
        (0..self.active.len())
            .map(|slot| self.commit_one(track, slot, now, rate))
            .sum()
    }

    /// Earliest end among active sustains.
    pub fn next_end(&self, track: &Track) -> Option<(usize, DualTime)> {
        self.active
            .iter()
            .enumerate()
            .map(|(slot, s)| (slot, track.sustains[s.sustain_index].end_time))
            .min_by_key(|&(_, end)| end)
    }

    /// Remove the sustain in `slot` as completed, committing it to its end.
    pub fn complete(&mut self, track: &mut Track, slot: usize, rate: SustainRate) -> usize {
        let end = track.sustains[self.active[slot].sustain_index].end_time;
        self.commit_one(track, slot, end, rate);
        let removed = self.active.remove(slot);
        track.sustains[removed.sustain_index].state = SustainState::Completed;
        removed.sustain_index
    }

    /// Remove the sustain in `slot` as dropped at `at`, leaving a dead record for
    /// the rest of it.
    pub fn drop_at(&mut self, track: &mut Track, slot: usize, at: DualTime, rate: SustainRate) -> usize {
        self.commit_one(track, slot, at, rate);
        let removed = self.active.remove(slot);
        let sustain = &mut track.sustains[removed.sustain_index];
        sustain.state = SustainState::Dropped;
        let start = at.max(removed.base_position);
        let (end, mask) = (sustain.end_time, sustain.lane_mask);
        self.record_dead(start, end, mask);
        removed.sustain_index
    }

    /// Drop every active sustain at `at`. Returns the dropped sustain indices.
    pub fn drop_all(&mut self, track: &mut Track, at: DualTime, rate: SustainRate) -> Vec<usize> {
        let mut dropped = Vec::with_capacity(self.active.len());
        while !self.active.is_empty() {
            dropped.push(self.drop_at(track, 0, at, rate));
        }
        dropped
    }

    /// Lanes claimed by active sustains.
    pub fn held_mask(&self, track: &Track) -> u16 {
        self.active
            .iter()
            .fold(0, |mask, s| mask | track.sustains[s.sustain_index].lane_mask)
    }

    /// Latest end among active sustains whose overdrive phrase is still creditable.
    pub fn eligible_whammy_end(&self, track: &Track) -> Option<DualTime> {
        self.active
            .iter()
            .filter(|s| {
                s.overdrive_index
                    .is_some_and(|p| track.overdrive_phrases.get(p).is_some_and(|p| p.enabled))
            })
            .map(|s| track.sustains[s.sustain_index].end_time)
            .max()
    }

    /// Mark eligible sustains as whammied from `at`.
    pub(crate) fn mark_whammy(&mut self, track: &Track, at: DualTime) {
        for sustain in &mut self.active {
            let eligible = sustain
                .overdrive_index
                .is_some_and(|p| track.overdrive_phrases.get(p).is_some_and(|p| p.enabled));
            sustain.whammy_start = eligible.then_some(at);
        }
    }

    /// Clear whammy marks, returning the latest end among the sustains that
    /// carried one.
    pub(crate) fn release_whammy(&mut self, track: &Track) -> Option<DualTime> {
        self.active
            .iter_mut()
            .filter_map(|s| {
                s.whammy_start
                    .take()
                    .map(|_| track.sustains[s.sustain_index].end_time)
            })
            .max()
    }
}
