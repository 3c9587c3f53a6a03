use serde::{Deserialize, Serialize};

use crate::error::TrackBuildError;
use crate::time::DualTime;

/// Tempo change event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoChange {
    /// Tick position of the change
    pub ticks: i64,
    /// Seconds at the change (computed from the preceding tempos)
    pub seconds: f64,
    /// New BPM value
    pub bpm: f64,
}

/// Beatline category as emitted by the chart loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeatlineKind {
    Measure,
    Strong,
    /// Half-beat line; drawn but not counted when measuring beats
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Beatline {
    pub position: DualTime,
    pub kind: BeatlineKind,
}

/// Tempo map plus beatlines.
///
/// Converts between ticks and seconds and measures elapsed beats by walking the
/// counted beatlines, so a time signature such as 6/8 scores per felt beat rather
/// than per quarter note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncTrack {
    resolution: u32,
    tempos: Vec<TempoChange>,
    beatlines: Vec<Beatline>,
    /// Tick positions of Measure/Strong beatlines
    beat_ticks: Vec<i64>,
}

impl SyncTrack {
    /// Build a tempo map from `(tick, bpm)` pairs sorted by tick.
    ///
    /// An empty tempo list means 120 BPM from tick 0. A list that does not start at
    /// tick 0 inherits its first BPM back to the start of the song.
    pub fn new(resolution: u32, tempos: &[(i64, f64)]) -> Result<Self, TrackBuildError> {
        if resolution == 0 {
            return Err(TrackBuildError::ZeroResolution);
        }
        let mut changes: Vec<TempoChange> = Vec::with_capacity(tempos.len() + 1);
        let first_bpm = tempos.first().map(|&(_, bpm)| bpm).unwrap_or(120.0);
        changes.push(TempoChange {
            ticks: 0,
            seconds: 0.0,
            bpm: first_bpm,
        });

        for &(ticks, bpm) in tempos {
            if !(bpm.is_finite() && bpm > 0.0) {
                return Err(TrackBuildError::InvalidTempo { ticks, bpm });
            }
            if ticks < 0 {
                return Err(TrackBuildError::UnsortedTempo { ticks });
            }
            let prev = changes[changes.len() - 1];
            if ticks < prev.ticks {
                return Err(TrackBuildError::UnsortedTempo { ticks });
            }
            let seconds =
                prev.seconds + (ticks - prev.ticks) as f64 / resolution as f64 * 60.0 / prev.bpm;
            if ticks == prev.ticks {
                // Later change at the same tick wins
                if let Some(last) = changes.last_mut() {
                    last.bpm = bpm;
                }
                continue;
            }
            changes.push(TempoChange {
                ticks,
                seconds,
                bpm,
            });
        }

        Ok(Self {
            resolution,
            tempos: changes,
            beatlines: Vec::new(),
            beat_ticks: Vec::new(),
        })
    }

    /// Attach beatlines given as `(tick, kind)` pairs sorted by tick.
    pub fn with_beatlines(
        mut self,
        beatlines: &[(i64, BeatlineKind)],
    ) -> Result<Self, TrackBuildError> {
        let mut prev = i64::MIN;
        let mut lines = Vec::with_capacity(beatlines.len());
        let mut beat_ticks = Vec::new();
        for &(ticks, kind) in beatlines {
            if ticks < prev || ticks < 0 {
                return Err(TrackBuildError::UnsortedBeatline { ticks });
            }
            prev = ticks;
            lines.push(Beatline {
                position: self.time_at_tick(ticks),
                kind,
            });
            if kind != BeatlineKind::Weak && beat_ticks.last() != Some(&ticks) {
                beat_ticks.push(ticks);
            }
        }
        self.beatlines = lines;
        self.beat_ticks = beat_ticks;
        Ok(self)
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn tempos(&self) -> &[TempoChange] {
        &self.tempos
    }

    pub fn beatlines(&self) -> &[Beatline] {
        &self.beatlines
    }

    fn tempo_index_for_tick(&self, tick: i64) -> usize {
        self.tempos
            .partition_point(|t| t.ticks <= tick)
            .saturating_sub(1)
    }

    fn tempo_index_for_seconds(&self, seconds: f64) -> usize {
        self.tempos
            .partition_point(|t| t.seconds <= seconds)
            .saturating_sub(1)
    }

    pub fn seconds_at_tick(&self, tick: i64) -> f64 {
        let tempo = &self.tempos[self.tempo_index_for_tick(tick)];
        tempo.seconds + (tick - tempo.ticks) as f64 / self.resolution as f64 * 60.0 / tempo.bpm
    }

    /// Tick at the given seconds, rounded down.
    pub fn tick_at_seconds(&self, seconds: f64) -> i64 {
        let tempo = &self.tempos[self.tempo_index_for_seconds(seconds)];
        let ticks = tempo.ticks as f64
            + (seconds - tempo.seconds) * tempo.bpm / 60.0 * self.resolution as f64;
        // Guard against 0.9999.. for instants that sit exactly on a tick
        (ticks + 1e-6).floor() as i64
    }

    pub fn time_at_tick(&self, tick: i64) -> DualTime {
        DualTime::new(tick, self.seconds_at_tick(tick))
    }

    pub fn time_at_seconds(&self, seconds: f64) -> DualTime {
        DualTime::new(self.tick_at_seconds(seconds), seconds)
    }

    /// Index of the last counted beatline at or before `tick`, walking forward from
    /// `hint`. Callers that move forward in time pass the previous result back in.
    pub fn beat_index_at(&self, tick: i64, hint: usize) -> usize {
        if self.beat_ticks.is_empty() {
            return 0;
        }
        let mut index = hint.min(self.beat_ticks.len() - 1);
        if self.beat_ticks[index] > tick {
            // Hint is ahead of the target; fall back to a search
            return self
                .beat_ticks
                .partition_point(|&t| t <= tick)
                .saturating_sub(1);
        }
        while index + 1 < self.beat_ticks.len() && self.beat_ticks[index + 1] <= tick {
            index += 1;
        }
        index
    }

    /// Fractional beat position of `tick`.
    pub fn beat_at(&self, tick: i64) -> f64 {
        let hint = self
            .beat_ticks
            .partition_point(|&t| t <= tick)
            .saturating_sub(1);
        self.beat_at_from(tick, hint)
    }

    /// Fractional beat position of `tick`, walking beatlines from `hint`.
    pub fn beat_at_from(&self, tick: i64, hint: usize) -> f64 {
        let res = self.resolution as f64;
        if self.beat_ticks.is_empty() {
            return tick as f64 / res;
        }
        let first = self.beat_ticks[0];
        if tick < first {
            return (tick - first) as f64 / res;
        }
        let index = self.beat_index_at(tick, hint);
        let start = self.beat_ticks[index];
        match self.beat_ticks.get(index + 1) {
            Some(&next) => index as f64 + (tick - start) as f64 / (next - start) as f64,
            None => index as f64 + (tick - start) as f64 / res,
        }
    }

    /// Beats elapsed from `from` to `to`; zero when `to` is not after `from`.
    pub fn beats_between(&self, from: DualTime, to: DualTime) -> f64 {
        if to.ticks <= from.ticks {
            return 0.0;
        }
        self.beat_at(to.ticks) - self.beat_at(from.ticks)
    }

    /// First tick at or after a fractional beat position (inverse of
    /// [`beat_at`](Self::beat_at) on whole ticks).
    pub fn tick_at_beat(&self, beat: f64) -> i64 {
        let res = self.resolution as f64;
        if self.beat_ticks.is_empty() {
            return ceil_ticks(beat * res);
        }
        let first = self.beat_ticks[0];
        if beat < 0.0 {
            return first + ceil_ticks(beat * res);
        }
        let index = beat.floor() as usize;
        let frac = beat - index as f64;
        let last = self.beat_ticks.len() - 1;
        if index >= last {
            let start = self.beat_ticks[last];
            return start + ceil_ticks((beat - last as f64) * res);
        }
        let start = self.beat_ticks[index];
        let next = self.beat_ticks[index + 1];
        start + ceil_ticks(frac * (next - start) as f64)
    }

    /// The instant `beats` beats after `from`.
    pub fn time_after_beats(&self, from: DualTime, beats: f64) -> DualTime {
        let target = self.beat_at(from.ticks) + beats;
        self.time_at_tick(self.tick_at_beat(target).max(from.ticks))
    }
}

fn ceil_ticks(ticks: f64) -> i64 {
    (ticks - 1e-6).ceil() as i64
}
