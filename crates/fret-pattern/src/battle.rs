//! Battle-mode attacks applied to a live engine's upcoming notes.
//!
//! An attack lands `TRANSFORMATION_SPACING` seconds after activation, giving the
//! player a moment to see it coming, and lasts `LENGTH_OF_EVENT` seconds.

use std::ops::Range;
use std::sync::Arc;

use fret_model::{Difficulty, DualTime, Instrument, Track};
use fret_rule::Engine;
use log::debug;
use thiserror::Error;

use crate::double_notes::double_notes;
use crate::splice::splice_notes;

/// Seconds between activation and the start of the affected window.
pub const TRANSFORMATION_SPACING: f64 = 1.5;

/// Length of the affected window in seconds.
pub const LENGTH_OF_EVENT: f64 = 10.0;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BattleError {
    #[error("track is already at the hardest difficulty")]
    TopDifficulty,
    #[error("no {0:?} track loaded for difficulty-up")]
    MissingAlternate(Difficulty),
    #[error("difficulty-up track is for {found:?}, expected {expected:?}")]
    InstrumentMismatch {
        expected: Instrument,
        found: Instrument,
    },
}

/// Tracks active attacks on one player's engine.
#[derive(Debug, Clone, Default)]
pub struct BattleController {
    /// One-step-harder version of the live track
    harder: Option<Arc<Track>>,
    double_notes: Option<(DualTime, DualTime)>,
}

impl BattleController {
    pub fn new(harder: Option<Arc<Track>>) -> Self {
        Self {
            harder,
            double_notes: None,
        }
    }

    /// Window `[start, end)` of a double-notes attack, if one was activated.
    pub fn double_notes_window(&self) -> Option<(DualTime, DualTime)> {
        self.double_notes
    }

    fn attack_window<E: Engine>(engine: &E) -> (DualTime, DualTime) {
        let now = engine.stats().current_time.seconds;
        let sync = &engine.track().sync;
        let start = now + TRANSFORMATION_SPACING;
        (
            sync.time_at_seconds(start),
            sync.time_at_seconds(start + LENGTH_OF_EVENT),
        )
    }

    /// Double every single-lane note in the attack window. Returns the affected
    /// note range.
    pub fn activate_double_notes<E: Engine>(&mut self, engine: &mut E) -> Range<usize> {
        let (start, end) = Self::attack_window(engine);
        let cursor = engine.stats().note_index;
        let track = engine.core_mut().track_mut();
        let range = clip(track.notes_in(start, end), cursor);
        let changed = double_notes(track, range.clone());
        debug!(
            "double notes from {:.3}s to {:.3}s: {changed} notes",
            start.seconds, end.seconds
        );
        self.double_notes = Some((start, end));
        range
    }

    /// Splice the next difficulty's notes into the attack window. An active
    /// double-notes attack carries over to the spliced notes.
    pub fn activate_difficulty_up<E: Engine>(
        &mut self,
        engine: &mut E,
    ) -> Result<Range<usize>, BattleError> {
        let live = engine.track();
        let target = live.difficulty.harder().ok_or(BattleError::TopDifficulty)?;
        let harder = self
            .harder
            .clone()
            .filter(|t| t.difficulty == target)
            .ok_or(BattleError::MissingAlternate(target))?;
        if harder.instrument != live.instrument {
            return Err(BattleError::InstrumentMismatch {
                expected: live.instrument,
                found: harder.instrument,
            });
        }

        let (start, end) = Self::attack_window(engine);
        let cursor = engine.stats().note_index;
        let track = engine.core_mut().track_mut();
        let range = splice_notes(track, &harder, start, end, cursor);

        if let Some((double_start, double_end)) = self.double_notes {
            let doubled = track.notes_in(double_start, double_end);
            let overlap = range.start.max(doubled.start)..range.end.min(doubled.end);
            if !overlap.is_empty() {
                double_notes(track, overlap);
            }
        }
        debug!(
            "difficulty up to {target:?} from {:.3}s to {:.3}s: {} notes",
            start.seconds,
            end.seconds,
            range.len()
        );
        Ok(range)
    }
}

fn clip(range: Range<usize>, cursor: usize) -> Range<usize> {
    range.start.max(cursor)..range.end.max(cursor)
}

#[cfg(test)]
mod tests {
    use fret_model::{NoteGroup, SyncTrack, lane};
    use fret_rule::{EngineParameters, GuitarEngine};

    use super::*;

    fn sync() -> Arc<SyncTrack> {
        Arc::new(SyncTrack::new(480, &[(0, 120.0)]).unwrap())
    }

    fn make_track(sync: &Arc<SyncTrack>, difficulty: Difficulty, ticks: &[i64], mask: u16) -> Track {
        let mut track = Track::empty(Instrument::Guitar, difficulty, sync.clone());
        track.notes = ticks
            .iter()
            .map(|&t| NoteGroup::new(sync.time_at_tick(t), mask))
            .collect();
        track
    }

    #[test]
    fn difficulty_up_unavailable_at_top() {
        let sync = sync();
        let track = make_track(&sync, Difficulty::Expert, &[960], lane::GREEN);
        let mut engine = GuitarEngine::new(track, EngineParameters::default());
        let mut battle = BattleController::new(None);
        assert_eq!(
            battle.activate_difficulty_up(&mut engine),
            Err(BattleError::TopDifficulty)
        );
    }

    #[test]
    fn difficulty_up_needs_next_difficulty() {
        let sync = sync();
        let live = make_track(&sync, Difficulty::Easy, &[960], lane::GREEN);
        let wrong = make_track(&sync, Difficulty::Expert, &[960], lane::RED);
        let mut engine = GuitarEngine::new(live, EngineParameters::default());
        let mut battle = BattleController::new(Some(Arc::new(wrong)));
        assert_eq!(
            battle.activate_difficulty_up(&mut engine),
            Err(BattleError::MissingAlternate(Difficulty::Medium))
        );
    }

    #[test]
    fn clip_keeps_cursor() {
        assert_eq!(clip(2..6, 4), 4..6);
        assert_eq!(clip(2..3, 4), 4..4);
        assert_eq!(clip(5..7, 4), 5..7);
    }
}
