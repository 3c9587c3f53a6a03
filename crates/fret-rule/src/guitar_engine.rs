//! Guitar/bass judging.
//!
//! A strum edge either hits a note in its window at once, or waits up to the strum
//! leniency for the frets to catch up. A strum that never finds a note is an
//! overstrum. HOPOs (with combo) and taps are hit by fretting alone; a strum
//! shortly after such a fret-hit is absorbed instead of overstrumming.

use fret_model::{DualTime, PhraseKind, Track, lane};
use log::trace;

use crate::engine::{Engine, EngineCore};
use crate::parameters::EngineParameters;

/// Controller state for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GuitarInput {
    /// Held frets (lane bits); the open bit is ignored
    pub frets: u16,
    pub strum_up: bool,
    pub strum_down: bool,
    pub whammy: bool,
    /// Overdrive activation button
    pub overdrive: bool,
}

impl GuitarInput {
    pub fn frets(frets: u16) -> Self {
        Self {
            frets,
            ..Self::default()
        }
    }

    pub fn strum_down(mut self) -> Self {
        self.strum_down = true;
        self
    }

    pub fn strum_up(mut self) -> Self {
        self.strum_up = true;
        self
    }

    pub fn whammy(mut self) -> Self {
        self.whammy = true;
        self
    }

    pub fn overdrive(mut self) -> Self {
        self.overdrive = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrumDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrumState {
    Inactive,
    /// A strum is waiting for a note until `deadline`
    Waiting {
        direction: StrumDirection,
        deadline: DualTime,
    },
    /// A fret-hit just happened; strums until `until` are absorbed
    Taken { until: DualTime },
    /// The last strum found nothing
    Overstrum,
}

/// Guitar-only boundaries, merged with the shared ones.
#[derive(Debug, Clone, Copy, PartialEq)]
enum StrumBoundary {
    /// Waiting strum runs out
    Expired,
    /// Waiting strum meets a note whose window opens with matching frets
    StrumHit(usize),
    /// Frets changed early for a fret-hittable note whose window opens
    FretHit(usize),
}

pub struct GuitarEngine {
    core: EngineCore,
    input: GuitarInput,
    strum: StrumState,
    /// Frets changed since the last hit
    frets_dirty: bool,
}

impl GuitarEngine {
    /// # Panics
    /// If the track is a drums track.
    pub fn new(track: Track, params: EngineParameters) -> Self {
        assert!(
            !track.instrument.is_drums(),
            "guitar engine cannot judge a {:?} track",
            track.instrument
        );
        Self {
            core: EngineCore::new(track, params),
            input: GuitarInput::default(),
            strum: StrumState::Inactive,
            frets_dirty: false,
        }
    }

    pub fn strum_state(&self) -> StrumState {
        self.strum
    }

    fn advance(&mut self, to: DualTime) {
        loop {
            let shared = self.core.next_boundary();
            let own = self.next_strum_boundary();
            // Shared boundaries go first on ties
            let take_own = match (shared, own) {
                (Some((shared_time, _)), Some((own_time, _))) => own_time < shared_time,
                (None, Some(_)) => true,
                _ => false,
            };
            if take_own {
                let Some((time, boundary)) = own else { break };
                if time > to {
                    break;
                }
                self.core.advance_clock(time);
                self.handle_strum_boundary(time, boundary);
            } else {
                let Some((time, boundary)) = shared else { break };
                if time > to {
                    break;
                }
                self.core.advance_clock(time);
                self.core.handle_boundary(time, boundary);
            }
        }
        self.core.advance_clock(to);
    }

    fn next_strum_boundary(&self) -> Option<(DualTime, StrumBoundary)> {
        let now = self.core.stats.current_time;
        let frets = self.input.frets & lane::FRETS;
        match self.strum {
            StrumState::Waiting { deadline, .. } => {
                let hit = self
                    .next_window_opening(now, deadline, frets, true)
                    .map(|(index, open)| (open, StrumBoundary::StrumHit(index)));
                Some(hit.unwrap_or((deadline, StrumBoundary::Expired)))
            }
            _ if self.frets_dirty => self
                .next_window_opening(now, now, frets, false)
                .map(|(index, open)| (open, StrumBoundary::FretHit(index))),
            _ => None,
        }
    }

    /// First note after the cursor whose window opens after `now` (and no later
    /// than `horizon`) and that the held frets would hit.
    ///
    /// Fret-hits only look at the cursor note.
    fn next_window_opening(
        &self,
        now: DualTime,
        horizon: DualTime,
        frets: u16,
        strummed: bool,
    ) -> Option<(usize, DualTime)> {
        let held = self.core.sustains.held_mask(&self.core.track);
        let cursor = self.core.stats.note_index;
        let notes = &self.core.track.notes;
        if strummed {
            for index in cursor..notes.len() {
                let (start, _) = self.core.note_window(index);
                if start > horizon {
                    break;
                }
                if start > now && lanes_match(frets, notes[index].lane_mask, held) {
                    return Some((index, start));
                }
            }
            None
        } else {
            let note = notes.get(cursor)?;
            let (start, _) = self.core.note_window(cursor);
            (start > now
                && self.is_fret_hittable(cursor)
                && lanes_match(frets, note.lane_mask, held))
            .then_some((cursor, start))
        }
    }

    fn handle_strum_boundary(&mut self, time: DualTime, boundary: StrumBoundary) {
        match boundary {
            StrumBoundary::Expired => self.overstrum(time),
            StrumBoundary::StrumHit(index) => {
                self.hit_with_skips(index, time);
                self.strum = StrumState::Inactive;
            }
            StrumBoundary::FretHit(index) => {
                self.hit_with_skips(index, time);
                self.take_strum(time);
            }
        }
    }

    fn overstrum(&mut self, time: DualTime) {
        self.core.overstrum(time);
        self.strum = StrumState::Overstrum;
    }

    fn take_strum(&mut self, time: DualTime) {
        let until = self
            .core
            .track
            .sync
            .time_at_seconds(time.seconds + self.core.params.guitar.hopo_leniency);
        self.strum = StrumState::Taken { until };
    }

    fn is_fret_hittable(&self, index: usize) -> bool {
        let note = &self.core.track.notes[index];
        note.is_fret_hittable(self.core.stats.combo)
            || self
                .core
                .track
                .phrase_at(PhraseKind::Trill, note.position)
                .is_some()
    }

    /// Note the input would hit now, searching forward from the cursor.
    fn find_hit(&self, time: DualTime, frets: u16, strummed: bool) -> Option<usize> {
        let held = self.core.sustains.held_mask(&self.core.track);
        let notes = &self.core.track.notes;
        for index in self.core.stats.note_index..notes.len() {
            let (start, end) = self.core.note_window(index);
            if start > time {
                break;
            }
            if time >= end {
                continue;
            }
            if !strummed && !self.is_fret_hittable(index) {
                continue;
            }
            if lanes_match(frets, notes[index].lane_mask, held) {
                return Some(index);
            }
        }
        None
    }

    /// Hit a note, missing every unjudged note before it.
    fn hit_with_skips(&mut self, index: usize, time: DualTime) {
        for skipped in self.core.stats.note_index..index {
            self.core.miss_note(skipped, time);
        }
        self.core.hit_note(index, time);
        self.core.stats.note_index = index + 1;
        self.core.skip_cleared_notes();
        self.frets_dirty = false;
    }

    /// Whether a strum at `time` has anything to wait for.
    fn strum_in_range(&self, time: DualTime) -> bool {
        if !self.core.sustains.is_empty() {
            return true;
        }
        let horizon = self
            .core
            .track
            .sync
            .time_at_seconds(time.seconds + self.core.params.guitar.strum_leniency);
        for index in self.core.stats.note_index..self.core.track.notes.len() {
            let (start, end) = self.core.note_window(index);
            if start > horizon {
                break;
            }
            if end > time {
                return true;
            }
        }
        false
    }

    fn on_strum(&mut self, time: DualTime, frets: u16, direction: StrumDirection) {
        if let StrumState::Waiting { .. } = self.strum {
            // The earlier strum never found a note
            self.overstrum(time);
        }
        if let Some(index) = self.find_hit(time, frets, true) {
            self.hit_with_skips(index, time);
            self.strum = StrumState::Inactive;
            return;
        }
        if let StrumState::Taken { until } = self.strum
            && time <= until
        {
            trace!("strum absorbed after fret-hit");
            return;
        }
        if !self.strum_in_range(time) {
            self.strum = StrumState::Inactive;
            return;
        }
        let guitar = &self.core.params.guitar;
        let next_is_fret_hittable = self.core.stats.note_index < self.core.track.notes.len()
            && self.is_fret_hittable(self.core.stats.note_index);
        let leniency = if next_is_fret_hittable {
            guitar.strum_leniency_small
        } else {
            guitar.strum_leniency
        };
        let deadline = self.core.track.sync.time_at_seconds(time.seconds + leniency);
        self.strum = StrumState::Waiting {
            direction,
            deadline,
        };
    }

    fn on_fret_change(&mut self, time: DualTime, frets: u16) {
        if let StrumState::Waiting { .. } = self.strum {
            if let Some(index) = self.find_hit(time, frets, true) {
                self.hit_with_skips(index, time);
                self.strum = StrumState::Inactive;
            }
            return;
        }
        if let Some(index) = self.find_hit(time, frets, false) {
            self.hit_with_skips(index, time);
            self.take_strum(time);
        }
    }

    /// End sustains the new frets no longer hold.
    fn check_sustains(&mut self, time: DualTime, frets: u16) {
        let leniency = self.core.params.guitar.sustain_drop_leniency;
        let mut slot = 0;
        while slot < self.core.sustains.active().len() {
            let track = &self.core.track;
            let active = self.core.sustains.active();
            let sustain = &track.sustains[active[slot].sustain_index];
            let others = active
                .iter()
                .enumerate()
                .filter(|&(other, _)| other != slot)
                .fold(0, |mask, (_, s)| mask | track.sustains[s.sustain_index].lane_mask);
            if sustain_held(frets, sustain.lane_mask, sustain.has_fret_leniency, others) {
                slot += 1;
                continue;
            }
            self.core.release_sustain(slot, time, leniency);
        }
        self.core.refresh_whammy(time);
    }
}

impl Engine for GuitarEngine {
    type Input = GuitarInput;

    fn core(&self) -> &EngineCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EngineCore {
        &mut self.core
    }

    fn update_time(&mut self, seconds: f64) {
        let time = self.core.time_at(seconds);
        self.advance(time);
        self.core.finish_update(time);
    }

    fn update_input(&mut self, seconds: f64, input: GuitarInput) {
        let time = self.core.time_at(seconds);
        self.advance(time);

        let prev = self.input;
        self.input = input;
        let frets = input.frets & lane::FRETS;
        let prev_frets = prev.frets & lane::FRETS;
        let frets_changed = frets != prev_frets;

        if frets & !prev_frets != 0 {
            self.core.register_bre_presses(time, frets & !prev_frets);
        }
        if input.overdrive && !prev.overdrive {
            self.core.activate_overdrive(time);
        }
        if frets_changed {
            self.check_sustains(time, frets);
            self.frets_dirty = true;
        }
        if input.whammy && !prev.whammy {
            self.core.press_whammy(time);
        } else if !input.whammy && prev.whammy {
            self.core.release_whammy(time);
        }

        // Up wins when both edges arrive together
        let strum = if input.strum_up && !prev.strum_up {
            Some(StrumDirection::Up)
        } else if input.strum_down && !prev.strum_down {
            Some(StrumDirection::Down)
        } else {
            None
        };
        match strum {
            Some(direction) => self.on_strum(time, frets, direction),
            None if frets_changed => self.on_fret_change(time, frets),
            None => {}
        }

        self.core.finish_update(time);
    }
}

/// Whether held `frets` play a note of `note_mask`.
///
/// The open bit is stripped from the target. A single-lane fretted note ignores
/// frets below its lane (anchoring). Frets claimed by active sustains (`held`) are
/// then allowed as extras.
pub(crate) fn lanes_match(frets: u16, note_mask: u16, held: u16) -> bool {
    let target = note_mask & lane::FRETS;
    let mut input = frets & lane::FRETS;
    if note_mask & lane::OPEN == 0
        && lane::count(target) == 1
        && let Some(low) = lane::lowest(target)
    {
        input &= !lane::below(low);
    }
    input == target || input & !held == target
}

/// Whether held `frets` keep a sustain of `mask` alive.
pub(crate) fn sustain_held(frets: u16, mask: u16, lenient: bool, others: u16) -> bool {
    let need = mask & lane::FRETS;
    if need == 0 {
        return lenient || frets & !others == 0;
    }
    if frets & need != need {
        return false;
    }
    if lenient {
        return true;
    }
    let mut extra = frets & !need & !others;
    if mask & lane::OPEN == 0
        && lane::count(need) == 1
        && let Some(low) = lane::lowest(need)
    {
        extra &= !lane::below(low);
    }
    extra == 0
}
