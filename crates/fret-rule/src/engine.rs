//! State shared by the guitar and drums engines.
//!
//! `EngineCore` owns the track and everything scored against it. Engines feed it
//! boundary instants in ascending time order: sustain ends, whammy expiry, the
//! overdrive meter running dry, solo ends, and the cursor note's miss time. Each
//! engine adds its own boundaries (strum deadlines for guitar) and processes
//! whichever comes first, so scoring never depends on how often the host polls.

use std::mem;

use fret_model::{DualTime, PhraseKind, SustainState, Track, lane};
use log::{debug, trace};

use crate::overdrive::OverdriveTracker;
use crate::parameters::EngineParameters;
use crate::stats::EngineStats;
use crate::sustain_tracker::{ActiveSustain, DeadSustain, SustainRate, SustainTracker};

/// Something that happened during an update, drained with `take_events`.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    NoteHit { note_index: usize, time: DualTime },
    NoteMissed { note_index: usize },
    Overstrum { time: DualTime },
    /// Drum pad hit with no note to hit
    Overhit { lane: u8, time: DualTime },
    SustainEnded { sustain_index: usize, completed: bool },
    MultiplierChanged { multiplier: u32 },
    OverdrivePhraseCompleted { phrase_index: usize },
    OverdriveStarted { time: DualTime },
    OverdriveEnded { time: DualTime },
    SoloEnded { solo_index: usize, bonus: u64 },
    BigRockEndingAwarded { bonus: u64 },
    BigRockEndingLost,
    TrackSwapped { swap_point: DualTime },
}

/// Shared boundary kinds. Derived order breaks ties between equal instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Boundary {
    SustainEnd,
    WhammyEnd,
    OverdriveEnd,
    SoloEnd,
    NoteMiss,
}

/// Pending Big Rock Ending bonus.
#[derive(Debug, Clone, Default)]
struct BigRockEnding {
    pending: u64,
    /// Seconds of the last counted press per lane
    last_press: [Option<f64>; 16],
    end: Option<DualTime>,
}

/// The judging surface shared by all instruments.
pub trait Engine {
    type Input: Copy;

    fn core(&self) -> &EngineCore;

    fn core_mut(&mut self) -> &mut EngineCore;

    /// Advance to `seconds` with no input change.
    fn update_time(&mut self, seconds: f64);

    /// Advance to `seconds` and apply a new input state.
    fn update_input(&mut self, seconds: f64, input: Self::Input);

    fn stats(&self) -> &EngineStats {
        &self.core().stats
    }

    fn track(&self) -> &Track {
        &self.core().track
    }

    fn active_sustains(&self) -> &[ActiveSustain] {
        self.core().sustains.active()
    }

    fn dead_sustains(&self) -> &[DeadSustain] {
        self.core().sustains.dead()
    }

    /// Drain the events recorded since the last call. Events accumulate until
    /// drained, so hosts call this once per frame.
    fn take_events(&mut self) -> Vec<EngineEvent> {
        self.core_mut().take_events()
    }

    /// Replace the rest of the song with another difficulty of the same
    /// instrument.
    fn swap_track(&mut self, track: Track) {
        self.core_mut().swap_track(track);
    }
}

#[derive(Debug, Clone)]
pub struct EngineCore {
    pub(crate) track: Track,
    pub(crate) params: EngineParameters,
    pub(crate) stats: EngineStats,
    pub(crate) sustains: SustainTracker,
    pub(crate) overdrive: OverdriveTracker,
    bre: BigRockEnding,
    /// Unbounded until drained with `take_events`
    events: Vec<EngineEvent>,
    /// Note points and bonuses; sustain points live in the tracker
    banked: u64,
    last_seconds: f64,
}

impl EngineCore {
    pub fn new(track: Track, params: EngineParameters) -> Self {
        let overdrive = OverdriveTracker::new(params.overdrive);
        Self {
            track,
            params,
            stats: EngineStats::default(),
            sustains: SustainTracker::default(),
            overdrive,
            bre: BigRockEnding::default(),
            events: Vec::new(),
            banked: 0,
            last_seconds: f64::NEG_INFINITY,
        }
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Mutable track access for live transforms. Callers must leave notes before
    /// the cursor untouched.
    pub fn track_mut(&mut self) -> &mut Track {
        &mut self.track
    }

    pub fn params(&self) -> &EngineParameters {
        &self.params
    }

    pub fn stats(&self) -> &EngineStats {
        &self.stats
    }

    pub fn sustains(&self) -> &SustainTracker {
        &self.sustains
    }

    pub fn overdrive(&self) -> &OverdriveTracker {
        &self.overdrive
    }

    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    pub fn effective_multiplier(&self) -> u32 {
        if self.overdrive.is_active() {
            self.stats.multiplier * 2
        } else {
            self.stats.multiplier
        }
    }

    fn rate(&self) -> SustainRate {
        SustainRate {
            multiplier: self.effective_multiplier(),
            points_per_beat: self.params.points_per_beat,
        }
    }

    /// Convert host seconds to a track instant.
    ///
    /// # Panics
    /// If time moves backwards.
    pub(crate) fn time_at(&mut self, seconds: f64) -> DualTime {
        assert!(seconds.is_finite(), "engine time must be finite, got {seconds}");
        assert!(
            seconds >= self.last_seconds,
            "engine time moved backwards: {seconds} after {}",
            self.last_seconds
        );
        self.last_seconds = seconds;
        self.track.sync.time_at_seconds(seconds)
    }

    /// Hit window `[start, end)` of a note.
    pub fn note_window(&self, index: usize) -> (DualTime, DualTime) {
        let notes = &self.track.notes;
        let position = notes[index].position.seconds;
        let prev = index
            .checked_sub(1)
            .map_or(f64::INFINITY, |i| position - notes[i].position.seconds);
        let next = notes
            .get(index + 1)
            .map_or(f64::INFINITY, |n| n.position.seconds - position);
        let window = &self.params.hit_window;
        let sync = &self.track.sync;
        (
            sync.time_at_seconds(position - window.front_end(prev)),
            sync.time_at_seconds(position + window.back_end(next)),
        )
    }

    /// Earliest shared boundary after the last processed one.
    pub(crate) fn next_boundary(&self) -> Option<(DualTime, Boundary)> {
        let now = self.stats.current_time;
        let mut next: Option<(DualTime, Boundary)> = None;
        let mut consider = |time: DualTime, kind: Boundary| {
            if next.is_none_or(|current| (time, kind) < current) {
                next = Some((time, kind));
            }
        };

        if let Some((_, end)) = self.sustains.next_end(&self.track) {
            consider(end, Boundary::SustainEnd);
        }
        if let Some(window) = self.overdrive.whammy() {
            consider(window.end, Boundary::WhammyEnd);
        }
        if let Some(end) = self.overdrive.projected_end(&self.track.sync, now) {
            consider(end, Boundary::OverdriveEnd);
        }
        if let Some(solo) = self.track.solo_phrases.get(self.stats.solo_index) {
            consider(solo.end_time, Boundary::SoloEnd);
        }
        if self.stats.note_index < self.track.notes.len() {
            consider(self.note_window(self.stats.note_index).1, Boundary::NoteMiss);
        }
        next
    }

    pub(crate) fn handle_boundary(&mut self, time: DualTime, kind: Boundary) {
        match kind {
            Boundary::SustainEnd => {
                if let Some((slot, end)) = self.sustains.next_end(&self.track)
                    && end <= time
                {
                    let rate = self.rate();
                    let index = self.sustains.complete(&mut self.track, slot, rate);
                    self.push_event(EngineEvent::SustainEnded {
                        sustain_index: index,
                        completed: true,
                    });
                    self.refresh_whammy(time);
                }
            }
            Boundary::WhammyEnd => self.overdrive.expire_whammy(time),
            Boundary::OverdriveEnd => {
                self.commit(time);
                self.overdrive.end();
                self.push_event(EngineEvent::OverdriveEnded { time });
            }
            Boundary::SoloEnd => self.finish_solo(),
            Boundary::NoteMiss => {
                let index = self.stats.note_index;
                self.miss_note(index, time);
                self.stats.note_index = index + 1;
                self.skip_cleared_notes();
            }
        }
    }

    /// Move the clock forward, accruing the overdrive meter.
    pub(crate) fn advance_clock(&mut self, to: DualTime) {
        if to > self.stats.current_time {
            self.overdrive.advance(&self.track.sync, to);
            self.stats.current_time = to;
        }
    }

    /// Process shared boundaries up to `to`. Engines with their own boundaries
    /// run their own loop instead.
    pub(crate) fn advance(&mut self, to: DualTime) {
        while let Some((time, kind)) = self.next_boundary()
            && time <= to
        {
            self.advance_clock(time);
            self.handle_boundary(time, kind);
        }
        self.advance_clock(to);
    }

    /// Close out an update at `time`.
    pub(crate) fn finish_update(&mut self, time: DualTime) {
        self.advance_clock(time);
        self.settle_bre_at_song_end();
        self.refresh_stats();
    }

    pub(crate) fn refresh_stats(&mut self) {
        let now = self.stats.current_time;
        let pending = self.sustains.pending(&self.track, now, self.rate());
        self.stats.sustain_score = self.sustains.committed();
        self.stats.score = self.banked + self.sustains.committed() + pending;
        self.stats.overdrive_amount = self.overdrive.amount();
        self.stats.overdrive_active = self.overdrive.is_active();
    }

    fn commit(&mut self, time: DualTime) {
        let rate = self.rate();
        self.sustains.commit_all(&self.track, time, rate);
    }

    pub(crate) fn skip_cleared_notes(&mut self) {
        while self
            .track
            .notes
            .get(self.stats.note_index)
            .is_some_and(|n| n.is_cleared())
        {
            self.stats.note_index += 1;
        }
    }

    /// Increment combo, raising the multiplier at each threshold. In-flight
    /// sustain score is committed at the old multiplier first.
    pub(crate) fn add_combo(&mut self, time: DualTime) {
        self.stats.combo += 1;
        self.stats.max_combo = self.stats.max_combo.max(self.stats.combo);
        let target =
            (1 + self.stats.combo / self.params.multiplier_threshold).min(self.params.max_multiplier);
        if target != self.stats.multiplier {
            self.commit(time);
            self.stats.multiplier = target;
            self.push_event(EngineEvent::MultiplierChanged { multiplier: target });
        }
    }

    /// Reset combo and multiplier, committing in-flight sustain score first.
    pub(crate) fn break_combo(&mut self, time: DualTime) {
        self.commit(time);
        self.stats.combo = 0;
        if self.stats.multiplier != 1 {
            self.stats.multiplier = 1;
            self.push_event(EngineEvent::MultiplierChanged { multiplier: 1 });
        }
    }

    pub(crate) fn award_note_points(&mut self, lanes: u8) {
        let points = self.params.points_per_note as u64
            * lanes as u64
            * self.effective_multiplier() as u64;
        self.banked += points;
    }

    /// Credit a fully hit note: phrase counters, sustains, bonus payouts.
    pub(crate) fn complete_note(&mut self, index: usize, time: DualTime) {
        self.stats.notes_hit += 1;
        let note = &self.track.notes[index];
        let position = note.position;
        let sustains = note.sustains();
        let (overdrive, solo) = (note.overdrive_index, note.solo_index);
        trace!("hit note {index} at {:.3}s", time.seconds);

        self.settle_bre_on_note(position, true);

        if let Some(p) = solo {
            self.track.solo_phrases[p].hit_count += 1;
        }
        if let Some(p) = overdrive {
            let phrase = &mut self.track.overdrive_phrases[p];
            phrase.hit_count += 1;
            if phrase.is_complete() {
                self.overdrive.award_phrase();
                self.stats.phrases_completed += 1;
                debug!("overdrive phrase {p} completed");
                self.push_event(EngineEvent::OverdrivePhraseCompleted { phrase_index: p });
            }
        }
        for sustain in sustains {
            self.sustains.start(&mut self.track, sustain, position);
        }
        self.refresh_whammy(time);
        self.push_event(EngineEvent::NoteHit {
            note_index: index,
            time,
        });
    }

    /// Hit every remaining lane of a note at once.
    pub(crate) fn hit_note(&mut self, index: usize, time: DualTime) {
        let lanes = self.track.notes[index].lane_count;
        self.award_note_points(lanes);
        self.track.notes[index].lane_mask = 0;
        self.add_combo(time);
        self.complete_note(index, time);
    }

    /// Declare a note missed. The caller moves the cursor.
    pub(crate) fn miss_note(&mut self, index: usize, time: DualTime) {
        self.stats.notes_missed += 1;
        self.break_combo(time);
        let note = &self.track.notes[index];
        let position = note.position;
        let sustains = note.sustains();
        if let Some(p) = note.overdrive_index {
            self.track.overdrive_phrases[p].disable();
        }
        for s in sustains {
            let sustain = &mut self.track.sustains[s];
            sustain.state = SustainState::Dropped;
            let (end, mask) = (sustain.end_time, sustain.lane_mask);
            self.sustains.record_dead(position, end, mask);
        }
        trace!("missed note {index}");
        self.settle_bre_on_note(position, false);
        self.refresh_whammy(time);
        self.push_event(EngineEvent::NoteMissed { note_index: index });
    }

    /// Drop all sustains and break combo after an unmatched strum.
    pub(crate) fn overstrum(&mut self, time: DualTime) {
        let rate = self.rate();
        for index in self.sustains.drop_all(&mut self.track, time, rate) {
            self.push_event(EngineEvent::SustainEnded {
                sustain_index: index,
                completed: false,
            });
        }
        self.break_combo(time);
        self.stats.overstrums += 1;
        self.refresh_whammy(time);
        debug!("overstrum at {:.3}s", time.seconds);
        self.push_event(EngineEvent::Overstrum { time });
    }

    /// End the sustain in `slot` early. Released within the drop leniency of its
    /// end, it counts as complete.
    pub(crate) fn release_sustain(&mut self, slot: usize, time: DualTime, drop_leniency: f64) {
        let rate = self.rate();
        let index = self.sustains.active()[slot].sustain_index;
        let end = self.track.sustains[index].end_time;
        let completed = end.seconds - time.seconds <= drop_leniency;
        if completed {
            self.sustains.complete(&mut self.track, slot, rate);
        } else {
            self.sustains.drop_at(&mut self.track, slot, time, rate);
        }
        self.push_event(EngineEvent::SustainEnded {
            sustain_index: index,
            completed,
        });
    }

    pub(crate) fn activate_overdrive(&mut self, time: DualTime) {
        if !self.overdrive.can_activate() {
            return;
        }
        self.commit(time);
        self.overdrive.activate();
        self.push_event(EngineEvent::OverdriveStarted { time });
    }

    pub(crate) fn press_whammy(&mut self, time: DualTime) {
        let eligible = self.sustains.eligible_whammy_end(&self.track);
        self.overdrive.press_whammy(&self.track.sync, time, eligible);
        if self.overdrive.whammy().is_some() {
            self.sustains.mark_whammy(&self.track, time);
        }
    }

    pub(crate) fn release_whammy(&mut self, time: DualTime) {
        let held_end = self.sustains.release_whammy(&self.track);
        self.overdrive.release_whammy(time, held_end);
    }

    pub(crate) fn refresh_whammy(&mut self, time: DualTime) {
        let eligible = self.sustains.eligible_whammy_end(&self.track);
        self.overdrive.refresh_whammy(&self.track.sync, time, eligible);
    }

    fn finish_solo(&mut self) {
        let index = self.stats.solo_index;
        let phrase = &self.track.solo_phrases[index];
        let mut bonus = phrase.hit_count as u64 * self.params.solo_points_per_note as u64;
        if phrase.total_notes > 0 && phrase.hit_count >= phrase.total_notes {
            bonus = (bonus as f64 * self.params.perfect_solo_multiplier).round() as u64;
        }
        debug!(
            "solo {index} ended: {}/{} hit, bonus {bonus}",
            phrase.hit_count, phrase.total_notes
        );
        self.banked += bonus;
        self.stats.solo_bonus += bonus;
        self.stats.solo_index += 1;
        self.push_event(EngineEvent::SoloEnded {
            solo_index: index,
            bonus,
        });
    }

    /// Count lane presses made inside a Big Rock Ending.
    pub(crate) fn register_bre_presses(&mut self, time: DualTime, pressed: u16) {
        let Some(end) = self
            .track
            .phrase_at(PhraseKind::BigRockEnding, time)
            .map(|p| p.end_time)
        else {
            return;
        };
        let cooldown = self.params.bre_lane_cooldown;
        for lane in lane::iter(pressed) {
            let last = &mut self.bre.last_press[lane as usize];
            if last.is_none_or(|l| time.seconds - l >= cooldown) {
                *last = Some(time.seconds);
                self.bre.pending += self.params.bre_points_per_hit as u64;
            }
        }
        self.bre.end = Some(end);
    }

    /// The first note after a Big Rock Ending decides its bonus.
    fn settle_bre_on_note(&mut self, position: DualTime, hit: bool) {
        if self.bre.pending == 0 || !self.bre.end.is_some_and(|end| position >= end) {
            return;
        }
        if hit {
            self.pay_bre();
        } else {
            debug!("big rock ending bonus of {} lost", self.bre.pending);
            self.bre = BigRockEnding::default();
            self.push_event(EngineEvent::BigRockEndingLost);
        }
    }

    fn settle_bre_at_song_end(&mut self) {
        let Some(end) = self.bre.end else {
            return;
        };
        if self.bre.pending > 0
            && self.stats.note_index >= self.track.notes.len()
            && self.stats.current_time >= end
        {
            self.pay_bre();
        }
    }

    fn pay_bre(&mut self) {
        let bonus = self.bre.pending;
        debug!("big rock ending bonus {bonus} awarded");
        self.banked += bonus;
        self.stats.bre_bonus += bonus;
        self.bre = BigRockEnding::default();
        self.push_event(EngineEvent::BigRockEndingAwarded { bonus });
    }
}
