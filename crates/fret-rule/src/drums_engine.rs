use fret_model::{DualTime, Track, lane};
use log::trace;

use crate::engine::{Engine, EngineCore, EngineEvent};
use crate::parameters::EngineParameters;

/// Pad hits for one frame. Unlike frets, pads are edges: a set bit is a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrumsInput {
    pub pads: u16,
    /// Overdrive activation request
    pub overdrive: bool,
}

impl DrumsInput {
    pub fn pads(pads: u16) -> Self {
        Self {
            pads,
            overdrive: false,
        }
    }

    pub fn overdrive() -> Self {
        Self {
            pads: 0,
            overdrive: true,
        }
    }
}

/// Drums judging: each pad of a chord is hit on its own and counts toward
/// combo; the chord completes once every pad is hit.
pub struct DrumsEngine {
    core: EngineCore,
}

impl DrumsEngine {
    /// # Panics
    /// If the track is not a drums track.
    pub fn new(track: Track, params: EngineParameters) -> Self {
        assert!(
            track.instrument.is_drums(),
            "drums engine cannot judge a {:?} track",
            track.instrument
        );
        Self {
            core: EngineCore::new(track, params),
        }
    }

    fn hit_pad(&mut self, pad: u8, time: DualTime) {
        let bit = lane::bit(pad);
        let notes = &self.core.track.notes;
        let mut target = None;
        for index in self.core.stats.note_index..notes.len() {
            let (start, end) = self.core.note_window(index);
            if start > time {
                break;
            }
            if time < end && notes[index].lane_mask & bit != 0 {
                target = Some(index);
                break;
            }
        }

        let Some(index) = target else {
            self.overhit(pad, time);
            return;
        };
        trace!("pad {pad} hit note {index}");
        self.core.track.notes[index].lane_mask &= !bit;
        self.core.award_note_points(1);
        self.core.add_combo(time);
        if self.core.track.notes[index].is_cleared() {
            self.core.complete_note(index, time);
            self.core.skip_cleared_notes();
        }
    }

    fn overhit(&mut self, pad: u8, time: DualTime) {
        self.core.stats.overhits += 1;
        if self.core.params.drums.overhit_penalty {
            self.core.break_combo(time);
        }
        self.core.push_event(EngineEvent::Overhit { lane: pad, time });
    }
}

impl Engine for DrumsEngine {
    type Input = DrumsInput;

    fn core(&self) -> &EngineCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EngineCore {
        &mut self.core
    }

    fn update_time(&mut self, seconds: f64) {
        let time = self.core.time_at(seconds);
        self.core.advance(time);
        self.core.finish_update(time);
    }

    fn update_input(&mut self, seconds: f64, input: DrumsInput) {
        let time = self.core.time_at(seconds);
        self.core.advance(time);

        if input.overdrive {
            self.core.activate_overdrive(time);
        }
        let pads = input.pads & self.core.track.instrument.valid_lanes();
        self.core.register_bre_presses(time, pads);
        for pad in lane::iter(pads) {
            self.hit_pad(pad, time);
        }

        self.core.finish_update(time);
    }
}
