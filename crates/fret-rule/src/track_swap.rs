use fret_model::{DualTime, SustainState, Track};
use log::debug;

use crate::engine::{EngineCore, EngineEvent};

impl EngineCore {
    /// Replace everything after the swap point with `new`, a different
    /// difficulty of the same instrument.
    ///
    /// The swap point is the latest of the current time, the last judged note,
    /// any note already partly hit and the end of every held sustain. Old notes,
    /// sustains and phrases up to it stay as they are; the new track supplies the
    /// rest, detached from overdrive and solo phrases.
    ///
    /// # Panics
    /// If `new` is for another instrument.
    pub fn swap_track(&mut self, new: Track) {
        assert_eq!(
            self.track.instrument, new.instrument,
            "cannot swap to a track for another instrument"
        );

        for sustain in self.sustains.active_mut() {
            sustain.overdrive_index = None;
            self.track.sustains[sustain.sustain_index].overdrive_index = None;
        }

        let swap = self.swap_point();
        let cursor = self.stats.note_index;
        // Drum pads can clear notes ahead of the cursor
        let touched = self.track.notes[cursor..]
            .iter()
            .rposition(|n| n.is_touched())
            .map_or(cursor, |i| cursor + i + 1);
        let keep = touched.max(self.track.notes.partition_point(|n| n.position < swap));
        let kept_sustains = self
            .track
            .notes
            .get(keep)
            .map_or(self.track.sustains.len(), |n| n.sustain_index);
        let last_kept = keep.checked_sub(1).map(|i| self.track.notes[i].position);

        let first_new = new
            .notes
            .iter()
            .position(|n| n.position >= swap && last_kept.is_none_or(|l| n.position > l))
            .unwrap_or(new.notes.len());
        let new_sustain_base = new
            .notes
            .get(first_new)
            .map_or(new.sustains.len(), |n| n.sustain_index);

        let track = &mut self.track;
        track.notes.truncate(keep);
        track.sustains.truncate(kept_sustains);

        if let Some(limit) = new.notes.get(first_new).map(|n| n.position) {
            for note in &track.notes[cursor..keep] {
                for index in note.sustains() {
                    let sustain = &mut track.sustains[index];
                    if sustain.state == SustainState::Pending && sustain.end_time > limit {
                        sustain.end_time = limit;
                    }
                }
            }
        }

        track.notes.extend(new.notes[first_new..].iter().map(|n| {
            let mut note = n.clone();
            note.sustain_index = note.sustain_index - new_sustain_base + kept_sustains;
            note.overdrive_index = None;
            note.solo_index = None;
            note
        }));
        track.sustains.extend(new.sustains[new_sustain_base..].iter().map(|s| {
            let mut sustain = s.clone();
            sustain.overdrive_index = None;
            sustain
        }));

        let od_kept = track
            .overdrive_phrases
            .partition_point(|p| p.start_time < swap);
        track.overdrive_phrases.truncate(od_kept);
        let solo_kept = track.solo_phrases.partition_point(|p| p.start_time < swap);
        track.solo_phrases.truncate(solo_kept);
        track.recount_phrase_notes();

        track.phrases.retain(|p| p.start_time < swap);
        track
            .phrases
            .extend(new.phrases.iter().filter(|p| p.start_time >= swap).cloned());
        track.phrases.sort_by_key(|p| p.start_time);
        track.difficulty = new.difficulty;

        let dead = self.sustains.dead_mut();
        for sustain in dead.iter_mut() {
            sustain.end_time = sustain.end_time.min(swap);
        }
        dead.retain(|s| s.start_time < s.end_time);

        let now = self.stats.current_time;
        self.refresh_whammy(now);
        debug!(
            "swapped to {:?} at {:.3}s: kept {keep} notes, took {}",
            self.track.difficulty,
            swap.seconds,
            new.notes.len() - first_new
        );
        self.push_event(EngineEvent::TrackSwapped { swap_point: swap });
        self.refresh_stats();
    }

    fn swap_point(&self) -> DualTime {
        let now = self.stats.current_time;
        let cursor = self.stats.note_index;
        let judged = cursor.checked_sub(1).map(|i| self.track.notes[i].position);
        let touched = self.track.notes[cursor..]
            .iter()
            .filter(|n| n.is_touched())
            .map(|n| n.position)
            .max();
        let held = self
            .sustains
            .active()
            .iter()
            .map(|s| self.track.sustains[s.sustain_index].end_time)
            .max();
        [judged, touched, held].into_iter().flatten().fold(now, DualTime::max)
    }
}
