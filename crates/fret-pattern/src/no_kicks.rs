use fret_model::{Track, lane};
use log::debug;

use crate::modifier::TrackModifier;

/// Strips the kick pedal from a drums track. Kick-only notes disappear.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoKicksModifier;

impl TrackModifier for NoKicksModifier {
    fn modify(&mut self, track: &mut Track) {
        if !track.instrument.is_drums() {
            return;
        }
        let before = track.notes.len();
        track.notes.retain_mut(|note| {
            note.lane_mask &= !lane::KICK;
            note.lane_count = lane::count(note.lane_mask);
            note.lane_mask != 0
        });
        // Drums carry no sustains
        for note in &mut track.notes {
            note.sustain_index = 0;
        }
        let len = track.notes.len();
        track.resolve_phrase_indices(0..len);
        track.recount_phrase_notes();
        debug!("no kicks: removed {} notes", before - len);
    }
}
