use std::ops::Range;

use fret_model::{Instrument, Track, lane};
use log::trace;

use crate::modifier::TrackModifier;

/// Lane added to a single guitar note, indexed by its lane.
const GUITAR_PARTNER: [Option<u8>; 6] = [None, Some(2), Some(3), Some(4), Some(5), Some(4)];

/// Pad added to a single drum hit: red→yellow, yellow→blue, blue→green, green→blue.
const DRUMS_PARTNER: [Option<u8>; 5] = [None, Some(2), Some(3), Some(4), Some(3)];

fn partner_lane(instrument: Instrument, lane: u8) -> Option<u8> {
    let table: &[Option<u8>] = if instrument.is_drums() {
        &DRUMS_PARTNER
    } else {
        &GUITAR_PARTNER
    };
    table.get(lane as usize).copied().flatten()
}

/// Turns every single-lane note into a two-lane chord.
#[derive(Debug, Clone, Copy, Default)]
pub struct DoubleNotesModifier;

impl TrackModifier for DoubleNotesModifier {
    fn modify(&mut self, track: &mut Track) {
        let len = track.notes.len();
        double_notes(track, 0..len);
    }
}

/// Add the partner lane to each untouched single-lane note in `range`.
///
/// A note is left alone when an earlier sustain still holds the partner lane at
/// its position. The note's own sustains gain the lane too. Returns the number of
/// notes changed.
pub fn double_notes(track: &mut Track, range: Range<usize>) -> usize {
    let instrument = track.instrument;
    let mut changed = 0;
    for index in range {
        let note = &track.notes[index];
        // Partially or fully hit notes are never rewritten
        if note.lane_count != 1 || note.is_touched() {
            continue;
        }
        let Some(partner) = lane::lowest(note.lane_mask).and_then(|l| partner_lane(instrument, l))
        else {
            continue;
        };
        let bit = lane::bit(partner);
        let position = note.position;
        let sustained = track.sustains[..note.sustain_index]
            .iter()
            .any(|s| s.lane_mask & bit != 0 && s.end_time > position);
        if sustained {
            trace!("note {index} keeps its lane: partner {partner} is sustained");
            continue;
        }

        let note = &mut track.notes[index];
        note.lane_mask |= bit;
        note.lane_count += 1;
        for s in note.sustains() {
            let sustain = &mut track.sustains[s];
            sustain.lane_mask |= bit;
            sustain.lane_count = lane::count(sustain.lane_mask);
        }
        changed += 1;
    }
    changed
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fret_model::{Difficulty, NoteGroup, Sustain, SyncTrack};

    use super::*;

    /// Notes as `(tick, mask, sustain end tick)`.
    fn make_track(instrument: Instrument, notes: &[(i64, u16, Option<i64>)]) -> Track {
        let sync = Arc::new(SyncTrack::new(480, &[(0, 120.0)]).unwrap());
        let mut track = Track::empty(instrument, Difficulty::Expert, sync.clone());
        for &(tick, mask, end) in notes {
            let mut note = NoteGroup::new(sync.time_at_tick(tick), mask);
            note.sustain_index = track.sustains.len();
            if let Some(end) = end {
                note.sustain_count = 1;
                track.sustains.push(Sustain::new(sync.time_at_tick(end), mask));
            }
            track.notes.push(note);
        }
        track
    }

    #[test]
    fn guitar_partners() {
        let mut track = make_track(
            Instrument::Guitar,
            &[
                (0, lane::GREEN, None),
                (480, lane::ORANGE, None),
                (960, lane::GREEN | lane::RED, None),
                (1440, lane::OPEN, None),
            ],
        );
        assert_eq!(double_notes(&mut track, 0..4), 2);
        assert_eq!(track.notes[0].lane_mask, lane::GREEN | lane::RED);
        assert_eq!(track.notes[1].lane_mask, lane::ORANGE | lane::BLUE);
        assert_eq!(track.notes[2].lane_mask, lane::GREEN | lane::RED);
        assert_eq!(track.notes[3].lane_mask, lane::OPEN);
        assert_eq!(track.notes[0].lane_count, 2);
    }

    #[test]
    fn drum_partners() {
        let mut track = make_track(
            Instrument::Drums,
            &[
                (0, lane::GREEN_PAD, None),
                (480, lane::RED_PAD, None),
                (960, lane::KICK, None),
            ],
        );
        double_notes(&mut track, 0..3);
        assert_eq!(track.notes[0].lane_mask, lane::GREEN_PAD | lane::BLUE_PAD);
        assert_eq!(track.notes[1].lane_mask, lane::RED_PAD | lane::YELLOW_PAD);
        assert_eq!(track.notes[2].lane_mask, lane::KICK);
    }

    #[test]
    fn sustained_partner_blocks_doubling() {
        let mut track = make_track(
            Instrument::Guitar,
            &[(0, lane::RED, Some(1920)), (960, lane::GREEN, Some(1200))],
        );
        double_notes(&mut track, 1..2);
        assert_eq!(track.notes[1].lane_mask, lane::GREEN);
    }

    #[test]
    fn sustains_gain_partner() {
        let mut track = make_track(Instrument::Guitar, &[(0, lane::YELLOW, Some(960))]);
        DoubleNotesModifier.modify(&mut track);
        assert_eq!(track.sustains[0].lane_mask, lane::YELLOW | lane::BLUE);
        assert_eq!(track.sustains[0].lane_count, 2);
    }
}
