// Note shuffle modifier (per-note lane permutation)
//
// Every note gets an independent random lane assignment. Lanes still held by an
// earlier sustain are not assignable, so a shuffled note never lands on a
// sustained lane. The open bit and the kick pedal stay where they are.

use fret_model::{DualTime, Track, lane};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::modifier::TrackModifier;

pub struct NoteShuffleModifier {
    rng: StdRng,
}

impl NoteShuffleModifier {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

/// Sustains placed so far that may still block lanes: `(end, mask)`.
#[derive(Default)]
struct HeldLanes {
    held: Vec<(DualTime, u16)>,
}

impl HeldLanes {
    fn mask_at(&mut self, position: DualTime) -> u16 {
        self.held.retain(|&(end, _)| end > position);
        self.held.iter().fold(0, |mask, &(_, m)| mask | m)
    }

    fn hold(&mut self, end: DualTime, mask: u16) {
        self.held.push((end, mask));
    }
}

impl TrackModifier for NoteShuffleModifier {
    fn modify(&mut self, track: &mut Track) {
        let movable = if track.instrument.is_drums() {
            lane::PADS
        } else {
            lane::FRETS
        };
        let mut held = HeldLanes::default();

        for index in 0..track.notes.len() {
            let position = track.notes[index].position;
            let source = track.notes[index].lane_mask & movable;
            if source == 0 {
                continue;
            }

            let blocked = held.mask_at(position);
            let mut targets: Vec<u8> = lane::iter(movable & !blocked).collect();
            let sources: Vec<u8> = lane::iter(source).collect();
            if targets.len() < sources.len() {
                targets = lane::iter(movable).collect();
            }
            targets.shuffle(&mut self.rng);

            let map = |mask: u16| {
                sources
                    .iter()
                    .zip(&targets)
                    .filter(|&(&from, _)| mask & lane::bit(from) != 0)
                    .fold(mask & !movable, |out, (_, &to)| out | lane::bit(to))
            };

            let note = &mut track.notes[index];
            note.lane_mask = map(note.lane_mask);
            for s in note.sustains() {
                let sustain = &mut track.sustains[s];
                sustain.lane_mask = map(sustain.lane_mask);
                held.hold(sustain.end_time, sustain.lane_mask & movable);
            }
        }
    }
}
