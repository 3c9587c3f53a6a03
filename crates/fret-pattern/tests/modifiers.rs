use std::sync::Arc;

use fret_model::{
    Difficulty, GuitarState, Instrument, RawNote, SyncTrack, Track, TrackBuilder, lane,
};
use fret_pattern::{Modifier, Modifiers, NoteShuffleModifier, TrackModifier, apply_modifiers};
use fret_rule::{Engine, EngineParameters, GuitarEngine, GuitarInput};
use proptest::prelude::*;

fn sync() -> Arc<SyncTrack> {
    Arc::new(SyncTrack::new(480, &[(0, 120.0)]).unwrap())
}

fn build(notes: Vec<RawNote>) -> Track {
    TrackBuilder::new(Instrument::Guitar, Difficulty::Expert, sync())
        .notes(notes)
        .build()
        .unwrap()
}

#[test]
fn all_taps_with_double_notes_play_without_strumming() {
    let sync = sync();
    let mut track = build(vec![RawNote::at(&sync, 960, 1), RawNote::at(&sync, 1920, 3)]);
    let modifiers: Modifiers = [Modifier::AllTaps, Modifier::DoubleNotes].into_iter().collect();
    apply_modifiers(&mut track, modifiers, 0);
    assert!(track.notes.iter().all(|n| n.guitar_state == GuitarState::Tap));

    let mut engine = GuitarEngine::new(track, EngineParameters::default());
    engine.update_input(1.0, GuitarInput::frets(lane::GREEN | lane::RED));
    engine.update_input(2.0, GuitarInput::frets(lane::YELLOW | lane::BLUE));
    assert_eq!(engine.stats().notes_hit, 2);
    assert_eq!(engine.stats().overstrums, 0);
}

proptest! {
    #[test]
    fn shuffle_keeps_timing_and_lane_counts(
        notes in prop::collection::vec((1i64..960, 1u8..=5, 0u8..3), 1..60),
        seed in any::<u64>(),
    ) {
        let sync = sync();
        let mut tick = 0;
        let mut raw = Vec::new();
        for (gap, first, extra) in notes {
            tick += gap;
            for offset in 0..=extra {
                raw.push(RawNote::at(&sync, tick, (first - 1 + offset) % 5 + 1));
            }
        }
        let original = build(raw);
        let mut shuffled = original.clone();
        NoteShuffleModifier::new(seed).modify(&mut shuffled);

        prop_assert_eq!(original.notes.len(), shuffled.notes.len());
        for (before, after) in original.notes.iter().zip(&shuffled.notes) {
            prop_assert_eq!(before.position, after.position);
            prop_assert_eq!(lane::count(before.lane_mask), lane::count(after.lane_mask));
        }
        for (before, after) in original.sustains.iter().zip(&shuffled.sustains) {
            prop_assert_eq!(lane::count(before.lane_mask), lane::count(after.lane_mask));
        }
    }
}
