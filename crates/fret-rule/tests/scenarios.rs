use std::sync::Arc;

use fret_model::{Difficulty, Instrument, RawNote, SyncTrack, Track, TrackBuilder, lane};
use fret_rule::{
    Engine, EngineEvent, EngineParameters, GuitarEngine, GuitarInput, StrumState,
};

fn sync() -> Arc<SyncTrack> {
    // 120 BPM: one beat is half a second, 960 ticks per second
    Arc::new(SyncTrack::new(480, &[(0, 120.0)]).unwrap())
}

fn guitar_track(sync: &Arc<SyncTrack>, notes: Vec<RawNote>) -> Track {
    TrackBuilder::new(Instrument::Guitar, Difficulty::Expert, sync.clone())
        .notes(notes)
        .build()
        .unwrap()
}

fn engine_for(track: Track) -> GuitarEngine {
    GuitarEngine::new(track, EngineParameters::for_instrument(Instrument::Guitar))
}

/// Strum with `frets` held at `t`, then let the strum bar go.
fn strum(engine: &mut GuitarEngine, t: f64, frets: u16) {
    engine.update_input(t, GuitarInput::frets(frets).strum_down());
    engine.update_input(t + 0.01, GuitarInput::frets(frets));
}

#[test]
fn chord_hit_with_exact_frets_on_time() {
    let sync = sync();
    let track = guitar_track(&sync, vec![RawNote::at(&sync, 960, 1), RawNote::at(&sync, 960, 2)]);
    let mut engine = engine_for(track);

    engine.update_input(0.9, GuitarInput::frets(lane::GREEN | lane::RED));
    assert_eq!(engine.stats().score, 0);
    engine.update_input(1.0, GuitarInput::frets(lane::GREEN | lane::RED).strum_down());

    assert_eq!(engine.stats().score, 50 * 2);
    assert_eq!(engine.stats().combo, 1);
    assert_eq!(engine.stats().note_index, 1);
}

#[test]
fn multiplier_raise_commits_sustain_at_old_rate() {
    let sync = sync();
    let mut notes: Vec<_> = (0..8).map(|i| RawNote::at(&sync, 480 * i, 1)).collect();
    notes.push(RawNote::at(&sync, 3840, 1).with_sustain(sync.time_at_tick(5760)));
    notes.push(RawNote::at(&sync, 4800, 2));
    let mut engine = engine_for(guitar_track(&sync, notes));

    for i in 0..9 {
        strum(&mut engine, 0.5 * i as f64, lane::GREEN);
    }
    assert_eq!(engine.stats().combo, 9);
    assert_eq!(engine.active_sustains().len(), 1);

    engine.update_input(5.0, GuitarInput::frets(lane::GREEN | lane::RED).strum_down());
    let stats = engine.stats();
    assert_eq!(stats.combo, 10);
    assert_eq!(stats.multiplier, 2);
    // Two beats of sustain at 1x, banked before the raise
    assert_eq!(engine.core().sustains().committed(), 50);
    assert_eq!(stats.score, 9 * 50 + 50 + 50);

    engine.update_input(5.01, GuitarInput::frets(lane::GREEN | lane::RED));
    engine.update_time(6.5);
    assert!(engine.active_sustains().is_empty());
    // Two more beats at 2x
    assert_eq!(engine.core().sustains().committed(), 50 + 100);
    assert_eq!(engine.stats().score, 9 * 50 + 50 + 50 + 100);
}

#[test]
fn stray_strum_outside_any_window_is_ignored() {
    let sync = sync();
    let track = guitar_track(&sync, vec![RawNote::at(&sync, 480, 1), RawNote::at(&sync, 4800, 1)]);
    let mut engine = engine_for(track);
    strum(&mut engine, 0.5, lane::GREEN);
    let before = engine.stats().clone();

    engine.update_input(2.0, GuitarInput::default().strum_down());
    assert_eq!(engine.strum_state(), StrumState::Inactive);
    engine.update_time(2.5);

    assert_eq!(engine.stats().score, before.score);
    assert_eq!(engine.stats().combo, 1);
    assert_eq!(engine.stats().overstrums, 0);
}

#[test]
fn overstrum_drops_every_held_sustain() {
    let sync = sync();
    let track = guitar_track(
        &sync,
        vec![
            RawNote::at(&sync, 960, 1).with_sustain(sync.time_at_tick(2880)),
            RawNote::at(&sync, 960, 2).with_sustain(sync.time_at_tick(3840)),
        ],
    );
    let mut engine = engine_for(track);
    strum(&mut engine, 1.0, lane::GREEN | lane::RED);
    assert_eq!(engine.active_sustains().len(), 2);

    engine.update_input(2.0, GuitarInput::frets(lane::GREEN | lane::RED).strum_down());
    assert!(matches!(engine.strum_state(), StrumState::Waiting { .. }));
    engine.update_time(2.1);

    let stats = engine.stats();
    assert_eq!(stats.overstrums, 1);
    assert_eq!(stats.combo, 0);
    assert_eq!(stats.multiplier, 1);
    assert!(engine.active_sustains().is_empty());

    let mut dead = engine.dead_sustains().to_vec();
    dead.sort_by_key(|d| d.end_time);
    assert_eq!(dead.len(), 2);
    for sustain in &dead {
        assert!((sustain.start_time.seconds - 2.05).abs() < 1e-3);
    }
    assert_eq!(dead[0].end_time.ticks, 2880);
    assert_eq!(dead[1].end_time.ticks, 3840);
}

#[test]
fn hopo_fret_hit_absorbs_following_strum() {
    let sync = sync();
    let track = guitar_track(&sync, vec![RawNote::at(&sync, 480, 1), RawNote::at(&sync, 600, 2)]);
    let mut engine = engine_for(track);
    strum(&mut engine, 0.5, lane::GREEN);

    engine.update_input(0.6, GuitarInput::frets(lane::RED));
    assert_eq!(engine.stats().combo, 2);
    assert!(matches!(engine.strum_state(), StrumState::Taken { .. }));

    engine.update_input(0.65, GuitarInput::frets(lane::RED).strum_down());
    engine.update_time(1.0);
    assert_eq!(engine.stats().overstrums, 0);
    assert_eq!(engine.stats().combo, 2);
}

#[test]
fn hopo_needs_combo() {
    let sync = sync();
    let track = guitar_track(&sync, vec![RawNote::at(&sync, 480, 1), RawNote::at(&sync, 600, 2)]);
    let mut engine = engine_for(track);

    // Miss the first note, then try to fret the HOPO
    engine.update_time(0.6);
    engine.update_input(0.61, GuitarInput::frets(lane::RED));
    assert_eq!(engine.stats().notes_hit, 0);
    engine.update_input(0.62, GuitarInput::frets(lane::RED).strum_down());
    assert_eq!(engine.stats().notes_hit, 1);
}

#[test]
fn early_strum_waits_for_frets() {
    let sync = sync();
    let track = guitar_track(&sync, vec![RawNote::at(&sync, 960, 3)]);
    let mut engine = engine_for(track);

    engine.update_input(0.96, GuitarInput::default().strum_down());
    assert!(matches!(engine.strum_state(), StrumState::Waiting { .. }));
    engine.update_input(0.98, GuitarInput::frets(lane::YELLOW));

    assert_eq!(engine.stats().notes_hit, 1);
    assert_eq!(engine.stats().overstrums, 0);
}

#[test]
fn waiting_strum_hits_when_window_opens() {
    let sync = sync();
    let track = guitar_track(&sync, vec![RawNote::at(&sync, 960, 1)]);
    let mut engine = engine_for(track);

    engine.update_input(0.9, GuitarInput::frets(lane::GREEN).strum_down());
    assert_eq!(engine.stats().notes_hit, 0);
    engine.update_time(1.0);

    assert_eq!(engine.stats().notes_hit, 1);
    let hit = engine
        .take_events()
        .into_iter()
        .find_map(|e| match e {
            EngineEvent::NoteHit { time, .. } => Some(time),
            _ => None,
        })
        .unwrap();
    assert!((hit.seconds - 0.93).abs() < 1e-9);
}

#[test]
fn hitting_ahead_misses_skipped_notes() {
    let sync = sync();
    let track = guitar_track(&sync, vec![RawNote::at(&sync, 960, 1), RawNote::at(&sync, 1000, 2)]);
    let mut engine = engine_for(track);

    engine.update_input(1.03, GuitarInput::frets(lane::RED).strum_down());
    let stats = engine.stats();
    assert_eq!(stats.notes_missed, 1);
    assert_eq!(stats.notes_hit, 1);
    assert_eq!(stats.combo, 1);
    assert_eq!(stats.note_index, 2);
}

#[test]
fn releasing_near_sustain_end_completes_it() {
    let sync = sync();
    let track = guitar_track(
        &sync,
        vec![RawNote::at(&sync, 960, 1).with_sustain(sync.time_at_tick(1920))],
    );
    let mut engine = engine_for(track);
    strum(&mut engine, 1.0, lane::GREEN);

    engine.update_input(1.95, GuitarInput::default());
    let ended = engine.take_events().into_iter().find_map(|e| match e {
        EngineEvent::SustainEnded { completed, .. } => Some(completed),
        _ => None,
    });
    assert_eq!(ended, Some(true));
    assert!(engine.dead_sustains().is_empty());
}

#[test]
fn overdrive_doubles_note_points() {
    let sync = sync();
    let track = TrackBuilder::new(Instrument::Guitar, Difficulty::Expert, sync.clone())
        .notes([
            RawNote::at(&sync, 480, 1),
            RawNote::at(&sync, 960, 1),
            RawNote::at(&sync, 1440, 1),
        ])
        .overdrive(sync.time_at_tick(480), sync.time_at_tick(500))
        .overdrive(sync.time_at_tick(960), sync.time_at_tick(1000))
        .build()
        .unwrap();
    let mut engine = engine_for(track);
    strum(&mut engine, 0.5, lane::GREEN);
    strum(&mut engine, 1.0, lane::GREEN);
    assert!((engine.stats().overdrive_amount - 0.5).abs() < 1e-9);

    engine.update_input(1.2, GuitarInput::frets(lane::GREEN).overdrive());
    assert!(engine.stats().overdrive_active);
    strum(&mut engine, 1.5, lane::GREEN);

    assert_eq!(engine.stats().score, 50 + 50 + 100);
    assert!(engine.stats().overdrive_amount < 0.5);
}

#[test]
fn swap_through_engine_keeps_progress() {
    let sync = sync();
    let easy = TrackBuilder::new(Instrument::Guitar, Difficulty::Easy, sync.clone())
        .notes((0..4).map(|i| RawNote::at(&sync, 960 * (i + 1), 1)))
        .build()
        .unwrap();
    let expert = guitar_track(&sync, (0..8).map(|i| RawNote::at(&sync, 480 * (i + 1), 2)).collect());
    let mut engine = engine_for(easy);
    strum(&mut engine, 1.0, lane::GREEN);
    engine.update_time(1.2);

    engine.swap_track(expert);
    assert_eq!(engine.track().difficulty, Difficulty::Expert);
    assert_eq!(engine.stats().note_index, 1);
    assert_eq!(engine.track().notes[1].position.ticks, 1440);

    strum(&mut engine, 1.5, lane::RED);
    assert_eq!(engine.stats().combo, 2);
}

/// Green note at 1.0s held to 3.0s inside an overdrive phrase, optionally after
/// another green note at 0.5s in the same phrase.
fn overdrive_sustain_engine(sync: &Arc<SyncTrack>, lead_in: bool) -> GuitarEngine {
    let mut notes = vec![RawNote::at(sync, 960, 1).with_sustain(sync.time_at_tick(2880))];
    if lead_in {
        notes.insert(0, RawNote::at(sync, 480, 1));
    }
    let start = if lead_in { 480 } else { 960 };
    let track = TrackBuilder::new(Instrument::Guitar, Difficulty::Expert, sync.clone())
        .notes(notes)
        .overdrive(sync.time_at_tick(start), sync.time_at_tick(1000))
        .build()
        .unwrap();
    engine_for(track)
}

fn assert_meter(engine: &GuitarEngine, expected: f64) {
    let amount = engine.stats().overdrive_amount;
    assert!((amount - expected).abs() < 1e-6, "meter {amount}, expected {expected}");
}

#[test]
fn whammy_on_overdrive_sustain_fills_meter() {
    let sync = sync();
    let mut engine = overdrive_sustain_engine(&sync, false);
    strum(&mut engine, 1.0, lane::GREEN);
    assert_meter(&engine, 0.25);

    engine.update_input(2.0, GuitarInput::frets(lane::GREEN).whammy());
    assert!(engine.core().overdrive().whammy().is_some());
    engine.update_time(2.5);

    // One press buys 0.25s, half a beat at 1/30 per beat
    assert_meter(&engine, 0.25 + 0.5 / 30.0);
    assert!(engine.core().overdrive().whammy().is_none());
}

#[test]
fn releasing_whammy_stops_gain() {
    let sync = sync();
    let mut engine = overdrive_sustain_engine(&sync, false);
    strum(&mut engine, 1.0, lane::GREEN);

    engine.update_input(2.0, GuitarInput::frets(lane::GREEN).whammy());
    engine.update_input(2.1, GuitarInput::frets(lane::GREEN));
    assert!(engine.core().overdrive().whammy().is_none());
    assert!(engine.active_sustains()[0].whammy_start.is_none());
    engine.update_time(2.5);

    assert_meter(&engine, 0.25 + 0.2 / 30.0);
}

#[test]
fn sustain_end_closes_whammy_window() {
    let sync = sync();
    let mut engine = overdrive_sustain_engine(&sync, false);
    strum(&mut engine, 1.0, lane::GREEN);

    engine.update_input(2.9, GuitarInput::frets(lane::GREEN).whammy());
    assert_eq!(engine.core().overdrive().whammy().map(|w| w.end.ticks), Some(2880));
    engine.update_time(3.5);

    assert!(engine.active_sustains().is_empty());
    assert!(engine.core().overdrive().whammy().is_none());
    assert_meter(&engine, 0.25 + 0.2 / 30.0);
}

#[test]
fn missed_phrase_sustain_gives_no_whammy_gain() {
    let sync = sync();
    let mut engine = overdrive_sustain_engine(&sync, true);
    engine.update_time(0.7);
    assert_eq!(engine.stats().notes_missed, 1);
    assert!(!engine.track().overdrive_phrases[0].enabled);

    strum(&mut engine, 1.0, lane::GREEN);
    assert_eq!(engine.active_sustains().len(), 1);
    engine.update_input(2.0, GuitarInput::frets(lane::GREEN).whammy());
    assert!(engine.core().overdrive().whammy().is_none());
    engine.update_time(2.5);

    assert_meter(&engine, 0.0);
}
