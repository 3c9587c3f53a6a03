use std::ops::Range;

use fret_model::{DualTime, SustainState, Track};
use log::warn;

/// Replace the live notes in `[start, end)` with the alternate track's notes for
/// the same span.
///
/// Notes before `cursor` are never replaced, nor is anything at or before the
/// last of them. Sustains reaching into the spliced range from before, or out of
/// it past the next live note, are cut at that note. Returns the range of spliced
/// notes in the live track; nothing changes when the alternate span is empty.
pub(crate) fn splice_notes(
    live: &mut Track,
    alternate: &Track,
    start: DualTime,
    end: DualTime,
    cursor: usize,
) -> Range<usize> {
    let first = cursor.max(live.notes.partition_point(|n| n.position < start));
    let last = first.max(live.notes.partition_point(|n| n.position < end));
    let floor = first.checked_sub(1).map(|i| live.notes[i].position);

    let alt_first = alternate
        .notes
        .partition_point(|n| n.position < start || floor.is_some_and(|f| n.position <= f));
    let alt_last = alt_first.max(alternate.notes.partition_point(|n| n.position < end));
    if alt_first == alt_last {
        warn!(
            "no alternate notes between {:.3}s and {:.3}s",
            start.seconds, end.seconds
        );
        return first..first;
    }

    let sustain_at = |track: &Track, index: usize| {
        track
            .notes
            .get(index)
            .map_or(track.sustains.len(), |n| n.sustain_index)
    };
    let (live_s_first, live_s_last) = (sustain_at(live, first), sustain_at(live, last));
    let (alt_s_first, alt_s_last) = (sustain_at(alternate, alt_first), sustain_at(alternate, alt_last));

    let spliced_notes = alternate.notes[alt_first..alt_last].iter().map(|n| {
        let mut note = n.clone();
        note.sustain_index = note.sustain_index - alt_s_first + live_s_first;
        note
    });
    live.notes.splice(first..last, spliced_notes);
    let spliced_sustains = alternate.sustains[alt_s_first..alt_s_last].iter().map(|s| {
        let mut sustain = s.clone();
        sustain.state = SustainState::Pending;
        sustain
    });
    live.sustains.splice(live_s_first..live_s_last, spliced_sustains);

    let new_last = first + (alt_last - alt_first);
    let removed = live_s_last - live_s_first;
    let added = alt_s_last - alt_s_first;
    for note in &mut live.notes[new_last..] {
        note.sustain_index = note.sustain_index + added - removed;
    }

    let entry = live.notes[first].position;
    for sustain in &mut live.sustains[..live_s_first] {
        if sustain.end_time > entry {
            sustain.end_time = entry;
        }
    }
    if let Some(exit) = live.notes.get(new_last).map(|n| n.position) {
        for sustain in &mut live.sustains[live_s_first..live_s_first + added] {
            if sustain.end_time > exit {
                sustain.end_time = exit;
            }
        }
    }

    live.resolve_phrase_indices(first..new_last);
    live.recount_phrase_notes();
    first..new_last
}
