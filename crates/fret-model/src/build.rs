//! Track construction from the chart loader's decoded collections.
//!
//! The builder groups per-lane notes into chords, resolves natural/forced guitar
//! styles, merges sustains sharing an end time, marks fret leniency, strips notes
//! inside Big Rock Endings and attaches phrase indices.

use std::sync::Arc;

use log::debug;

use crate::error::TrackBuildError;
use crate::lane;
use crate::note::{Difficulty, GuitarState, Instrument, NoteGroup};
use crate::phrase::{HittablePhrase, Phrase, PhraseKind};
use crate::sustain::Sustain;
use crate::sync_track::SyncTrack;
use crate::time::DualTime;
use crate::track::Track;

/// A single-lane note as decoded by the chart loader.
#[derive(Debug, Clone, PartialEq)]
pub struct RawNote {
    pub position: DualTime,
    pub lane: u8,
    /// End of the tail, if the note is held
    pub sustain_end: Option<DualTime>,
    pub state: GuitarState,
}

impl RawNote {
    pub fn new(position: DualTime, lane: u8) -> Self {
        Self {
            position,
            lane,
            sustain_end: None,
            state: GuitarState::Natural,
        }
    }

    /// Convenience constructor in ticks.
    pub fn at(sync: &SyncTrack, tick: i64, lane: u8) -> Self {
        Self::new(sync.time_at_tick(tick), lane)
    }

    pub fn with_sustain(mut self, end: DualTime) -> Self {
        self.sustain_end = Some(end);
        self
    }

    pub fn with_state(mut self, state: GuitarState) -> Self {
        self.state = state;
        self
    }
}

pub struct TrackBuilder {
    instrument: Instrument,
    difficulty: Difficulty,
    sync: Arc<SyncTrack>,
    notes: Vec<RawNote>,
    overdrive: Vec<(DualTime, DualTime)>,
    alternate_overdrive: Vec<(DualTime, DualTime)>,
    use_alternate_overdrive: bool,
    solos: Vec<(DualTime, DualTime)>,
    phrases: Vec<Phrase>,
    hopo_threshold: i64,
    sustain_cutoff: i64,
}

impl TrackBuilder {
    pub fn new(instrument: Instrument, difficulty: Difficulty, sync: Arc<SyncTrack>) -> Self {
        let resolution = sync.resolution() as i64;
        Self {
            instrument,
            difficulty,
            sync,
            notes: Vec::new(),
            overdrive: Vec::new(),
            alternate_overdrive: Vec::new(),
            use_alternate_overdrive: false,
            solos: Vec::new(),
            phrases: Vec::new(),
            // 170 ticks at 480 resolution
            hopo_threshold: resolution * 17 / 48,
            sustain_cutoff: resolution / 4,
        }
    }

    pub fn notes(mut self, notes: impl IntoIterator<Item = RawNote>) -> Self {
        self.notes.extend(notes);
        self
    }

    pub fn overdrive(mut self, start: DualTime, end: DualTime) -> Self {
        self.overdrive.push((start, end));
        self
    }

    /// Overdrive phrases from the chart's alternate overdrive track.
    pub fn alternate_overdrive(mut self, start: DualTime, end: DualTime) -> Self {
        self.alternate_overdrive.push((start, end));
        self
    }

    /// Pick the alternate overdrive phrases instead of the primary ones.
    pub fn use_alternate_overdrive(mut self, enabled: bool) -> Self {
        self.use_alternate_overdrive = enabled;
        self
    }

    pub fn solo(mut self, start: DualTime, end: DualTime) -> Self {
        self.solos.push((start, end));
        self
    }

    pub fn phrase(mut self, kind: PhraseKind, start: DualTime, end: DualTime) -> Self {
        self.phrases.push(Phrase {
            kind,
            start_time: start,
            end_time: end,
        });
        self
    }

    /// Maximum tick distance for a natural HOPO.
    pub fn hopo_threshold(mut self, ticks: i64) -> Self {
        self.hopo_threshold = ticks;
        self
    }

    /// Tails shorter than this many ticks are not sustains.
    pub fn sustain_cutoff(mut self, ticks: i64) -> Self {
        self.sustain_cutoff = ticks;
        self
    }

    pub fn build(self) -> Result<Track, TrackBuildError> {
        self.validate()?;

        let overdrive_source = if self.use_alternate_overdrive {
            &self.alternate_overdrive
        } else {
            &self.overdrive
        };
        let overdrive_phrases = to_hittable(overdrive_source, 0)?;
        let solo_phrases = to_hittable(&self.solos, overdrive_phrases.len())?;
        let mut phrases = self.phrases.clone();
        for (i, phrase) in phrases.iter().enumerate() {
            if phrase.end_time < phrase.start_time {
                return Err(TrackBuildError::InvertedPhrase { index: i });
            }
        }
        phrases.sort_by(|a, b| a.start_time.cmp(&b.start_time));

        let bre: Vec<&Phrase> = phrases
            .iter()
            .filter(|p| p.kind == PhraseKind::BigRockEnding)
            .collect();

        let groups = self.group_chords(&bre);
        let mut track = Track::empty(self.instrument, self.difficulty, self.sync.clone());
        track.overdrive_phrases = overdrive_phrases;
        track.solo_phrases = solo_phrases;
        track.phrases = phrases;

        for (i, group) in groups.iter().enumerate() {
            let mut note = NoteGroup::new(group.position, group.mask);
            note.guitar_state = if self.instrument.is_drums() {
                GuitarState::Strum
            } else {
                self.resolve_state(&groups, i)
            };
            note.sustain_index = track.sustains.len();
            if !self.instrument.is_drums() {
                let next_position = groups.get(i + 1).map(|g| g.position);
                let sustains = self.build_sustains(group, next_position);
                note.sustain_count = sustains.len();
                track.sustains.extend(sustains);
            }
            track.notes.push(note);
        }

        let count = track.notes.len();
        track.resolve_phrase_indices(0..count);
        track.recount_phrase_notes();

        debug!(
            "built {:?} {:?} track: {} notes, {} sustains, {} overdrive phrases, {} solos",
            track.instrument,
            track.difficulty,
            track.notes.len(),
            track.sustains.len(),
            track.overdrive_phrases.len(),
            track.solo_phrases.len()
        );
        Ok(track)
    }

    fn validate(&self) -> Result<(), TrackBuildError> {
        let valid = self.instrument.valid_lanes();
        let mut prev = DualTime::INACTIVE;
        for (index, raw) in self.notes.iter().enumerate() {
            if raw.position < prev {
                return Err(TrackBuildError::UnsortedNotes {
                    index,
                    ticks: raw.position.ticks,
                });
            }
            prev = raw.position;
            if raw.lane >= 16 || lane::bit(raw.lane) & valid == 0 {
                return Err(TrackBuildError::LaneOutOfRange {
                    index,
                    lane: raw.lane,
                    instrument: self.instrument,
                });
            }
            if let Some(end) = raw.sustain_end
                && end < raw.position
            {
                return Err(TrackBuildError::NegativeSustain {
                    index,
                    lane: raw.lane,
                });
            }
        }
        Ok(())
    }

    fn group_chords(&self, bre: &[&Phrase]) -> Vec<ChordGroup> {
        let mut groups: Vec<ChordGroup> = Vec::new();
        for raw in &self.notes {
            if bre.iter().any(|p| p.contains(raw.position)) {
                continue;
            }
            let tail = raw
                .sustain_end
                .filter(|end| end.ticks - raw.position.ticks >= self.sustain_cutoff);
            match groups.last_mut() {
                Some(group) if group.position.ticks == raw.position.ticks => {
                    group.mask |= lane::bit(raw.lane);
                    group.tails.push((raw.lane, tail));
                    if group.state == GuitarState::Natural {
                        group.state = raw.state;
                    }
                }
                _ => groups.push(ChordGroup {
                    position: raw.position,
                    mask: lane::bit(raw.lane),
                    state: raw.state,
                    tails: vec![(raw.lane, tail)],
                }),
            }
        }
        groups
    }

    fn resolve_state(&self, groups: &[ChordGroup], index: usize) -> GuitarState {
        let group = &groups[index];
        let natural = || {
            let Some(prev) = index.checked_sub(1).map(|i| &groups[i]) else {
                return GuitarState::Strum;
            };
            let close = group.position.ticks - prev.position.ticks <= self.hopo_threshold;
            if close && lane::count(group.mask) == 1 && group.mask != prev.mask {
                GuitarState::Hopo
            } else {
                GuitarState::Strum
            }
        };
        match group.state {
            GuitarState::Natural => natural(),
            GuitarState::Forced => match natural() {
                GuitarState::Hopo => GuitarState::Strum,
                _ => GuitarState::Hopo,
            },
            explicit => explicit,
        }
    }

    fn build_sustains(&self, group: &ChordGroup, next: Option<DualTime>) -> Vec<Sustain> {
        let mut sustains: Vec<Sustain> = Vec::new();
        for &(lane, tail) in &group.tails {
            let Some(end) = tail else { continue };
            match sustains.iter_mut().find(|s| s.end_time.ticks == end.ticks) {
                Some(sustain) => {
                    sustain.lane_mask |= lane::bit(lane);
                    sustain.lane_count = lane::count(sustain.lane_mask);
                }
                None => sustains.push(Sustain::new(end, lane::bit(lane))),
            }
        }
        // Disjoint lengths inside one chord, or some lanes not sustained at all
        let sustained: u16 = sustains.iter().fold(0, |acc, s| acc | s.lane_mask);
        let disjoint = sustains.len() > 1 || (!sustains.is_empty() && sustained != group.mask);
        for sustain in &mut sustains {
            let overlaps_next = next.is_some_and(|n| sustain.end_time > n);
            sustain.has_fret_leniency = disjoint || overlaps_next;
        }
        sustains.sort_by(|a, b| a.end_time.cmp(&b.end_time));
        sustains
    }
}

struct ChordGroup {
    position: DualTime,
    mask: u16,
    state: GuitarState,
    tails: Vec<(u8, Option<DualTime>)>,
}

fn to_hittable(
    ranges: &[(DualTime, DualTime)],
    index_offset: usize,
) -> Result<Vec<HittablePhrase>, TrackBuildError> {
    let mut phrases = Vec::with_capacity(ranges.len());
    for (i, &(start, end)) in ranges.iter().enumerate() {
        if end < start {
            return Err(TrackBuildError::InvertedPhrase {
                index: index_offset + i,
            });
        }
        phrases.push(HittablePhrase::new(start, end));
    }
    phrases.sort_by(|a, b| a.start_time.cmp(&b.start_time));
    Ok(phrases)
}
