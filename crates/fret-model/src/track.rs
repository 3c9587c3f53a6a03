use std::ops::Range;
use std::sync::Arc;

use crate::note::{Difficulty, Instrument, NoteGroup};
use crate::phrase::{HittablePhrase, Phrase, PhraseKind};
use crate::sustain::Sustain;
use crate::sync_track::SyncTrack;
use crate::time::DualTime;

/// A built, time-sorted instrument track.
///
/// Notes reference their sustains as contiguous ranges, and sustains are stored
/// in the same order as the notes that own them. A note without sustains points
/// at the index its sustains would occupy, keeping `sustain_index` sorted.
#[derive(Debug, Clone)]
pub struct Track {
    pub instrument: Instrument,
    pub difficulty: Difficulty,
    pub sync: Arc<SyncTrack>,
    pub notes: Vec<NoteGroup>,
    pub sustains: Vec<Sustain>,
    pub overdrive_phrases: Vec<HittablePhrase>,
    pub solo_phrases: Vec<HittablePhrase>,
    /// Trill, tremolo, BRE and face-off sections
    pub phrases: Vec<Phrase>,
}

impl Track {
    pub fn empty(instrument: Instrument, difficulty: Difficulty, sync: Arc<SyncTrack>) -> Self {
        Self {
            instrument,
            difficulty,
            sync,
            notes: Vec::new(),
            sustains: Vec::new(),
            overdrive_phrases: Vec::new(),
            solo_phrases: Vec::new(),
            phrases: Vec::new(),
        }
    }

    /// Start time of a sustain (the position of the note that owns it).
    pub fn sustain_start(&self, sustain_index: usize) -> DualTime {
        self.notes[self.sustain_owner(sustain_index)].position
    }

    /// Index of the note owning a sustain.
    pub fn sustain_owner(&self, sustain_index: usize) -> usize {
        self.notes
            .partition_point(|n| n.sustain_index + n.sustain_count <= sustain_index)
    }

    /// Indices of notes whose position lies in `[start, end)`.
    pub fn notes_in(&self, start: DualTime, end: DualTime) -> Range<usize> {
        let first = self.notes.partition_point(|n| n.position < start);
        let last = self.notes.partition_point(|n| n.position < end);
        first..last
    }

    /// End of the last note or sustain.
    pub fn end_time(&self) -> DualTime {
        let last_note = self.notes.last().map(|n| n.position);
        let last_sustain = self.sustains.iter().map(|s| s.end_time).max();
        match (last_note, last_sustain) {
            (Some(n), Some(s)) => n.max(s),
            (Some(n), None) => n,
            (None, Some(s)) => s,
            (None, None) => DualTime::ZERO,
        }
    }

    pub fn phrase_at(&self, kind: PhraseKind, time: DualTime) -> Option<&Phrase> {
        self.phrases
            .iter()
            .find(|p| p.kind == kind && p.contains(time))
    }

    pub fn phrases_of(&self, kind: PhraseKind) -> impl Iterator<Item = &Phrase> {
        self.phrases.iter().filter(move |p| p.kind == kind)
    }

    pub fn overdrive_phrase_at(&self, time: DualTime) -> Option<usize> {
        self.overdrive_phrases.iter().position(|p| p.contains(time))
    }

    pub fn solo_phrase_at(&self, time: DualTime) -> Option<usize> {
        self.solo_phrases.iter().position(|p| p.contains(time))
    }

    /// Re-derive the overdrive/solo attachment of notes in `range` (and their
    /// sustains) from phrase containment.
    pub fn resolve_phrase_indices(&mut self, range: Range<usize>) {
        for index in range {
            let position = self.notes[index].position;
            let overdrive = self.overdrive_phrase_at(position);
            let solo = self.solo_phrase_at(position);
            let note = &mut self.notes[index];
            note.overdrive_index = overdrive;
            note.solo_index = solo;
            for sustain in note.sustains() {
                self.sustains[sustain].overdrive_index = overdrive;
            }
        }
    }

    /// Recount `total_notes` of every overdrive and solo phrase from the notes
    /// that reference it. Hit counts are left alone.
    pub fn recount_phrase_notes(&mut self) {
        for phrase in self
            .overdrive_phrases
            .iter_mut()
            .chain(self.solo_phrases.iter_mut())
        {
            phrase.total_notes = 0;
        }
        for note in &self.notes {
            if let Some(p) = note.overdrive_index {
                self.overdrive_phrases[p].total_notes += 1;
            }
            if let Some(p) = note.solo_index {
                self.solo_phrases[p].total_notes += 1;
            }
        }
    }
}
