use serde::{Deserialize, Serialize};

use crate::time::DualTime;

/// A phrase whose notes are counted (overdrive or solo).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HittablePhrase {
    pub start_time: DualTime,
    pub end_time: DualTime,
    pub hit_count: u32,
    pub total_notes: u32,
    /// Cleared once a note of the phrase is missed; never set again
    pub enabled: bool,
}

impl HittablePhrase {
    pub fn new(start_time: DualTime, end_time: DualTime) -> Self {
        Self {
            start_time,
            end_time,
            hit_count: 0,
            total_notes: 0,
            enabled: true,
        }
    }

    pub fn contains(&self, time: DualTime) -> bool {
        self.start_time <= time && time < self.end_time
    }

    pub fn is_complete(&self) -> bool {
        self.enabled && self.total_notes > 0 && self.hit_count == self.total_notes
    }

    /// Void credit for this phrase instance.
    pub fn disable(&mut self) {
        self.enabled = false;
    }
}

/// Phrase kinds that are not note-counted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhraseKind {
    Trill,
    Tremolo,
    BigRockEnding,
    /// Face-off section assigned to one player
    FaceOff { player: u8 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phrase {
    pub kind: PhraseKind,
    pub start_time: DualTime,
    pub end_time: DualTime,
}

impl Phrase {
    pub fn contains(&self, time: DualTime) -> bool {
        self.start_time <= time && time < self.end_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(ticks: i64) -> DualTime {
        DualTime::new(ticks, ticks as f64 / 960.0)
    }

    #[test]
    fn completion_requires_enabled_and_all_hit() {
        let mut phrase = HittablePhrase::new(t(0), t(960));
        phrase.total_notes = 2;
        phrase.hit_count = 2;
        assert!(phrase.is_complete());
        phrase.disable();
        assert!(!phrase.is_complete());
    }

    #[test]
    fn empty_phrase_never_completes() {
        let phrase = HittablePhrase::new(t(0), t(960));
        assert!(!phrase.is_complete());
    }

    #[test]
    fn contains_is_half_open() {
        let phrase = Phrase {
            kind: PhraseKind::Trill,
            start_time: t(0),
            end_time: t(960),
        };
        assert!(phrase.contains(t(0)));
        assert!(!phrase.contains(t(960)));
    }
}
