// Modifier foundation types
//
// Defines the Modifier set, the TrackModifier trait, and the pre-play
// application order.

use fret_model::Track;
use serde::{Deserialize, Serialize};

use crate::double_notes::DoubleNotesModifier;
use crate::forcing::ForcingModifier;
use crate::no_kicks::NoKicksModifier;
use crate::note_shuffle::NoteShuffleModifier;

/// A single gameplay modifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    AllStrums,
    AllHopos,
    AllTaps,
    HoposToTaps,
    TapsToHopos,
    DoubleNotes,
    NoteShuffle,
    NoKicks,
}

impl Modifier {
    pub const ALL: [Modifier; 8] = [
        Self::AllStrums,
        Self::AllHopos,
        Self::AllTaps,
        Self::HoposToTaps,
        Self::TapsToHopos,
        Self::DoubleNotes,
        Self::NoteShuffle,
        Self::NoKicks,
    ];

    fn bit(self) -> u16 {
        1 << self as u16
    }
}

/// Set of enabled modifiers, serialized as its bit mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Modifiers(u16);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);

    pub fn contains(self, modifier: Modifier) -> bool {
        self.0 & modifier.bit() != 0
    }

    pub fn insert(&mut self, modifier: Modifier) {
        self.0 |= modifier.bit();
    }

    pub fn remove(&mut self, modifier: Modifier) {
        self.0 &= !modifier.bit();
    }

    pub fn with(mut self, modifier: Modifier) -> Self {
        self.insert(modifier);
        self
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Modifier> {
        Modifier::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

impl FromIterator<Modifier> for Modifiers {
    fn from_iter<I: IntoIterator<Item = Modifier>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Modifiers::NONE, |set, modifier| set.with(modifier))
    }
}

/// A transform applied to a built track.
pub trait TrackModifier {
    /// Apply this modification to the track (in-place).
    fn modify(&mut self, track: &mut Track);
}

/// Apply a modifier set before play.
///
/// Order: strum/HOPO/tap forcing (only the highest-precedence one), no-kicks,
/// note shuffle, then double notes. `seed` drives the shuffle.
pub fn apply_modifiers(track: &mut Track, modifiers: Modifiers, seed: u64) {
    if let Some(mut forcing) = ForcingModifier::from_modifiers(modifiers) {
        forcing.modify(track);
    }
    if modifiers.contains(Modifier::NoKicks) {
        NoKicksModifier.modify(track);
    }
    if modifiers.contains(Modifier::NoteShuffle) {
        NoteShuffleModifier::new(seed).modify(track);
    }
    if modifiers.contains(Modifier::DoubleNotes) {
        DoubleNotesModifier.modify(track);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_operations() {
        let mut set = Modifiers::NONE.with(Modifier::AllTaps);
        assert!(set.contains(Modifier::AllTaps));
        assert!(!set.contains(Modifier::NoKicks));
        set.insert(Modifier::NoKicks);
        set.remove(Modifier::AllTaps);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Modifier::NoKicks]);
    }

    #[test]
    fn serializes_as_mask() {
        let set: Modifiers = [Modifier::AllStrums, Modifier::NoteShuffle].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "65");
        let back: Modifiers = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
