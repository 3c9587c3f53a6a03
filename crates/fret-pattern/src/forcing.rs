use fret_model::{GuitarState, Track};

use crate::modifier::{Modifier, Modifiers, TrackModifier};

/// Rewrites how fretted notes must be played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcingModifier {
    AllStrums,
    AllHopos,
    AllTaps,
    HoposToTaps,
    TapsToHopos,
}

impl ForcingModifier {
    /// Pick the forcing to apply from a modifier set.
    ///
    /// Only one applies: `AllStrums` > `AllHopos` > `AllTaps` > `HoposToTaps` >
    /// `TapsToHopos`.
    pub fn from_modifiers(modifiers: Modifiers) -> Option<Self> {
        [
            (Modifier::AllStrums, Self::AllStrums),
            (Modifier::AllHopos, Self::AllHopos),
            (Modifier::AllTaps, Self::AllTaps),
            (Modifier::HoposToTaps, Self::HoposToTaps),
            (Modifier::TapsToHopos, Self::TapsToHopos),
        ]
        .into_iter()
        .find(|(modifier, _)| modifiers.contains(*modifier))
        .map(|(_, forcing)| forcing)
    }

    fn convert(self, state: GuitarState) -> GuitarState {
        match (self, state) {
            (Self::AllStrums, _) => GuitarState::Strum,
            (Self::AllHopos, _) => GuitarState::Hopo,
            (Self::AllTaps, _) => GuitarState::Tap,
            (Self::HoposToTaps, GuitarState::Hopo) => GuitarState::Tap,
            (Self::TapsToHopos, GuitarState::Tap) => GuitarState::Hopo,
            (_, state) => state,
        }
    }
}

impl TrackModifier for ForcingModifier {
    fn modify(&mut self, track: &mut Track) {
        if track.instrument.is_drums() {
            return;
        }
        for note in &mut track.notes {
            note.guitar_state = self.convert(note.guitar_state);
        }
    }
}
