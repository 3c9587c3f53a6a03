use serde::{Deserialize, Serialize};

use crate::lane;
use crate::time::DualTime;

/// Instrument a track is played on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instrument {
    Guitar,
    Bass,
    Rhythm,
    Drums,
}

impl Instrument {
    pub fn is_drums(self) -> bool {
        self == Self::Drums
    }

    /// Mask of lanes a note on this instrument may use.
    pub fn valid_lanes(self) -> u16 {
        match self {
            Self::Drums => lane::KICK | lane::PADS,
            Self::Guitar | Self::Bass | Self::Rhythm => lane::OPEN | lane::FRETS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    /// The next harder difficulty, `None` at the top.
    pub fn harder(self) -> Option<Difficulty> {
        match self {
            Self::Easy => Some(Self::Medium),
            Self::Medium => Some(Self::Hard),
            Self::Hard => Some(Self::Expert),
            Self::Expert => None,
        }
    }
}

/// How a fretted note must be played.
///
/// `Natural` and `Forced` only appear in loader input; the track builder resolves
/// them to one of the three playable styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GuitarState {
    #[default]
    Natural,
    Forced,
    Strum,
    Hopo,
    Tap,
}

/// One chord event on the track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteGroup {
    pub position: DualTime,
    /// Lanes still to be played; cleared by the engine as they are hit
    pub lane_mask: u16,
    pub lane_count: u8,
    /// First sustain owned by this note
    pub sustain_index: usize,
    pub sustain_count: usize,
    pub overdrive_index: Option<usize>,
    pub solo_index: Option<usize>,
    pub guitar_state: GuitarState,
}

impl NoteGroup {
    pub fn new(position: DualTime, lane_mask: u16) -> Self {
        Self {
            position,
            lane_mask,
            lane_count: lane::count(lane_mask),
            sustain_index: 0,
            sustain_count: 0,
            overdrive_index: None,
            solo_index: None,
            guitar_state: GuitarState::Strum,
        }
    }

    /// Range of this note's sustains in the track's sustain array.
    pub fn sustains(&self) -> std::ops::Range<usize> {
        self.sustain_index..self.sustain_index + self.sustain_count
    }

    /// Open note: only the open/kick bit set.
    pub fn is_open(&self) -> bool {
        self.lane_mask == lane::OPEN
    }

    pub fn is_chord(&self) -> bool {
        self.lane_count > 1
    }

    /// Whether every lane has been hit.
    pub fn is_cleared(&self) -> bool {
        self.lane_mask == 0
    }

    /// Whether at least one lane has been hit.
    pub fn is_touched(&self) -> bool {
        lane::count(self.lane_mask) < self.lane_count
    }

    /// Fret-hittable without a strum at the given combo.
    pub fn is_fret_hittable(&self, combo: u32) -> bool {
        match self.guitar_state {
            GuitarState::Tap => true,
            GuitarState::Hopo => combo > 0,
            _ => false,
        }
    }
}
