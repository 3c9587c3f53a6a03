use thiserror::Error;

use crate::note::Instrument;

/// Reasons a chart's decoded data cannot become a [`Track`](crate::Track).
///
/// The loader is expected to validate ranges already; these surface the cases it
/// missed as explicit results instead of silently building a broken track.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrackBuildError {
    #[error("tick resolution must be non-zero")]
    ZeroResolution,

    #[error("invalid tempo {bpm} BPM at tick {ticks}")]
    InvalidTempo { ticks: i64, bpm: f64 },

    #[error("tempo change at tick {ticks} is out of order")]
    UnsortedTempo { ticks: i64 },

    #[error("beatline at tick {ticks} is out of order")]
    UnsortedBeatline { ticks: i64 },

    #[error("note {index} at tick {ticks} is out of order")]
    UnsortedNotes { index: usize, ticks: i64 },

    #[error("lane {lane} of note {index} is not valid for {instrument:?}")]
    LaneOutOfRange {
        index: usize,
        lane: u8,
        instrument: Instrument,
    },

    #[error("sustain on lane {lane} of note {index} ends before it starts")]
    NegativeSustain { index: usize, lane: u8 },

    #[error("phrase {index} ends before it starts")]
    InvertedPhrase { index: usize },
}
