// Dual-domain time, tempo map, and the note/sustain/phrase track model

mod build;
mod error;
pub mod lane;
mod note;
mod phrase;
mod sustain;
mod sync_track;
mod time;
mod track;

pub use build::{RawNote, TrackBuilder};
pub use error::TrackBuildError;
pub use note::{Difficulty, GuitarState, Instrument, NoteGroup};
pub use phrase::{HittablePhrase, Phrase, PhraseKind};
pub use sustain::{Sustain, SustainState};
pub use sync_track::{Beatline, BeatlineKind, SyncTrack, TempoChange};
pub use time::DualTime;
pub use track::Track;
