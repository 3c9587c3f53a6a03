// Pre-play track modifiers (forcing, shuffle, double notes, no kicks)
// and battle-mode attacks on a live engine

pub mod battle;
pub mod double_notes;
pub mod forcing;
pub mod modifier;
pub mod no_kicks;
pub mod note_shuffle;
mod splice;

pub use battle::{BattleController, BattleError, LENGTH_OF_EVENT, TRANSFORMATION_SPACING};
pub use double_notes::{DoubleNotesModifier, double_notes};
pub use forcing::ForcingModifier;
pub use modifier::{Modifier, Modifiers, TrackModifier, apply_modifiers};
pub use no_kicks::NoKicksModifier;
pub use note_shuffle::NoteShuffleModifier;
