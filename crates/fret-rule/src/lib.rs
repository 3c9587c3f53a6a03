// Note judging, sustain scoring, overdrive, and mid-song track swaps

mod drums_engine;
mod engine;
mod guitar_engine;
mod hit_window;
mod overdrive;
mod parameters;
mod stats;
mod sustain_tracker;
mod track_swap;

pub use drums_engine::{DrumsEngine, DrumsInput};
pub use engine::{Engine, EngineCore, EngineEvent};
pub use guitar_engine::{GuitarEngine, GuitarInput, StrumDirection, StrumState};
pub use hit_window::HitWindowSettings;
pub use overdrive::{OverdriveTracker, WhammyWindow};
pub use parameters::{DrumsParameters, EngineParameters, GuitarParameters, OverdriveParameters};
pub use stats::EngineStats;
pub use sustain_tracker::{ActiveSustain, DeadSustain, SustainRate, SustainTracker};

/// Points per lane of a hit guitar/bass note, before the multiplier.
pub const POINTS_PER_NOTE: u32 = 50;

/// Points per hit drum pad, before the multiplier.
pub const POINTS_PER_DRUM_NOTE: u32 = 25;

/// Points per held beat per sustain lane, before the multiplier.
pub const POINTS_PER_BEAT: u32 = 25;

/// Combo needed for each multiplier step.
pub const MULTIPLIER_THRESHOLD: u32 = 10;

pub const DEFAULT_MAX_MULTIPLIER: u32 = 4;
pub const BASS_MAX_MULTIPLIER: u32 = 6;

pub const SOLO_POINTS_PER_NOTE: u32 = 100;
pub const BRE_POINTS_PER_HIT: u32 = 150;
