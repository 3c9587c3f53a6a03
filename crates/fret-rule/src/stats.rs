use fret_model::DualTime;
use serde::{Deserialize, Serialize};

/// Running score state exposed to the host after each update.
///
/// `score` includes sustain points accrued but not yet committed, so it can be
/// shown every frame without waiting for a boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub score: u64,
    pub combo: u32,
    pub max_combo: u32,
    /// Base multiplier (overdrive doubling not applied)
    pub multiplier: u32,
    /// Next unjudged note
    pub note_index: usize,
    /// Next solo phrase that has not been scored
    pub solo_index: usize,
    pub current_time: DualTime,
    pub notes_hit: u32,
    pub notes_missed: u32,
    pub overstrums: u32,
    pub overhits: u32,
    /// Overdrive meter in `[0, 1]`
    pub overdrive_amount: f64,
    pub overdrive_active: bool,
    /// Committed sustain points (part of `score`)
    pub sustain_score: u64,
    pub solo_bonus: u64,
    pub bre_bonus: u64,
    /// Overdrive phrases completed
    pub phrases_completed: u32,
}

impl Default for EngineStats {
    fn default() -> Self {
        Self {
            score: 0,
            combo: 0,
            max_combo: 0,
            multiplier: 1,
            note_index: 0,
            solo_index: 0,
            current_time: DualTime::ZERO,
            notes_hit: 0,
            notes_missed: 0,
            overstrums: 0,
            overhits: 0,
            overdrive_amount: 0.0,
            overdrive_active: false,
            sustain_score: 0,
            solo_bonus: 0,
            bre_bonus: 0,
            phrases_completed: 0,
        }
    }
}
