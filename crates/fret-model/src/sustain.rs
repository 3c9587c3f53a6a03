use serde::{Deserialize, Serialize};

use crate::time::DualTime;

/// Lifecycle of a sustain as seen by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SustainState {
    #[default]
    Pending,
    Active,
    Completed,
    Dropped,
}

/// A held tail attached to a note. Its start is the owning note's position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sustain {
    pub end_time: DualTime,
    pub lane_mask: u16,
    pub lane_count: u8,
    /// Input may include frets beyond the sustain's own lanes
    pub has_fret_leniency: bool,
    pub overdrive_index: Option<usize>,
    pub state: SustainState,
}

impl Sustain {
    pub fn new(end_time: DualTime, lane_mask: u16) -> Self {
        Self {
            end_time,
            lane_mask,
            lane_count: crate::lane::count(lane_mask),
            has_fret_leniency: false,
            overdrive_index: None,
            state: SustainState::Pending,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, SustainState::Completed | SustainState::Dropped)
    }
}
