use serde::{Deserialize, Serialize};

/// Hit window tolerances in seconds.
///
/// In static mode every note gets `max_window`. In dynamic mode the full window
/// shrinks to the distance between neighbouring notes, bounded by
/// `[min_window, max_window]`. The front/back ratio apportions the full window
/// around the note: `1.0` is symmetric, larger values favour early hits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct HitWindowSettings {
    pub max_window: f64,
    pub min_window: f64,
    pub is_dynamic: bool,
    pub front_to_back_ratio: f64,
}

impl Default for HitWindowSettings {
    fn default() -> Self {
        Self {
            max_window: 0.14,
            min_window: 0.14,
            is_dynamic: false,
            front_to_back_ratio: 1.0,
        }
    }
}

impl HitWindowSettings {
    /// Full window for a neighbour `distance` seconds away.
    pub fn full_window(&self, distance: f64) -> f64 {
        if self.is_dynamic {
            distance.clamp(self.min_window, self.max_window)
        } else {
            self.max_window
        }
    }

    /// Tolerance before the note, given the distance to the previous note.
    pub fn front_end(&self, distance: f64) -> f64 {
        self.full_window(distance) / 2.0 * self.ratio()
    }

    /// Tolerance after the note, given the distance to the next note.
    pub fn back_end(&self, distance: f64) -> f64 {
        let full = self.full_window(distance);
        full - full / 2.0 * self.ratio()
    }

    fn ratio(&self) -> f64 {
        self.front_to_back_ratio.clamp(0.0, 2.0)
    }

    pub(crate) fn validate(&mut self) {
        self.max_window = self.max_window.max(0.0);
        self.min_window = self.min_window.clamp(0.0, self.max_window);
        self.front_to_back_ratio = self.front_to_back_ratio.clamp(0.0, 2.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dynamic() -> HitWindowSettings {
        HitWindowSettings {
            max_window: 0.14,
            min_window: 0.06,
            is_dynamic: true,
            front_to_back_ratio: 1.0,
        }
    }

    #[test]
    fn static_ignores_distance() {
        let w = HitWindowSettings::default();
        assert_eq!(w.front_end(0.01), 0.07);
        assert_eq!(w.back_end(10.0), 0.07);
    }

    #[test]
    fn dynamic_clamps_to_bounds() {
        let w = dynamic();
        assert!((w.full_window(0.01) - 0.06).abs() < 1e-12);
        assert!((w.full_window(0.1) - 0.1).abs() < 1e-12);
        assert!((w.full_window(f64::INFINITY) - 0.14).abs() < 1e-12);
    }

    #[test]
    fn ratio_splits_window() {
        let w = HitWindowSettings {
            front_to_back_ratio: 1.5,
            ..HitWindowSettings::default()
        };
        assert!((w.front_end(1.0) - 0.105).abs() < 1e-12);
        assert!((w.back_end(1.0) - 0.035).abs() < 1e-12);
    }

    #[test]
    fn validate_fixes_inverted_bounds() {
        let mut w = HitWindowSettings {
            max_window: 0.1,
            min_window: 0.2,
            is_dynamic: true,
            front_to_back_ratio: 5.0,
        };
        w.validate();
        assert_eq!(w.min_window, 0.1);
        assert_eq!(w.front_to_back_ratio, 2.0);
    }
}
