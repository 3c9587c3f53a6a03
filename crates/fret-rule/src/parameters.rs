use std::path::Path;

use anyhow::{Context, Result};
use fret_model::Instrument;
use serde::{Deserialize, Serialize};

use crate::hit_window::HitWindowSettings;
use crate::{
    BASS_MAX_MULTIPLIER, BRE_POINTS_PER_HIT, DEFAULT_MAX_MULTIPLIER, MULTIPLIER_THRESHOLD,
    POINTS_PER_BEAT, POINTS_PER_DRUM_NOTE, POINTS_PER_NOTE, SOLO_POINTS_PER_NOTE,
};

/// Overdrive meter and whammy tuning. Gains and drains are fractions of a full
/// meter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct OverdriveParameters {
    pub phrase_gain: f64,
    pub activation_threshold: f64,
    pub drain_per_beat: f64,
    pub whammy_gain_per_beat: f64,
    /// Seconds of gain a single whammy press buys
    pub whammy_time: f64,
}

impl Default for OverdriveParameters {
    fn default() -> Self {
        Self {
            phrase_gain: 0.25,
            activation_threshold: 0.5,
            drain_per_beat: 1.0 / 32.0,
            whammy_gain_per_beat: 1.0 / 30.0,
            whammy_time: 0.25,
        }
    }
}

/// Strum/hopo timing for fretted instruments, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct GuitarParameters {
    /// After a fret-hit hopo/tap, a strum within this time is absorbed
    pub hopo_leniency: f64,
    /// How long a strum waits for frets before it becomes an overstrum
    pub strum_leniency: f64,
    /// Waiting time used when the next note is fret-hittable
    pub strum_leniency_small: f64,
    /// Releasing a sustain this close to its end counts as completing it
    pub sustain_drop_leniency: f64,
}

impl Default for GuitarParameters {
    fn default() -> Self {
        Self {
            hopo_leniency: 0.08,
            strum_leniency: 0.05,
            strum_leniency_small: 0.025,
            sustain_drop_leniency: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct DrumsParameters {
    /// Pad hits outside every note window break combo
    pub overhit_penalty: bool,
}

/// Everything the judging engines are tuned by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct EngineParameters {
    pub hit_window: HitWindowSettings,
    pub multiplier_threshold: u32,
    pub max_multiplier: u32,
    pub points_per_note: u32,
    pub points_per_beat: u32,
    pub solo_points_per_note: u32,
    pub perfect_solo_multiplier: f64,
    pub bre_points_per_hit: u32,
    /// Minimum seconds between two counted BRE hits on the same lane
    pub bre_lane_cooldown: f64,
    pub overdrive: OverdriveParameters,
    pub guitar: GuitarParameters,
    pub drums: DrumsParameters,
}

impl Default for EngineParameters {
    fn default() -> Self {
        Self {
            hit_window: HitWindowSettings::default(),
            multiplier_threshold: MULTIPLIER_THRESHOLD,
            max_multiplier: DEFAULT_MAX_MULTIPLIER,
            points_per_note: POINTS_PER_NOTE,
            points_per_beat: POINTS_PER_BEAT,
            solo_points_per_note: SOLO_POINTS_PER_NOTE,
            perfect_solo_multiplier: 1.5,
            bre_points_per_hit: BRE_POINTS_PER_HIT,
            bre_lane_cooldown: 0.1,
            overdrive: OverdriveParameters::default(),
            guitar: GuitarParameters::default(),
            drums: DrumsParameters::default(),
        }
    }
}

impl EngineParameters {
    /// Defaults tuned for an instrument.
    pub fn for_instrument(instrument: Instrument) -> Self {
        let mut params = Self::default();
        match instrument {
            Instrument::Bass => params.max_multiplier = BASS_MAX_MULTIPLIER,
            Instrument::Drums => {
                params.points_per_note = POINTS_PER_DRUM_NOTE;
                params.hit_window = HitWindowSettings {
                    max_window: 0.14,
                    min_window: 0.08,
                    is_dynamic: true,
                    front_to_back_ratio: 1.0,
                };
            }
            Instrument::Guitar | Instrument::Rhythm => {}
        }
        params
    }

    /// Parse parameters from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut params: EngineParameters =
            serde_json::from_str(json).context("invalid engine parameters")?;
        params.validate();
        Ok(params)
    }

    /// Read parameters from a JSON file.
    pub fn read(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&data).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Write parameters to a JSON file.
    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Clamp out-of-range values.
    pub fn validate(&mut self) {
        self.hit_window.validate();
        self.multiplier_threshold = self.multiplier_threshold.max(1);
        self.max_multiplier = self.max_multiplier.max(1);
        self.perfect_solo_multiplier = self.perfect_solo_multiplier.max(1.0);
        self.bre_lane_cooldown = self.bre_lane_cooldown.max(0.0);

        let od = &mut self.overdrive;
        od.phrase_gain = od.phrase_gain.clamp(0.0, 1.0);
        od.activation_threshold = od.activation_threshold.clamp(0.0, 1.0);
        od.drain_per_beat = od.drain_per_beat.max(0.0);
        od.whammy_gain_per_beat = od.whammy_gain_per_beat.max(0.0);
        od.whammy_time = od.whammy_time.max(0.0);

        let g = &mut self.guitar;
        g.hopo_leniency = g.hopo_leniency.max(0.0);
        g.strum_leniency = g.strum_leniency.max(0.0);
        g.strum_leniency_small = g.strum_leniency_small.clamp(0.0, g.strum_leniency);
        g.sustain_drop_leniency = g.sustain_drop_leniency.max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bass_has_higher_multiplier_cap() {
        assert_eq!(EngineParameters::for_instrument(Instrument::Guitar).max_multiplier, 4);
        assert_eq!(EngineParameters::for_instrument(Instrument::Bass).max_multiplier, 6);
    }

    #[test]
    fn drums_defaults() {
        let params = EngineParameters::for_instrument(Instrument::Drums);
        assert_eq!(params.points_per_note, 25);
        assert!(params.hit_window.is_dynamic);
    }

    #[test]
    fn from_json_fills_missing_fields() {
        let params = EngineParameters::from_json(
            r#"{"maxMultiplier": 6, "guitar": {"strumLeniency": 0.07}}"#,
        )
        .unwrap();
        assert_eq!(params.max_multiplier, 6);
        assert_eq!(params.guitar.strum_leniency, 0.07);
        assert_eq!(params.guitar.hopo_leniency, 0.08);
        assert_eq!(params.points_per_note, 50);
    }

    #[test]
    fn from_json_clamps() {
        let params = EngineParameters::from_json(
            r#"{"multiplierThreshold": 0, "overdrive": {"phraseGain": 3.0}}"#,
        )
        .unwrap();
        assert_eq!(params.multiplier_threshold, 1);
        assert_eq!(params.overdrive.phrase_gain, 1.0);
    }

    #[test]
    fn from_json_reports_errors() {
        let err = EngineParameters::from_json("{not json").unwrap_err();
        assert!(err.to_string().contains("invalid engine parameters"));
    }

    #[test]
    fn read_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        let params = EngineParameters::for_instrument(Instrument::Bass);
        params.write(&path).unwrap();
        let back = EngineParameters::read(&path).unwrap();
        assert_eq!(back.max_multiplier, 6);
        assert_eq!(back.multiplier_threshold, params.multiplier_threshold);
        assert!((back.guitar.strum_leniency - params.guitar.strum_leniency).abs() < 1e-12);
    }
}
