//! Detector thresholds and the landmark table, loadable from JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::landmarks::LandmarkIndexTable;

/// Tuning for the gesture state machine.
///
/// Missing fields in a JSON document fall back to the defaults, so a config
/// file only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Eye aspect ratio below which the eyes count as closed.
    pub ear_close: f64,

    /// Mouth ratio above which a closed mouth opens.
    pub mouth_open_threshold: f64,

    /// Mouth ratio below which an open mouth closes.
    pub mouth_close_threshold: f64,

    /// Frames spent establishing the eyebrow baseline.
    pub calib_frames: u32,

    /// EMA coefficient while calibrating.
    pub ema_alpha_calib: f64,

    /// EMA coefficient once calibrated.
    pub ema_alpha_normal: f64,

    /// Multiple of the baseline a brow must exceed to count as raised.
    pub raise_pct: f64,

    /// Multiple of the baseline both brows must drop under to relax.
    pub raise_pct_hysteresis: f64,

    /// Per-frame rate at which the baseline follows the smoothed signal.
    pub baseline_drift_rate: f64,

    pub landmarks: LandmarkIndexTable,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            ear_close: 0.21,
            mouth_open_threshold: 0.030,
            mouth_close_threshold: 0.025,
            calib_frames: 12,
            ema_alpha_calib: 0.4,
            ema_alpha_normal: 0.25,
            raise_pct: 1.18,
            raise_pct_hysteresis: 1.12,
            baseline_drift_rate: 0.002,
            landmarks: LandmarkIndexTable::default(),
        }
    }
}

impl GestureConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check the ordering constraints the hysteresis logic relies on.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("ear_close", self.ear_close),
            ("mouth_open_threshold", self.mouth_open_threshold),
            ("mouth_close_threshold", self.mouth_close_threshold),
            ("ema_alpha_calib", self.ema_alpha_calib),
            ("ema_alpha_normal", self.ema_alpha_normal),
            ("raise_pct", self.raise_pct),
            ("raise_pct_hysteresis", self.raise_pct_hysteresis),
            ("baseline_drift_rate", self.baseline_drift_rate),
        ] {
            if !value.is_finite() {
                return Err(invalid(format!("{} must be finite, got {}", name, value)));
            }
        }
        if self.ear_close <= 0.0 {
            return Err(invalid(format!("ear_close must be positive, got {}", self.ear_close)));
        }
        if self.mouth_close_threshold > self.mouth_open_threshold {
            return Err(invalid(format!(
                "mouth_close_threshold ({}) must not exceed mouth_open_threshold ({})",
                self.mouth_close_threshold, self.mouth_open_threshold
            )));
        }
        if self.calib_frames == 0 {
            return Err(invalid("calib_frames must be at least 1".to_string()));
        }
        check_unit("ema_alpha_calib", self.ema_alpha_calib, false)?;
        check_unit("ema_alpha_normal", self.ema_alpha_normal, false)?;
        check_unit("baseline_drift_rate", self.baseline_drift_rate, true)?;
        if self.raise_pct_hysteresis > self.raise_pct {
            return Err(invalid(format!(
                "raise_pct_hysteresis ({}) must not exceed raise_pct ({})",
                self.raise_pct_hysteresis, self.raise_pct
            )));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> Error {
    Error::InvalidConfig(msg)
}

/// `value` must lie in `(0, 1]`, or `[0, 1]` when `allow_zero` is set.
fn check_unit(name: &str, value: f64, allow_zero: bool) -> Result<()> {
    let lower_ok = if allow_zero { value >= 0.0 } else { value > 0.0 };
    if lower_ok && value <= 1.0 {
        Ok(())
    } else {
        Err(invalid(format!("{} must be within (0, 1], got {}", name, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = GestureConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.calib_frames, 12);
        assert_eq!(config.landmarks, LandmarkIndexTable::face_mesh());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = GestureConfig::from_json_str(r#"{ "ear_close": 0.18, "calib_frames": 5 }"#)
            .unwrap();
        assert_eq!(config.ear_close, 0.18);
        assert_eq!(config.calib_frames, 5);
        assert_eq!(config.mouth_open_threshold, 0.030);
        assert_eq!(config.landmarks, LandmarkIndexTable::face_mesh());
    }

    #[test]
    fn inverted_mouth_band_is_rejected() {
        let err = GestureConfig::from_json_str(
            r#"{ "mouth_open_threshold": 0.02, "mouth_close_threshold": 0.03 }"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn out_of_range_alpha_is_rejected() {
        let config = GestureConfig {
            ema_alpha_normal: 1.5,
            ..GestureConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GestureConfig {
            baseline_drift_rate: 0.0,
            ..GestureConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_finite_thresholds_are_rejected() {
        for config in [
            GestureConfig {
                mouth_open_threshold: f64::NAN,
                ..GestureConfig::default()
            },
            GestureConfig {
                mouth_close_threshold: f64::NAN,
                ..GestureConfig::default()
            },
            GestureConfig {
                raise_pct: f64::INFINITY,
                ..GestureConfig::default()
            },
            GestureConfig {
                raise_pct_hysteresis: f64::NAN,
                ..GestureConfig::default()
            },
        ] {
            assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
        }
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let err = GestureConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }
}
