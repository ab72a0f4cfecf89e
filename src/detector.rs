//! Per-session gesture state machine.
//!
//! Turns the continuous per-frame signals into counted events:
//! - **Blink**: EAR dips under `ear_close` and comes back. Counted on the
//!   reopen edge so a long closure is one blink.
//! - **Mouth open**: two thresholds with a dead zone between them. Counted on
//!   the opening edge.
//! - **Brow raise**: the first `calib_frames` frames build a per-side
//!   baseline from a fast EMA. Afterwards a slower EMA is compared against
//!   the baseline with a relative hysteresis band; either brow going high
//!   raises, both brows must relax to return to normal. The baseline then
//!   drifts slowly toward the EMA.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GestureConfig;
use crate::error::Result;
use crate::signals::FrameSignals;

/// Lower bound on the brow baseline used in threshold comparisons.
const BASELINE_FLOOR: f64 = 1e-6;

/// Mutable per-session record. Only [`GestureDetector::process`] changes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub blinks: u64,
    pub mouth_opens: u64,
    pub brow_raises: u64,

    pub eye_closed: bool,
    pub mouth_open: bool,
    pub brow_high: bool,

    /// Frames seen while calibrating. Stops advancing once calibrated.
    pub frames_seen: u32,
    pub brow_baseline_left: f64,
    pub brow_baseline_right: f64,
    pub brow_ema_left: f64,
    pub brow_ema_right: f64,
    pub calibrated: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> Counts {
        Counts {
            blinks: self.blinks,
            mouth_opens: self.mouth_opens,
            brow_raises: self.brow_raises,
        }
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            eye: if self.eye_closed {
                EyeStatus::Closed
            } else {
                EyeStatus::Open
            },
            mouth: if self.mouth_open {
                MouthStatus::Open
            } else {
                MouthStatus::Closed
            },
            brow: if self.brow_high {
                BrowStatus::High
            } else if !self.calibrated {
                BrowStatus::Calibrating
            } else {
                BrowStatus::Normal
            },
        }
    }
}

/// Event counters of one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counts {
    pub blinks: u64,
    pub mouth_opens: u64,
    pub brow_raises: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EyeStatus {
    Open,
    Closed,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MouthStatus {
    Open,
    Closed,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowStatus {
    High,
    Normal,
    Calibrating,
    Unknown,
}

impl EyeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Unknown => "unknown",
        }
    }
}

impl MouthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Unknown => "unknown",
        }
    }
}

impl BrowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Normal => "normal",
            Self::Calibrating => "calibrating",
            Self::Unknown => "unknown",
        }
    }
}

/// Human-readable state of each feature after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub eye: EyeStatus,
    pub mouth: MouthStatus,
    pub brow: BrowStatus,
}

impl StatusSnapshot {
    /// Reported when no face was found in the frame.
    pub const fn unknown() -> Self {
        Self {
            eye: EyeStatus::Unknown,
            mouth: MouthStatus::Unknown,
            brow: BrowStatus::Unknown,
        }
    }
}

/// Applies the gesture rules of a [`GestureConfig`] to session states.
///
/// Holds no per-session data, so one detector serves every session.
#[derive(Debug, Clone, Default)]
pub struct GestureDetector {
    config: GestureConfig,
}

impl GestureDetector {
    /// Detector using `config` as given, without validation.
    pub fn new(config: GestureConfig) -> Self {
        Self { config }
    }

    /// Detector for a config that passes [`GestureConfig::validate`].
    pub fn try_new(config: GestureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Advance `state` by one frame and return the resulting status.
    ///
    /// Callers must not run two `process` calls on the same state at once;
    /// the store's per-session lock guarantees that.
    pub fn process(&self, state: &mut SessionState, signals: &FrameSignals) -> StatusSnapshot {
        self.update_eyes(state, signals.ear);
        self.update_mouth(state, signals.mouth_ratio);
        self.update_brows(state, signals.brow_left, signals.brow_right);
        state.status()
    }

    fn update_eyes(&self, state: &mut SessionState, ear: f64) {
        if ear < self.config.ear_close && !state.eye_closed {
            state.eye_closed = true;
        } else if ear >= self.config.ear_close && state.eye_closed {
            state.eye_closed = false;
            state.blinks += 1;
            debug!(blinks = state.blinks, ear, "blink");
        }
    }

    fn update_mouth(&self, state: &mut SessionState, ratio: f64) {
        if !state.mouth_open && ratio > self.config.mouth_open_threshold {
            state.mouth_open = true;
            state.mouth_opens += 1;
            debug!(mouth_opens = state.mouth_opens, ratio, "mouth opened");
        } else if state.mouth_open && ratio < self.config.mouth_close_threshold {
            state.mouth_open = false;
        }
    }

    fn update_brows(&self, state: &mut SessionState, left: f64, right: f64) {
        if !state.calibrated {
            self.calibrate_brows(state, left, right);
            return;
        }

        let alpha = self.config.ema_alpha_normal;
        state.brow_ema_left = ema(alpha, left, state.brow_ema_left);
        state.brow_ema_right = ema(alpha, right, state.brow_ema_right);

        let (left_high, left_low) = self.band(state.brow_ema_left, state.brow_baseline_left);
        let (right_high, right_low) = self.band(state.brow_ema_right, state.brow_baseline_right);

        if !state.brow_high && (left_high || right_high) {
            state.brow_high = true;
            state.brow_raises += 1;
            debug!(
                brow_raises = state.brow_raises,
                ema_left = state.brow_ema_left,
                ema_right = state.brow_ema_right,
                "brow raised"
            );
        } else if state.brow_high && left_low && right_low {
            state.brow_high = false;
        }

        let drift = self.config.baseline_drift_rate;
        state.brow_baseline_left = ema(drift, state.brow_ema_left, state.brow_baseline_left);
        state.brow_baseline_right = ema(drift, state.brow_ema_right, state.brow_baseline_right);
    }

    fn calibrate_brows(&self, state: &mut SessionState, left: f64, right: f64) {
        state.frames_seen += 1;
        if state.frames_seen == 1 {
            state.brow_ema_left = left;
            state.brow_ema_right = right;
        } else {
            let alpha = self.config.ema_alpha_calib;
            state.brow_ema_left = ema(alpha, left, state.brow_ema_left);
            state.brow_ema_right = ema(alpha, right, state.brow_ema_right);
        }

        if state.frames_seen >= self.config.calib_frames {
            state.brow_baseline_left = state.brow_ema_left;
            state.brow_baseline_right = state.brow_ema_right;
            state.calibrated = true;
            debug!(
                baseline_left = state.brow_baseline_left,
                baseline_right = state.brow_baseline_right,
                "brow calibration finished"
            );
        }
    }

    /// `(high, low)` flags of a smoothed brow value against its baseline.
    fn band(&self, value: f64, baseline: f64) -> (bool, bool) {
        let base = baseline.max(BASELINE_FLOOR);
        (
            value > base * self.config.raise_pct,
            value < base * self.config.raise_pct_hysteresis,
        )
    }
}

fn ema(alpha: f64, sample: f64, previous: f64) -> f64 {
    alpha * sample + (1.0 - alpha) * previous
}

#[cfg(test)]
mod tests {
    use super::*;

    const BROW: f64 = 0.1;

    fn signals(ear: f64, mouth: f64) -> FrameSignals {
        FrameSignals::new(ear, mouth, BROW, BROW)
    }

    fn calibrated_state(detector: &GestureDetector) -> SessionState {
        let mut state = SessionState::new();
        for _ in 0..detector.config().calib_frames {
            detector.process(&mut state, &signals(0.3, 0.0));
        }
        assert!(state.calibrated);
        state
    }

    #[test]
    fn fresh_state_is_zeroed() {
        let state = SessionState::new();
        assert_eq!(state.counts(), Counts::default());
        assert!(!state.calibrated);
        assert_eq!(state.frames_seen, 0);
        assert_eq!(state.status().brow, BrowStatus::Calibrating);
    }

    #[test]
    fn blink_counts_on_reopen_only() {
        let detector = GestureDetector::default();
        let mut state = SessionState::new();

        for _ in 0..4 {
            let status = detector.process(&mut state, &signals(0.1, 0.0));
            assert_eq!(status.eye, EyeStatus::Closed);
        }
        assert_eq!(state.blinks, 0);

        let status = detector.process(&mut state, &signals(0.3, 0.0));
        assert_eq!(status.eye, EyeStatus::Open);
        assert_eq!(state.blinks, 1);

        detector.process(&mut state, &signals(0.3, 0.0));
        assert_eq!(state.blinks, 1);
    }

    #[test]
    fn ear_exactly_at_threshold_counts_as_open() {
        let detector = GestureDetector::default();
        let mut state = SessionState::new();

        detector.process(&mut state, &signals(0.21, 0.0));
        assert!(!state.eye_closed);

        detector.process(&mut state, &signals(0.2, 0.0));
        detector.process(&mut state, &signals(0.21, 0.0));
        assert_eq!(state.blinks, 1);
    }

    #[test]
    fn mouth_dead_zone_holds_state() {
        let detector = GestureDetector::default();
        let mut state = SessionState::new();

        detector.process(&mut state, &signals(0.3, 0.04));
        assert_eq!(state.mouth_opens, 1);

        for ratio in [0.026, 0.029, 0.027, 0.028, 0.026] {
            let status = detector.process(&mut state, &signals(0.3, ratio));
            assert_eq!(status.mouth, MouthStatus::Open);
        }
        assert_eq!(state.mouth_opens, 1);

        let status = detector.process(&mut state, &signals(0.3, 0.024));
        assert_eq!(status.mouth, MouthStatus::Closed);

        // Below the open threshold while closed: nothing happens.
        detector.process(&mut state, &signals(0.3, 0.029));
        assert!(!state.mouth_open);
        assert_eq!(state.mouth_opens, 1);
    }

    #[test]
    fn calibration_blocks_raises() {
        let detector = GestureDetector::default();
        let mut state = SessionState::new();

        for i in 0..12u32 {
            let brow = if i % 2 == 0 { 0.1 } else { 0.5 };
            let status = detector.process(&mut state, &FrameSignals::new(0.3, 0.0, brow, brow));
            assert_eq!(state.brow_raises, 0);
            if i < 11 {
                assert_eq!(status.brow, BrowStatus::Calibrating);
            }
        }
        assert!(state.calibrated);
        assert_eq!(state.frames_seen, 12);
    }

    #[test]
    fn calibration_ema_starts_at_first_sample() {
        let detector = GestureDetector::default();
        let mut state = SessionState::new();

        detector.process(&mut state, &FrameSignals::new(0.3, 0.0, 0.2, 0.1));
        assert_eq!(state.brow_ema_left, 0.2);
        assert_eq!(state.brow_ema_right, 0.1);

        detector.process(&mut state, &FrameSignals::new(0.3, 0.0, 0.3, 0.1));
        assert!((state.brow_ema_left - (0.4 * 0.3 + 0.6 * 0.2)).abs() < 1e-12);
    }

    #[test]
    fn frames_seen_freezes_after_calibration() {
        let detector = GestureDetector::default();
        let mut state = calibrated_state(&detector);
        for _ in 0..30 {
            detector.process(&mut state, &signals(0.3, 0.0));
        }
        assert_eq!(state.frames_seen, 12);
        assert!(state.calibrated);
    }

    #[test]
    fn one_side_raises_both_must_relax() {
        let detector = GestureDetector::default();
        let mut state = calibrated_state(&detector);

        let mut raised_after = None;
        for i in 0..10 {
            let status =
                detector.process(&mut state, &FrameSignals::new(0.3, 0.0, BROW * 1.4, BROW));
            if status.brow == BrowStatus::High && raised_after.is_none() {
                raised_after = Some(i);
            }
        }
        assert!(raised_after.is_some());
        assert_eq!(state.brow_raises, 1);

        // Left relaxes, right goes up: still one raise, still high.
        for _ in 0..10 {
            detector.process(&mut state, &FrameSignals::new(0.3, 0.0, BROW, BROW * 1.4));
        }
        assert!(state.brow_high);
        assert_eq!(state.brow_raises, 1);

        for _ in 0..20 {
            detector.process(&mut state, &signals(0.3, 0.0));
        }
        assert!(!state.brow_high);
        assert_eq!(state.status().brow, BrowStatus::Normal);
    }

    #[test]
    fn baseline_drifts_toward_ema() {
        let detector = GestureDetector::default();
        let mut state = calibrated_state(&detector);
        let before = state.brow_baseline_left;

        // 1.1x stays inside the band, so only drift moves the baseline.
        for _ in 0..50 {
            detector.process(&mut state, &FrameSignals::new(0.3, 0.0, BROW * 1.1, BROW * 1.1));
        }
        assert!(!state.brow_high);
        assert!(state.brow_baseline_left > before);
        assert!(state.brow_baseline_left < BROW * 1.1);
    }

    #[test]
    fn zero_baseline_uses_floor() {
        let detector = GestureDetector::default();
        let mut state = SessionState::new();
        for _ in 0..12 {
            detector.process(&mut state, &FrameSignals::new(0.3, 0.0, 0.0, 0.0));
        }
        assert_eq!(state.brow_baseline_left, 0.0);

        // Tiny values under the floor never count as a raise.
        detector.process(&mut state, &FrameSignals::new(0.3, 0.0, 1e-7, 1e-7));
        assert_eq!(state.brow_raises, 0);

        for _ in 0..5 {
            detector.process(&mut state, &FrameSignals::new(0.3, 0.0, 0.01, 0.01));
        }
        assert_eq!(state.brow_raises, 1);
    }

    #[test]
    fn custom_config_changes_thresholds() {
        let detector = GestureDetector::new(GestureConfig {
            ear_close: 0.3,
            calib_frames: 1,
            ..GestureConfig::default()
        });
        let mut state = SessionState::new();

        detector.process(&mut state, &signals(0.25, 0.0));
        assert!(state.eye_closed);
        assert!(state.calibrated);
    }

    #[test]
    fn try_new_validates() {
        let bad = GestureConfig {
            raise_pct: f64::NAN,
            ..GestureConfig::default()
        };
        assert!(GestureDetector::try_new(bad).is_err());
        assert!(GestureDetector::try_new(GestureConfig::default()).is_ok());
    }

    #[test]
    fn labels_serialize_lowercase() {
        let snapshot = StatusSnapshot {
            eye: EyeStatus::Closed,
            mouth: MouthStatus::Open,
            brow: BrowStatus::Calibrating,
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"eye":"closed","mouth":"open","brow":"calibrating"}"#);
        assert_eq!(BrowStatus::Unknown.as_str(), "unknown");
    }
}
