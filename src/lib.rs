//! # face-gestures
//!
//! Counts facial gestures from per-frame landmark sets.
//!
//! This crate provides:
//! - **Signals**: eye aspect ratio, mouth opening and eyebrow-to-eyelid
//!   ratios computed from one frame's landmarks
//! - **Detection**: a per-session state machine turning those signals into
//!   debounced blink, mouth-open and eyebrow-raise events
//! - **Sessions**: a concurrent store keeping independent calibration and
//!   counters per session id
//!
//! Landmark detection itself is out of scope: feed in the points produced by
//! a face-mesh provider (MediaPipe FaceMesh indexing by default).
//!
//! ## Pipeline
//!
//! 1. Build a [`LandmarkFrame`] from pixel (or normalized) landmarks; the
//!    face scale defaults to the landmarks' bounding-box diagonal
//! 2. [`FrameSignals::extract`] computes the scale-invariant ratios
//! 3. [`GestureDetector::process`] advances the session state:
//!    - blinks count when the eyes reopen
//!    - mouth opens count on the opening edge of a two-threshold band
//!    - brow raises count after a calibration phase, against a slowly
//!      drifting baseline
//! 4. [`GestureCounter`] does all of the above per session id
//!
//! ## Quick Start
//!
//! ```rust
//! use face_gestures::{FrameSignals, GestureCounter};
//!
//! let counter = GestureCounter::default();
//!
//! // Eyes closed, then open again: one blink.
//! counter.process_signals("user-1", &FrameSignals::new(0.15, 0.0, 0.1, 0.1), Vec::new());
//! let report = counter.process_signals("user-1", &FrameSignals::new(0.30, 0.0, 0.1, 0.1), Vec::new());
//!
//! assert_eq!(report.counts.blinks, 1);
//! assert_eq!(report.states.brow.as_str(), "calibrating");
//! ```
//!
//! With landmarks from a provider:
//!
//! ```rust
//! use face_gestures::{GestureCounter, LandmarkFrame, Point};
//!
//! let counter = GestureCounter::default();
//!
//! // `None` when the provider found no face: nothing changes.
//! let report = counter.process_frame("user-1", None).unwrap();
//! assert_eq!(report.counts.blinks, 0);
//!
//! // A full 478-point mesh in [0,1] coordinates for a 640x480 image.
//! let mesh = vec![Point::new(0.5, 0.5); 478];
//! let frame = LandmarkFrame::from_normalized(&mesh, 640, 480);
//! let report = counter.process_frame("user-1", Some(&frame)).unwrap();
//! assert_eq!(report.states.eye.as_str(), "closed");
//! ```

mod config;
mod counter;
mod detector;
mod error;
mod landmarks;
mod signals;
mod store;
mod types;

pub use config::GestureConfig;
pub use counter::{FrameReport, GestureCounter, OVERLAY_STRIDE};
pub use detector::{
    BrowStatus, Counts, EyeStatus, GestureDetector, MouthStatus, SessionState, StatusSnapshot,
};
pub use error::{Error, Result};
pub use landmarks::{BrowIndices, EyeIndices, LandmarkIndexTable, MouthIndices};
pub use signals::{
    brow_distance_ratio, eye_aspect_ratio, mouth_opening_ratio, FrameSignals, EPSILON,
};
pub use store::{InMemorySessionStore, SessionHandle, SessionSlot, SessionStore};
pub use types::{BoundingBox, LandmarkFrame, Point};
