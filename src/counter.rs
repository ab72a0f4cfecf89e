//! Frame-level entry point tying the extractor, detector and store together.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GestureConfig;
use crate::detector::{Counts, GestureDetector, StatusSnapshot};
use crate::error::{Error, Result};
use crate::signals::FrameSignals;
use crate::store::{InMemorySessionStore, SessionStore};
use crate::types::{LandmarkFrame, Point};

/// Every n-th landmark is echoed back for drawing.
pub const OVERLAY_STRIDE: usize = 8;

/// Result of one frame for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub session_id: String,
    pub counts: Counts,
    pub states: StatusSnapshot,
    /// Subsampled landmarks in normalized image coordinates. Empty when the
    /// frame carried no image size or no face was found.
    #[serde(default)]
    pub landmarks: Vec<Point>,
}

impl FrameReport {
    /// Report for a frame without a face: zero counts, unknown states.
    pub fn no_face(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            counts: Counts::default(),
            states: StatusSnapshot::unknown(),
            landmarks: Vec::new(),
        }
    }
}

/// Counts gestures for any number of concurrent sessions.
///
/// `GestureCounter` is `Sync`; share it behind an `Arc` and call
/// [`process_frame`](Self::process_frame) from as many threads as needed.
#[derive(Debug)]
pub struct GestureCounter<S = InMemorySessionStore> {
    detector: GestureDetector,
    store: S,
}

impl GestureCounter<InMemorySessionStore> {
    /// Counter over an in-memory store. The config is used as given; see
    /// [`try_new`](Self::try_new) for one built in code.
    pub fn new(config: GestureConfig) -> Self {
        Self::with_store(config, InMemorySessionStore::new())
    }

    /// Like [`new`](Self::new), but rejects a config failing
    /// [`GestureConfig::validate`].
    pub fn try_new(config: GestureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }
}

impl Default for GestureCounter<InMemorySessionStore> {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}

impl<S: SessionStore> GestureCounter<S> {
    pub fn with_store(config: GestureConfig, store: S) -> Self {
        Self {
            detector: GestureDetector::new(config),
            store,
        }
    }

    pub fn config(&self) -> &GestureConfig {
        self.detector.config()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply one frame to `session_id`.
    ///
    /// `None` means the landmark provider found no face; the session is left
    /// untouched (and not created) and a zeroed report is returned. A frame
    /// whose landmarks do not cover the index table is rejected before any
    /// state is touched.
    pub fn process_frame(
        &self,
        session_id: &str,
        frame: Option<&LandmarkFrame>,
    ) -> Result<FrameReport> {
        let Some(frame) = frame else {
            debug!(session_id, "no face in frame");
            return Ok(FrameReport::no_face(session_id));
        };

        let table = &self.config().landmarks;
        let signals = check_length(frame, table.required_landmarks())
            .and_then(|()| FrameSignals::extract(frame, table))
            .map_err(|e| {
                warn!(session_id, error = %e, "rejected frame");
                e
            })?;

        Ok(self.process_signals(session_id, &signals, frame.overlay_points(OVERLAY_STRIDE)))
    }

    /// Apply precomputed signals to `session_id`.
    pub fn process_signals(
        &self,
        session_id: &str,
        signals: &FrameSignals,
        landmarks: Vec<Point>,
    ) -> FrameReport {
        let slot = self.store.get_or_create(session_id);
        let mut state = slot.lock();
        let states = self.detector.process(&mut state, signals);

        FrameReport {
            session_id: session_id.to_string(),
            counts: state.counts(),
            states,
            landmarks,
        }
    }

    /// Current counts and states of an existing session.
    pub fn snapshot(&self, session_id: &str) -> Option<FrameReport> {
        let state = self.store.get(session_id)?.snapshot();
        Some(FrameReport {
            session_id: session_id.to_string(),
            counts: state.counts(),
            states: state.status(),
            landmarks: Vec::new(),
        })
    }

    pub fn session_count(&self) -> usize {
        self.store.len()
    }

    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        self.store.evict_idle(max_idle)
    }
}

fn check_length(frame: &LandmarkFrame, required: usize) -> Result<()> {
    if frame.num_landmarks() < required {
        return Err(Error::LandmarkOutOfRange {
            index: required - 1,
            len: frame.num_landmarks(),
        });
    }
    Ok(())
}
