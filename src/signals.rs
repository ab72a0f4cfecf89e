//! Per-frame geometric signals.
//!
//! Pure functions turning a [`LandmarkFrame`] into the scalar ratios the
//! gesture detector consumes. Distances are divided by the face scale so
//! the signals do not depend on how far the face is from the camera.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::landmarks::{BrowIndices, EyeIndices, LandmarkIndexTable, MouthIndices};
use crate::types::LandmarkFrame;

/// Added to every denominator.
pub const EPSILON: f64 = 1e-9;

/// Eye aspect ratio: `(|p2-p6| + |p3-p5|) / (2 |p1-p4|)`.
///
/// Drops towards zero as the lids close.
pub fn eye_aspect_ratio(frame: &LandmarkFrame, eye: &EyeIndices) -> Result<f64> {
    let [p1, p2, p3, p4, p5, p6] = eye.0;
    let vertical = frame.get(p2)?.distance(&frame.get(p6)?)
        + frame.get(p3)?.distance(&frame.get(p5)?);
    let horizontal = frame.get(p1)?.distance(&frame.get(p4)?);
    Ok(vertical / (2.0 * horizontal + EPSILON))
}

/// Lip gap relative to the face scale.
pub fn mouth_opening_ratio(
    frame: &LandmarkFrame,
    face_size: f64,
    mouth: &MouthIndices,
) -> Result<f64> {
    let gap = frame.get(mouth.upper_lip)?.distance(&frame.get(mouth.lower_lip)?);
    Ok(scaled(gap, face_size))
}

/// Eyebrow-to-eyelid distance relative to the face scale.
pub fn brow_distance_ratio(
    frame: &LandmarkFrame,
    face_size: f64,
    brow: &BrowIndices,
) -> Result<f64> {
    let dist = frame.get(brow.brow)?.distance(&frame.get(brow.eyelid)?);
    Ok(scaled(dist, face_size))
}

fn scaled(distance: f64, face_size: f64) -> f64 {
    distance / (face_size + EPSILON)
}

/// Everything the detector needs from one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSignals {
    /// Mean eye aspect ratio of both eyes.
    pub ear: f64,
    pub mouth_ratio: f64,
    pub brow_left: f64,
    pub brow_right: f64,
}

impl FrameSignals {
    pub const fn new(ear: f64, mouth_ratio: f64, brow_left: f64, brow_right: f64) -> Self {
        Self {
            ear,
            mouth_ratio,
            brow_left,
            brow_right,
        }
    }

    /// Compute all signals for `frame` using the indices in `table`.
    ///
    /// Fails only when the table references a landmark the frame lacks.
    pub fn extract(frame: &LandmarkFrame, table: &LandmarkIndexTable) -> Result<Self> {
        let ear_left = eye_aspect_ratio(frame, &table.left_eye)?;
        let ear_right = eye_aspect_ratio(frame, &table.right_eye)?;
        let face_size = frame.face_size;

        Ok(Self {
            ear: (ear_left + ear_right) / 2.0,
            mouth_ratio: mouth_opening_ratio(frame, face_size, &table.mouth)?,
            brow_left: brow_distance_ratio(frame, face_size, &table.left_brow)?,
            brow_right: brow_distance_ratio(frame, face_size, &table.right_brow)?,
        })
    }
}
