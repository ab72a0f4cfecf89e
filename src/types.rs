use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A 2D point with floating-point coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// Euclidean distance, accumulated in `f64` so ratios built on top of it
    /// keep their precision.
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }
}

/// A bounding box defined by top-left corner, width, and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest axis-aligned box containing every point.
    ///
    /// Returns `None` for an empty slice.
    pub fn enclosing(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        Some(Self::new(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Length of the box diagonal. Used as the face scale.
    pub fn diagonal(&self) -> f64 {
        f64::from(self.width).hypot(f64::from(self.height))
    }
}

/// Landmarks for one face in one video frame, in pixel space.
///
/// `face_size` is the scale every distance ratio is divided by, normally the
/// diagonal of the landmarks' bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkFrame {
    pub points: Vec<Point>,
    pub face_size: f64,
    /// Source image dimensions, known when the frame was built from
    /// normalized coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_size: Option<(u32, u32)>,
}

impl LandmarkFrame {
    /// Frame with an explicit face scale.
    pub fn new(points: Vec<Point>, face_size: f64) -> Self {
        Self {
            points,
            face_size,
            image_size: None,
        }
    }

    /// Frame whose face scale is the diagonal of the points' bounding box.
    pub fn from_points(points: Vec<Point>) -> Self {
        let face_size = BoundingBox::enclosing(&points)
            .map(|b| b.diagonal())
            .unwrap_or(0.0);
        Self::new(points, face_size)
    }

    /// Convert `[0,1]` landmark coordinates into pixel space for a
    /// `width` x `height` image, then derive the face scale.
    pub fn from_normalized(points: &[Point], width: u32, height: u32) -> Self {
        let (w, h) = (width as f32, height as f32);
        let pixels = points
            .iter()
            .map(|p| Point::new(p.x * w, p.y * h))
            .collect();
        let mut frame = Self::from_points(pixels);
        frame.image_size = Some((width, height));
        frame
    }

    pub fn num_landmarks(&self) -> usize {
        self.points.len()
    }

    /// Landmark at `idx`, or `LandmarkOutOfRange` if the frame is too short
    /// for the configured index table.
    pub fn get(&self, idx: usize) -> Result<Point> {
        self.points
            .get(idx)
            .copied()
            .ok_or(Error::LandmarkOutOfRange {
                index: idx,
                len: self.points.len(),
            })
    }

    /// Every `stride`-th landmark in normalized image coordinates, for
    /// drawing an overlay on the client.
    ///
    /// Empty when the image size is unknown.
    pub fn overlay_points(&self, stride: usize) -> Vec<Point> {
        let Some((width, height)) = self.image_size else {
            return Vec::new();
        };
        if width == 0 || height == 0 {
            return Vec::new();
        }
        let (w, h) = (width as f32, height as f32);
        self.points
            .iter()
            .step_by(stride.max(1))
            .map(|p| Point::new(p.x / w, p.y / h))
            .collect()
    }
}
