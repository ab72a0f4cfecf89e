//! Landmark index tables.
//!
//! The signal extractor reads a handful of fixed landmarks per frame. Which
//! index means "upper lip" or "left outer eye corner" depends on the
//! landmark provider, so the indices are configuration rather than code.

use serde::{Deserialize, Serialize};

/// Six eye landmarks in anatomical order: outer corner, two upper-lid
/// points, inner corner, two lower-lid points.
///
/// With that ordering `p2/p6` and `p3/p5` are vertical pairs and `p1/p4`
/// spans the eye horizontally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EyeIndices(pub [usize; 6]);

/// Eyebrow-top landmark and the upper-eyelid landmark below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowIndices {
    pub brow: usize,
    pub eyelid: usize,
}

/// Upper and lower inner-lip landmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouthIndices {
    pub upper_lip: usize,
    pub lower_lip: usize,
}

/// Every landmark index the extractor reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LandmarkIndexTable {
    pub left_eye: EyeIndices,
    pub right_eye: EyeIndices,
    pub mouth: MouthIndices,
    pub left_brow: BrowIndices,
    pub right_brow: BrowIndices,
}

impl LandmarkIndexTable {
    /// MediaPipe FaceMesh (468/478 point) indexing.
    pub const fn face_mesh() -> Self {
        Self {
            left_eye: EyeIndices([33, 160, 158, 133, 153, 144]),
            right_eye: EyeIndices([263, 387, 385, 362, 380, 373]),
            mouth: MouthIndices {
                upper_lip: 13,
                lower_lip: 14,
            },
            left_brow: BrowIndices {
                brow: 105,
                eyelid: 159,
            },
            right_brow: BrowIndices {
                brow: 334,
                eyelid: 386,
            },
        }
    }

    /// Largest index referenced; a frame needs more landmarks than this.
    pub fn max_index(&self) -> usize {
        self.left_eye
            .0
            .iter()
            .chain(self.right_eye.0.iter())
            .chain([
                &self.mouth.upper_lip,
                &self.mouth.lower_lip,
                &self.left_brow.brow,
                &self.left_brow.eyelid,
                &self.right_brow.brow,
                &self.right_brow.eyelid,
            ])
            .copied()
            .max()
            .unwrap_or(0)
    }

    /// Minimum number of landmarks a frame must carry for this table.
    pub fn required_landmarks(&self) -> usize {
        self.max_index() + 1
    }
}

impl Default for LandmarkIndexTable {
    fn default() -> Self {
        Self::face_mesh()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_mesh_requires_full_mesh() {
        let table = LandmarkIndexTable::face_mesh();
        assert_eq!(table.max_index(), 387);
        assert_eq!(table.required_landmarks(), 388);
    }

    #[test]
    fn table_deserializes_from_json() {
        let json = r#"{
            "left_eye": [0, 1, 2, 3, 4, 5],
            "right_eye": [6, 7, 8, 9, 10, 11],
            "mouth": { "upper_lip": 12, "lower_lip": 13 },
            "left_brow": { "brow": 14, "eyelid": 15 },
            "right_brow": { "brow": 16, "eyelid": 17 }
        }"#;
        let table: LandmarkIndexTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.right_eye, EyeIndices([6, 7, 8, 9, 10, 11]));
        assert_eq!(table.required_landmarks(), 18);
    }
}
