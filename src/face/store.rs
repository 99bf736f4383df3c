//! Native-side storage for forwarded blendshape keys, scores and the facial
//! transformation matrix.

use glam::Mat4;

use crate::adapter::{BLENDSHAPE_SLOTS, MATRIX_LEN};
use crate::error::{FaceError, Result};

use super::morph::BlendShapeInfluences;

/// Latest blendshape data received across the native boundary.
#[derive(Debug, Clone)]
pub struct BlendshapeStore {
    keys: Vec<String>,
    scores: [f32; BLENDSHAPE_SLOTS],
    /// Facial transformation matrix (column-major)
    matrix: Mat4,
    updates: u64,
}

impl Default for BlendshapeStore {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            scores: [0.0; BLENDSHAPE_SLOTS],
            matrix: Mat4::IDENTITY,
            updates: 0,
        }
    }
}

impl BlendshapeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the key list
    pub fn set_keys(&mut self, keys: Vec<String>) {
        self.keys = keys;
    }

    /// Copy the first 52 scores and the first 16 matrix elements.
    ///
    /// Short input is rejected and leaves the store untouched.
    pub fn set_scores_and_matrix(&mut self, scores: &[f32], matrix: &[f32]) -> Result<()> {
        if scores.len() < BLENDSHAPE_SLOTS {
            return Err(FaceError::ScoreCount {
                expected: BLENDSHAPE_SLOTS,
                actual: scores.len(),
            }
            .into());
        }
        if matrix.len() < MATRIX_LEN {
            return Err(FaceError::MatrixLength {
                expected: MATRIX_LEN,
                actual: matrix.len(),
            }
            .into());
        }

        self.scores.copy_from_slice(&scores[..BLENDSHAPE_SLOTS]);
        // matrix[col * 4 + row]
        self.matrix = Mat4::from_cols_slice(&matrix[..MATRIX_LEN]);
        self.updates += 1;
        Ok(())
    }

    /// Name → score pairs for the stored keys, skipping empty names
    pub fn influences(&self) -> BlendShapeInfluences {
        self.keys
            .iter()
            .zip(self.scores.iter())
            .filter(|(name, _)| !name.is_empty())
            .map(|(name, &score)| (name.clone(), score))
            .collect()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn scores(&self) -> &[f32; BLENDSHAPE_SLOTS] {
        &self.scores
    }

    pub fn matrix(&self) -> Mat4 {
        self.matrix
    }

    /// Number of successful score/matrix updates
    pub fn updates(&self) -> u64 {
        self.updates
    }
}
