//! Face Landmarker result types.
//!
//! Mirrors the shape of MediaPipe's `FaceLandmarkerResult`: one blendshape
//! category list and one 4x4 facial transformation matrix per detected face.

use serde::{Deserialize, Serialize};

/// A single scored blendshape category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// ARKit-style blendshape name (e.g. `jawOpen`)
    pub category_name: String,
    /// Score in [0.0, 1.0]
    pub score: f32,
    /// Index of the category in the model output
    #[serde(default)]
    pub index: Option<i32>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Category {
    pub fn new(name: impl Into<String>, score: f32) -> Self {
        Self {
            category_name: name.into(),
            score,
            index: None,
            display_name: None,
        }
    }
}

/// Result of one Face Landmarker inference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceLandmarkerResult {
    /// Blendshape categories, one list per face
    pub face_blendshapes: Vec<Vec<Category>>,
    /// Column-major 4x4 facial transformation matrices, one per face
    pub facial_transformation_matrixes: Vec<[f32; 16]>,
}

impl FaceLandmarkerResult {
    /// Categories of the first detected face
    pub fn first_face(&self) -> Option<&[Category]> {
        self.face_blendshapes.first().map(Vec::as_slice)
    }

    /// Transformation matrix of the first detected face
    pub fn first_matrix(&self) -> Option<&[f32; 16]> {
        self.facial_transformation_matrixes.first()
    }

    pub fn has_face(&self) -> bool {
        !self.face_blendshapes.is_empty()
    }
}
