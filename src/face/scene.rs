//! Per-frame scene preparation: stored blendshapes → morphed head + transform.

use glam::{EulerRot, Mat3, Mat4, Quat, Vec3};
use std::sync::Arc;

use super::model::FaceModel;
use super::morph::MorphTargetInfo;
use super::store::BlendshapeStore;

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, Default)]
pub struct FaceFrame {
    /// Model transform (rotation only)
    pub transform: Mat4,
    /// Index of the morphed mesh, if the model has one
    pub morph_mesh: Option<usize>,
    /// Morphed positions per primitive of `morph_mesh`
    pub morphed: Vec<Vec<Vec3>>,
    /// Morph influences applied this frame
    pub influences: Vec<f32>,
}

/// Head model plus the morph bookkeeping derived from it.
pub struct FaceScene {
    model: Arc<FaceModel>,
    morph: Option<MorphTargetInfo>,
    rotation: Quat,
}

impl FaceScene {
    pub fn new(model: Arc<FaceModel>, rotation: Quat) -> Self {
        let morph = MorphTargetInfo::from_model(&model);
        if morph.is_none() {
            tracing::warn!("Face model has no named morph targets, blendshapes will not animate");
        }
        Self {
            model,
            morph,
            rotation,
        }
    }

    /// Rotation from XYZ Euler angles in degrees
    pub fn rotation_from_degrees(deg: [f32; 3]) -> Quat {
        Quat::from_euler(
            EulerRot::XYZ,
            deg[0].to_radians(),
            deg[1].to_radians(),
            deg[2].to_radians(),
        )
    }

    /// Apply the stored blendshapes and build this frame's render input.
    pub fn prepare(&mut self, store: &BlendshapeStore) -> FaceFrame {
        let transform = face_transform(self.rotation, store.matrix());

        let Some(morph) = self.morph.as_mut() else {
            return FaceFrame {
                transform,
                ..FaceFrame::default()
            };
        };

        morph.apply_face_mesh(&store.influences());

        FaceFrame {
            transform,
            morph_mesh: Some(morph.mesh_idx()),
            morphed: morph.morph_positions(&self.model),
            influences: morph.influences().to_vec(),
        }
    }

    pub fn model(&self) -> &Arc<FaceModel> {
        &self.model
    }
}

/// Upper 3x3 of `rotation * facial`; translation and projective terms dropped.
pub fn face_transform(rotation: Quat, facial: Mat4) -> Mat4 {
    let combined = Mat4::from_quat(rotation) * facial;
    Mat4::from_mat3(Mat3::from_mat4(combined))
}
