//! Blendshape scores → morph target influences.

use glam::Vec3;
use std::collections::HashMap;

use super::model::FaceModel;

/// Influences below this are treated as zero when morphing.
const MIN_INFLUENCE: f32 = 0.001;

/// Ordered name → weight pairs for one frame.
///
/// When a name appears twice the later weight wins on application.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlendShapeInfluences(Vec<(String, f32)>);

impl BlendShapeInfluences {
    /// Last weight recorded for `name`
    pub fn get(&self, name: &str) -> Option<f32> {
        self.0
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, w)| *w)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(n, w)| (n.as_str(), *w))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f32)> for BlendShapeInfluences {
    fn from_iter<I: IntoIterator<Item = (String, f32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Morph target bookkeeping for the head mesh.
#[derive(Debug, Clone)]
pub struct MorphTargetInfo {
    mesh_idx: usize,
    mesh_name: Option<String>,
    /// Target name → target index
    target_map: HashMap<String, usize>,
    influences: Vec<f32>,
}

impl MorphTargetInfo {
    /// Pick the first mesh that names its morph targets.
    pub fn from_model(model: &FaceModel) -> Option<Self> {
        let (mesh_idx, mesh) = model
            .meshes
            .iter()
            .enumerate()
            .find(|(_, m)| m.target_names.iter().any(|n| !n.is_empty()))?;

        let target_map = mesh
            .target_names
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(i, name)| (name.clone(), i))
            .collect();

        tracing::debug!(
            "Morph mesh {} ({:?}) with {} targets",
            mesh_idx,
            mesh.name,
            mesh.target_names.len()
        );

        Some(Self {
            mesh_idx,
            mesh_name: mesh.name.clone(),
            target_map,
            influences: vec![0.0; mesh.target_names.len()],
        })
    }

    /// Reset every influence, then set the ones named in `influences`.
    pub fn apply_face_mesh(&mut self, influences: &BlendShapeInfluences) {
        self.influences.iter_mut().for_each(|w| *w = 0.0);

        for (name, weight) in influences.iter() {
            match self.target_map.get(name) {
                Some(&idx) => self.influences[idx] = weight,
                None => tracing::trace!("No morph target named '{}'", name),
            }
        }
    }

    /// Morphed positions for each primitive of the morph mesh.
    pub fn morph_positions(&self, model: &FaceModel) -> Vec<Vec<Vec3>> {
        let Some(mesh) = model.meshes.get(self.mesh_idx) else {
            return Vec::new();
        };

        let mut result = Vec::with_capacity(mesh.primitives.len());
        for prim in &mesh.primitives {
            let mut morphed = prim.positions.clone();

            for (t_idx, &weight) in self.influences.iter().enumerate() {
                if weight.abs() < MIN_INFLUENCE {
                    continue;
                }
                let Some(deltas) = prim.morph_deltas.get(t_idx) else {
                    continue;
                };
                if deltas.len() != morphed.len() {
                    continue;
                }
                for (v, delta) in morphed.iter_mut().zip(deltas.iter()) {
                    *v += *delta * weight;
                }
            }

            result.push(morphed);
        }
        result
    }

    pub fn mesh_idx(&self) -> usize {
        self.mesh_idx
    }

    pub fn mesh_name(&self) -> Option<&str> {
        self.mesh_name.as_deref()
    }

    pub fn target_count(&self) -> usize {
        self.influences.len()
    }

    pub fn target_index(&self, name: &str) -> Option<usize> {
        self.target_map.get(name).copied()
    }

    pub fn influences(&self) -> &[f32] {
        &self.influences
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::testing::{glb_with_target_names, triangle_glb};
    use serde_json::json;

    fn model() -> FaceModel {
        FaceModel::from_slice(&triangle_glb()).unwrap()
    }

    fn influences(pairs: &[(&str, f32)]) -> BlendShapeInfluences {
        pairs.iter().map(|(n, w)| (n.to_string(), *w)).collect()
    }

    #[test]
    fn test_from_model_finds_named_mesh() {
        let info = MorphTargetInfo::from_model(&model()).unwrap();
        assert_eq!(info.mesh_idx(), 0);
        assert_eq!(info.mesh_name(), Some("Head"));
        assert_eq!(info.target_count(), 2);
        assert_eq!(info.target_index("jawOpen"), Some(0));
        assert_eq!(info.target_index("eyeBlinkLeft"), Some(1));
    }

    #[test]
    fn test_unnamed_target_keeps_later_indices() {
        let bytes = glb_with_target_names(json!([null, "Face.eyeBlinkLeft"]));
        let model = FaceModel::from_slice(&bytes).unwrap();
        let mut info = MorphTargetInfo::from_model(&model).unwrap();
        assert_eq!(info.target_count(), 2);
        assert_eq!(info.target_index("Face.eyeBlinkLeft"), Some(1));
        assert_eq!(info.target_index(""), None);

        info.apply_face_mesh(&influences(&[("Face.eyeBlinkLeft", 1.0), ("", 0.5)]));
        assert_eq!(info.influences(), &[0.0, 1.0]);

        let positions = info.morph_positions(&model);
        assert_eq!(positions[0][2], Vec3::new(0.0, 1.0, 1.0));
        assert_eq!(positions[0][0], Vec3::ZERO);
    }

    #[test]
    fn test_mesh_with_only_unnamed_targets_is_skipped() {
        let bytes = glb_with_target_names(json!([null, 3]));
        let model = FaceModel::from_slice(&bytes).unwrap();
        assert!(MorphTargetInfo::from_model(&model).is_none());
    }

    #[test]
    fn test_apply_sets_named_targets() {
        let mut info = MorphTargetInfo::from_model(&model()).unwrap();
        info.apply_face_mesh(&influences(&[("eyeBlinkLeft", 0.7), ("browDownLeft", 0.3)]));
        assert_eq!(info.influences(), &[0.0, 0.7]);
    }

    #[test]
    fn test_apply_zeroes_unnamed_targets() {
        let mut info = MorphTargetInfo::from_model(&model()).unwrap();
        info.apply_face_mesh(&influences(&[("jawOpen", 1.0), ("eyeBlinkLeft", 0.5)]));
        info.apply_face_mesh(&influences(&[("eyeBlinkLeft", 0.2)]));
        assert_eq!(info.influences(), &[0.0, 0.2]);
    }

    #[test]
    fn test_later_duplicate_wins() {
        let mut info = MorphTargetInfo::from_model(&model()).unwrap();
        let inf = influences(&[("jawOpen", 0.1), ("jawOpen", 0.9)]);
        assert_eq!(inf.get("jawOpen"), Some(0.9));
        info.apply_face_mesh(&inf);
        assert_eq!(info.influences()[0], 0.9);
    }

    #[test]
    fn test_morph_positions() {
        let model = model();
        let mut info = MorphTargetInfo::from_model(&model).unwrap();

        let rest = info.morph_positions(&model);
        assert_eq!(rest[0], model.meshes[0].primitives[0].positions);

        info.apply_face_mesh(&influences(&[("jawOpen", 0.5), ("eyeBlinkLeft", 1.0)]));
        let morphed = info.morph_positions(&model);
        assert_eq!(morphed.len(), 1);
        let p = &morphed[0];
        assert!((p[0] - Vec3::new(0.0, -0.25, 0.0)).length() < 1e-6);
        assert!((p[1] - Vec3::new(1.0, -0.25, 0.0)).length() < 1e-6);
        assert!((p[2] - Vec3::new(0.0, 0.75, 1.0)).length() < 1e-6);
    }
}
