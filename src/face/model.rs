//! glTF/GLB head model loader using the `gltf` crate.
//!
//! Extracts drawable primitives, morph target position deltas and the morph
//! target names stored in mesh extras (`extras.targetNames`).

use glam::Vec3;
use std::path::Path;

use crate::error::{ModelError, Result};

/// How a primitive's indices are assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl From<gltf::mesh::Mode> for PrimitiveMode {
    fn from(mode: gltf::mesh::Mode) -> Self {
        use gltf::mesh::Mode;
        match mode {
            Mode::Points => Self::Points,
            Mode::Lines => Self::Lines,
            Mode::LineLoop => Self::LineLoop,
            Mode::LineStrip => Self::LineStrip,
            Mode::Triangles => Self::Triangles,
            Mode::TriangleStrip => Self::TriangleStrip,
            Mode::TriangleFan => Self::TriangleFan,
        }
    }
}

/// A loaded head model.
pub struct FaceModel {
    pub meshes: Vec<MeshData>,
    /// Mesh indices in draw order (scene traversal)
    pub draw_order: Vec<usize>,
}

/// All drawable primitives of one mesh.
pub struct MeshData {
    pub name: Option<String>,
    pub primitives: Vec<PrimitiveData>,
    /// Morph target names from mesh extras, shared prefix stripped
    pub target_names: Vec<String>,
}

/// Decoded texture image (RGBA8).
pub struct TextureImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Geometry for a single primitive.
pub struct PrimitiveData {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub mode: PrimitiveMode,
    /// Base color factor from material (RGBA)
    pub base_color: [f32; 4],
    pub texture: Option<TextureImage>,
    /// morph_deltas[target_idx] = per-vertex position deltas
    pub morph_deltas: Vec<Vec<Vec3>>,
}

impl FaceModel {
    /// Load a GLB or glTF file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelError::Read(format!("{}: not found", path.display())).into());
        }
        let (document, buffers, images) = gltf::import(path).map_err(ModelError::Import)?;
        let model = Self::from_gltf(&document, &buffers, &images)?;

        tracing::info!(
            "Loaded face model {} ({} meshes)",
            path.display(),
            model.meshes.len()
        );
        Ok(model)
    }

    /// Load from in-memory GLB (or self-contained glTF) bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let (document, buffers, images) = gltf::import_slice(bytes).map_err(ModelError::Import)?;
        Self::from_gltf(&document, &buffers, &images)
    }

    fn from_gltf(
        document: &gltf::Document,
        buffers: &[gltf::buffer::Data],
        images: &[gltf::image::Data],
    ) -> Result<Self> {
        let mut meshes = Vec::new();
        let mut drawable = 0usize;

        for mesh in document.meshes() {
            let target_names = parse_morph_target_names(&mesh);
            let mut primitives = Vec::new();

            for prim in mesh.primitives() {
                let reader = prim.reader(|buffer| Some(&buffers[buffer.index()]));

                // Unindexed primitives are not drawn
                let Some(indices) = reader.read_indices() else {
                    tracing::debug!(
                        "Skipping unindexed primitive {} of mesh {}",
                        prim.index(),
                        mesh.index()
                    );
                    continue;
                };
                let indices: Vec<u32> = indices.into_u32().collect();

                let positions: Vec<Vec3> = reader
                    .read_positions()
                    .map(|iter| iter.map(Vec3::from).collect())
                    .unwrap_or_default();

                let normals: Vec<Vec3> = reader
                    .read_normals()
                    .map(|iter| iter.map(Vec3::from).collect())
                    .unwrap_or_else(|| vec![Vec3::Y; positions.len()]);

                let uvs: Vec<[f32; 2]> = reader
                    .read_tex_coords(0)
                    .map(|iter| iter.into_f32().collect())
                    .unwrap_or_else(|| vec![[0.0; 2]; positions.len()]);

                let pbr = prim.material().pbr_metallic_roughness();
                let base_color = pbr.base_color_factor();

                let texture = pbr.base_color_texture().and_then(|tex_info| {
                    let img_idx = tex_info.texture().source().index();
                    images.get(img_idx).map(decode_texture)
                });

                let morph_deltas = read_morph_deltas(&prim, buffers);

                primitives.push(PrimitiveData {
                    positions,
                    normals,
                    uvs,
                    indices,
                    mode: prim.mode().into(),
                    base_color,
                    texture,
                    morph_deltas,
                });
            }

            drawable += primitives.len();
            meshes.push(MeshData {
                name: mesh.name().map(String::from),
                primitives,
                target_names,
            });
        }

        if drawable == 0 {
            return Err(ModelError::NoGeometry.into());
        }

        let draw_order = scene_draw_order(document);

        Ok(Self { meshes, draw_order })
    }

    /// Total number of drawable primitives
    pub fn primitive_count(&self) -> usize {
        self.meshes.iter().map(|m| m.primitives.len()).sum()
    }
}

/// Mesh indices reached by a depth-first walk of the default scene.
fn scene_draw_order(document: &gltf::Document) -> Vec<usize> {
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next());

    let Some(scene) = scene else {
        return document.meshes().map(|m| m.index()).collect();
    };

    let mut order = Vec::new();
    for node in scene.nodes() {
        collect_meshes(&node, &mut order);
    }
    order
}

fn collect_meshes(node: &gltf::Node, order: &mut Vec<usize>) {
    if let Some(mesh) = node.mesh() {
        order.push(mesh.index());
    }
    for child in node.children() {
        collect_meshes(&child, order);
    }
}

/// Morph target names from `extras.targetNames`, one entry per target index.
///
/// Entries that are missing a usable name become empty strings so every later
/// target keeps its index.
fn parse_morph_target_names(mesh: &gltf::Mesh) -> Vec<String> {
    let Some(extras) = mesh.extras().as_ref() else {
        return Vec::new();
    };
    let value: serde_json::Value = match serde_json::from_str(extras.get()) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("Mesh {} has unreadable extras: {}", mesh.index(), e);
            return Vec::new();
        }
    };
    let Some(entries) = value.get("targetNames").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    let mut unnamed = Vec::new();
    let names: Vec<String> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| match entry.as_str() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                unnamed.push(i);
                String::new()
            }
        })
        .collect();

    if !unnamed.is_empty() {
        tracing::debug!(
            "Mesh {} morph targets without a name: {:?}",
            mesh.index(),
            unnamed
        );
    }

    strip_shared_prefix(names)
}

/// Drop a `"<mesh>."` prefix shared by every named target.
///
/// `"Face.jawOpen"` becomes `"jawOpen"` when all named targets start with
/// `"Face."`. Unnamed entries stay empty and are not part of the check.
fn strip_shared_prefix(mut names: Vec<String>) -> Vec<String> {
    let named: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|n| !n.is_empty())
        .collect();
    if named.len() < 2 {
        return names;
    }

    let Some(dot) = named[0].find('.') else {
        return names;
    };
    let prefix = named[0][..=dot].to_string();
    if !named.iter().all(|n| n.starts_with(&prefix)) {
        return names;
    }

    for name in names.iter_mut().filter(|n| !n.is_empty()) {
        name.drain(..prefix.len());
    }
    names
}

/// Decode a base color image into RGBA8 texels.
fn decode_texture(img: &gltf::image::Data) -> TextureImage {
    use gltf::image::Format;

    let pixels = match img.format {
        Format::R8G8B8A8 => img.pixels.clone(),
        Format::R8G8B8 => img
            .pixels
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], u8::MAX])
            .collect(),
        Format::R8G8 => img
            .pixels
            .chunks_exact(2)
            .flat_map(|c| [c[0], c[1], 0, u8::MAX])
            .collect(),
        Format::R8 => img
            .pixels
            .iter()
            .flat_map(|&l| [l, l, l, u8::MAX])
            .collect(),
        other => {
            tracing::warn!("Unsupported texture format {:?}, drawing it white", other);
            vec![u8::MAX; (img.width * img.height * 4) as usize]
        }
    };

    TextureImage {
        pixels,
        width: img.width,
        height: img.height,
    }
}

fn read_morph_deltas(prim: &gltf::Primitive, buffers: &[gltf::buffer::Data]) -> Vec<Vec<Vec3>> {
    let reader = prim.reader(|buffer| Some(&buffers[buffer.index()]));

    reader
        .read_morph_targets()
        .map(|(positions, _normals, _tangents)| match positions {
            Some(iter) => iter.map(Vec3::from).collect(),
            None => Vec::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CartoonHeadError;
    use crate::face::testing::{glb_with, glb_with_target_names, triangle_glb};
    use serde_json::json;

    #[test]
    fn test_load_triangle() {
        let model = FaceModel::from_slice(&triangle_glb()).unwrap();
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.primitive_count(), 1);
        assert_eq!(model.draw_order, vec![0]);

        let mesh = &model.meshes[0];
        assert_eq!(mesh.name.as_deref(), Some("Head"));
        assert_eq!(mesh.target_names, vec!["jawOpen", "eyeBlinkLeft"]);

        let prim = &mesh.primitives[0];
        assert_eq!(prim.positions.len(), 3);
        assert_eq!(prim.positions[1], Vec3::X);
        assert_eq!(prim.indices, vec![0, 1, 2]);
        assert_eq!(prim.mode, PrimitiveMode::Triangles);
        assert_eq!(prim.morph_deltas.len(), 2);
        assert_eq!(prim.morph_deltas[1][2], Vec3::Z);
    }

    #[test]
    fn test_missing_attributes_default() {
        let model = FaceModel::from_slice(&triangle_glb()).unwrap();
        let prim = &model.meshes[0].primitives[0];
        assert_eq!(prim.normals, vec![Vec3::Y; 3]);
        assert_eq!(prim.uvs, vec![[0.0, 0.0]; 3]);
        assert_eq!(prim.base_color, [1.0, 1.0, 1.0, 1.0]);
        assert!(prim.texture.is_none());
    }

    #[test]
    fn test_unindexed_model_has_no_geometry() {
        let bytes = glb_with(false, true);
        assert!(matches!(
            FaceModel::from_slice(&bytes),
            Err(CartoonHeadError::Model(ModelError::NoGeometry))
        ));
    }

    #[test]
    fn test_no_scene_draws_all_meshes() {
        let model = FaceModel::from_slice(&glb_with(true, false)).unwrap();
        assert_eq!(model.draw_order, vec![0]);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            FaceModel::load("does/not/exist.glb"),
            Err(CartoonHeadError::Model(ModelError::Read(_)))
        ));
    }

    #[test]
    fn test_garbage_bytes() {
        assert!(matches!(
            FaceModel::from_slice(b"definitely not a glb"),
            Err(CartoonHeadError::Model(ModelError::Import(_)))
        ));
    }

    #[test]
    fn test_strip_shared_prefix() {
        let names = vec!["Face.jawOpen".to_string(), "Face.eyeBlinkLeft".to_string()];
        assert_eq!(strip_shared_prefix(names), vec!["jawOpen", "eyeBlinkLeft"]);

        let mixed = vec!["A.jawOpen".to_string(), "B.eyeBlinkLeft".to_string()];
        assert_eq!(strip_shared_prefix(mixed.clone()), mixed);

        let bare = vec!["jawOpen".to_string(), "eyeBlinkLeft".to_string()];
        assert_eq!(strip_shared_prefix(bare.clone()), bare);

        let single = vec!["Face.jawOpen".to_string()];
        assert_eq!(strip_shared_prefix(single.clone()), single);
    }

    #[test]
    fn test_strip_shared_prefix_keeps_unnamed_slots() {
        let names = vec![
            "Face.jawOpen".to_string(),
            String::new(),
            "Face.eyeBlinkLeft".to_string(),
        ];
        assert_eq!(
            strip_shared_prefix(names),
            vec!["jawOpen", "", "eyeBlinkLeft"]
        );
    }

    #[test]
    fn test_unnamed_target_keeps_indices() {
        let bytes = glb_with_target_names(json!([null, "Face.eyeBlinkLeft"]));
        let model = FaceModel::from_slice(&bytes).unwrap();
        let mesh = &model.meshes[0];
        assert_eq!(mesh.target_names, vec!["", "Face.eyeBlinkLeft"]);
        assert_eq!(mesh.primitives[0].morph_deltas.len(), mesh.target_names.len());
    }

    #[test]
    fn test_non_string_names_become_empty() {
        let bytes = glb_with_target_names(json!(["Face.jawOpen", 7, "Face.eyeBlinkLeft"]));
        let model = FaceModel::from_slice(&bytes).unwrap();
        assert_eq!(
            model.meshes[0].target_names,
            vec!["jawOpen", "", "eyeBlinkLeft"]
        );
    }
}
