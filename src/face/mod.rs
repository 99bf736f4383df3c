//! Native face engine state: blendshape storage, head model, morphing and
//! per-frame scene preparation.

pub mod model;
pub mod morph;
pub mod scene;
pub mod store;

pub use model::FaceModel;
pub use morph::{BlendShapeInfluences, MorphTargetInfo};
pub use scene::{FaceFrame, FaceScene};
pub use store::BlendshapeStore;
