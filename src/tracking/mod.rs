//! Tracking module
//!
//! Face Landmarker result types and the desktop UDP feed that delivers them:
//! - `result`: blendshape categories and facial transformation matrices
//! - `receiver`: JSON-over-UDP result receiver

pub mod receiver;
pub mod result;

pub use result::{Category, FaceLandmarkerResult};
