//! Surface lifecycle handling and the OpenGL ES head renderer.

pub mod gl;
pub mod surface;

pub use gl::GlFaceRenderer;
pub use surface::{NativeSurface, SurfaceRenderer};

/// GL viewport rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Viewport {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Viewport covering a whole surface
    pub fn full(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }
}

impl From<[i32; 4]> for Viewport {
    fn from(v: [i32; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}
