//! Render-surface callbacks and the display projection matrix.

use glam::Mat4;

use crate::config::SurfaceConfig;
use crate::error::Result;

/// Native entry points driven by the surface lifecycle.
pub trait NativeSurface {
    fn surface_created(&mut self) -> Result<()>;
    fn surface_changed(&mut self, width: i32, height: i32) -> Result<()>;
    fn draw_frame(&mut self) -> Result<()>;
}

/// Relays surface callbacks to a [`NativeSurface`] and keeps the projection.
pub struct SurfaceRenderer<N> {
    native: N,
    fovy_deg: f32,
    near: f32,
    far: f32,
    projection: Mat4,
    size: Option<(i32, i32)>,
}

impl<N: NativeSurface> SurfaceRenderer<N> {
    pub fn new(native: N, config: &SurfaceConfig) -> Self {
        Self {
            native,
            fovy_deg: config.fovy_deg,
            near: config.near,
            far: config.far,
            projection: Mat4::IDENTITY,
            size: None,
        }
    }

    pub fn on_surface_created(&mut self) -> Result<()> {
        tracing::debug!("Surface created");
        self.native.surface_created()
    }

    pub fn on_surface_changed(&mut self, width: i32, height: i32) -> Result<()> {
        if height > 0 {
            let aspect = width as f32 / height as f32;
            self.projection =
                Mat4::perspective_rh_gl(self.fovy_deg.to_radians(), aspect, self.near, self.far);
        } else {
            tracing::warn!("Surface height is {}, keeping previous projection", height);
        }
        self.size = Some((width, height));

        tracing::debug!("Surface changed: {}x{}", width, height);
        self.native.surface_changed(width, height)
    }

    pub fn on_draw_frame(&mut self) -> Result<()> {
        self.native.draw_frame()
    }

    pub fn on_surface_destroyed(&mut self) {
        tracing::debug!("Surface destroyed");
        self.size = None;
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Last size reported by `on_surface_changed`, cleared on destroy
    pub fn size(&self) -> Option<(i32, i32)> {
        self.size
    }

    pub fn native(&self) -> &N {
        &self.native
    }

    pub fn native_mut(&mut self) -> &mut N {
        &mut self.native
    }
}
