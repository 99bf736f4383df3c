//! GL-thread face engine: the native side of the surface callbacks.

use std::sync::Arc;

use crate::error::Result;
use crate::face::{FaceFrame, FaceScene};
use crate::render::{GlFaceRenderer, NativeSurface, Viewport};
use crate::SharedFace;

/// Produces a `glow` context for the GL context current on this thread.
pub type GlLoader = Box<dyn Fn() -> Result<glow::Context>>;

/// Per-GL-thread engine state.
pub struct FaceEngine {
    shared: Arc<SharedFace>,
    loader: Option<GlLoader>,
    renderer: Option<GlFaceRenderer>,
    scene: Option<FaceScene>,
    scene_generation: u64,
    viewport: Option<Viewport>,
    last_frame: Option<FaceFrame>,
    frames: u64,
}

impl FaceEngine {
    /// Engine that prepares frames but never touches GL
    pub fn headless(shared: Arc<SharedFace>) -> Self {
        Self {
            shared,
            loader: None,
            renderer: None,
            scene: None,
            scene_generation: 0,
            viewport: None,
            last_frame: None,
            frames: 0,
        }
    }

    /// Engine that draws through the context `loader` provides
    pub fn with_loader(shared: Arc<SharedFace>, loader: GlLoader) -> Self {
        Self {
            loader: Some(loader),
            ..Self::headless(shared)
        }
    }

    /// Rebuild the scene when the shared model changed. Returns false if no model is set.
    fn sync_scene(&mut self) -> bool {
        let Some((model, generation)) = self.shared.model() else {
            return false;
        };
        if self.scene.is_some() && generation == self.scene_generation {
            return true;
        }

        let rotation = FaceScene::rotation_from_degrees(self.shared.config().face.rotation_deg);
        self.scene = Some(FaceScene::new(model, rotation));
        self.scene_generation = generation;

        // Uploaded buffers belong to the previous model
        if let Some(mut renderer) = self.renderer.take() {
            renderer.destroy();
        }
        tracing::info!("Face scene built (model generation {})", generation);
        true
    }

    fn ensure_renderer(&mut self) -> Result<()> {
        if self.renderer.is_some() {
            return Ok(());
        }
        let (Some(loader), Some(scene)) = (self.loader.as_ref(), self.scene.as_ref()) else {
            return Ok(());
        };

        let gl = loader()?;
        let clear_color = self.shared.config().face.clear_color;
        let mut renderer = GlFaceRenderer::new(gl, scene.model(), clear_color)?;
        if let Some(vp) = self.viewport {
            renderer.set_viewport(vp);
        }
        self.renderer = Some(renderer);
        Ok(())
    }

    /// Release GL objects while the context is still current
    pub fn release(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            renderer.destroy();
        }
    }

    /// Render input of the last drawn frame
    pub fn last_frame(&self) -> Option<&FaceFrame> {
        self.last_frame.as_ref()
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.viewport
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn has_renderer(&self) -> bool {
        self.renderer.is_some()
    }
}

impl NativeSurface for FaceEngine {
    fn surface_created(&mut self) -> Result<()> {
        // Objects of the old context are gone with it
        self.renderer = None;
        Ok(())
    }

    fn surface_changed(&mut self, width: i32, height: i32) -> Result<()> {
        let viewport = match self.shared.config().face.viewport {
            Some(v) => Viewport::from(v),
            None => Viewport::full(width, height),
        };
        self.viewport = Some(viewport);
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.set_viewport(viewport);
        }
        Ok(())
    }

    fn draw_frame(&mut self) -> Result<()> {
        if !self.sync_scene() {
            return Ok(());
        }
        self.ensure_renderer()?;

        let Some(scene) = self.scene.as_mut() else {
            return Ok(());
        };
        let frame = self.shared.with_store(|store| scene.prepare(store));

        if let Some(renderer) = self.renderer.as_mut() {
            renderer.draw(&frame);
        }

        self.last_frame = Some(frame);
        self.frames += 1;
        Ok(())
    }
}
