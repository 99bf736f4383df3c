//! cartoon-head - Blendshape-driven cartoon head renderer
//!
//! Consumes MediaPipe Face Landmarker results and renders a morph-target
//! head model with OpenGL ES:
//! - Adapts results into fixed blendshape slots and display rows
//! - Stores forwarded blendshapes and the facial transform natively
//! - Maps scores onto glTF morph targets and draws the head
//! - Exposes the native side to Android through JNI

pub mod adapter;
pub mod bridge;
pub mod config;
pub mod error;
pub mod face;
pub mod render;
pub mod tracking;

pub use config::Config;
pub use error::{CartoonHeadError, Result};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use adapter::{BlendshapeSink, BLENDSHAPE_SLOTS, MATRIX_LEN};
use face::{BlendshapeStore, FaceModel};

/// State shared between the result-producing thread and the GL thread
#[derive(Default)]
pub struct SharedFace {
    /// Configuration fixed at startup
    config: Config,
    /// Latest forwarded blendshapes and facial matrix
    store: RwLock<BlendshapeStore>,
    /// Loaded head model
    model: RwLock<Option<Arc<FaceModel>>>,
    /// Bumped every time a model is set
    model_generation: AtomicU64,
}

impl SharedFace {
    pub fn new(config: Config) -> Arc<Self> {
        Arc::new(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace the head model
    pub fn set_model(&self, model: FaceModel) {
        *self.model.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(model));
        self.model_generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Current model with its generation
    pub fn model(&self) -> Option<(Arc<FaceModel>, u64)> {
        let model = self
            .model
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        Some((model, self.model_generation.load(Ordering::Acquire)))
    }

    pub fn model_generation(&self) -> u64 {
        self.model_generation.load(Ordering::Acquire)
    }

    /// Run `f` with read access to the store
    pub fn with_store<R>(&self, f: impl FnOnce(&BlendshapeStore) -> R) -> R {
        f(&self.store.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn set_keys(&self, keys: Vec<String>) {
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_keys(keys);
    }

    pub fn set_scores_and_matrix(&self, scores: &[f32], matrix: &[f32]) -> Result<()> {
        self.store
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set_scores_and_matrix(scores, matrix)
    }
}

impl BlendshapeSink for SharedFace {
    fn set_blendshape_keys(&self, keys: &[String]) -> Result<()> {
        self.set_keys(keys.to_vec());
        Ok(())
    }

    fn set_blendshapes_and_matrix(
        &self,
        scores: &[f32; BLENDSHAPE_SLOTS],
        matrix: &[f32; MATRIX_LEN],
    ) -> Result<()> {
        self.set_scores_and_matrix(scores, matrix)
    }
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
