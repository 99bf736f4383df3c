//! Error types for cartoon-head

use thiserror::Error;

/// Main error type for cartoon-head
#[derive(Error, Debug)]
pub enum CartoonHeadError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Face state error: {0}")]
    Face(#[from] FaceError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Tracking error: {0}")]
    Tracking(#[from] TrackingError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid configuration value: {field} - {message}")]
    InvalidValue { field: String, message: String },
}

/// Errors raised while storing forwarded blendshape data
#[derive(Error, Debug)]
pub enum FaceError {
    #[error("Expected at least {expected} blendshape scores, got {actual}")]
    ScoreCount { expected: usize, actual: usize },

    #[error("Expected at least {expected} matrix elements, got {actual}")]
    MatrixLength { expected: usize, actual: usize },
}

/// glTF model loading errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read model file: {0}")]
    Read(String),

    #[error("Failed to import glTF: {0}")]
    Import(#[from] gltf::Error),

    #[error("Model has no drawable primitive")]
    NoGeometry,
}

/// OpenGL rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to create GL object: {0}")]
    CreateObject(String),

    #[error("Shader compilation failed: {0}")]
    ShaderCompile(String),

    #[error("Program link failed: {0}")]
    ProgramLink(String),

    #[error("GL context unavailable: {0}")]
    Context(String),
}

/// Landmarker result feed errors
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("Receiver error: {0}")]
    Receiver(String),

    #[error("Result parse error: {0}")]
    Parse(String),
}

/// JNI boundary errors
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("JNI call failed: {0}")]
    Jni(#[from] jni::errors::Error),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Panic in native call: {0}")]
    Panic(String),
}

/// Result type alias for cartoon-head operations
pub type Result<T> = std::result::Result<T, CartoonHeadError>;
