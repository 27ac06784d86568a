//! Error Handling Module
//!
//! Defines the error taxonomy for SaccharumVision.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for SaccharumVision operations
#[derive(Error, Debug)]
pub enum SaccharumError {
    /// The image bytes could not be decoded (corrupt or unsupported format)
    #[error("Failed to decode image: {0}")]
    Decode(String),

    /// No inference engine is loaded
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// The engine failed for the original image or one of its variants
    #[error("Inference error: {0}")]
    Inference(String),

    /// Missing or inconsistent model/class artifacts, fatal at startup
    #[error("Configuration error: {}", .0.join("; "))]
    Configuration(Vec<String>),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid caller-supplied input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Path not found
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

impl SaccharumError {
    /// Shorthand for a configuration error with a single diagnostic
    pub fn config(msg: impl Into<String>) -> Self {
        SaccharumError::Configuration(vec![msg.into()])
    }
}

impl From<image::ImageError> for SaccharumError {
    fn from(err: image::ImageError) -> Self {
        SaccharumError::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for SaccharumError {
    fn from(err: serde_json::Error) -> Self {
        SaccharumError::Serialization(err.to_string())
    }
}

/// Convenience Result type for SaccharumVision operations
pub type Result<T> = std::result::Result<T, SaccharumError>;

/// Extension trait for turning foreign errors and missing values into invalid-input errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| SaccharumError::InvalidInput(format!("{}: {}", msg, e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| SaccharumError::InvalidInput(format!("{}: {}", f(), e)))
    }
}

impl<T> ResultExt<T> for Option<T> {
    fn context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| SaccharumError::InvalidInput(msg.to_string()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.ok_or_else(|| SaccharumError::InvalidInput(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SaccharumError::Inference("engine panicked".to_string());
        assert_eq!(format!("{}", err), "Inference error: engine panicked");
    }

    #[test]
    fn test_configuration_joins_diagnostics() {
        let err = SaccharumError::Configuration(vec![
            "Model not found: models/a.mpk".to_string(),
            "Models directory not found: models".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "Configuration error: Model not found: models/a.mpk; Models directory not found: models"
        );
    }

    #[test]
    fn test_image_error_maps_to_decode() {
        let err: SaccharumError = image::load_from_memory(b"definitely not an image")
            .unwrap_err()
            .into();
        assert!(matches!(err, SaccharumError::Decode(_)));
    }

    #[test]
    fn test_result_context() {
        let parsed: std::result::Result<f32, std::num::ParseFloatError> = "abc".parse::<f32>();
        let err = parsed.context("threshold must be a number").unwrap_err();
        assert!(matches!(err, SaccharumError::InvalidInput(_)));
        assert!(err.to_string().contains("threshold must be a number"));
    }

    #[test]
    fn test_option_context() {
        let opt: Option<i32> = None;
        let with_context = opt.with_context(|| "missing field".to_string());
        assert!(with_context.is_err());
    }
}
