//! # SaccharumVision
//!
//! Sugarcane leaf disease classification built on the Burn framework.
//!
//! A single image is classified into one of a fixed set of conditions
//! (Healthy, Mosaic, RedRot, Rust, Yellow by default). Robustness comes from
//! test-time augmentation: the original image and N randomly rotated, flipped
//! and color-jittered variants are classified and their probabilities averaged.
//! A confidence threshold then marks the result as reliable or not.
//!
//! ## Modules
//!
//! - `model`: CNN architecture, class set and weight loading
//! - `inference`: preprocessing, augmentation, aggregation and the decision policy
//! - `config`: application configuration shared by the CLI and the server
//! - `utils`: error type, logging and formatting helpers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use saccharum_vision::{AppConfig, PredictOptions, Predictor};
//!
//! let predictor = Predictor::from_config(&AppConfig::default())?;
//! let result = predictor.predict_path("leaf.jpg".as_ref(), &PredictOptions::default());
//! println!("{}: {}", result.status, result.message);
//! ```

pub mod backend;
pub mod config;
pub mod inference;
pub mod model;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::{AppConfig, Environment};
pub use inference::{
    InferenceEngine, PredictOptions, PredictionResult, PredictionStatus, Predictor,
    ProbabilityVector,
};
pub use model::{ClassSet, SugarcaneClassifier, SugarcaneClassifierConfig};
pub use utils::error::{Result, SaccharumError};

/// Default square input resolution
pub const DEFAULT_IMAGE_SIZE: u32 = 224;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
