//! Inference pipeline
//!
//! - `preprocess`: decode, resize and normalize images into `[1, 3, H, W]` tensors
//! - `augmentation`: seeded test-time augmentation of resized images
//! - `engine`: the `InferenceEngine` seam and the Burn-backed implementation
//! - `tta`: averaging the original pass with N augmented passes
//! - `policy`: threshold decision and user-facing messages
//! - `predictor`: the request pipeline used by the CLI and the server

pub mod augmentation;
pub mod engine;
pub mod policy;
pub mod predictor;
pub mod preprocess;
pub mod result;
pub mod tta;

// Re-export main types for convenience
pub use augmentation::{Augmenter, TtaConfig};
pub use engine::{BurnEngine, InferenceEngine, ProbabilityVector};
pub use predictor::{BatchItem, ModelInfo, Predictor};
pub use preprocess::{ImageTensor, Normalization, Preprocessor};
pub use result::{
    ClassPrediction, PredictOptions, PredictionMethod, PredictionResult, PredictionStatus,
    RankedProbabilities, DEFAULT_NUM_AUGMENTATIONS, DEFAULT_THRESHOLD, TOP_K,
};
pub use tta::{Aggregate, TtaAggregator};
