//! Model module: CNN architecture, class set and artifact loading
//!
//! A deployed model consists of three files:
//! - a Burn weights record (`CompactRecorder`, `.mpk`)
//! - an optional architecture config (`SugarcaneClassifierConfig` as JSON)
//! - the ordered class list (JSON array of strings)

pub mod classes;
pub mod cnn;

use std::path::Path;

use burn::config::Config;
use burn::module::Module;
use burn::record::CompactRecorder;
use burn::tensor::backend::Backend;
use tracing::{info, warn};

use crate::utils::error::{Result, SaccharumError};

// Re-export main types for convenience
pub use classes::{ClassSet, DEFAULT_CLASSES};
pub use cnn::{
    is_valid_input_size, SugarcaneClassifier, SugarcaneClassifierConfig, INPUT_SIZE_MULTIPLE,
};

/// Load the architecture config, or derive a default one sized to the class set
///
/// Rejects input sizes the pooling stages cannot reduce.
pub fn load_model_config(
    path: &Path,
    num_classes: usize,
    input_size: usize,
) -> Result<SugarcaneClassifierConfig> {
    let config = if path.exists() {
        SugarcaneClassifierConfig::load(path).map_err(|e| {
            SaccharumError::config(format!("Invalid model config {:?}: {}", path, e))
        })?
    } else {
        warn!(
            "Model config not found at {:?}, using default architecture with {} classes",
            path, num_classes
        );
        SugarcaneClassifierConfig::new()
            .with_num_classes(num_classes)
            .with_input_size(input_size)
    };

    if !is_valid_input_size(config.input_size) {
        return Err(SaccharumError::config(format!(
            "Input size {} must be a positive multiple of {}",
            config.input_size, INPUT_SIZE_MULTIPLE
        )));
    }
    Ok(config)
}

/// Load a pretrained classifier from a weights record
pub fn load_classifier<B: Backend>(
    weights_path: &Path,
    config: &SugarcaneClassifierConfig,
    device: &B::Device,
) -> Result<SugarcaneClassifier<B>> {
    if !weights_path.exists() {
        return Err(SaccharumError::config(format!(
            "Model not found: {}",
            weights_path.display()
        )));
    }

    info!("Loading model from: {:?}", weights_path);
    let model = SugarcaneClassifier::<B>::new(config, device)
        .load_file(weights_path, &CompactRecorder::new(), device)
        .map_err(|e| {
            SaccharumError::config(format!(
                "Failed to load model weights {:?}: {:?}",
                weights_path, e
            ))
        })?;

    info!(
        "Model loaded: input [1, {}, {}, {}] -> output [1, {}]",
        config.in_channels,
        config.input_size,
        config.input_size,
        model.num_classes()
    );
    Ok(model)
}
