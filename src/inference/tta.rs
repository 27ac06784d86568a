//! Test-time augmentation aggregator
//!
//! Runs the engine over the original image plus N augmented variants and
//! averages the probability vectors. Any failed pass fails the aggregate so
//! the averaging denominator is always N + 1.

use image::Rgb32FImage;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::inference::augmentation::Augmenter;
use crate::inference::engine::{InferenceEngine, ProbabilityVector};
use crate::inference::preprocess::Preprocessor;
use crate::utils::error::Result;

/// Output of one aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    /// Prediction for the un-augmented image
    pub original: ProbabilityVector,
    /// Element-wise mean over the original and every variant
    pub mean: ProbabilityVector,
    /// Number of inference passes averaged
    pub passes: usize,
}

/// Borrowed view of the collaborators needed for one aggregation
pub struct TtaAggregator<'a> {
    engine: &'a dyn InferenceEngine,
    preprocessor: &'a Preprocessor,
    augmenter: &'a Augmenter,
}

impl<'a> TtaAggregator<'a> {
    pub fn new(
        engine: &'a dyn InferenceEngine,
        preprocessor: &'a Preprocessor,
        augmenter: &'a Augmenter,
    ) -> Self {
        Self {
            engine,
            preprocessor,
            augmenter,
        }
    }

    /// Single non-augmented pass
    pub fn infer_original(&self, resized: &Rgb32FImage) -> Result<ProbabilityVector> {
        let tensor = self.preprocessor.normalize(resized);
        self.engine.infer(&tensor)
    }

    /// Original pass followed by `num_augmentations` augmented passes
    ///
    /// `resized` is the un-normalized output of [`Preprocessor::resize`].
    pub fn aggregate(
        &self,
        resized: &Rgb32FImage,
        num_augmentations: usize,
        rng: &mut ChaCha8Rng,
    ) -> Result<Aggregate> {
        let original = self.infer_original(resized)?;

        let mut predictions = Vec::with_capacity(num_augmentations + 1);
        predictions.push(original.clone());

        let variants = self.augmenter.variants(resized, num_augmentations, rng);
        for (i, variant) in variants.iter().enumerate() {
            let probs = self.engine.infer(&self.preprocessor.normalize(variant))?;
            debug!("Augmentation {}/{} inferred", i + 1, num_augmentations);
            predictions.push(probs);
        }

        let mean = ProbabilityVector::mean(&predictions)?;
        Ok(Aggregate {
            original,
            mean,
            passes: predictions.len(),
        })
    }
}
