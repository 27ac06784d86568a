//! Prediction service
//!
//! Ties preprocessing, test-time augmentation, the injected engine and the
//! decision policy into one request pipeline. Public `predict_*` methods never
//! fail: upstream errors become a result with status `error`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use image::DynamicImage;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::backend::{backend_name, default_device, InferenceBackend};
use crate::config::AppConfig;
use crate::inference::augmentation::Augmenter;
use crate::inference::engine::{BurnEngine, InferenceEngine};
use crate::inference::policy;
use crate::inference::preprocess::{Normalization, Preprocessor};
use crate::inference::result::{
    ClassPrediction, PredictOptions, PredictionResult, RankedProbabilities, TOP_K,
};
use crate::inference::tta::TtaAggregator;
use crate::model::{load_classifier, load_model_config, ClassSet};
use crate::utils::error::{Result, SaccharumError};

/// Static description of the loaded model
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub input_shape: [usize; 4],
    pub output_shape: [usize; 2],
    pub classes: Vec<String>,
    pub num_classes: usize,
    pub normalization: Normalization,
}

/// Outcome for one file of a batch
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub path: PathBuf,
    pub result: PredictionResult,
}

/// Shared, read-only prediction pipeline
pub struct Predictor {
    engine: Arc<dyn InferenceEngine>,
    classes: ClassSet,
    preprocessor: Preprocessor,
    augmenter: Augmenter,
    max_augmentations: usize,
}

impl Predictor {
    /// Assemble a predictor around an already loaded engine
    ///
    /// Fails when the engine output width disagrees with the class set.
    pub fn new(
        engine: Arc<dyn InferenceEngine>,
        classes: ClassSet,
        preprocessor: Preprocessor,
    ) -> Result<Self> {
        if engine.num_classes() != classes.len() {
            return Err(SaccharumError::config(format!(
                "Model outputs {} classes but the class list has {}",
                engine.num_classes(),
                classes.len()
            )));
        }

        Ok(Self {
            engine,
            classes,
            preprocessor,
            augmenter: Augmenter::default(),
            max_augmentations: 10,
        })
    }

    pub fn with_augmenter(mut self, augmenter: Augmenter) -> Self {
        self.augmenter = augmenter;
        self
    }

    pub fn with_max_augmentations(mut self, max_augmentations: usize) -> Self {
        self.max_augmentations = max_augmentations;
        self
    }

    /// Load classes, architecture and weights described by `config` on the default backend
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let classes = ClassSet::load(&config.classes_path)?;
        let model_config = load_model_config(
            &config.model_config_path,
            classes.len(),
            config.image_size as usize,
        )?;

        let device = default_device();
        let model = load_classifier::<InferenceBackend>(&config.model_path, &model_config, &device)?;
        let engine = BurnEngine::new(model, device, backend_name());

        let preprocessor = Preprocessor::new(model_config.input_size as u32, config.normalization);
        Ok(Self::new(Arc::new(engine), classes, preprocessor)?
            .with_augmenter(Augmenter::new(config.augmentation.clone()))
            .with_max_augmentations(config.max_augmentations))
    }

    pub fn classes(&self) -> &ClassSet {
        &self.classes
    }

    pub fn max_augmentations(&self) -> usize {
        self.max_augmentations
    }

    pub fn model_info(&self) -> ModelInfo {
        let size = self.preprocessor.image_size() as usize;
        ModelInfo {
            name: self.engine.name(),
            input_shape: [1, 3, size, size],
            output_shape: [1, self.classes.len()],
            classes: self.classes.labels().to_vec(),
            num_classes: self.classes.len(),
            normalization: self.preprocessor.normalization(),
        }
    }

    /// Run the pipeline on a decoded image, propagating failures
    pub fn try_predict(
        &self,
        image: &DynamicImage,
        options: &PredictOptions,
        rng: &mut ChaCha8Rng,
    ) -> Result<PredictionResult> {
        options.validate(self.max_augmentations)?;
        let start = Instant::now();

        debug!("Preprocessing to {}x{}", self.preprocessor.image_size(), self.preprocessor.image_size());
        let resized = self.preprocessor.resize(image);
        let tta = TtaAggregator::new(self.engine.as_ref(), &self.preprocessor, &self.augmenter);

        let augmentations = if options.use_tta {
            options.num_augmentations
        } else {
            0
        };
        let aggregate = tta.aggregate(&resized, augmentations, rng)?;
        debug!("Aggregated {} inference passes", aggregate.passes);

        let top_3 = RankedProbabilities::from_vector(&self.classes, &aggregate.original).top(TOP_K);
        let result = policy::decide(
            &self.classes,
            &aggregate.mean,
            top_3,
            options.threshold,
            options.method(),
        )?;

        debug!("Prediction finished in {:.1} ms", start.elapsed().as_secs_f64() * 1000.0);
        Ok(result)
    }

    /// Predict with a caller-supplied RNG; failures become an error result
    pub fn predict_image(
        &self,
        image: &DynamicImage,
        options: &PredictOptions,
        rng: &mut ChaCha8Rng,
    ) -> PredictionResult {
        self.try_predict(image, options, rng)
            .unwrap_or_else(|e| self.failed(options, e))
    }

    /// Predict from encoded image bytes
    pub fn predict_bytes(&self, bytes: &[u8], options: &PredictOptions) -> PredictionResult {
        match self.preprocessor.decode(bytes) {
            Ok(image) => self.predict_image(&image, options, &mut ChaCha8Rng::from_entropy()),
            Err(e) => self.failed(options, e),
        }
    }

    /// Predict from an image file
    pub fn predict_path(&self, path: &Path, options: &PredictOptions) -> PredictionResult {
        self.predict_path_with_rng(path, options, &mut ChaCha8Rng::from_entropy())
    }

    /// Predict from an image file with a caller-supplied RNG
    pub fn predict_path_with_rng(
        &self,
        path: &Path,
        options: &PredictOptions,
        rng: &mut ChaCha8Rng,
    ) -> PredictionResult {
        info!("Predicting {:?}", path);
        match self.preprocessor.load(path) {
            Ok(image) => self.predict_image(&image, options, rng),
            Err(e) => self.failed(options, e),
        }
    }

    /// Predict several files; a failing file yields an error result and the batch continues
    pub fn predict_batch(
        &self,
        paths: &[PathBuf],
        options: &PredictOptions,
        rng: &mut ChaCha8Rng,
    ) -> Vec<BatchItem> {
        paths
            .iter()
            .map(|path| BatchItem {
                path: path.clone(),
                result: self.predict_path_with_rng(path, options, rng),
            })
            .collect()
    }

    /// Ranked classes from a single non-augmented pass
    pub fn top_k(&self, image: &DynamicImage, k: usize) -> Result<Vec<ClassPrediction>> {
        let tta = TtaAggregator::new(self.engine.as_ref(), &self.preprocessor, &self.augmenter);
        let probs = tta.infer_original(&self.preprocessor.resize(image))?;
        if probs.len() != self.classes.len() {
            return Err(SaccharumError::Inference(format!(
                "Probability vector has {} entries for {} classes",
                probs.len(),
                self.classes.len()
            )));
        }
        Ok(RankedProbabilities::from_vector(&self.classes, &probs).top(k))
    }

    pub fn top_k_bytes(&self, bytes: &[u8], k: usize) -> Result<Vec<ClassPrediction>> {
        let image = self.preprocessor.decode(bytes)?;
        self.top_k(&image, k)
    }

    pub fn top_k_path(&self, path: &Path, k: usize) -> Result<Vec<ClassPrediction>> {
        let image = self.preprocessor.load(path)?;
        self.top_k(&image, k)
    }

    fn failed(&self, options: &PredictOptions, err: SaccharumError) -> PredictionResult {
        error!("Prediction failed: {}", err);
        PredictionResult::error(options.method(), &err)
    }
}
