//! Inference engine abstraction
//!
//! The aggregator only needs `infer(tensor) -> probabilities`. The Burn
//! classifier is one implementation; tests plug in scripted engines.

use std::sync::{Mutex, PoisonError};

use burn::tensor::{backend::Backend, Tensor};
use serde::Serialize;

use crate::inference::preprocess::ImageTensor;
use crate::model::{is_valid_input_size, SugarcaneClassifier, INPUT_SIZE_MULTIPLE};
use crate::utils::error::{Result, SaccharumError};

/// One probability per class, positionally aligned with the class set
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ProbabilityVector(Vec<f32>);

impl ProbabilityVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Index and value of the maximum; the first index wins on exact ties
    pub fn argmax(&self) -> Option<(usize, f32)> {
        self.0
            .iter()
            .copied()
            .enumerate()
            .fold(None, |best, (i, p)| match best {
                Some((_, bp)) if bp >= p => best,
                _ => Some((i, p)),
            })
    }

    /// Class indices sorted by descending probability, stable for exact ties
    pub fn ranked(&self) -> Vec<(usize, f32)> {
        let mut indexed: Vec<(usize, f32)> = self.0.iter().copied().enumerate().collect();
        indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
        indexed
    }

    /// Element-wise mean of equally sized vectors
    pub fn mean(vectors: &[ProbabilityVector]) -> Result<ProbabilityVector> {
        let first = vectors
            .first()
            .ok_or_else(|| SaccharumError::Inference("No predictions to average".to_string()))?;

        let width = first.len();
        let mut sums = vec![0.0f64; width];
        for vector in vectors {
            if vector.len() != width {
                return Err(SaccharumError::Inference(format!(
                    "Prediction width mismatch: expected {}, got {}",
                    width,
                    vector.len()
                )));
            }
            for (sum, &p) in sums.iter_mut().zip(vector.as_slice()) {
                *sum += p as f64;
            }
        }

        let count = vectors.len() as f64;
        Ok(ProbabilityVector(
            sums.into_iter().map(|s| (s / count) as f32).collect(),
        ))
    }
}

/// A loaded network mapping a batched image tensor to class probabilities
///
/// Implementations must be safe to share across request handlers. Engines
/// whose runtime is not re-entrant serialize calls internally.
pub trait InferenceEngine: Send + Sync {
    /// Run one forward pass on a `[1, 3, H, W]` tensor
    fn infer(&self, input: &ImageTensor) -> Result<ProbabilityVector>;

    /// Width of the probability vectors this engine produces
    fn num_classes(&self) -> usize;

    /// Human-readable engine name for diagnostics
    fn name(&self) -> String;
}

/// Burn classifier behind a mutex, so concurrent requests queue
///
/// The weights are never mutated, so a lock poisoned by a panicking request
/// is recovered rather than failing every later request.
pub struct BurnEngine<B: Backend> {
    model: Mutex<SugarcaneClassifier<B>>,
    device: B::Device,
    num_classes: usize,
    backend_name: &'static str,
}

impl<B: Backend> BurnEngine<B> {
    pub fn new(model: SugarcaneClassifier<B>, device: B::Device, backend_name: &'static str) -> Self {
        let num_classes = model.num_classes();
        Self {
            model: Mutex::new(model),
            device,
            num_classes,
            backend_name,
        }
    }
}

impl<B: Backend> InferenceEngine for BurnEngine<B> {
    fn infer(&self, input: &ImageTensor) -> Result<ProbabilityVector> {
        let [_, _, height, width] = input.shape();
        if !is_valid_input_size(height) || !is_valid_input_size(width) {
            return Err(SaccharumError::Inference(format!(
                "Input {}x{} is not a positive multiple of {}",
                width, height, INPUT_SIZE_MULTIPLE
            )));
        }

        let model = self.model.lock().unwrap_or_else(PoisonError::into_inner);

        let tensor =
            Tensor::<B, 1>::from_floats(input.data(), &self.device).reshape(input.shape());
        let output = model.forward_softmax(tensor);

        let probs: Vec<f32> = output
            .into_data()
            .to_vec()
            .map_err(|e| SaccharumError::Inference(format!("Failed to read output: {:?}", e)))?;

        if probs.len() != self.num_classes {
            return Err(SaccharumError::Inference(format!(
                "Expected {} probabilities, got {}",
                self.num_classes,
                probs.len()
            )));
        }

        Ok(ProbabilityVector::new(probs))
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn name(&self) -> String {
        format!("SugarcaneClassifier ({})", self.backend_name)
    }
}
