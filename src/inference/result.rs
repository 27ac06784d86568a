//! Prediction request options and result types

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::inference::engine::ProbabilityVector;
use crate::model::ClassSet;
use crate::utils::error::{Result, SaccharumError};

/// Default minimum probability for a reliable prediction
pub const DEFAULT_THRESHOLD: f32 = 0.70;

/// Default number of augmented variants per TTA request
pub const DEFAULT_NUM_AUGMENTATIONS: usize = 5;

/// Number of ranked classes attached to every result
pub const TOP_K: usize = 3;

/// Caller-supplied prediction parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictOptions {
    pub use_tta: bool,
    pub threshold: f32,
    pub num_augmentations: usize,
}

impl Default for PredictOptions {
    fn default() -> Self {
        Self {
            use_tta: true,
            threshold: DEFAULT_THRESHOLD,
            num_augmentations: DEFAULT_NUM_AUGMENTATIONS,
        }
    }
}

impl PredictOptions {
    /// Check the threshold range and the augmentation bound
    pub fn validate(&self, max_augmentations: usize) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(SaccharumError::InvalidInput(format!(
                "threshold must be between 0.0 and 1.0, got {}",
                self.threshold
            )));
        }
        if self.use_tta && self.num_augmentations > max_augmentations {
            return Err(SaccharumError::InvalidInput(format!(
                "num_augmentations must be at most {}, got {}",
                max_augmentations, self.num_augmentations
            )));
        }
        Ok(())
    }

    pub fn method(&self) -> PredictionMethod {
        if self.use_tta {
            PredictionMethod::Tta {
                num_augmentations: self.num_augmentations,
            }
        } else {
            PredictionMethod::Direct
        }
    }
}

/// Outcome of the decision policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    Success,
    Warning,
    Error,
}

impl PredictionStatus {
    /// Whether the caller received a usable label
    pub fn is_usable(&self) -> bool {
        !matches!(self, PredictionStatus::Error)
    }
}

impl std::fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictionStatus::Success => write!(f, "success"),
            PredictionStatus::Warning => write!(f, "warning"),
            PredictionStatus::Error => write!(f, "error"),
        }
    }
}

/// How the aggregate probabilities were produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionMethod {
    Tta { num_augmentations: usize },
    Direct,
}

impl std::fmt::Display for PredictionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictionMethod::Tta { num_augmentations } => {
                write!(f, "TTA ({} augmentations)", num_augmentations)
            }
            PredictionMethod::Direct => write!(f, "Direct prediction"),
        }
    }
}

impl Serialize for PredictionMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A single ranked class
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassPrediction {
    pub class: String,
    /// Probability on the 0-100 scale
    pub confidence: f32,
    /// Probability on the 0-1 scale
    pub probability: f32,
}

/// Class -> probability mapping, sorted descending; serializes as an ordered JSON object
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RankedProbabilities(Vec<(String, f32)>);

impl RankedProbabilities {
    /// Pair every class with its probability, highest first (stable for ties)
    pub fn from_vector(classes: &ClassSet, probs: &ProbabilityVector) -> Self {
        Self(
            probs
                .ranked()
                .into_iter()
                .filter_map(|(i, p)| classes.name(i).map(|name| (name.to_string(), p)))
                .collect(),
        )
    }

    pub fn entries(&self) -> &[(String, f32)] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, class: &str) -> Option<f32> {
        self.0.iter().find(|(name, _)| name == class).map(|(_, p)| *p)
    }

    /// The first `k` entries as ranked class predictions
    pub fn top(&self, k: usize) -> Vec<ClassPrediction> {
        self.0
            .iter()
            .take(k)
            .map(|(class, p)| ClassPrediction {
                class: class.clone(),
                confidence: p * 100.0,
                probability: *p,
            })
            .collect()
    }
}

impl Serialize for RankedProbabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (class, p) in &self.0 {
            map.serialize_entry(class, p)?;
        }
        map.end()
    }
}

/// Result of one prediction request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub status: PredictionStatus,
    pub class: String,
    /// Aggregate top probability on the 0-100 scale
    pub confidence: f32,
    /// Aggregate top probability on the 0-1 scale
    pub probability: f32,
    pub probabilities: RankedProbabilities,
    pub top_3: Vec<ClassPrediction>,
    pub method: PredictionMethod,
    pub message: String,
}

impl PredictionResult {
    /// Terminal error result: no label, zero confidence, the reason as message
    pub fn error(method: PredictionMethod, reason: &SaccharumError) -> Self {
        Self {
            status: PredictionStatus::Error,
            class: "Unknown".to_string(),
            confidence: 0.0,
            probability: 0.0,
            probabilities: RankedProbabilities::default(),
            top_3: Vec::new(),
            method,
            message: format!("Error processing the image: {}", reason),
        }
    }
}
