//! Decision policy: turn an aggregate probability vector into a result

use tracing::{info, warn};

use crate::inference::engine::ProbabilityVector;
use crate::inference::result::{
    ClassPrediction, PredictionMethod, PredictionResult, PredictionStatus, RankedProbabilities,
};
use crate::model::ClassSet;
use crate::utils::error::{Result, SaccharumError};

/// Classify a probability against the reliability threshold
///
/// Equality counts as reliable.
pub fn classify(probability: f32, threshold: f32) -> PredictionStatus {
    if probability >= threshold {
        PredictionStatus::Success
    } else {
        PredictionStatus::Warning
    }
}

/// Human-readable message for an outcome
///
/// Error results carry their failure reason instead, see [`PredictionResult::error`].
pub fn message(status: PredictionStatus, class: &str, confidence: f32, threshold: f32) -> String {
    match status {
        PredictionStatus::Success => format!("Detected: {} ({:.1}%)", class, confidence),
        PredictionStatus::Warning => format!(
            "Low confidence ({:.1}%). Result is not reliable. A minimum of {:.0}% is required.",
            confidence,
            threshold * 100.0
        ),
        PredictionStatus::Error => "Error processing the image".to_string(),
    }
}

/// Apply the threshold to an aggregate vector and assemble the full result
pub fn decide(
    classes: &ClassSet,
    aggregate: &ProbabilityVector,
    top_3: Vec<ClassPrediction>,
    threshold: f32,
    method: PredictionMethod,
) -> Result<PredictionResult> {
    if aggregate.len() != classes.len() {
        return Err(SaccharumError::Inference(format!(
            "Probability vector has {} entries for {} classes",
            aggregate.len(),
            classes.len()
        )));
    }

    let (index, probability) = aggregate
        .argmax()
        .ok_or_else(|| SaccharumError::Inference("Empty probability vector".to_string()))?;
    let class = classes
        .name(index)
        .ok_or_else(|| {
            SaccharumError::Inference(format!("Class index {} outside the class set", index))
        })?
        .to_string();

    let confidence = probability * 100.0;
    let status = classify(probability, threshold);
    match status {
        PredictionStatus::Success => info!("Prediction: {} ({:.1}%)", class, confidence),
        _ => warn!("Low confidence prediction: {} ({:.1}%)", class, confidence),
    }

    Ok(PredictionResult {
        status,
        message: message(status, &class, confidence, threshold),
        class,
        confidence,
        probability,
        probabilities: RankedProbabilities::from_vector(classes, aggregate),
        top_3,
        method,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes() -> ClassSet {
        ClassSet::default()
    }

    #[test]
    fn test_threshold_boundary_is_success() {
        assert_eq!(classify(0.70, 0.70), PredictionStatus::Success);
        assert_eq!(classify(0.6999, 0.70), PredictionStatus::Warning);
        assert_eq!(classify(0.0, 0.0), PredictionStatus::Success);
    }

    #[test]
    fn test_warning_states_required_minimum() {
        let aggregate = ProbabilityVector::new(vec![0.65, 0.15, 0.1, 0.05, 0.05]);
        let result = decide(
            &classes(),
            &aggregate,
            Vec::new(),
            0.70,
            PredictionMethod::Direct,
        )
        .unwrap();

        assert_eq!(result.status, PredictionStatus::Warning);
        assert_eq!(result.class, "Healthy");
        assert!((result.confidence - 65.0).abs() < 1e-4);
        assert!(result.message.contains("70%"));
    }

    #[test]
    fn test_success_message() {
        let aggregate = ProbabilityVector::new(vec![0.05, 0.05, 0.8, 0.05, 0.05]);
        let result = decide(
            &classes(),
            &aggregate,
            Vec::new(),
            0.70,
            PredictionMethod::Tta { num_augmentations: 5 },
        )
        .unwrap();

        assert_eq!(result.status, PredictionStatus::Success);
        assert_eq!(result.message, "Detected: RedRot (80.0%)");
        assert_eq!(result.probabilities.entries()[0].0, "RedRot");
        assert_eq!(result.probabilities.len(), 5);
    }

    #[test]
    fn test_width_mismatch_is_inference_error() {
        let aggregate = ProbabilityVector::new(vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        let err = decide(&classes(), &aggregate, Vec::new(), 0.7, PredictionMethod::Direct)
            .unwrap_err();
        assert!(matches!(err, SaccharumError::Inference(_)));
    }
}
