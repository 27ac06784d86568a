//! Prediction endpoints
//!
//! Uploads are validated and stored before inference. The blocking
//! prediction runs on the blocking thread pool.

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use saccharum_vision::inference::{ClassPrediction, PredictionResult, PredictionStatus, TOP_K};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::routes::upload::{image_url, parse_options, read_upload, store, stored_name};
use crate::state::SharedState;

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub success: bool,
    pub status: PredictionStatus,
    pub filename: String,
    pub image_url: String,
    pub prediction: PredictionResult,
}

#[derive(Debug, Serialize)]
pub struct TopResponse {
    pub success: bool,
    pub filename: String,
    pub image_url: String,
    pub top_3: Vec<ClassPrediction>,
}

/// POST /api/predict - TTA prediction (also served as /api/predict-improved)
///
/// A failed prediction is returned with status 422 and the structured
/// `status: error` result.
pub async fn predict(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<PredictResponse>), ApiError> {
    let upload = read_upload(multipart, state.config.max_content_length).await?;
    let predictor = state.predictor()?;

    let filename = stored_name(&state.config, &upload.filename)?;
    let options = parse_options(&upload.fields, &state.config)?;
    store(&state.config.upload_dir, &filename, &upload.bytes).await?;

    info!("Processing image: {}", filename);
    info!(
        "  TTA: {}, Threshold: {}, Augmentations: {}",
        options.use_tta, options.threshold, options.num_augmentations
    );

    let bytes = upload.bytes;
    let prediction = tokio::task::spawn_blocking(move || predictor.predict_bytes(&bytes, &options))
        .await
        .map_err(|e| ApiError::internal(format!("Prediction task failed: {}", e)))?;

    let code = match prediction.status {
        PredictionStatus::Success => StatusCode::OK,
        PredictionStatus::Warning => {
            warn!(
                "Low confidence prediction for {}: {} ({:.2}%)",
                filename, prediction.class, prediction.confidence
            );
            StatusCode::OK
        }
        PredictionStatus::Error => StatusCode::UNPROCESSABLE_ENTITY,
    };

    Ok((
        code,
        Json(PredictResponse {
            success: prediction.status.is_usable(),
            status: prediction.status,
            image_url: image_url(&filename),
            filename,
            prediction,
        }),
    ))
}

/// POST /api/predict-top3 - Top-3 classes from a single non-augmented pass
pub async fn predict_top3(
    State(state): State<SharedState>,
    multipart: Multipart,
) -> Result<Json<TopResponse>, ApiError> {
    let upload = read_upload(multipart, state.config.max_content_length).await?;
    let predictor = state.predictor()?;

    let filename = stored_name(&state.config, &upload.filename)?;
    store(&state.config.upload_dir, &filename, &upload.bytes).await?;
    info!("Top-{} for: {}", TOP_K, filename);

    let bytes = upload.bytes;
    let top_3 = tokio::task::spawn_blocking(move || predictor.top_k_bytes(&bytes, TOP_K))
        .await
        .map_err(|e| ApiError::internal(format!("Prediction task failed: {}", e)))??;

    Ok(Json(TopResponse {
        success: true,
        image_url: image_url(&filename),
        filename,
        top_3,
    }))
}
