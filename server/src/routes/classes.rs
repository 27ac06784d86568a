//! Class list and model metadata endpoints

use axum::{extract::State, Json};
use saccharum_vision::inference::ModelInfo;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::SharedState;

#[derive(Serialize)]
pub struct ClassesResponse {
    pub success: bool,
    pub classes: Vec<String>,
}

#[derive(Serialize)]
pub struct ModelResponse {
    pub success: bool,
    pub backend: String,
    #[serde(flatten)]
    pub info: ModelInfo,
}

/// GET /api/classes - Ordered class labels
pub async fn list_classes(State(state): State<SharedState>) -> Result<Json<ClassesResponse>, ApiError> {
    let predictor = state.predictor()?;
    Ok(Json(ClassesResponse {
        success: true,
        classes: predictor.classes().labels().to_vec(),
    }))
}

/// GET /api/model - Loaded model description
pub async fn model_info(State(state): State<SharedState>) -> Result<Json<ModelResponse>, ApiError> {
    let predictor = state.predictor()?;
    Ok(Json(ModelResponse {
        success: true,
        backend: saccharum_vision::backend::backend_name().to_string(),
        info: predictor.model_info(),
    }))
}
