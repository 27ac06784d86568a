//! Application state for the SaccharumVision server

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use saccharum_vision::{AppConfig, Predictor, SaccharumError};

/// Shared application state
pub struct AppState {
    /// Server configuration
    pub config: AppConfig,
    /// Loaded prediction pipeline; `None` when the model failed to load
    pub predictor: Option<Arc<Predictor>>,
    /// Monotonic start time for uptime
    pub started_at: Instant,
    /// Wall-clock start time reported by the health check
    pub started_at_utc: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: AppConfig, predictor: Option<Arc<Predictor>>) -> Self {
        Self {
            config,
            predictor,
            started_at: Instant::now(),
            started_at_utc: Utc::now(),
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.predictor.is_some()
    }

    /// The predictor, or `ModelUnavailable` when none is loaded
    pub fn predictor(&self) -> Result<Arc<Predictor>, SaccharumError> {
        self.predictor.clone().ok_or_else(|| {
            SaccharumError::ModelUnavailable(
                "The model is not loaded. Please restart the server.".to_string(),
            )
        })
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

pub type SharedState = Arc<AppState>;
