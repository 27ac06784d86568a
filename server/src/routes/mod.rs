//! HTTP routes

pub mod classes;
pub mod health;
pub mod predict;
pub mod upload;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::services::ServeDir;

use crate::state::SharedState;

/// All API routes plus the static upload directory
pub fn router(state: SharedState) -> Router {
    let upload_dir = state.config.upload_dir.clone();
    let body_limit = state.config.max_content_length;

    Router::new()
        // Status
        .route("/api/health", get(health::health_check))
        .route("/api/classes", get(classes::list_classes))
        .route("/api/model", get(classes::model_info))

        // Prediction
        .route("/api/predict", post(predict::predict))
        .route("/api/predict-improved", post(predict::predict))
        .route("/api/predict-top3", post(predict::predict_top3))

        // Stored uploads
        .nest_service("/uploads", ServeDir::new(upload_dir))

        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use image::{ImageFormat, Rgb, RgbImage};
    use saccharum_vision::inference::{
        ImageTensor, InferenceEngine, Normalization, Preprocessor, ProbabilityVector,
    };
    use saccharum_vision::{AppConfig, ClassSet, Predictor, Result};
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "saccharum-test-boundary";

    struct FixedEngine {
        probs: Vec<f32>,
        calls: Arc<AtomicUsize>,
    }

    impl InferenceEngine for FixedEngine {
        fn infer(&self, _input: &ImageTensor) -> Result<ProbabilityVector> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ProbabilityVector::new(self.probs.clone()))
        }

        fn num_classes(&self) -> usize {
            self.probs.len()
        }

        fn name(&self) -> String {
            "fixed".to_string()
        }
    }

    struct Harness {
        _dir: TempDir,
        app: Router,
        calls: Arc<AtomicUsize>,
        upload_dir: std::path::PathBuf,
    }

    fn harness(probs: Option<Vec<f32>>, max_content_length: usize) -> Harness {
        let dir = TempDir::new().unwrap();
        let upload_dir = dir.path().join("uploads");
        let config = AppConfig {
            upload_dir: upload_dir.clone(),
            max_content_length,
            ..AppConfig::default()
        };

        let calls = Arc::new(AtomicUsize::new(0));
        let predictor = probs.map(|probs| {
            let engine = FixedEngine {
                probs,
                calls: calls.clone(),
            };
            Arc::new(
                Predictor::new(
                    Arc::new(engine),
                    ClassSet::default(),
                    Preprocessor::new(16, Normalization::ImageNet),
                )
                .unwrap(),
            )
        });

        let state = Arc::new(AppState::new(config, predictor));
        Harness {
            _dir: dir,
            app: router(state),
            calls,
            upload_dir,
        }
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(24, 24, Rgb([40, 150, 60]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn multipart_body(filename: &str, file: &[u8], fields: &[(&str, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(file);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_model_state() {
        let h = harness(Some(vec![0.2; 5]), 1024 * 1024);
        let (status, body) = send(h.app, get_request("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["model_loaded"], true);

        let h = harness(None, 1024 * 1024);
        let (status, body) = send(h.app, get_request("/api/health")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
    }

    #[tokio::test]
    async fn test_classes_and_model_info() {
        let h = harness(Some(vec![0.2; 5]), 1024 * 1024);
        let (status, body) = send(h.app.clone(), get_request("/api/classes")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["classes"][2], "RedRot");

        let (status, body) = send(h.app, get_request("/api/model")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["num_classes"], 5);
        assert_eq!(body["normalization"], "imagenet");
    }

    #[tokio::test]
    async fn test_classes_without_model_is_unavailable() {
        let h = harness(None, 1024 * 1024);
        let (status, body) = send(h.app, get_request("/api/classes")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_predict_runs_tta_and_stores_upload() {
        let h = harness(Some(vec![0.05, 0.8, 0.05, 0.05, 0.05]), 1024 * 1024);
        let body = multipart_body("my leaf.png", &png_bytes(), &[]);
        let (status, json) = send(h.app, upload_request("/api/predict", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["status"], "success");
        assert_eq!(json["prediction"]["class"], "Mosaic");
        assert_eq!(json["prediction"]["method"], "TTA (5 augmentations)");
        assert_eq!(json["prediction"]["top_3"].as_array().unwrap().len(), 3);
        assert_eq!(h.calls.load(Ordering::SeqCst), 6);

        let filename = json["filename"].as_str().unwrap();
        assert!(filename.ends_with("_my_leaf.png"));
        assert_eq!(json["image_url"], format!("/uploads/{}", filename));
        assert!(h.upload_dir.join(filename).exists());
    }

    #[tokio::test]
    async fn test_predict_improved_alias_with_options() {
        let h = harness(Some(vec![0.65, 0.15, 0.1, 0.05, 0.05]), 1024 * 1024);
        let body = multipart_body("leaf.jpg", &png_bytes(), &[("use_tta", "false"), ("threshold", "0.7")]);
        let (status, json) = send(h.app, upload_request("/api/predict-improved", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "warning");
        assert_eq!(json["success"], true);
        assert_eq!(json["prediction"]["method"], "Direct prediction");
        assert!(json["prediction"]["message"].as_str().unwrap().contains("70%"));
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_predict_rejects_bad_uploads() {
        let h = harness(Some(vec![0.2; 5]), 1024 * 1024);

        let body = multipart_body("notes.txt", b"hello", &[]);
        let (status, json) = send(h.app.clone(), upload_request("/api/predict", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().starts_with("File type not allowed"));

        let body = multipart_body("", &png_bytes(), &[]);
        let (status, json) = send(h.app.clone(), upload_request("/api/predict", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "The file has no name");

        let body = format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"threshold\"\r\n\r\n0.5\r\n--{BOUNDARY}--\r\n");
        let (status, json) = send(h.app, upload_request("/api/predict", body.into_bytes())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No file was sent");
    }

    #[tokio::test]
    async fn test_corrupt_image_yields_error_result() {
        let h = harness(Some(vec![0.2; 5]), 1024 * 1024);
        let body = multipart_body("broken.png", b"definitely not a png", &[]);
        let (status, json) = send(h.app, upload_request("/api/predict", body)).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json["success"], false);
        assert_eq!(json["status"], "error");
        assert_eq!(json["prediction"]["confidence"], 0.0);
        assert_eq!(json["prediction"]["probability"], 0.0);
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_oversized_upload_is_413() {
        let h = harness(Some(vec![0.2; 5]), 256);
        let body = multipart_body("leaf.png", &vec![7u8; 4096], &[]);
        let (status, json) = send(h.app, upload_request("/api/predict", body)).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("too large"));
    }

    #[tokio::test]
    async fn test_predict_without_model_is_unavailable() {
        let h = harness(None, 1024 * 1024);
        let body = multipart_body("leaf.png", &png_bytes(), &[]);
        let (status, _) = send(h.app, upload_request("/api/predict", body)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_top3_uses_single_pass() {
        let h = harness(Some(vec![0.1, 0.2, 0.3, 0.35, 0.05]), 1024 * 1024);
        let body = multipart_body("leaf.bmp", &png_bytes(), &[]);
        let (status, json) = send(h.app, upload_request("/api/predict-top3", body)).await;

        assert_eq!(status, StatusCode::OK);
        let top = json["top_3"].as_array().unwrap();
        assert_eq!(top.len(), 3);
        assert_eq!(top[0]["class"], "Rust");
        assert_eq!(top[1]["class"], "RedRot");
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    }
}
