//! Application configuration
//!
//! Layering, lowest precedence first: the environment profile selected by
//! `SACCHARUM_ENV`, an optional JSON config file, then command-line flags
//! applied by the binaries.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::inference::augmentation::TtaConfig;
use crate::inference::preprocess::Normalization;
use crate::inference::result::{PredictOptions, DEFAULT_NUM_AUGMENTATIONS, DEFAULT_THRESHOLD};
use crate::model::{is_valid_input_size, INPUT_SIZE_MULTIPLE};
use crate::utils::error::{Result, SaccharumError};
use crate::DEFAULT_IMAGE_SIZE;

/// Environment variable selecting the profile
pub const ENV_VAR: &str = "SACCHARUM_ENV";

/// Upper bound on uploaded file size (16 MiB)
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 16 * 1024 * 1024;

/// Deployment profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    /// Read the profile from `SACCHARUM_ENV`; anything but "production" is development
    pub fn from_env() -> Self {
        match std::env::var(ENV_VAR) {
            Ok(value) => Self::parse(&value),
            Err(_) => Self::default(),
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Runtime configuration shared by the CLI and the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Burn weights record
    pub model_path: PathBuf,
    /// Optional architecture config next to the weights
    pub model_config_path: PathBuf,
    /// Ordered class list (JSON array)
    pub classes_path: PathBuf,
    /// Square input resolution, used when no architecture config is present
    pub image_size: u32,
    pub normalization: Normalization,

    pub upload_dir: PathBuf,
    /// Lowercase extensions accepted for upload
    pub allowed_extensions: Vec<String>,
    /// Maximum upload size in bytes
    pub max_content_length: usize,

    pub host: String,
    pub port: u16,
    /// Verbose server logging
    pub debug: bool,

    pub default_threshold: f32,
    pub default_num_augmentations: usize,
    pub max_augmentations: usize,
    /// Perturbation ranges for augmented variants
    pub augmentation: TtaConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/sugarcane_classifier.mpk"),
            model_config_path: PathBuf::from("models/model_config.json"),
            classes_path: PathBuf::from("models/classes.json"),
            image_size: DEFAULT_IMAGE_SIZE,
            normalization: Normalization::default(),
            upload_dir: PathBuf::from("uploads"),
            allowed_extensions: ["png", "jpg", "jpeg", "bmp", "tiff"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            host: "0.0.0.0".to_string(),
            port: 5000,
            debug: true,
            default_threshold: DEFAULT_THRESHOLD,
            default_num_augmentations: DEFAULT_NUM_AUGMENTATIONS,
            max_augmentations: 10,
            augmentation: TtaConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults for a deployment profile
    pub fn for_environment(env: Environment) -> Self {
        match env {
            Environment::Development => Self::default(),
            Environment::Production => Self {
                debug: false,
                ..Self::default()
            },
        }
    }

    /// Profile from `SACCHARUM_ENV`, overridden by `path` when given
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let env = Environment::from_env();
        match path {
            Some(path) => {
                info!("Loading configuration from {:?} ({} profile)", path, env);
                Self::load(path)
            }
            None => Ok(Self::for_environment(env)),
        }
    }

    /// Load from a JSON file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SaccharumError::PathNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| SaccharumError::config(format!("Invalid config {:?}: {}", path, e)))
    }

    /// Request options built from the configured defaults
    pub fn default_options(&self) -> PredictOptions {
        PredictOptions {
            use_tta: true,
            threshold: self.default_threshold,
            num_augmentations: self.default_num_augmentations,
        }
    }

    /// Startup checks; an empty list means the deployment is usable
    ///
    /// Creates the upload directory when it is missing.
    pub fn validate_paths(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.model_path.exists() {
            errors.push(format!("Model not found: {}", self.model_path.display()));
        }

        if let Some(model_dir) = self.model_path.parent() {
            if !model_dir.as_os_str().is_empty() && !model_dir.exists() {
                errors.push(format!(
                    "Model directory not found: {}",
                    model_dir.display()
                ));
            }
        }

        if !self.upload_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(&self.upload_dir) {
                errors.push(format!(
                    "Could not create upload directory {}: {}",
                    self.upload_dir.display(),
                    e
                ));
            }
        }

        if !is_valid_input_size(self.image_size as usize) {
            errors.push(format!(
                "image_size must be a positive multiple of {}, got {}",
                INPUT_SIZE_MULTIPLE, self.image_size
            ));
        }

        if !(0.0..=1.0).contains(&self.default_threshold) {
            errors.push(format!(
                "default_threshold must be between 0.0 and 1.0, got {}",
                self.default_threshold
            ));
        }

        if self.default_num_augmentations > self.max_augmentations {
            errors.push(format!(
                "default_num_augmentations ({}) exceeds max_augmentations ({})",
                self.default_num_augmentations, self.max_augmentations
            ));
        }

        errors
    }

    /// Whether a file name carries an accepted extension (case-insensitive)
    pub fn is_allowed_extension(&self, filename: &str) -> bool {
        match filename.rsplit_once('.') {
            Some((_, ext)) => {
                let ext = ext.to_lowercase();
                self.allowed_extensions.iter().any(|allowed| *allowed == ext)
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.port, 5000);
        assert_eq!(config.image_size, DEFAULT_IMAGE_SIZE);
        assert_eq!(config.max_content_length, 16 * 1024 * 1024);
        assert_eq!(config.default_options(), PredictOptions::default());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse(" PROD "), Environment::Production);
        assert_eq!(Environment::parse("staging"), Environment::Development);
        assert!(!AppConfig::for_environment(Environment::Production).debug);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"port": 8080, "normalization": "caffe", "augmentation": {"brightness_delta": 0.0}}"#,
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.normalization, Normalization::Caffe);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.augmentation.brightness_delta, 0.0);
        assert_eq!(config.augmentation.contrast_upper, TtaConfig::default().contrast_upper);
    }

    #[test]
    fn test_malformed_file_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ port: ").unwrap();

        assert!(matches!(
            AppConfig::load(&path),
            Err(SaccharumError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_paths_reports_missing_model_and_creates_uploads() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig {
            model_path: dir.path().join("models/missing.mpk"),
            upload_dir: dir.path().join("uploads"),
            ..AppConfig::default()
        };

        let errors = config.validate_paths();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].starts_with("Model not found"));
        assert!(errors[1].starts_with("Model directory not found"));
        assert!(dir.path().join("uploads").is_dir());
    }

    #[test]
    fn test_validate_paths_ok() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("model.mpk");
        std::fs::write(&model_path, b"weights").unwrap();
        let config = AppConfig {
            model_path,
            upload_dir: dir.path().join("uploads"),
            ..AppConfig::default()
        };

        assert!(config.validate_paths().is_empty());
    }

    #[test]
    fn test_validate_paths_rejects_unpoolable_image_size() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("model.mpk");
        std::fs::write(&model_path, b"weights").unwrap();

        for size in [0, 8, 100] {
            let config = AppConfig {
                model_path: model_path.clone(),
                upload_dir: dir.path().join("uploads"),
                image_size: size,
                ..AppConfig::default()
            };
            let errors = config.validate_paths();
            assert_eq!(errors.len(), 1, "size {}", size);
            assert!(errors[0].starts_with("image_size must be a positive multiple of 16"));
        }
    }

    #[test]
    fn test_allowed_extensions() {
        let config = AppConfig::default();
        assert!(config.is_allowed_extension("leaf.JPG"));
        assert!(config.is_allowed_extension("scan.tiff"));
        assert!(!config.is_allowed_extension("notes.txt"));
        assert!(!config.is_allowed_extension("noextension"));
    }
}
