//! Class set loading
//!
//! The ordered list of disease labels the network was trained on. Index `i`
//! of every probability vector refers to `labels[i]`.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::utils::error::{Result, SaccharumError};

/// Labels used when no class file ships with the model
pub const DEFAULT_CLASSES: [&str; 5] = ["Healthy", "Mosaic", "RedRot", "Rust", "Yellow"];

/// Ordered, immutable set of class labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ClassSet {
    labels: Vec<String>,
}

impl Default for ClassSet {
    fn default() -> Self {
        Self {
            labels: DEFAULT_CLASSES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl ClassSet {
    /// Build a class set, rejecting empty or duplicated label lists
    pub fn new(labels: Vec<String>) -> Result<Self> {
        if labels.is_empty() {
            return Err(SaccharumError::config("Class list is empty"));
        }

        let mut seen = HashSet::new();
        let duplicates: Vec<String> = labels
            .iter()
            .filter(|label| !seen.insert(label.as_str()))
            .map(|label| format!("Duplicate class label: {}", label))
            .collect();
        if !duplicates.is_empty() {
            return Err(SaccharumError::Configuration(duplicates));
        }

        Ok(Self { labels })
    }

    /// Load the class list from a JSON array of strings
    ///
    /// A missing file falls back to [`DEFAULT_CLASSES`]; a file that exists
    /// but cannot be parsed is a configuration error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("Class file not found: {:?}", path);
            warn!("Using default classes: {}", DEFAULT_CLASSES.join(", "));
            return Ok(Self::default());
        }

        info!("Loading classes from: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        let labels: Vec<String> = serde_json::from_str(&content).map_err(|e| {
            SaccharumError::config(format!("Invalid class file {:?}: {}", path, e))
        })?;

        let classes = Self::new(labels)?;
        info!("Classes loaded: {}", classes.labels.join(", "));
        Ok(classes)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label at a class index
    pub fn name(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Index of a label
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.labels.iter().position(|label| label == name)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}
