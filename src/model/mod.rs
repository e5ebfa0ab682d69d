//! Trained model artifacts: ONNX sessions plus the feature schema recorded
//! at training time.

mod onnx;

pub use onnx::OnnxModel;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Feature-name ordering persisted alongside the trained artifacts
/// (`schema.json` in the model directory).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSchema {
    pub feature_names: Vec<String>,
}

impl ModelSchema {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| format!("model schema {}: {}", path.display(), e))?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Verify that `names` matches the recorded training schema exactly:
    /// same names, same order. Classification must not silently reorder or
    /// drop features.
    pub fn check(&self, names: &[String]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if self.feature_names.len() != names.len()
            || self.feature_names.iter().zip(names).any(|(a, b)| a != b)
        {
            return Err(format!(
                "feature schema mismatch: model trained on {:?}, got {:?}",
                self.feature_names, names
            )
            .into());
        }
        Ok(())
    }
}
