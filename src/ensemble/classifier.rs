//! Loads the trained artifacts and turns one feature vector into one
//! classification result: per-model outputs, a soft-voted probability, a
//! weighted combined probability, and a majority-of-three verdict.

use crate::config::EnsembleConfig;
use crate::features::{FeatureVector, FEATURE_NAMES};
use crate::model::{ModelSchema, OnnxModel};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Weights of the combined probability: gradient-boost, random-forest,
/// soft-vote. Sum must be exactly 1.0.
pub const COMBINED_WEIGHTS: [f32; 3] = [0.4, 0.3, 0.3];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Benign,
    Malicious,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Benign => "benign",
            Verdict::Malicious => "malicious",
        }
    }
}

/// Raw per-model outputs for one window, before combination.
#[derive(Debug, Clone, Copy)]
pub struct ModelVotes {
    pub boost_prob: f32,
    pub boost_label: bool,
    pub forest_prob: f32,
    pub forest_label: bool,
    pub anomaly_score: f32,
    pub anomaly_flag: bool,
}

/// Per-window classification output. Immutable once produced; exactly one
/// per scored window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub ts: i64,
    pub boost_prob: f32,
    pub boost_label: bool,
    pub forest_prob: f32,
    pub forest_label: bool,
    pub anomaly_score: f32,
    pub anomaly_flag: bool,
    pub vote_prob: f32,
    pub vote_label: bool,
    pub combined_prob: f32,
    pub verdict: Verdict,
}

impl ClassificationResult {
    /// Deterministic combination of per-model outputs.
    ///
    /// The soft vote averages the two supervised probabilities under
    /// `vote_weights`; `combined_prob` is the convex combination of
    /// gradient-boost, random-forest, and soft-vote probabilities under
    /// [`COMBINED_WEIGHTS`]. The verdict is malicious iff at least two of
    /// {boost label, forest label, anomaly flag} are set: a majority of
    /// three, not a threshold on `combined_prob`. The two outputs may
    /// disagree and both are exposed.
    pub fn combine(ts: i64, votes: ModelVotes, vote_weights: (f32, f32)) -> Self {
        let (wb, wf) = vote_weights;
        let vote_prob = (votes.boost_prob * wb + votes.forest_prob * wf) / (wb + wf);
        let vote_label = vote_prob >= 0.5;
        let combined_prob = votes.boost_prob * COMBINED_WEIGHTS[0]
            + votes.forest_prob * COMBINED_WEIGHTS[1]
            + vote_prob * COMBINED_WEIGHTS[2];
        let yeas =
            votes.boost_label as u8 + votes.forest_label as u8 + votes.anomaly_flag as u8;
        let verdict = if yeas >= 2 {
            Verdict::Malicious
        } else {
            Verdict::Benign
        };
        Self {
            ts,
            boost_prob: votes.boost_prob,
            boost_label: votes.boost_label,
            forest_prob: votes.forest_prob,
            forest_label: votes.forest_label,
            anomaly_score: votes.anomaly_score,
            anomaly_flag: votes.anomaly_flag,
            vote_prob,
            vote_label,
            combined_prob,
            verdict,
        }
    }
}

/// Holds the three loaded artifacts and the recorded training schema.
/// Read-only after load; shared for the process lifetime.
pub struct EnsembleClassifier {
    boost: OnnxModel,
    forest: OnnxModel,
    anomaly: OnnxModel,
    schema: ModelSchema,
    vote_weights: (f32, f32),
}

impl EnsembleClassifier {
    /// Load all artifacts from `dir`: `gradient_boost.onnx`,
    /// `random_forest.onnx`, `isolation_forest.onnx`, and `schema.json`.
    /// Any missing artifact, or a recorded schema that disagrees with the
    /// crate's canonical feature order, is a hard failure.
    pub fn load(dir: &Path, config: &EnsembleConfig) -> Result<Self, BoxError> {
        if config.vote_weight_boost <= 0.0 || config.vote_weight_forest <= 0.0 {
            return Err("soft-vote weights must be positive".into());
        }

        let schema = ModelSchema::load(&dir.join("schema.json"))?;
        let canonical: Vec<String> = FEATURE_NAMES.iter().map(|n| n.to_string()).collect();
        schema.check(&canonical)?;

        let boost = OnnxModel::load(&dir.join("gradient_boost.onnx"))?;
        let forest = OnnxModel::load(&dir.join("random_forest.onnx"))?;
        let anomaly = OnnxModel::load(&dir.join("isolation_forest.onnx"))?;

        info!(dir = %dir.display(), "ensemble artifacts loaded");
        Ok(Self {
            boost,
            forest,
            anomaly,
            schema,
            vote_weights: (config.vote_weight_boost, config.vote_weight_forest),
        })
    }

    /// Classify one window. A malformed vector (wrong names, order, or
    /// arity) fails this call only; the caller reports the window as a
    /// classification error and keeps the loop running.
    pub fn classify(&self, vector: &FeatureVector) -> Result<ClassificationResult, BoxError> {
        self.schema.check(&vector.names)?;
        if vector.values.len() != vector.names.len() {
            return Err(format!(
                "feature vector arity {} does not match schema arity {}",
                vector.values.len(),
                vector.names.len()
            )
            .into());
        }

        let (boost_label, boost_prob) = self.boost.predict(&vector.values)?;
        let (forest_label, forest_prob) = self.forest.predict(&vector.values)?;
        let (anomaly_flag, anomaly_score) = self.anomaly.predict_outlier(&vector.values)?;

        Ok(ClassificationResult::combine(
            vector.ts,
            ModelVotes {
                boost_prob,
                boost_label,
                forest_prob,
                forest_label,
                anomaly_score,
                anomaly_flag,
            },
            self.vote_weights,
        ))
    }
}
