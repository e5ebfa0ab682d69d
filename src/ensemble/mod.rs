//! Multi-model ensemble classification with a deterministic voting policy.

mod classifier;

pub use classifier::{
    ClassificationResult, EnsembleClassifier, ModelVotes, Verdict, COMBINED_WEIGHTS,
};
