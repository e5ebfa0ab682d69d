//! Overwatch Agent — Real-time host anomaly detection from OS audit telemetry.
//!
//! Modular structure:
//! - [`tail`] — Audit log follower with rotation detection
//! - [`window`] — Tumbling-window aggregation of raw log lines
//! - [`features`] — Per-window audit feature extraction
//! - [`model`] — ONNX model artifacts and recorded feature schema
//! - [`ensemble`] — Multi-model ensemble classification and voting
//! - [`storage`] — Encrypted local storage of scored windows
//! - [`logging`] — Structured JSON logging

pub mod config;
pub mod tail;
pub mod window;
pub mod features;
pub mod model;
pub mod ensemble;
pub mod storage;
pub mod logging;

pub use config::AgentConfig;
pub use tail::{LineSource, LogFollower};
pub use window::WindowAggregator;
pub use features::{AuditRecord, FeatureExtractor, FeatureVector, SyscallTable};
pub use model::{ModelSchema, OnnxModel};
pub use ensemble::{ClassificationResult, EnsembleClassifier, ModelVotes, Verdict};
pub use storage::EventStore;
pub use logging::StructuredLogger;
