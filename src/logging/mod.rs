//! Structured JSON logging for the detection loop.

mod format;

pub use format::{StructuredLogger, WindowLogEvent};
