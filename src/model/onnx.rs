//! ONNX Runtime inference for one trained artifact. Input: [1, n] f32.
//! Classifier exports emit a label tensor and a probability tensor; the
//! outlier-detector export emits a ±1 label tensor and a score tensor.

use ndarray::Array2;
use std::path::Path;
use std::sync::OnceLock;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

static ORT_ENV: OnceLock<ort::Environment> = OnceLock::new();

fn init_env() -> &'static ort::Environment {
    ORT_ENV.get_or_init(|| {
        ort::Environment::builder()
            .with_name("overwatch-agent")
            .build()
            .expect("ORT environment")
    })
}

/// Read-only scoring session for one artifact, loaded once at startup and
/// shared for the process lifetime.
pub struct OnnxModel {
    session: ort::Session,
    input_name: String,
}

impl OnnxModel {
    /// Load an artifact. A missing or unreadable file is an error; the
    /// ensemble must not start partially initialized.
    pub fn load(path: &Path) -> Result<Self, BoxError> {
        if !path.exists() {
            return Err(format!("model artifact not found: {}", path.display()).into());
        }
        let _env = init_env();

        let session = ort::Session::builder()?.commit_from_file(path)?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "input".to_string());

        Ok(Self {
            session,
            input_name,
        })
    }

    /// Run the session on one vector. Returns the first output's leading
    /// label and the second output's trailing score (the positive-class
    /// probability for classifiers, the raw score for the outlier detector).
    fn run(&self, values: &[f32]) -> Result<(i64, f32), BoxError> {
        let arr = Array2::from_shape_vec((1, values.len()), values.to_vec())?;
        let input = ort::Value::from_array(arr.into_dyn())?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input]?)?;

        let label_out = outputs.get(0).ok_or("model emitted no label output")?;
        let labels = label_out.try_extract_raw_tensor::<i64>()?;
        let label = labels
            .as_slice()
            .first()
            .copied()
            .ok_or("empty label tensor")?;

        let score_out = outputs.get(1).ok_or("model emitted no score output")?;
        let scores = score_out.try_extract_raw_tensor::<f32>()?;
        let score = scores
            .as_slice()
            .last()
            .copied()
            .ok_or("empty score tensor")?;

        Ok((label, score))
    }

    /// Supervised prediction: (binary label, malicious-class probability).
    pub fn predict(&self, values: &[f32]) -> Result<(bool, f32), BoxError> {
        let (label, score) = self.run(values)?;
        Ok((label == 1, score.clamp(0.0, 1.0)))
    }

    /// Outlier decision: (flag, raw score). The flag is set when the sample
    /// is classified as an outlier (label -1).
    pub fn predict_outlier(&self, values: &[f32]) -> Result<(bool, f32), BoxError> {
        let (label, score) = self.run(values)?;
        Ok((label == -1, score))
    }
}
