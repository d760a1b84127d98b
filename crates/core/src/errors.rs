use std::path::PathBuf;

use thiserror::Error;

/// Failures while reading the source workbook. Load performs no recovery;
/// callers see exactly which sheet, row, or column broke.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not open workbook `{path}`: {source}")]
    OpenWorkbook { path: PathBuf, source: calamine::XlsxError },
    #[error("could not read sheet `{sheet}`: {source}")]
    ReadSheet { sheet: String, source: calamine::XlsxError },
    #[error("sheet `{sheet}` has no header row")]
    EmptySheet { sheet: String },
    #[error("sheet `{sheet}` is missing required column `{column}`")]
    MissingColumn { sheet: String, column: String },
    #[error("sheet `{sheet}` row {row}: invalid `{column}` cell: {message}")]
    Cell { sheet: String, row: usize, column: String, message: String },
}

/// Failures during the offline segmentation fit.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum TrainingError {
    #[error("training set is empty")]
    EmptyDataset,
    #[error("cluster count {requested} is invalid for {customers} customers")]
    InvalidClusterCount { requested: usize, customers: usize },
    #[error("non-finite feature value for customer `{customer_id}`")]
    NonFiniteFeature { customer_id: String },
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Failures while applying a fitted model to a single input. These are
/// recoverable at serving time: the resolver downgrades them to the
/// popularity fallback instead of surfacing them to the caller.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InferenceError {
    #[error("feature dimension mismatch: model expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("model has no fitted state: {0}")]
    Unfitted(String),
}

/// Failures while persisting or reloading the artifact bundle. A missing
/// or undecodable component is fatal; serving never starts from a
/// partial bundle.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact bundle is incomplete: missing `{path}`")]
    Missing { path: PathBuf },
    #[error("could not read artifact `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not write artifact `{path}`: {source}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error("artifact `{path}` could not be encoded: {message}")]
    Encode { path: PathBuf, message: String },
    #[error("artifact `{path}` could not be decoded: {message}")]
    Decode { path: PathBuf, message: String },
}

/// Umbrella error for the end-to-end training pass.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Training(#[from] TrainingError),
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{ArtifactError, InferenceError, PipelineError, TrainingError};

    #[test]
    fn missing_artifact_names_the_file() {
        let error = ArtifactError::Missing { path: PathBuf::from("artifacts/kmeans.json") };
        assert!(error.to_string().contains("kmeans.json"));
        assert!(error.to_string().contains("incomplete"));
    }

    #[test]
    fn inference_error_converts_into_training_error() {
        let training: TrainingError =
            InferenceError::DimensionMismatch { expected: 3, actual: 2 }.into();
        assert_eq!(
            training,
            TrainingError::Inference(InferenceError::DimensionMismatch { expected: 3, actual: 2 })
        );
    }

    #[test]
    fn pipeline_error_preserves_training_message() {
        let pipeline = PipelineError::from(TrainingError::EmptyDataset);
        assert_eq!(pipeline.to_string(), "training set is empty");
    }
}
