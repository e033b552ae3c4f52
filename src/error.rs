use std::{fmt, path::PathBuf, sync::Arc};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Which of the three persisted artifacts a failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Encoder,
    Scaler,
    Model,
}

impl ArtifactKind {
    pub fn file_name(self) -> &'static str {
        match self {
            ArtifactKind::Encoder => "brand_encoder.json",
            ArtifactKind::Scaler => "price_scaler.json",
            ArtifactKind::Model => "best_car_price_model.json",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactKind::Encoder => "encoder",
            ArtifactKind::Scaler => "scaler",
            ArtifactKind::Model => "model",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactFault {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid artifact: {0}")]
    Invalid(String),
}

#[derive(Debug, thiserror::Error)]
#[error("{artifact} artifact at {}: {fault}", .path.display())]
pub struct ArtifactError {
    pub artifact: ArtifactKind,
    pub path: PathBuf,
    #[source]
    pub fault: ArtifactFault,
}

impl ArtifactError {
    pub fn new(artifact: ArtifactKind, path: impl Into<PathBuf>, fault: impl Into<ArtifactFault>) -> Self {
        Self {
            artifact,
            path: path.into(),
            fault: fault.into(),
        }
    }
}

/// Failure raised by an artifact while transforming a row.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("X has {got} features, but {stage} is expecting {expected} features as input")]
    Shape {
        stage: ArtifactKind,
        expected: usize,
        got: usize,
    },

    #[error("feature names should match those passed during fit: expected {expected:?}, got {got:?}")]
    FeatureNames { expected: Vec<String>, got: Vec<String> },

    #[error("{0} produced a non-finite value")]
    NonFinite(ArtifactKind),
}

/// Failure modes of a predict call. Unknown brands are not in here; they are
/// recovered inside the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("{0}")]
    Validation(String),

    #[error("Model file not found: {0}")]
    ArtifactUnavailable(Arc<ArtifactError>),

    #[error("Prediction error: {0}")]
    Prediction(String),
}

impl From<StageError> for PredictError {
    fn from(e: StageError) -> Self {
        PredictError::Prediction(e.to_string())
    }
}

impl PredictError {
    pub fn status(&self) -> StatusCode {
        match self {
            PredictError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PredictError::ArtifactUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            // infra faults other than missing files land here as 400 too
            PredictError::Prediction(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "detail": self.to_string() }))).into_response()
    }
}
