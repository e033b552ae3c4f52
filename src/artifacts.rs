//! Persisted encoder / scaler / model and the handle that owns them.
//!
//! The pipeline only sees the three capability traits. The JSON-backed
//! structs below are one storage format; anything implementing the traits
//! can be passed to [`Artifacts::from_parts`].

use serde::{de::DeserializeOwned, Deserialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::error::{ArtifactError, ArtifactFault, ArtifactKind, PredictError, StageError};
use crate::types::BrandCode;

// ---------- Capability contracts ----------

pub trait CategoryEncoder: Send + Sync {
    fn encode(&self, label: &str) -> BrandCode;

    fn vocabulary_len(&self) -> usize;
}

pub trait FeatureScaler: Send + Sync {
    /// `columns` names each entry of `row`, in order.
    fn scale(&self, row: &[f64], columns: &[&str]) -> Result<Vec<f64>, StageError>;
}

pub trait RegressionModel: Send + Sync {
    /// Returns the predicted log-price.
    fn predict(&self, x: &[f64], columns: &[&str]) -> Result<f64, StageError>;
}

// ---------- JSON-backed implementations ----------

/// Label encoder: a brand's code is its index in the sorted vocabulary.
#[derive(Debug, Clone)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

#[derive(Deserialize)]
struct LabelEncoderJson {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn new(classes: Vec<String>) -> Result<Self, ArtifactFault> {
        if classes.is_empty() {
            return Err(ArtifactFault::Invalid("encoder has no classes".into()));
        }
        if let Some(w) = classes.windows(2).find(|w| w[0] >= w[1]) {
            return Err(ArtifactFault::Invalid(format!(
                "classes must be sorted and unique, found {:?} before {:?}",
                w[0], w[1]
            )));
        }
        Ok(Self { classes })
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let raw: LabelEncoderJson = read_json(ArtifactKind::Encoder, path)?;
        Self::new(raw.classes).map_err(|e| ArtifactError::new(ArtifactKind::Encoder, path, e))
    }
}

impl CategoryEncoder for LabelEncoder {
    fn encode(&self, label: &str) -> BrandCode {
        match self.classes.binary_search_by(|c| c.as_str().cmp(label)) {
            Ok(idx) => BrandCode::Known(idx as i64),
            Err(_) => BrandCode::Unknown,
        }
    }

    fn vocabulary_len(&self) -> usize {
        self.classes.len()
    }
}

/// Standard scaler: `(x - mean) / scale` per column.
///
/// A zero `scale` is rejected at load. Fitted scalers already store 1.0 for
/// zero-variance columns, so a zero here means the file was written by hand
/// or damaged.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    feature_names: Option<Vec<String>>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

#[derive(Deserialize)]
struct StandardScalerJson {
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn new(
        feature_names: Option<Vec<String>>,
        mean: Vec<f64>,
        scale: Vec<f64>,
    ) -> Result<Self, ArtifactFault> {
        if mean.len() != scale.len() {
            return Err(ArtifactFault::Invalid(format!(
                "mean has {} entries but scale has {}",
                mean.len(),
                scale.len()
            )));
        }
        check_names(&feature_names, mean.len())?;
        if let Some(s) = scale.iter().find(|s| !s.is_finite() || **s == 0.0) {
            return Err(ArtifactFault::Invalid(format!("scale entry {} is not usable", s)));
        }
        if mean.iter().any(|m| !m.is_finite()) {
            return Err(ArtifactFault::Invalid("mean contains a non-finite entry".into()));
        }
        Ok(Self {
            feature_names,
            mean,
            scale,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let raw: StandardScalerJson = read_json(ArtifactKind::Scaler, path)?;
        Self::new(raw.feature_names, raw.mean, raw.scale)
            .map_err(|e| ArtifactError::new(ArtifactKind::Scaler, path, e))
    }
}

impl FeatureScaler for StandardScaler {
    fn scale(&self, row: &[f64], columns: &[&str]) -> Result<Vec<f64>, StageError> {
        check_shape(ArtifactKind::Scaler, self.mean.len(), row.len())?;
        check_columns(&self.feature_names, columns)?;
        let out: Vec<f64> = row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect();
        if out.iter().any(|v| !v.is_finite()) {
            return Err(StageError::NonFinite(ArtifactKind::Scaler));
        }
        Ok(out)
    }
}

/// Ordinary linear regression on the scaled row.
#[derive(Debug, Clone)]
pub struct LinearRegression {
    feature_names: Option<Vec<String>>,
    coef: Vec<f64>,
    intercept: f64,
}

#[derive(Deserialize)]
struct LinearRegressionJson {
    #[serde(default)]
    feature_names: Option<Vec<String>>,
    coef: Vec<f64>,
    intercept: f64,
}

impl LinearRegression {
    pub fn new(
        feature_names: Option<Vec<String>>,
        coef: Vec<f64>,
        intercept: f64,
    ) -> Result<Self, ArtifactFault> {
        if coef.is_empty() {
            return Err(ArtifactFault::Invalid("model has no coefficients".into()));
        }
        check_names(&feature_names, coef.len())?;
        if !intercept.is_finite() || coef.iter().any(|c| !c.is_finite()) {
            return Err(ArtifactFault::Invalid("model contains a non-finite weight".into()));
        }
        Ok(Self {
            feature_names,
            coef,
            intercept,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let raw: LinearRegressionJson = read_json(ArtifactKind::Model, path)?;
        Self::new(raw.feature_names, raw.coef, raw.intercept)
            .map_err(|e| ArtifactError::new(ArtifactKind::Model, path, e))
    }
}

impl RegressionModel for LinearRegression {
    fn predict(&self, x: &[f64], columns: &[&str]) -> Result<f64, StageError> {
        check_shape(ArtifactKind::Model, self.coef.len(), x.len())?;
        check_columns(&self.feature_names, columns)?;
        Ok(self.intercept + x.iter().zip(&self.coef).map(|(v, c)| v * c).sum::<f64>())
    }
}

fn read_json<T: DeserializeOwned>(kind: ArtifactKind, path: &Path) -> Result<T, ArtifactError> {
    let txt = fs::read_to_string(path).map_err(|e| ArtifactError::new(kind, path, e))?;
    serde_json::from_str(&txt).map_err(|e| ArtifactError::new(kind, path, e))
}

fn check_names(names: &Option<Vec<String>>, width: usize) -> Result<(), ArtifactFault> {
    match names {
        Some(n) if n.len() != width => Err(ArtifactFault::Invalid(format!(
            "feature_names has {} entries, expected {}",
            n.len(),
            width
        ))),
        _ => Ok(()),
    }
}

fn check_shape(stage: ArtifactKind, expected: usize, got: usize) -> Result<(), StageError> {
    if expected != got {
        return Err(StageError::Shape { stage, expected, got });
    }
    Ok(())
}

fn check_columns(fitted: &Option<Vec<String>>, columns: &[&str]) -> Result<(), StageError> {
    match fitted {
        Some(names) if !names.iter().map(String::as_str).eq(columns.iter().copied()) => {
            Err(StageError::FeatureNames {
                expected: names.clone(),
                got: columns.iter().map(|c| c.to_string()).collect(),
            })
        }
        _ => Ok(()),
    }
}

// ---------- Loaded set + process-wide handle ----------

pub struct Artifacts {
    encoder: Box<dyn CategoryEncoder>,
    scaler: Box<dyn FeatureScaler>,
    model: Box<dyn RegressionModel>,
}

impl Artifacts {
    pub fn from_parts(
        encoder: Box<dyn CategoryEncoder>,
        scaler: Box<dyn FeatureScaler>,
        model: Box<dyn RegressionModel>,
    ) -> Self {
        Self {
            encoder,
            scaler,
            model,
        }
    }

    /// Loads the three fixed-name JSON artifacts from `dir`.
    pub fn load(dir: &Path) -> Result<Self, ArtifactError> {
        let encoder = LabelEncoder::load(&artifact_path(dir, ArtifactKind::Encoder))?;
        let scaler = StandardScaler::load(&artifact_path(dir, ArtifactKind::Scaler))?;
        let model = LinearRegression::load(&artifact_path(dir, ArtifactKind::Model))?;
        Ok(Self::from_parts(
            Box::new(encoder),
            Box::new(scaler),
            Box::new(model),
        ))
    }

    pub fn encoder(&self) -> &dyn CategoryEncoder {
        self.encoder.as_ref()
    }

    pub fn scaler(&self) -> &dyn FeatureScaler {
        self.scaler.as_ref()
    }

    pub fn model(&self) -> &dyn RegressionModel {
        self.model.as_ref()
    }
}

pub fn artifact_path(dir: &Path, kind: ArtifactKind) -> PathBuf {
    dir.join(kind.file_name())
}

/// Opened once at startup and shared read-only by every request. A failed
/// load is kept so each predict call reports it.
#[derive(Clone)]
pub enum ArtifactStore {
    Loaded(Arc<Artifacts>),
    Unavailable(Arc<ArtifactError>),
}

impl ArtifactStore {
    pub fn open(dir: &Path) -> Self {
        match Artifacts::load(dir) {
            Ok(a) => ArtifactStore::Loaded(Arc::new(a)),
            Err(e) => ArtifactStore::Unavailable(Arc::new(e)),
        }
    }

    pub fn get(&self) -> Result<&Artifacts, PredictError> {
        match self {
            ArtifactStore::Loaded(a) => Ok(a.as_ref()),
            ArtifactStore::Unavailable(e) => Err(PredictError::ArtifactUnavailable(Arc::clone(e))),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, ArtifactStore::Loaded(_))
    }
}

impl From<Artifacts> for ArtifactStore {
    fn from(a: Artifacts) -> Self {
        ArtifactStore::Loaded(Arc::new(a))
    }
}
