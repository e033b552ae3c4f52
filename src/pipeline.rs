use tracing::debug;

use crate::artifacts::ArtifactStore;
use crate::error::{ArtifactKind, PredictError, StageError};
use crate::types::{BrandCode, CarInput, FeatureRow, PredictionResult, FEATURE_COLUMNS};

/// Result of one predict call plus which encode branch was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub result: PredictionResult,
    pub brand: BrandCode,
}

#[derive(Clone)]
pub struct PricePredictor {
    store: ArtifactStore,
}

impl PricePredictor {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn predict(&self, input: &CarInput) -> Result<Prediction, PredictError> {
        input.validate()?;
        let artifacts = self.store.get()?;

        let brand = artifacts.encoder().encode(&input.brand);
        let row = FeatureRow::new(brand, input);
        let scaled = artifacts.scaler().scale(row.as_slice(), &FEATURE_COLUMNS)?;
        let log_price = artifacts.model().predict(&scaled, &FEATURE_COLUMNS)?;

        debug!(
            "brand={} code={:?} row={:?} scaled={:?} log_price={:.4}",
            input.brand, brand, row.0, scaled, log_price
        );

        let price = price_from_log(log_price)?;
        Ok(Prediction {
            result: PredictionResult::zar(price),
            brand,
        })
    }
}

/// exp, clamp at zero, round to cents.
pub fn price_from_log(log_price: f64) -> Result<f64, StageError> {
    let price = log_price.exp();
    if !price.is_finite() {
        return Err(StageError::NonFinite(ArtifactKind::Model));
    }
    Ok(round_cents(price.max(0.0)))
}

/// Half-to-even on exact ties. Values too large to scale by 100 have no
/// fractional part and are returned as is.
fn round_cents(x: f64) -> f64 {
    let cents = x * 100.0;
    if !cents.is_finite() {
        return x;
    }
    cents.round_ties_even() / 100.0
}
