use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::error::PredictError;

pub const MIN_ENGINE_SIZE: f64 = 1.0;
pub const MAX_ENGINE_SIZE: f64 = 6.0;
pub const CURRENCY: &str = "ZAR";

/// Column order the scaler and model were fitted with. Must not change.
pub const FEATURE_COLUMNS: [&str; 3] = ["Brand_Encoded", "Engine_Size", "Is_Luxury"];

// ---------- Request/Response types ----------

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CarInput {
    pub brand: String,
    pub engine_size: f64,
    #[serde(deserialize_with = "lax_int")]
    pub is_luxury: i64,
}

/// Integer field that also takes `1.0`, `true` and `"1"`. Fractional values
/// are rejected.
fn lax_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    struct LaxInt;

    impl<'de> de::Visitor<'de> for LaxInt {
        type Value = i64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a valid integer")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<i64, E> {
            Ok(v)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<i64, E> {
            i64::try_from(v).map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<i64, E> {
            if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
                Ok(v as i64)
            } else {
                Err(E::invalid_value(de::Unexpected::Float(v), &self))
            }
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<i64, E> {
            Ok(v as i64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<i64, E> {
            v.trim()
                .parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    deserializer.deserialize_any(LaxInt)
}

impl CarInput {
    /// Field constraints. Checked before any artifact is touched.
    pub fn validate(&self) -> Result<(), PredictError> {
        if self.brand.is_empty() {
            return Err(PredictError::Validation(
                "brand: must contain at least 1 character".to_string(),
            ));
        }
        // NaN fails both comparisons, so it is rejected too
        if !(self.engine_size >= MIN_ENGINE_SIZE && self.engine_size <= MAX_ENGINE_SIZE) {
            return Err(PredictError::Validation(format!(
                "engine_size: must be between {:.1} and {:.1}, got {}",
                MIN_ENGINE_SIZE, MAX_ENGINE_SIZE, self.engine_size
            )));
        }
        if !matches!(self.is_luxury, 0 | 1) {
            return Err(PredictError::Validation(format!(
                "is_luxury: must be 0 or 1, got {}",
                self.is_luxury
            )));
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub predicted_price_zar: f64,
    pub currency: String,
}

impl PredictionResult {
    pub fn zar(predicted_price_zar: f64) -> Self {
        Self {
            predicted_price_zar,
            currency: CURRENCY.to_string(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ServiceInfo {
    pub message: &'static str,
    pub status: &'static str,
}

#[derive(Serialize, Debug)]
pub struct HealthStatus {
    pub status: &'static str,
}

// ---------- Pipeline intermediates ----------

/// Outcome of the encode step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrandCode {
    Known(i64),
    /// Not in the trained vocabulary; feeds code 0 into the pipeline.
    Unknown,
}

impl BrandCode {
    pub const FALLBACK: i64 = 0;

    pub fn code(self) -> i64 {
        match self {
            BrandCode::Known(c) => c,
            BrandCode::Unknown => Self::FALLBACK,
        }
    }

    pub fn is_known(self) -> bool {
        matches!(self, BrandCode::Known(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRow(pub [f64; 3]);

impl FeatureRow {
    pub fn new(brand: BrandCode, input: &CarInput) -> Self {
        FeatureRow([
            brand.code() as f64,
            input.engine_size,
            input.is_luxury as f64,
        ])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn columns() -> &'static [&'static str] {
        &FEATURE_COLUMNS
    }
}
