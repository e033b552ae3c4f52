//! SA car price prediction service.
//!
//! A brand / engine size / luxury flag goes in, a ZAR price estimate comes
//! out. The request path is encoder -> scaler -> log-price regression -> exp.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod server;
pub mod types;

pub use artifacts::{ArtifactStore, Artifacts};
pub use config::Config;
pub use error::PredictError;
pub use pipeline::{Prediction, PricePredictor};
pub use server::{build_router, AppState};
pub use types::{BrandCode, CarInput, FeatureRow, PredictionResult, FEATURE_COLUMNS};
