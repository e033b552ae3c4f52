use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::artifacts::ArtifactStore;
use crate::error::PredictError;
use crate::pipeline::PricePredictor;
use crate::types::{CarInput, HealthStatus, PredictionResult, ServiceInfo};

pub const SERVICE_TITLE: &str = "SA Car Price Prediction API";

// ---------- Server state ----------

#[derive(Clone)]
pub struct AppState {
    predictor: Arc<PricePredictor>,
}

impl AppState {
    pub fn new(store: ArtifactStore) -> Self {
        Self {
            predictor: Arc::new(PricePredictor::new(store)),
        }
    }

    pub fn predictor(&self) -> &PricePredictor {
        &self.predictor
    }
}

// ---------- Handlers ----------

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: SERVICE_TITLE,
        status: "running",
    })
}

// Independent of artifact availability.
async fn health() -> Json<HealthStatus> {
    Json(HealthStatus { status: "healthy" })
}

async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<CarInput>, JsonRejection>,
) -> Result<Json<PredictionResult>, PredictError> {
    // malformed bodies are field-level validation failures, same as range checks
    let Json(input) = payload.map_err(|e| PredictError::Validation(e.body_text()))?;

    match state.predictor.predict(&input) {
        Ok(p) => {
            tracing::info!(
                "predict brand={} known={} engine_size={} is_luxury={} price_zar={:.2}",
                input.brand,
                p.brand.is_known(),
                input.engine_size,
                input.is_luxury,
                p.result.predicted_price_zar
            );
            Ok(Json(p.result))
        }
        Err(e) => {
            tracing::warn!("predict failed for brand={}: {}", input.brand, e);
            Err(e)
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/predict", post(predict))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}
