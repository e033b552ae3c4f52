use anyhow::Context;
use sa_car_price::{build_router, AppState, ArtifactStore, CarInput, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    tracing::info!("config: {:?}", config);

    let store = ArtifactStore::open(&config.artifact_dir);
    match &store {
        ArtifactStore::Loaded(a) => tracing::info!(
            "loaded artifacts from {}; brand vocabulary[{}]",
            config.artifact_dir.display(),
            a.encoder().vocabulary_len()
        ),
        ArtifactStore::Unavailable(e) => {
            tracing::warn!("artifacts unavailable, /predict will return 500: {}", e)
        }
    }

    let state = AppState::new(store);

    // Warmup so a broken artifact set shows up in the startup log
    if state.predictor().store().is_loaded() {
        let probe = CarInput {
            brand: "Toyota".to_string(),
            engine_size: 2.0,
            is_luxury: 0,
        };
        match state.predictor().predict(&probe) {
            Ok(p) => tracing::info!("warmup predict ok: {:.2} {}", p.result.predicted_price_zar, p.result.currency),
            Err(e) => tracing::warn!("warmup predict failed: {}", e),
        }
    }

    let app = build_router(state);

    let addr = std::net::SocketAddr::from((config.host, config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
