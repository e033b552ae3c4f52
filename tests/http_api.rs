/// End-to-end tests over a real listener on 127.0.0.1.
///
/// Run with: cargo test --test http_api

use std::path::{Path, PathBuf};

use sa_car_price::{build_router, AppState, ArtifactStore};
use serde_json::{json, Value};

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

async fn spawn(artifact_dir: &Path) -> String {
    let app = build_router(AppState::new(ArtifactStore::open(artifact_dir)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn post_predict(base: &str, body: Value) -> (u16, Value) {
    let res = reqwest::Client::new()
        .post(format!("{}/predict", base))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = res.status().as_u16();
    (status, res.json().await.unwrap())
}

#[tokio::test]
async fn test_root_and_health() {
    let base = spawn(&fixtures()).await;

    let root: Value = reqwest::get(format!("{}/", base)).await.unwrap().json().await.unwrap();
    assert_eq!(root, json!({"message": "SA Car Price Prediction API", "status": "running"}));

    let health: Value = reqwest::get(format!("{}/health", base)).await.unwrap().json().await.unwrap();
    assert_eq!(health, json!({"status": "healthy"}));
}

#[tokio::test]
async fn test_predict_reference_body() {
    let base = spawn(&fixtures()).await;
    let (status, body) =
        post_predict(&base, json!({"brand": "Toyota", "engine_size": 2.0, "is_luxury": 0})).await;

    assert_eq!(status, 200);
    assert_eq!(body["currency"], "ZAR");
    let price = body["predicted_price_zar"].as_f64().unwrap();
    assert!((price - 162754.79).abs() < 1e-6);
    assert_eq!(body.as_object().unwrap().len(), 2);
}

#[tokio::test]
async fn test_unknown_brand_still_prices() {
    let base = spawn(&fixtures()).await;
    let (status, body) =
        post_predict(&base, json!({"brand": "Zonda", "engine_size": 2.0, "is_luxury": 0})).await;
    assert_eq!(status, 200);
    assert!(body["predicted_price_zar"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_out_of_range_fields_are_422() {
    let base = spawn(&fixtures()).await;
    let cases = [
        (json!({"brand": "Toyota", "engine_size": 0.5, "is_luxury": 0}), "engine_size"),
        (json!({"brand": "Toyota", "engine_size": 7.0, "is_luxury": 0}), "engine_size"),
        (json!({"brand": "Toyota", "engine_size": 2.0, "is_luxury": 2}), "is_luxury"),
        (json!({"brand": "Toyota", "engine_size": 2.0, "is_luxury": -1}), "is_luxury"),
        (json!({"brand": "", "engine_size": 2.0, "is_luxury": 0}), "brand"),
    ];
    for (body, field) in cases {
        let (status, res) = post_predict(&base, body.clone()).await;
        assert_eq!(status, 422, "body {}", body);
        assert!(res["detail"].as_str().unwrap().contains(field), "detail {}", res);
    }
}

#[tokio::test]
async fn test_malformed_body_is_422() {
    let base = spawn(&fixtures()).await;
    let (status, res) = post_predict(&base, json!({"brand": "Toyota", "engine_size": 2.0})).await;
    assert_eq!(status, 422);
    assert!(res["detail"].as_str().unwrap().contains("is_luxury"));

    let (status, _) =
        post_predict(&base, json!({"brand": "Toyota", "engine_size": "big", "is_luxury": 0})).await;
    assert_eq!(status, 422);
}

#[tokio::test]
async fn test_missing_artifacts_500_but_healthy() {
    let empty = tempfile::tempdir().unwrap();
    let base = spawn(empty.path()).await;

    let (status, res) =
        post_predict(&base, json!({"brand": "Toyota", "engine_size": 2.0, "is_luxury": 0})).await;
    assert_eq!(status, 500);
    let detail = res["detail"].as_str().unwrap();
    assert!(detail.starts_with("Model file not found: encoder artifact"), "{}", detail);

    // validation still wins over the missing artifacts
    let (status, _) =
        post_predict(&base, json!({"brand": "Toyota", "engine_size": 9.0, "is_luxury": 0})).await;
    assert_eq!(status, 422);

    let health = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(health.status().as_u16(), 200);
}

#[tokio::test]
async fn test_cors_mirrors_origin_with_credentials() {
    let base = spawn(&fixtures()).await;
    let res = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("{}/predict", base))
        .header("Origin", "https://cars.example.co.za")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .unwrap();

    assert!(res.status().is_success());
    let h = res.headers();
    assert_eq!(h["access-control-allow-origin"], "https://cars.example.co.za");
    assert_eq!(h["access-control-allow-credentials"], "true");
    assert!(h["access-control-allow-methods"].to_str().unwrap().contains("POST"));
}

#[tokio::test]
async fn test_is_luxury_accepts_integral_float_and_bool() {
    let base = spawn(&fixtures()).await;
    let (_, as_int) =
        post_predict(&base, json!({"brand": "BMW", "engine_size": 3.0, "is_luxury": 1})).await;
    for raw in [json!(1.0), json!(true)] {
        let (status, body) =
            post_predict(&base, json!({"brand": "BMW", "engine_size": 3.0, "is_luxury": raw})).await;
        assert_eq!(status, 200);
        assert_eq!(body, as_int);
    }

    let (status, _) =
        post_predict(&base, json!({"brand": "BMW", "engine_size": 3.0, "is_luxury": 0.5})).await;
    assert_eq!(status, 422);
}
