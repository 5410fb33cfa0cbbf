// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - POST /classify (success + 422 on malformed embedding)
// - POST /classify/batch (mixed outcomes)
// - POST /index/captures + GET /index/stats, then neighbour lookup
// - debug routes: gating, /debug/weights, /debug/history, /admin/reload, /metrics

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use serde_json::Value as Json;
use serial_test::serial;
use tower::ServiceExt as _; // for `oneshot`

use activity_fusion::{create_router, AppState, FusionEngine, MemoryIndex};

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn test_state() -> AppState {
    AppState::new(
        FusionEngine::builtin().expect("builtin engine"),
        Arc::new(MemoryIndex::new()),
        100,
    )
}

fn test_router() -> Router {
    create_router(test_state())
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    (status, bytes)
}

fn post_json(uri: &str, v: &Json) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(v.to_string()))
        .expect("build POST")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET")
}

fn email_capture(id: &str) -> Json {
    json!({
        "capture_id": id,
        "window_title": "Chrome — Gmail",
        "ocr_regions": [
            { "text": "Compose", "role_hint": "button", "confidence": 0.95 },
            { "text": "Send", "role_hint": "button", "confidence": 0.9 }
        ]
    })
}

#[tokio::test]
async fn health_returns_ok() {
    let app = test_router();
    let (status, body) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "ok");
}

#[tokio::test]
async fn classify_returns_result_json() {
    let app = test_router();
    let (status, body) = send(&app, post_json("/classify", &email_capture("a1"))).await;
    assert_eq!(status, StatusCode::OK);

    let v: Json = serde_json::from_slice(&body).expect("parse classify json");
    assert_eq!(v["category"], "communication");
    assert!(v["label"].as_str().unwrap().contains("interacting"));
    let conf = v["confidence"].as_f64().unwrap();
    assert!((0.77..=0.85).contains(&conf), "confidence {conf}");
    assert_eq!(v["contributing_signals"], json!(["text"]));
    assert!(v["breakdown"].as_array().unwrap().len() >= 2);
}

#[tokio::test]
async fn classify_rejects_dimension_mismatch_with_422() {
    let state = test_state();
    let app = create_router(state.clone());

    let (status, _) = send(
        &app,
        post_json(
            "/index/captures",
            &json!([{ "capture_id": "p1", "embedding": [1.0, 0.0, 0.0], "label": "Gmail" }]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let mut capture = email_capture("a2");
    capture["embedding"] = json!([1.0, 0.0]);
    let (status, body) = send(&app, post_json("/classify", &capture)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let v: Json = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["kind"], "dimension_mismatch");
    assert!(v["error"].as_str().unwrap().contains('3'));

    // rejected captures are not recorded
    assert!(state.history().is_empty());
}

#[tokio::test]
async fn indexed_captures_become_neighbours() {
    let app = test_router();

    let (status, body) = send(
        &app,
        post_json(
            "/index/captures",
            &json!([
                { "capture_id": "p1", "embedding": [1.0, 0.0], "label": "Gmail",
                  "captured_at": "2025-01-01T10:00:00Z" },
                { "capture_id": "p2", "embedding": [0.0, 1.0], "label": "Figma" },
                { "capture_id": "bad", "embedding": [1.0, 0.0, 0.0], "label": "X" }
            ]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["upserted"], 2);
    assert_eq!(v["rejected"][0]["capture_id"], "bad");

    let (_, body) = send(&app, get("/index/stats")).await;
    let stats: Json = serde_json::from_slice(&body).unwrap();
    assert_eq!(stats["entries"], 2);
    assert_eq!(stats["dimension"], 2);

    let mut capture = email_capture("a3");
    capture["embedding"] = json!([0.99, 0.05]);
    let (status, body) = send(&app, post_json("/classify", &capture)).await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["similar_captures"][0]["capture_id"], "p1");
    assert_eq!(v["contributing_signals"], json!(["text", "similarity"]));
}

#[tokio::test]
async fn batch_reports_each_capture() {
    let state = test_state();
    let app = create_router(state.clone());

    let (status, _) = send(
        &app,
        post_json(
            "/index/captures",
            &json!([{ "capture_id": "p1", "embedding": [1.0, 0.0], "label": "Gmail" }]),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let mut broken = email_capture("b2");
    broken["embedding"] = json!([1.0, 0.0, 0.0]);
    let batch = json!([email_capture("b1"), broken, { "capture_id": "b3", "window_title": "" }]);

    let (status, body) = send(&app, post_json("/classify/batch", &batch)).await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&body).unwrap();
    let items = v.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert!(items[0]["result"].is_object());
    assert_eq!(items[1]["error"]["kind"], "dimension_mismatch");
    assert!(items[1].get("result").is_none());
    assert_eq!(items[2]["result"]["label"], "Unknown Activity");

    assert_eq!(state.history().len(), 2);
}

#[tokio::test]
#[serial]
async fn debug_routes_are_gated() {
    std::env::remove_var("DEBUG_ROUTES");
    let app = test_router();
    let (status, _) = send(&app, get("/debug/weights")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
#[serial]
async fn debug_routes_expose_weights_history_and_metrics() {
    std::env::set_var("DEBUG_ROUTES", "1");
    let app = test_router();
    std::env::remove_var("DEBUG_ROUTES");

    let (status, _) = send(&app, post_json("/classify", &email_capture("d1"))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get("/debug/weights")).await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["similarity"]["top_k"], 5);
    assert!((v["weights"]["baseline_confidence"].as_f64().unwrap() - 0.5).abs() < 1e-6);

    let (status, body) = send(&app, get("/debug/history?n=5")).await;
    assert_eq!(status, StatusCode::OK);
    let v: Json = serde_json::from_slice(&body).unwrap();
    let rows = v.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["capture_id"], "d1");
    assert_eq!(rows[0]["category"], "communication");
    // raw labels never leave through the debug surface
    assert!(!String::from_utf8_lossy(&body).contains("Gmail"));

    let (status, body) = send(&app, get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body).unwrap();
    for needle in [
        "fusion_classifications_total",
        "fusion_signal_contributions_total",
        "fusion_confidence_bucket",
    ] {
        assert!(
            text.contains(needle),
            "metrics exposition missing '{needle}'\n{text}"
        );
    }
}

#[tokio::test]
#[serial]
async fn admin_reload_applies_new_config() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("fusion.toml");
    std::fs::write(&path, "[similarity]\ntop_k = 2\nfloor = 0.8\n").unwrap();

    std::env::set_var("DEBUG_ROUTES", "1");
    std::env::set_var("FUSION_CONFIG_PATH", path.display().to_string());
    std::env::remove_var("FUSION_TOP_K");
    std::env::remove_var("FUSION_SIMILARITY_FLOOR");
    let app = test_router();

    let (status, body) = send(&app, post_json("/admin/reload", &json!({}))).await;
    assert_eq!(status, StatusCode::OK, "{}", String::from_utf8_lossy(&body));

    let (_, body) = send(&app, get("/debug/weights")).await;
    let v: Json = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["similarity"]["top_k"], 2);

    // a broken config is reported, the running engine stays
    std::fs::write(&path, "[similarity\n").unwrap();
    let (status, body) = send(&app, post_json("/admin/reload", &json!({}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let v: Json = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["kind"], "internal");

    let (_, body) = send(&app, get("/debug/weights")).await;
    let v: Json = serde_json::from_slice(&body).unwrap();
    assert_eq!(v["similarity"]["top_k"], 2);

    std::env::remove_var("DEBUG_ROUTES");
    std::env::remove_var("FUSION_CONFIG_PATH");
}
