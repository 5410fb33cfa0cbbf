//! HTTP shell around `FusionEngine`.
//!
//! The engine sits behind `RwLock<Arc<_>>` so `/admin/reload` can swap it while
//! in-flight requests finish on the old one. The in-memory similarity store is
//! shared by the engine (reader) and `/index/captures` (writer).

use std::sync::{Arc, RwLock};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::analyze::FusionWeights;
use crate::capture::CaptureSignals;
use crate::classification::ClassificationResult;
use crate::config::FusionConfig;
use crate::engine::FusionEngine;
use crate::error::ClassifyError;
use crate::history::{History, HistoryEntry};
use crate::metrics::Metrics;
use crate::similarity::{IndexStats, IndexedCapture, MemoryIndex, SearchParams};

const DEFAULT_HISTORY_N: usize = 20;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<RwLock<Arc<FusionEngine>>>,
    index: Arc<MemoryIndex>,
    history: Arc<History>,
}

impl AppState {
    /// Wires `index` into `engine` as its similarity store.
    pub fn new(engine: FusionEngine, index: Arc<MemoryIndex>, history_capacity: usize) -> Self {
        let engine = engine.with_index(index.clone());
        Self {
            engine: Arc::new(RwLock::new(Arc::new(engine))),
            index,
            history: Arc::new(History::with_capacity(history_capacity)),
        }
    }

    pub fn from_config(cfg: &FusionConfig) -> anyhow::Result<Self> {
        let engine = FusionEngine::from_config(cfg)?;
        Ok(Self::new(
            engine,
            Arc::new(MemoryIndex::new()),
            cfg.server.history_capacity,
        ))
    }

    pub fn engine(&self) -> Arc<FusionEngine> {
        self.engine.read().expect("rwlock poisoned").clone()
    }

    pub fn index(&self) -> &Arc<MemoryIndex> {
        &self.index
    }

    pub fn history(&self) -> &Arc<History> {
        &self.history
    }

    fn swap_engine(&self, engine: FusionEngine) {
        let engine = Arc::new(engine.with_index(self.index.clone()));
        *self.engine.write().expect("rwlock poisoned") = engine;
    }
}

fn debug_routes_enabled() -> bool {
    std::env::var("DEBUG_ROUTES").ok().as_deref() == Some("1")
}

pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/classify", post(classify))
        .route("/classify/batch", post(classify_batch))
        .route("/index/captures", post(index_captures))
        .route("/index/stats", get(index_stats));

    if debug_routes_enabled() {
        router = router
            .route("/debug/history", get(debug_history))
            .route("/debug/weights", get(debug_weights))
            .route("/admin/reload", post(admin_reload));
        match Metrics::init() {
            Ok(m) => router = router.merge(m.router()),
            Err(e) => warn!(target: "api", error = %e, "prometheus recorder unavailable"),
        }
    }

    router
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/* ----------------------------
Errors
---------------------------- */

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}

pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl From<ClassifyError> for ApiError {
    fn from(e: ClassifyError) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: ErrorBody {
                error: e.to_string(),
                kind: e.kind().to_string(),
            },
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                error: format!("{e:#}"),
                kind: "internal".to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/* ----------------------------
Classification
---------------------------- */

async fn classify(
    State(state): State<AppState>,
    Json(signals): Json<CaptureSignals>,
) -> Result<Json<ClassificationResult>, ApiError> {
    let result = state.engine().classify(&signals)?;
    state.history.push(&signals.capture_id, &result);
    Ok(Json(result))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub capture_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<ClassificationResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

async fn classify_batch(
    State(state): State<AppState>,
    Json(items): Json<Vec<CaptureSignals>>,
) -> Json<Vec<BatchOutcome>> {
    let engine = state.engine();
    let out = items
        .into_iter()
        .map(|signals| match engine.classify(&signals) {
            Ok(result) => {
                state.history.push(&signals.capture_id, &result);
                BatchOutcome {
                    capture_id: signals.capture_id,
                    result: Some(result),
                    error: None,
                }
            }
            Err(e) => BatchOutcome {
                capture_id: signals.capture_id,
                result: None,
                error: Some(ErrorBody {
                    error: e.to_string(),
                    kind: e.kind().to_string(),
                }),
            },
        })
        .collect();
    Json(out)
}

/* ----------------------------
Similarity store (writer side)
---------------------------- */

#[derive(Debug, Deserialize)]
struct IndexItem {
    capture_id: String,
    embedding: Vec<f32>,
    label: String,
    #[serde(default)]
    captured_at: Option<DateTime<Utc>>, // now when absent
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexRejection {
    pub capture_id: String,
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IndexUpsertResp {
    pub upserted: usize,
    pub rejected: Vec<IndexRejection>,
    pub stats: IndexStats,
}

async fn index_captures(
    State(state): State<AppState>,
    Json(items): Json<Vec<IndexItem>>,
) -> Json<IndexUpsertResp> {
    let now = Utc::now();
    let mut upserted = 0;
    let mut rejected = Vec::new();
    for it in items {
        let capture_id = it.capture_id.clone();
        let entry = IndexedCapture {
            capture_id: it.capture_id,
            embedding: it.embedding,
            label: it.label,
            captured_at: it.captured_at.unwrap_or(now),
        };
        match state.index.upsert(entry) {
            Ok(()) => upserted += 1,
            Err(e) => rejected.push(IndexRejection {
                capture_id,
                error: e.to_string(),
            }),
        }
    }
    let stats = state.index.stats();
    info!(
        target: "api",
        upserted,
        rejected = rejected.len(),
        entries = stats.entries,
        "index upsert"
    );
    Json(IndexUpsertResp {
        upserted,
        rejected,
        stats,
    })
}

async fn index_stats(State(state): State<AppState>) -> Json<IndexStats> {
    Json(state.index.stats())
}

/* ----------------------------
Debug / admin
---------------------------- */

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    n: Option<usize>,
}

async fn debug_history(
    State(state): State<AppState>,
    Query(q): Query<HistoryQuery>,
) -> Json<Vec<HistoryEntry>> {
    Json(state.history.snapshot_last_n(q.n.unwrap_or(DEFAULT_HISTORY_N)))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WeightsOut {
    pub weights: FusionWeights,
    pub similarity: SearchParams,
}

async fn debug_weights(State(state): State<AppState>) -> Json<WeightsOut> {
    let engine = state.engine();
    Json(WeightsOut {
        weights: *engine.weights(),
        similarity: engine.search_params(),
    })
}

async fn admin_reload(State(state): State<AppState>) -> Result<String, ApiError> {
    let cfg = FusionConfig::load()?;
    let engine = FusionEngine::from_config(&cfg)?;
    state.swap_engine(engine);
    info!(target: "api", "engine reloaded from config");
    Ok("reloaded".to_string())
}
