// src/metrics.rs
//! Prometheus exposition plus the counters the fusion pipeline records.
//!
//! Recording goes through the `metrics` facade, so the engine can call these
//! helpers whether or not a recorder has been installed.

use axum::{routing::get, Router};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::classification::{ClassificationResult, SignalKind};

pub const CLASSIFICATIONS_TOTAL: &str = "fusion_classifications_total";
pub const SIGNAL_CONTRIBUTIONS_TOTAL: &str = "fusion_signal_contributions_total";
pub const SOFT_FAILURES_TOTAL: &str = "fusion_soft_failures_total";
pub const PRECONDITION_FAILURES_TOTAL: &str = "fusion_precondition_failures_total";
pub const CONFIDENCE: &str = "fusion_confidence";

const CONFIDENCE_BUCKETS: &[f64] = &[0.5, 0.55, 0.6, 0.65, 0.7, 0.75, 0.8, 0.85, 0.9, 0.95, 1.0];

// One recorder per process; routers built later (tests, reload) share it.
static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (first call) and describe the fusion series.
    pub fn init() -> anyhow::Result<Self> {
        let handle = HANDLE.get_or_try_init(|| -> anyhow::Result<PrometheusHandle> {
            let handle = PrometheusBuilder::new()
                .set_buckets_for_metric(Matcher::Full(CONFIDENCE.to_string()), CONFIDENCE_BUCKETS)?
                .install_recorder()?;

            describe_counter!(CLASSIFICATIONS_TOTAL, "Successful classify calls");
            describe_counter!(
                SIGNAL_CONTRIBUTIONS_TOTAL,
                "Signals that contributed to a classification, by signal"
            );
            describe_counter!(
                SOFT_FAILURES_TOTAL,
                "Analyzer errors absorbed as an unavailable signal, by signal"
            );
            describe_counter!(
                PRECONDITION_FAILURES_TOTAL,
                "classify calls rejected for malformed input, by kind"
            );
            describe_histogram!(CONFIDENCE, "Confidence of returned classifications");
            Ok(handle)
        })?;
        Ok(Self {
            handle: handle.clone(),
        })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router<S>(&self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

pub fn record_classification(result: &ClassificationResult) {
    counter!(CLASSIFICATIONS_TOTAL).increment(1);
    for s in &result.contributing_signals {
        counter!(SIGNAL_CONTRIBUTIONS_TOTAL, "signal" => s.as_str()).increment(1);
    }
    histogram!(CONFIDENCE).record(result.confidence as f64);
}

pub fn record_soft_failure(signal: SignalKind) {
    counter!(SOFT_FAILURES_TOTAL, "signal" => signal.as_str()).increment(1);
}

pub fn record_precondition_failure(kind: &'static str) {
    counter!(PRECONDITION_FAILURES_TOTAL, "kind" => kind).increment(1);
}
