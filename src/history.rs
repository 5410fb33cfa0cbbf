//! history.rs: bounded in-memory log of recent classifications for diagnostics.
//!
//! Only hashed text is kept; the entry is safe to expose on a debug route.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;

use crate::category::ActivityCategory;
use crate::classification::{ClassificationResult, SignalKind};
use crate::telemetry::anon_hash;

const MAX_CAPACITY: usize = 10_000;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub capture_id: String,
    /// `anon_hash` of the final label.
    pub label_hash: String,
    pub category: ActivityCategory,
    pub confidence: f32,
    pub signals: Vec<SignalKind>,
    pub neighbours: usize,
}

#[derive(Debug)]
pub struct History {
    inner: Mutex<Vec<HistoryEntry>>,
    cap: usize,
}

impl History {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.clamp(1, MAX_CAPACITY);
        Self {
            inner: Mutex::new(Vec::with_capacity(cap)),
            cap,
        }
    }

    pub fn push(&self, capture_id: &str, r: &ClassificationResult) {
        let entry = HistoryEntry {
            at: Utc::now(),
            capture_id: capture_id.to_string(),
            label_hash: anon_hash(&r.label),
            category: r.category,
            confidence: r.confidence,
            signals: r.contributing_signals.iter().copied().collect(),
            neighbours: r.similar_captures.len(),
        };

        let mut v = self.inner.lock().expect("history mutex poisoned");
        v.push(entry);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }

    /// Oldest first.
    pub fn snapshot_last_n(&self, n: usize) -> Vec<HistoryEntry> {
        let v = self.inner.lock().expect("history mutex poisoned");
        let start = v.len().saturating_sub(n);
        v[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("history mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn result(conf: f32) -> ClassificationResult {
        ClassificationResult {
            label: "Gmail".into(),
            category: ActivityCategory::Communication,
            confidence: conf,
            contributing_signals: BTreeSet::from([SignalKind::Text]),
            similar_captures: vec![],
            breakdown: vec![],
        }
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let h = History::with_capacity(3);
        for i in 0..5 {
            h.push(&format!("c{i}"), &result(0.5 + i as f32 * 0.1));
        }
        assert_eq!(h.len(), 3);
        let ids: Vec<String> = h.snapshot_last_n(10).into_iter().map(|e| e.capture_id).collect();
        assert_eq!(ids, vec!["c2", "c3", "c4"]);
        assert_eq!(h.snapshot_last_n(1)[0].capture_id, "c4");
    }

    #[test]
    fn label_is_hashed() {
        let h = History::with_capacity(2);
        h.push("x", &result(0.5));
        let e = &h.snapshot_last_n(1)[0];
        assert_ne!(e.label_hash, "Gmail");
        assert_eq!(e.label_hash, anon_hash("Gmail"));
        assert_eq!(e.signals, vec![SignalKind::Text]);
    }
}
