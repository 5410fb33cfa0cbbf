//! # Similarity search
//!
//! Read contract over a store of previously embedded captures. The fusion
//! engine only ever calls `SimilarityIndex::search`; how the store is laid out
//! (linear scan, ANN structure, remote service) stays behind the trait.
//!
//! `MemoryIndex` is the bundled implementation: a linear cosine scan guarded by
//! an `RwLock`, so one external writer can upsert while many classifiers read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

use crate::classification::SimilarCapture;
use crate::error::IndexError;

pub const DEFAULT_SIMILARITY_FLOOR: f32 = 0.7;
pub const DEFAULT_TOP_K: usize = 5;

/// Tunables for a top-K query (`[similarity]` in the config file).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    pub floor: f32,
    pub top_k: usize,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            floor: DEFAULT_SIMILARITY_FLOOR,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl SearchParams {
    pub fn sanitized(mut self) -> Self {
        if !self.floor.is_finite() {
            self.floor = DEFAULT_SIMILARITY_FLOOR;
        }
        self.floor = self.floor.clamp(-1.0, 1.0);
        self.top_k = self.top_k.max(1);
        self
    }
}

/// One top-K request.
#[derive(Debug, Clone, Copy)]
pub struct SimilarityQuery<'a> {
    pub embedding: &'a [f32],
    /// The capture being classified; never returned as its own neighbour.
    pub exclude_id: Option<&'a str>,
    pub params: SearchParams,
}

/// Read side of the similarity store.
///
/// Implementations must return only entries with similarity >= `params.floor`,
/// sorted by similarity descending (more recent capture first on ties), at most
/// `params.top_k` of them. A zero query vector or an empty store yields `Ok(vec![])`.
/// A query whose dimension differs from the stored vectors is `DimensionMismatch`.
pub trait SimilarityIndex: Send + Sync {
    fn search(&self, query: &SimilarityQuery<'_>) -> Result<Vec<SimilarCapture>, IndexError>;
}

/// Prior capture as written by the ingest pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedCapture {
    pub capture_id: String,
    pub embedding: Vec<f32>,
    /// Label the capture was resolved to when it was classified.
    pub label: String,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Entry {
    capture: IndexedCapture,
    norm: f32,
}

#[derive(Debug, Default)]
struct State {
    dimension: Option<usize>,
    entries: Vec<Entry>,
    by_id: HashMap<String, usize>,
}

/// In-memory linear-scan store.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    inner: RwLock<State>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub entries: usize,
    pub dimension: Option<usize>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by `capture_id`. The first insert fixes the dimension.
    pub fn upsert(&self, capture: IndexedCapture) -> Result<(), IndexError> {
        if capture.embedding.is_empty() {
            return Err(IndexError::InvalidEntry(format!(
                "capture `{}` has an empty embedding",
                capture.capture_id
            )));
        }
        if capture.embedding.iter().any(|x| !x.is_finite()) {
            return Err(IndexError::InvalidEntry(format!(
                "capture `{}` has non-finite embedding components",
                capture.capture_id
            )));
        }

        let mut guard = self
            .inner
            .write()
            .map_err(|_| IndexError::Unavailable("index lock poisoned".into()))?;

        let dim = capture.embedding.len();
        match guard.dimension {
            Some(expected) if expected != dim => {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    actual: dim,
                })
            }
            _ => guard.dimension = Some(dim),
        }

        let norm = l2_norm(&capture.embedding);
        let id = capture.capture_id.clone();
        let entry = Entry { capture, norm };
        if let Some(&pos) = guard.by_id.get(&id) {
            guard.entries[pos] = entry;
        } else {
            let pos = guard.entries.len();
            guard.entries.push(entry);
            guard.by_id.insert(id, pos);
        }
        Ok(())
    }

    pub fn stats(&self) -> IndexStats {
        match self.inner.read() {
            Ok(g) => IndexStats {
                entries: g.entries.len(),
                dimension: g.dimension,
            },
            Err(_) => IndexStats {
                entries: 0,
                dimension: None,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.stats().entries
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SimilarityIndex for MemoryIndex {
    fn search(&self, query: &SimilarityQuery<'_>) -> Result<Vec<SimilarCapture>, IndexError> {
        let guard = self
            .inner
            .read()
            .map_err(|_| IndexError::Unavailable("index lock poisoned".into()))?;

        let Some(dim) = guard.dimension else {
            return Ok(Vec::new());
        };
        if query.embedding.len() != dim {
            return Err(IndexError::DimensionMismatch {
                expected: dim,
                actual: query.embedding.len(),
            });
        }
        let q_norm = l2_norm(query.embedding);
        if q_norm == 0.0 {
            return Ok(Vec::new());
        }

        let params = query.params.sanitized();
        let mut hits: Vec<(&IndexedCapture, f32)> = guard
            .entries
            .iter()
            .filter(|e| e.norm > 0.0)
            .filter(|e| query.exclude_id != Some(e.capture.capture_id.as_str()))
            .map(|e| {
                let sim = dot(query.embedding, &e.capture.embedding) / (q_norm * e.norm);
                (&e.capture, sim.clamp(-1.0, 1.0))
            })
            .filter(|(_, sim)| *sim >= params.floor)
            .collect();

        hits.sort_by(|(a, sa), (b, sb)| {
            sb.partial_cmp(sa)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.captured_at.cmp(&a.captured_at))
                .then_with(|| a.capture_id.cmp(&b.capture_id))
        });
        hits.truncate(params.top_k);

        debug!(
            target: "index",
            scanned = guard.entries.len(),
            returned = hits.len(),
            floor = params.floor,
            "similarity scan"
        );

        Ok(hits
            .into_iter()
            .map(|(c, sim)| SimilarCapture {
                capture_id: c.capture_id.clone(),
                similarity: sim,
                label: c.label.clone(),
            })
            .collect())
    }
}

/// Cosine similarity; 0.0 for mismatched lengths or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let na = l2_norm(a);
    let nb = l2_norm(b);
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot(a, b) / (na * nb)
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}
