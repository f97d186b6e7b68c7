use crate::traits::VectorIndex;
use crate::{Embedding, IndexEntry, RetrievalError, SearchHit};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

#[derive(Debug, Default)]
struct IndexState {
    entries: Vec<IndexEntry>,
    next_sequence: u64,
    dimensions: Option<usize>,
}

/// Process-local vector index with exact cosine search.
///
/// The id counter, the dimensionality and the entries share one lock, so assigning an
/// id and appending its entry is a single critical section.
#[derive(Debug, Default)]
pub struct InMemoryVectorIndex {
    state: RwLock<IndexState>,
    max_entries: Option<usize>,
}

impl InMemoryVectorIndex {
    /// Dimensionality is fixed by the first successful `add`.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            state: RwLock::new(IndexState {
                dimensions: Some(dimensions),
                ..IndexState::default()
            }),
            max_entries: None,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries);
        self
    }

    /// Entry count. A poisoned lock is logged and reads as empty; `add` and `query`
    /// report it as `IndexUnavailable`.
    pub fn len(&self) -> usize {
        match self.read() {
            Ok(state) => state.entries.len(),
            Err(error) => {
                warn!(%error, "index length unavailable");
                0
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, IndexState>, RetrievalError> {
        self.state
            .read()
            .map_err(|_| RetrievalError::IndexUnavailable("index lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, IndexState>, RetrievalError> {
        self.state
            .write()
            .map_err(|_| RetrievalError::IndexUnavailable("index lock poisoned".to_string()))
    }
}

fn check_dimensions(expected: Option<usize>, actual: usize) -> Result<(), RetrievalError> {
    match expected {
        Some(expected) if expected != actual => Err(RetrievalError::InvalidArgument(format!(
            "embedding dimension {actual} does not match index dimension {expected}"
        ))),
        _ => Ok(()),
    }
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    let mut dot = 0.0f64;
    let mut norm_left = 0.0f64;
    let mut norm_right = 0.0f64;
    for (&x, &y) in left.iter().zip(right.iter()) {
        let x = f64::from(x);
        let y = f64::from(y);
        dot += x * y;
        norm_left += x * x;
        norm_right += y * y;
    }

    if norm_left == 0.0 || norm_right == 0.0 {
        return 0.0;
    }

    dot / (norm_left.sqrt() * norm_right.sqrt())
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn dimensions(&self) -> Option<usize> {
        match self.read() {
            Ok(state) => state.dimensions,
            Err(error) => {
                warn!(%error, "index dimensions unavailable");
                None
            }
        }
    }

    async fn add(&self, text: String, embedding: Embedding) -> Result<String, RetrievalError> {
        let mut state = self.write()?;
        check_dimensions(state.dimensions, embedding.dimensions())?;

        if let Some(limit) = self.max_entries {
            if state.entries.len() >= limit {
                return Err(RetrievalError::IndexUnavailable(format!(
                    "index is full ({limit} entries)"
                )));
            }
        }

        let sequence = state.next_sequence;
        state.next_sequence = sequence.checked_add(1).ok_or_else(|| {
            RetrievalError::IndexUnavailable("id space exhausted".to_string())
        })?;
        state.dimensions.get_or_insert(embedding.dimensions());

        let id = format!("doc_{sequence}");
        state.entries.push(IndexEntry {
            id: id.clone(),
            sequence,
            text,
            embedding,
        });

        Ok(id)
    }

    async fn query(
        &self,
        embedding: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        if top_k == 0 {
            return Err(RetrievalError::InvalidArgument(
                "top_k must be positive".to_string(),
            ));
        }

        let state = self.read()?;
        check_dimensions(state.dimensions, embedding.dimensions())?;

        let mut scored = state
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| {
                let score = cosine_similarity(embedding.as_slice(), entry.embedding.as_slice());
                (score, entry.sequence, position)
            })
            .collect::<Vec<_>>();

        let ranking = |left: &(f64, u64, usize), right: &(f64, u64, usize)| -> Ordering {
            right.0.total_cmp(&left.0).then(left.1.cmp(&right.1))
        };

        if scored.len() > top_k {
            scored.select_nth_unstable_by(top_k - 1, ranking);
            scored.truncate(top_k);
        }
        scored.sort_unstable_by(ranking);

        debug!(
            entries = state.entries.len(),
            top_k,
            returned = scored.len(),
            "vector query"
        );

        Ok(scored
            .into_iter()
            .map(|(score, _, position)| {
                let entry = &state.entries[position];
                SearchHit {
                    id: entry.id.clone(),
                    text: entry.text.clone(),
                    score,
                }
            })
            .collect())
    }
}
