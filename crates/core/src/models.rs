use crate::error::RetrievalError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFingerprint {
    pub document_id: String,
    pub document_title: String,
    pub source_path: String,
    pub checksum: String,
    pub ingested_at: DateTime<Utc>,
}

/// One retrievable line of a document, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub document_id: Option<String>,
    pub position: u64,
    pub text: String,
}

/// A fixed-length vector produced by an embedder. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Result<Self, RetrievalError> {
        if values.is_empty() {
            return Err(RetrievalError::EmbeddingFailure(
                "embedding has no components".to_string(),
            ));
        }

        if let Some(position) = values.iter().position(|value| !value.is_finite()) {
            return Err(RetrievalError::EmbeddingFailure(format!(
                "embedding component {position} is not finite"
            )));
        }

        Ok(Self(values))
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub id: String,
    pub sequence: u64,
    pub text: String,
    pub embedding: Embedding,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub text: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub fingerprint: DocumentFingerprint,
    pub chunk_ids: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct IngestionOptions {
    pub embed_batch_size: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            embed_batch_size: 32,
        }
    }
}

pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    pub default_top_k: usize,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            default_top_k: DEFAULT_TOP_K,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Embedding;
    use crate::error::ErrorKind;

    #[test]
    fn embedding_rejects_empty_and_non_finite_vectors() {
        let empty = Embedding::new(Vec::new()).unwrap_err();
        assert_eq!(empty.kind(), ErrorKind::EmbeddingFailure);

        let nan = Embedding::new(vec![0.5, f32::NAN]).unwrap_err();
        assert!(nan.to_string().contains("component 1"));
    }

    #[test]
    fn embedding_keeps_its_components() {
        let embedding = Embedding::new(vec![1.0, 0.0, -1.0]).expect("valid vector");
        assert_eq!(embedding.dimensions(), 3);
        assert_eq!(embedding.as_slice(), &[1.0, 0.0, -1.0]);
    }
}
