use crate::{Embedding, RetrievalError, SearchHit};
use async_trait::async_trait;

/// Storage for embedded chunks with nearest-neighbour lookup.
///
/// Entries are append-only: `add` never overwrites or merges, and every call gets a
/// fresh id even when text and vector repeat.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Vector length accepted by this index, once known.
    fn dimensions(&self) -> Option<usize>;

    async fn add(&self, text: String, embedding: Embedding) -> Result<String, RetrievalError>;

    /// Up to `top_k` entries, most similar first. Equal scores keep insertion order.
    async fn query(
        &self,
        embedding: &Embedding,
        top_k: usize,
    ) -> Result<Vec<SearchHit>, RetrievalError>;
}
