use crate::traits::VectorIndex;
use crate::{Embedder, RetrievalError, RetrievalOptions, SearchHit};
use std::sync::Arc;
use tracing::debug;

/// Read path: embed the query, then ask the index for its nearest entries.
pub struct RetrievalService<E: ?Sized, V: ?Sized> {
    embedder: Arc<E>,
    index: Arc<V>,
    options: RetrievalOptions,
}

impl<E, V> RetrievalService<E, V>
where
    E: Embedder + ?Sized,
    V: VectorIndex + ?Sized,
{
    pub fn new(embedder: Arc<E>, index: Arc<V>) -> Self {
        Self::with_options(embedder, index, RetrievalOptions::default())
    }

    pub fn with_options(embedder: Arc<E>, index: Arc<V>, options: RetrievalOptions) -> Self {
        Self {
            embedder,
            index,
            options,
        }
    }

    /// Ranked chunk texts, most similar first. `None` uses the configured default.
    pub async fn search(
        &self,
        query_text: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<String>, RetrievalError> {
        let hits = self.search_hits(query_text, top_k).await?;
        Ok(hits.into_iter().map(|hit| hit.text).collect())
    }

    pub async fn search_hits(
        &self,
        query_text: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<SearchHit>, RetrievalError> {
        if query_text.trim().is_empty() {
            return Err(RetrievalError::InvalidQuery("query is empty".to_string()));
        }

        let top_k = top_k.unwrap_or(self.options.default_top_k);
        if top_k == 0 {
            return Err(RetrievalError::InvalidArgument(
                "top_k must be a positive integer".to_string(),
            ));
        }

        let query_vector = self.embedder.embed_one(query_text).await?;
        let hits = self.index.query(&query_vector, top_k).await?;
        debug!(top_k, hits = hits.len(), "search completed");
        Ok(hits)
    }
}
