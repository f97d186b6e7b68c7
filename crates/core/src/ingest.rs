use crate::error::{ExtractError, IngestError, PipelineError, RetrievalError};
use crate::traits::VectorIndex;
use crate::{
    build_chunks, extract_text, DocumentFingerprint, Embedder, IngestionOptions, IngestionReport,
};
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_pdf = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));

        if is_pdf {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub fn digest_file(path: &Path) -> Result<String, ExtractError> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn build_document_fingerprint(path: &Path) -> Result<DocumentFingerprint, ExtractError> {
    let checksum = digest_file(path)?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ExtractError::MissingFileName(path.display().to_string()))?;

    Ok(DocumentFingerprint {
        document_id: generate_document_id(path),
        document_title: name.to_string(),
        source_path: path.to_string_lossy().to_string(),
        checksum,
        ingested_at: Utc::now(),
    })
}

fn generate_document_id(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Write path: chunk, embed, then append to the index in source order.
///
/// Not transactional. When embedding or insertion fails partway, entries already added
/// stay in the index and the returned [`IngestError`] lists their ids.
pub struct IngestionPipeline<E: ?Sized, V: ?Sized> {
    embedder: Arc<E>,
    index: Arc<V>,
    options: IngestionOptions,
}

impl<E, V> IngestionPipeline<E, V>
where
    E: Embedder + ?Sized,
    V: VectorIndex + ?Sized,
{
    pub fn new(embedder: Arc<E>, index: Arc<V>) -> Self {
        Self::with_options(embedder, index, IngestionOptions::default())
    }

    pub fn with_options(embedder: Arc<E>, index: Arc<V>, options: IngestionOptions) -> Self {
        Self {
            embedder,
            index,
            options,
        }
    }

    pub async fn ingest(&self, document_text: &str) -> Result<Vec<String>, IngestError> {
        self.ingest_document(None, document_text).await
    }

    pub async fn ingest_document(
        &self,
        document_id: Option<&str>,
        document_text: &str,
    ) -> Result<Vec<String>, IngestError> {
        let chunks = build_chunks(document_id, document_text);
        if chunks.is_empty() {
            debug!(document_id = ?document_id, "document has no text to index");
            return Ok(Vec::new());
        }

        let batch_size = self.options.embed_batch_size.max(1);
        let mut ids = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(batch_size) {
            let texts = batch
                .iter()
                .map(|chunk| chunk.text.clone())
                .collect::<Vec<_>>();
            debug!(
                document_id = ?document_id,
                first_position = batch[0].position,
                size = texts.len(),
                "embedding chunk batch"
            );

            let embeddings = match self.embedder.embed_batch(&texts).await {
                Ok(embeddings) if embeddings.len() == texts.len() => embeddings,
                Ok(embeddings) => {
                    let source = RetrievalError::EmbeddingFailure(format!(
                        "embedder returned {} vectors for {} chunks",
                        embeddings.len(),
                        texts.len()
                    ));
                    return Err(partial_failure(ids, source));
                }
                Err(source) => return Err(partial_failure(ids, source)),
            };

            for (text, embedding) in texts.into_iter().zip(embeddings) {
                match self.index.add(text, embedding).await {
                    Ok(id) => ids.push(id),
                    Err(source) => return Err(partial_failure(ids, source)),
                }
            }
        }

        info!(document_id = ?document_id, chunks = ids.len(), "document indexed");
        Ok(ids)
    }

    pub async fn ingest_pdf(&self, path: &Path) -> Result<IngestionReport, PipelineError> {
        let owned = path.to_path_buf();
        let (fingerprint, text) = run_blocking_extraction(move || {
            let fingerprint = build_document_fingerprint(&owned)?;
            let text = extract_text(&owned)?;
            Ok((fingerprint, text))
        })
        .await?;

        let chunk_ids = self
            .ingest_document(Some(&fingerprint.document_id), &text)
            .await?;

        Ok(IngestionReport {
            fingerprint,
            chunk_ids,
        })
    }
}

/// Runs lopdf work off the async workers. A panic inside it becomes `ExtractError::Panicked`.
async fn run_blocking_extraction<T, F>(work: F) -> Result<T, ExtractError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ExtractError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|error| ExtractError::Panicked(error.to_string()))?
}

fn partial_failure(ingested_ids: Vec<String>, source: RetrievalError) -> IngestError {
    if !ingested_ids.is_empty() {
        warn!(
            ingested = ingested_ids.len(),
            error = %source,
            "ingestion failed partway, already indexed chunks are kept"
        );
    }
    IngestError {
        ingested_ids,
        source,
    }
}
