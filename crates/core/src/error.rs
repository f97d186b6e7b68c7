use std::fmt;
use thiserror::Error;

/// Coarse error category, stable enough for an outer layer to map onto status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidQuery,
    EmbeddingFailure,
    IndexUnavailable,
    Extraction,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::InvalidQuery => "invalid_query",
            ErrorKind::EmbeddingFailure => "embedding_failure",
            ErrorKind::IndexUnavailable => "index_unavailable",
            ErrorKind::Extraction => "extraction",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("embedding failed: {0}")]
    EmbeddingFailure(String),

    #[error("index unavailable: {0}")]
    IndexUnavailable(String),
}

impl RetrievalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RetrievalError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            RetrievalError::InvalidQuery(_) => ErrorKind::InvalidQuery,
            RetrievalError::EmbeddingFailure(_) => ErrorKind::EmbeddingFailure,
            RetrievalError::IndexUnavailable(_) => ErrorKind::IndexUnavailable,
        }
    }
}

/// Ingestion is not transactional: entries added before the failure stay in the index.
#[derive(Debug, Error)]
#[error("ingestion stopped after {} chunk(s): {source}", .ingested_ids.len())]
pub struct IngestError {
    pub ingested_ids: Vec<String>,
    #[source]
    pub source: RetrievalError,
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }

    pub fn ingested_count(&self) -> usize {
        self.ingested_ids.len()
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("extraction task panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Extract(_) => ErrorKind::Extraction,
            PipelineError::Ingest(error) => error.kind(),
        }
    }
}

pub type Result<T, E = RetrievalError> = std::result::Result<T, E>;
