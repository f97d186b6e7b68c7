pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod ingest;
pub mod models;
pub mod retrieval;
pub mod stores;
pub mod traits;

pub use chunking::{build_chunks, chunk_lines, LineChunks};
pub use embeddings::{
    CharacterNgramEmbedder, Embedder, HttpEmbedder, HttpEmbedderConfig,
    DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{ErrorKind, ExtractError, IngestError, PipelineError, RetrievalError};
pub use extractor::{extract_text, LopdfExtractor, PageText, PdfExtractor};
pub use ingest::{build_document_fingerprint, discover_pdf_files, IngestionPipeline};
pub use models::{
    Chunk, DocumentFingerprint, Embedding, IndexEntry, IngestionOptions, IngestionReport,
    RetrievalOptions, SearchHit, DEFAULT_TOP_K,
};
pub use retrieval::RetrievalService;
pub use stores::InMemoryVectorIndex;
pub use traits::VectorIndex;
