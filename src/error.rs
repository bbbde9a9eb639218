/// Crate-wide error type and `Result` alias.
///
/// Every fallible operation in the library reports one of these variants so
/// callers can match on the failure class without string inspection. Variants
/// carry the store or document name they concern.
use thiserror::Error;

use crate::embedder::EmbedderError;
use crate::index::IndexError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The file extension is not one of the decodable document formats.
    #[error("unsupported format \"{extension}\" for document \"{document}\" (supported: pdf, docx, doc)")]
    UnsupportedFormat { document: String, extension: String },

    /// The bytes could not be decoded by the format's parser.
    #[error("cannot decode document \"{document}\": {detail}")]
    CorruptDocument { document: String, detail: String },

    /// An operation that needs chunks was given none.
    #[error("no chunks to index for knowledge base \"{store}\"")]
    EmptyInput { store: String },

    /// A knowledge base with this name already exists.
    #[error("knowledge base \"{store}\" already exists")]
    NameConflict { store: String },

    /// No knowledge base with this name exists.
    #[error("knowledge base \"{store}\" not found")]
    NotFound { store: String },

    /// The persisted artifacts are unreadable or inconsistent with each other.
    #[error("knowledge base \"{store}\" is corrupt: {detail}")]
    CorruptStore { store: String, detail: String },

    /// A search was issued against an index holding no vectors.
    #[error("knowledge base \"{store}\" has an empty index")]
    EmptyIndex { store: String },

    /// The embedding function failed or produced unusable vectors.
    #[error("embedding failed for knowledge base \"{store}\": {detail}")]
    EmbeddingFailure { store: String, detail: String },

    /// The index cannot serve queries in its current configuration, for
    /// example when the query embedder's dimensionality does not match it.
    #[error("vector index for knowledge base \"{store}\" is unavailable: {detail}")]
    IndexUnavailable { store: String, detail: String },

    /// The store name is empty or contains characters unsafe for a directory.
    #[error("invalid knowledge base name \"{name}\": {detail}")]
    InvalidName { name: String, detail: String },

    /// Chunking parameters violate `0 <= overlap < chunk_size, chunk_size > 0`.
    #[error("invalid chunking parameters: chunk_size={chunk_size}, overlap={overlap}")]
    InvalidChunking { chunk_size: usize, overlap: usize },

    /// The answer synthesizer rejected or failed the request.
    #[error("answer synthesis failed: {0}")]
    Synthesis(String),

    /// The operation was cancelled before anything was committed.
    #[error("operation cancelled before commit")]
    Cancelled,

    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Map an index-layer error onto the store it occurred in.
    pub(crate) fn from_index(store: &str, err: IndexError) -> Self {
        match err {
            IndexError::Empty => Error::EmptyIndex {
                store: store.to_string(),
            },
            IndexError::DimensionMismatch { .. } => Error::EmbeddingFailure {
                store: store.to_string(),
                detail: err.to_string(),
            },
            IndexError::Corrupt(_) | IndexError::DuplicateId(_) => Error::CorruptStore {
                store: store.to_string(),
                detail: err.to_string(),
            },
        }
    }

    /// Map an embedder-layer error onto the store whose operation needed it.
    pub(crate) fn from_embedder(store: &str, err: EmbedderError) -> Self {
        Error::EmbeddingFailure {
            store: store.to_string(),
            detail: err.to_string(),
        }
    }
}
