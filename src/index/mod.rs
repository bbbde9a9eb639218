/// Vector index abstraction.
///
/// A `VectorIndex` holds `(id, vector)` pairs of one fixed dimensionality and
/// answers cosine top-k queries. Implementations must serialize themselves to
/// the versioned binary artifact so a store survives process restarts.
pub mod flat;

use thiserror::Error;

pub use flat::FlatIndex;

/// Errors raised by index operations.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("index holds no vectors")]
    Empty,

    #[error("vector has dimension {got}, index expects {expected}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("duplicate vector id {0}")]
    DuplicateId(u64),

    #[error("corrupt index data: {0}")]
    Corrupt(String),
}

/// One search hit: the vector's id and its cosine similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub id: u64,
    pub score: f32,
}

/// In-memory vector index over a single fixed dimensionality.
pub trait VectorIndex: Send + Sync {
    /// Insert one vector under a caller-chosen id. Re-inserting an existing
    /// id or a vector of the wrong dimension is an error.
    fn insert(&mut self, id: u64, vector: &[f32]) -> Result<(), IndexError>;

    /// Return up to `k` hits ordered by descending similarity, ties broken
    /// by ascending id. Searching an empty index is an error; `k` larger
    /// than the index yields every vector, never padding.
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError>;

    /// Number of vectors held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensionality every vector in this index must have.
    fn dimension(&self) -> usize;

    /// Serialize to the versioned binary artifact.
    fn encode(&self) -> Vec<u8>;
}
