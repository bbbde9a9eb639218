/// Data model for persisted knowledge bases.
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chunker::ChunkCandidate;
use crate::index::{FlatIndex, IndexError, SearchHit, VectorIndex};
use crate::loader::SourceKind;

/// Identifier of a chunk within one knowledge base. Ids start at 0 on
/// create and keep growing across appends; they are never reused.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ChunkId(pub u64);

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One indexed chunk as persisted in the chunk table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub text: String,
    pub document: String,
    pub source: SourceKind,
    /// Half-open char-offset range within the originating text unit.
    pub span: (usize, usize),
    pub store: String,
}

impl Chunk {
    pub(crate) fn from_candidate(candidate: ChunkCandidate, id: ChunkId, store: &str) -> Self {
        Self {
            id,
            text: candidate.text,
            document: candidate.document,
            source: candidate.source,
            span: candidate.span,
            store: store.to_string(),
        }
    }

    /// Human-readable provenance, e.g. `"report.pdf, page 3"`.
    #[must_use]
    pub fn citation(&self) -> String {
        match self.source.describe() {
            Some(location) => format!("{}, {location}", self.document),
            None => self.document.clone(),
        }
    }
}

/// Serialized form of `chunks.json`.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ChunkTable {
    pub format_version: u32,
    pub store: String,
    pub chunks: Vec<Chunk>,
}

/// Serialized form of `meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoreMeta {
    pub format_version: u32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub dimension: usize,
}

/// Summary returned by [`super::StoreManager::info`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoreInfo {
    pub name: String,
    pub chunk_count: usize,
    pub dimension: usize,
    pub created_at: DateTime<Utc>,
    pub generation: u64,
}

/// In-memory snapshot of one knowledge base generation.
///
/// Immutable once loaded: mutations go through the manager, which commits a
/// new generation and hands back a fresh snapshot. Every vector id in the
/// index has exactly one chunk table entry and vice versa.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    pub(crate) name: String,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) generation: u64,
    pub(crate) index: FlatIndex,
    pub(crate) chunks: BTreeMap<ChunkId, Chunk>,
}

impl KnowledgeBase {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    #[must_use]
    pub fn get(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(&id)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// Cosine top-k over the index; ids resolve through [`Self::get`].
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        self.index.search(query, k)
    }
}
