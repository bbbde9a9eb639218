/// Query-time retrieval: embed the query, search the index, resolve hits
/// back to chunks through the chunk table.
use tracing::debug;

use crate::embedder::Embedder;
use crate::error::{Error, Result};
use crate::store::models::{Chunk, ChunkId, KnowledgeBase};

/// One retrieved chunk with its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

/// Ordered retrieval result, best match first.
pub type QueryResult = Vec<ScoredChunk>;

pub struct Retriever<'a, E: Embedder + ?Sized> {
    embedder: &'a E,
}

impl<'a, E: Embedder + ?Sized> Retriever<'a, E> {
    pub fn new(embedder: &'a E) -> Self {
        Self { embedder }
    }

    /// Top-k chunks for a query. `k` is capped by the store's chunk count:
    /// returning fewer than `k` results is normal, padding never happens.
    /// Searching a store with no vectors is an error.
    pub fn retrieve(&self, kb: &KnowledgeBase, query: &str, k: usize) -> Result<QueryResult> {
        if self.embedder.dimensions() != kb.dimension() {
            return Err(Error::IndexUnavailable {
                store: kb.name().to_string(),
                detail: format!(
                    "index dimension {} cannot serve query embeddings of dimension {}",
                    kb.dimension(),
                    self.embedder.dimensions()
                ),
            });
        }

        let query_vector = self
            .embedder
            .embed(query)
            .map_err(|e| Error::from_embedder(kb.name(), e))?;
        let hits = kb
            .search(&query_vector, k)
            .map_err(|e| Error::from_index(kb.name(), e))?;

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let chunk = kb.get(ChunkId(hit.id)).ok_or_else(|| Error::CorruptStore {
                store: kb.name().to_string(),
                detail: format!("search returned unknown chunk id {}", hit.id),
            })?;
            results.push(ScoredChunk {
                chunk: chunk.clone(),
                score: hit.score,
            });
        }

        debug!(
            "Retrieved {} of {k} requested chunk(s) from \"{}\"",
            results.len(),
            kb.name()
        );
        Ok(results)
    }
}
