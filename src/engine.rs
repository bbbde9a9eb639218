/// Pipeline orchestration: uploads in, committed stores and answers out.
///
/// One ingest call decodes every file, isolates per-document failures,
/// chunks and embeds whatever decoded, and commits the whole batch in a
/// single store mutation. A cancellation token aborts between steps; once
/// the commit starts, it finishes.
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::chunker::Chunker;
use crate::config::Config;
use crate::embedder::Embedder;
use crate::error::{Error, Result};
use crate::loader;
use crate::retriever::{QueryResult, Retriever};
use crate::store::{EmbeddedChunk, StoreManager};
use crate::synthesizer::{self, AnswerSynthesizer};

/// One uploaded file: display name plus raw bytes.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Extension declared by the file name, without the dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        self.name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
    }
}

/// Why one document was left out of an ingest.
#[derive(Debug)]
pub struct DocumentFailure {
    pub document: String,
    pub error: Error,
}

/// Outcome of one ingest batch.
#[derive(Debug)]
pub struct IngestReport {
    pub store: String,
    /// Whether this ingest created the store (as opposed to appending).
    pub created: bool,
    pub documents_indexed: usize,
    pub chunks_added: usize,
    pub failures: Vec<DocumentFailure>,
}

/// A synthesized answer with the deduplicated context that grounded it.
#[derive(Debug)]
pub struct Answer {
    pub text: String,
    pub sources: QueryResult,
}

pub struct RagEngine {
    stores: StoreManager,
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
    top_k: usize,
}

impl RagEngine {
    pub fn new(config: &Config, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let chunker = Chunker::new(config.chunk_size, config.chunk_overlap)?;
        let stores = StoreManager::open(&config.stores_dir)?;
        Ok(Self {
            stores,
            embedder,
            chunker,
            top_k: config.top_k,
        })
    }

    /// Direct access to store management (list, info, delete).
    #[must_use]
    pub fn stores(&self) -> &StoreManager {
        &self.stores
    }

    /// Configured default for `k` when the caller has no preference.
    #[must_use]
    pub fn default_top_k(&self) -> usize {
        self.top_k
    }

    /// Ingest uploads into `store`, creating it on first use. Documents
    /// that fail to decode are reported and skipped; the rest commit as one
    /// batch. With no decodable text at all, nothing is created or changed.
    pub async fn ingest(
        &self,
        store: &str,
        files: Vec<UploadFile>,
        cancel: Option<&CancellationToken>,
    ) -> Result<IngestReport> {
        let mut failures = Vec::new();
        let mut candidates = Vec::new();
        let mut documents_indexed = 0;

        for file in &files {
            check_cancelled(cancel)?;
            match loader::load_bytes(&file.bytes, file.extension(), &file.name) {
                Ok(units) => {
                    let mut chunks = self.chunker.split_units(&units);
                    if chunks.is_empty() {
                        warn!("\"{}\" contains no extractable text", file.name);
                    } else {
                        documents_indexed += 1;
                    }
                    candidates.append(&mut chunks);
                }
                Err(e) => {
                    warn!("Skipping \"{}\": {e}", file.name);
                    failures.push(DocumentFailure {
                        document: file.name.clone(),
                        error: e,
                    });
                }
            }
        }

        if candidates.is_empty() {
            info!(
                "Nothing to index for \"{store}\" ({} of {} file(s) failed)",
                failures.len(),
                files.len()
            );
            return Ok(IngestReport {
                store: store.to_string(),
                created: false,
                documents_indexed,
                chunks_added: 0,
                failures,
            });
        }

        check_cancelled(cancel)?;
        // The remote embedder blocks on HTTP; keep it off the async workers
        let texts: Vec<String> = candidates.iter().map(|c| c.text.clone()).collect();
        let embedder = Arc::clone(&self.embedder);
        let vectors = tokio::task::spawn_blocking(move || {
            let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
            embedder.embed_batch(&refs)
        })
        .await
        .map_err(|e| Error::EmbeddingFailure {
            store: store.to_string(),
            detail: format!("embedding task failed: {e}"),
        })?
        .map_err(|e| Error::from_embedder(store, e))?;
        if vectors.len() != candidates.len() {
            return Err(Error::EmbeddingFailure {
                store: store.to_string(),
                detail: format!(
                    "embedder returned {} vector(s) for {} chunk(s)",
                    vectors.len(),
                    candidates.len()
                ),
            });
        }

        // Last cancellation point: past here the batch commits atomically
        check_cancelled(cancel)?;
        let batch: Vec<EmbeddedChunk> = candidates.into_iter().zip(vectors).collect();
        let chunks_added = batch.len();

        let (kb, created) = if self.stores.exists(store) {
            let current = self.stores.load(store)?;
            (self.stores.append(&current, batch).await?, false)
        } else {
            (self.stores.create(store, batch).await?, true)
        };

        info!(
            "Ingest into \"{store}\": {documents_indexed} document(s), {chunks_added} chunk(s), total now {}",
            kb.chunk_count()
        );
        Ok(IngestReport {
            store: store.to_string(),
            created,
            documents_indexed,
            chunks_added,
            failures,
        })
    }

    /// Top-k retrieval against a store's live generation.
    pub fn retrieve(&self, store: &str, query: &str, k: usize) -> Result<QueryResult> {
        let kb = self.stores.load(store)?;
        Retriever::new(self.embedder.as_ref()).retrieve(&kb, query, k)
    }

    /// Retrieval plus synthesis, with deduplicated sources attached.
    pub fn ask(
        &self,
        store: &str,
        question: &str,
        k: usize,
        synthesizer: &dyn AnswerSynthesizer,
    ) -> Result<Answer> {
        let results = self.retrieve(store, question, k)?;
        let context = synthesizer::dedup_context(results);
        let text = synthesizer
            .answer(question, &context)
            .map_err(|e| Error::Synthesis(e.to_string()))?;
        Ok(Answer {
            text,
            sources: context,
        })
    }
}

fn check_cancelled(cancel: Option<&CancellationToken>) -> Result<()> {
    if cancel.is_some_and(CancellationToken::is_cancelled) {
        return Err(Error::Cancelled);
    }
    Ok(())
}
