/// Named knowledge-base storage.
///
/// A `StoreManager` owns a root directory of stores. Mutations (create,
/// append, delete) serialize per store name behind an async mutex and become
/// visible through a single atomic rename, so loads observe either the old
/// or the new committed state, never a mix. Loaded [`KnowledgeBase`]
/// snapshots are immutable; appending yields a new snapshot.
pub mod layout;
pub mod models;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex as TokioMutex;
use tracing::{debug, info, warn};

use crate::chunker::ChunkCandidate;
use crate::error::{Error, Result};
use crate::index::{FlatIndex, IndexError, VectorIndex};
use layout::{
    CHUNKS_FILE, CURRENT_FILE, INDEX_FILE, META_FILE, STORE_FORMAT_VERSION, generation_dir_name,
    has_live_generation, parse_generation, read_current, stage_dir, store_dir, write_current,
};
use models::{Chunk, ChunkId, ChunkTable, KnowledgeBase, StoreInfo, StoreMeta};

/// A chunk candidate paired with its embedding, ready to commit.
pub type EmbeddedChunk = (ChunkCandidate, Vec<f32>);

pub struct StoreManager {
    root: PathBuf,
    locks: StdMutex<HashMap<String, Arc<TokioMutex<()>>>>,
}

impl StoreManager {
    /// Open a manager rooted at `root`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        info!("Knowledge base root: {}", root.display());
        Ok(Self {
            root,
            locks: StdMutex::new(HashMap::new()),
        })
    }

    /// The mutation lock for one store name, created on first use.
    fn name_lock(&self, name: &str) -> Arc<TokioMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(name.to_string()).or_default().clone()
    }

    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        store_dir(&self.root, name).is_dir()
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Create a new store from a non-empty batch. The store appears on disk
    /// fully formed or not at all.
    pub async fn create(&self, name: &str, batch: Vec<EmbeddedChunk>) -> Result<KnowledgeBase> {
        validate_name(name)?;
        if batch.is_empty() {
            return Err(Error::EmptyInput {
                store: name.to_string(),
            });
        }
        let dimension = batch[0].1.len();
        if dimension == 0 {
            return Err(Error::EmbeddingFailure {
                store: name.to_string(),
                detail: "embedder produced an empty vector".to_string(),
            });
        }

        let lock = self.name_lock(name);
        let _guard = lock.lock().await;
        if self.exists(name) {
            return Err(Error::NameConflict {
                store: name.to_string(),
            });
        }

        let kb = assemble(
            name,
            Utc::now(),
            1,
            FlatIndex::new(dimension),
            BTreeMap::new(),
            batch,
        )?;
        self.persist_new_store(&kb)?;
        info!(
            "Created knowledge base \"{name}\" with {} chunk(s)",
            kb.chunk_count()
        );
        Ok(kb)
    }

    /// Append a batch to an existing store, committing one new generation.
    ///
    /// The handle is only used for identity: the current on-disk state is
    /// reloaded under the store's lock before extending, so a stale handle
    /// cannot roll the store back. An empty batch is a no-op.
    pub async fn append(
        &self,
        kb: &KnowledgeBase,
        batch: Vec<EmbeddedChunk>,
    ) -> Result<KnowledgeBase> {
        if batch.is_empty() {
            debug!("Append of zero chunks to \"{}\" is a no-op", kb.name());
            return Ok(kb.clone());
        }

        let lock = self.name_lock(kb.name());
        let _guard = lock.lock().await;
        let current = self.load(kb.name())?;
        let old_generation = current.generation;
        let added = batch.len();

        let KnowledgeBase {
            name,
            created_at,
            index,
            chunks,
            ..
        } = current;
        let updated = assemble(&name, created_at, old_generation + 1, index, chunks, batch)?;
        self.persist_generation(&updated)?;

        // CURRENT already points away; a reader that resolved the old
        // generation chases the repointed file instead of failing. Losing
        // this cleanup only costs disk space
        let old_dir = store_dir(&self.root, &name).join(generation_dir_name(old_generation));
        if let Err(e) = fs::remove_dir_all(&old_dir) {
            warn!("Could not prune old generation {}: {e}", old_dir.display());
        }

        info!(
            "Appended {added} chunk(s) to \"{name}\" (generation {})",
            updated.generation
        );
        Ok(updated)
    }

    /// Remove a store and everything under it. Returns whether it existed.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let lock = self.name_lock(name);
        let _guard = lock.lock().await;
        let dir = store_dir(&self.root, name);
        if !dir.is_dir() {
            debug!("Delete of missing knowledge base \"{name}\" ignored");
            return Ok(false);
        }
        fs::remove_dir_all(&dir)?;
        info!("Deleted knowledge base \"{name}\"");
        Ok(true)
    }

    // ── Reads ────────────────────────────────────────────────────────────

    /// Load the live generation of a store into memory, verifying that the
    /// index and chunk table agree. A load racing an append's cleanup
    /// chases the repointed generation instead of failing on the pruned
    /// directory.
    pub fn load(&self, name: &str) -> Result<KnowledgeBase> {
        let dir = store_dir(&self.root, name);
        if !dir.is_dir() {
            return Err(Error::NotFound {
                store: name.to_string(),
            });
        }
        let corrupt = |detail: String| Error::CorruptStore {
            store: name.to_string(),
            detail,
        };

        let meta_bytes = fs::read(dir.join(META_FILE))
            .map_err(|e| corrupt(format!("{META_FILE} unreadable: {e}")))?;
        let meta: StoreMeta = serde_json::from_slice(&meta_bytes)
            .map_err(|e| corrupt(format!("{META_FILE} invalid: {e}")))?;
        if meta.format_version != STORE_FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported store format version {}",
                meta.format_version
            )));
        }
        if meta.name != name {
            return Err(corrupt(format!(
                "directory belongs to store \"{}\"",
                meta.name
            )));
        }

        let (generation, index_bytes, table_bytes) = read_live_artifacts(&dir, name)?;

        let index = FlatIndex::decode(&index_bytes).map_err(|e| corrupt(e.to_string()))?;
        if index.dimension() != meta.dimension {
            return Err(corrupt(format!(
                "index dimension {} disagrees with {META_FILE} dimension {}",
                index.dimension(),
                meta.dimension
            )));
        }

        let table: ChunkTable = serde_json::from_slice(&table_bytes)
            .map_err(|e| corrupt(format!("{CHUNKS_FILE} invalid: {e}")))?;
        if table.format_version != STORE_FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported chunk table version {}",
                table.format_version
            )));
        }
        if table.store != name {
            return Err(corrupt(format!(
                "chunk table belongs to store \"{}\"",
                table.store
            )));
        }
        if table.chunks.len() != index.len() {
            return Err(corrupt(format!(
                "index holds {} vector(s) but chunk table has {} entr(ies)",
                index.len(),
                table.chunks.len()
            )));
        }

        let mut chunks = BTreeMap::new();
        for chunk in table.chunks {
            let id = chunk.id;
            if chunks.insert(id, chunk).is_some() {
                return Err(corrupt(format!("duplicate chunk id {id} in chunk table")));
            }
        }
        for &id in index.ids() {
            if !chunks.contains_key(&ChunkId(id)) {
                return Err(corrupt(format!(
                    "index vector {id} has no chunk table entry"
                )));
            }
        }

        debug!("Loaded \"{name}\" generation {generation}: {} chunk(s)", chunks.len());
        Ok(KnowledgeBase {
            name: name.to_string(),
            created_at: meta.created_at,
            generation,
            index,
            chunks,
        })
    }

    /// Names of every loadable store, sorted. Directories without a live
    /// generation are skipped with a warning, never an error.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if has_live_generation(&entry.path()) {
                names.push(name);
            } else {
                warn!("Skipping \"{name}\": no live generation");
            }
        }
        names.sort();
        Ok(names)
    }

    /// Summary of one store. Loads the live generation, so the chunk count
    /// is exact rather than estimated.
    pub fn info(&self, name: &str) -> Result<StoreInfo> {
        let kb = self.load(name)?;
        Ok(StoreInfo {
            name: kb.name.clone(),
            chunk_count: kb.chunk_count(),
            dimension: kb.dimension(),
            created_at: kb.created_at,
            generation: kb.generation,
        })
    }

    // ── Persistence ──────────────────────────────────────────────────────

    /// Stage a complete store directory, then rename it into place. A
    /// failed rename onto an existing directory means another process won
    /// the name.
    fn persist_new_store(&self, kb: &KnowledgeBase) -> Result<()> {
        let stage = stage_dir(&self.root);
        let staged = (|| -> Result<()> {
            let gen_dir = stage.join(generation_dir_name(kb.generation));
            fs::create_dir_all(&gen_dir)?;
            write_artifacts(&gen_dir, kb)?;
            let meta = StoreMeta {
                format_version: STORE_FORMAT_VERSION,
                name: kb.name.clone(),
                created_at: kb.created_at,
                dimension: kb.dimension(),
            };
            fs::write(stage.join(META_FILE), serde_json::to_vec_pretty(&meta)?)?;
            write_current(&stage, kb.generation)?;
            Ok(())
        })();
        if let Err(e) = staged {
            let _ = fs::remove_dir_all(&stage);
            return Err(e);
        }

        let dir = store_dir(&self.root, &kb.name);
        if let Err(e) = fs::rename(&stage, &dir) {
            let _ = fs::remove_dir_all(&stage);
            if dir.exists() {
                return Err(Error::NameConflict {
                    store: kb.name.clone(),
                });
            }
            return Err(e.into());
        }
        Ok(())
    }

    /// Write a new generation into an existing store and repoint CURRENT.
    /// Until the repoint lands, readers keep seeing the old generation.
    fn persist_generation(&self, kb: &KnowledgeBase) -> Result<()> {
        let dir = store_dir(&self.root, &kb.name);
        let gen_dir = dir.join(generation_dir_name(kb.generation));
        fs::create_dir_all(&gen_dir)?;
        write_artifacts(&gen_dir, kb)?;
        write_current(&dir, kb.generation)?;
        Ok(())
    }
}

fn write_artifacts(gen_dir: &Path, kb: &KnowledgeBase) -> Result<()> {
    fs::write(gen_dir.join(INDEX_FILE), kb.index.encode())?;
    let table = ChunkTable {
        format_version: STORE_FORMAT_VERSION,
        store: kb.name.clone(),
        chunks: kb.chunks.values().cloned().collect(),
    };
    fs::write(gen_dir.join(CHUNKS_FILE), serde_json::to_vec_pretty(&table)?)?;
    Ok(())
}

/// How many repointed-CURRENT chases a read tolerates before reporting the
/// missing artifact. One chase needs a whole append to land inside the
/// read, so real loads settle after at most one or two.
const POINTER_CHASES: usize = 8;

/// Resolve CURRENT and read that generation's artifacts as one snapshot.
///
/// An append commits by repointing CURRENT and then pruning the superseded
/// generation, so a reader that resolved the pointer just before the
/// repoint can find the directory already gone. That is not corruption:
/// re-reading CURRENT names the newer generation and the read starts over
/// there. A vanished artifact with an unchanged pointer stays an error.
fn read_live_artifacts(dir: &Path, name: &str) -> Result<(u64, Vec<u8>, Vec<u8>)> {
    let corrupt = |detail: String| Error::CorruptStore {
        store: name.to_string(),
        detail,
    };
    let mut chases = 0;
    loop {
        let current = read_current(dir)
            .map_err(|e| corrupt(format!("{CURRENT_FILE} pointer unreadable: {e}")))?;
        let generation = parse_generation(&current)
            .ok_or_else(|| corrupt(format!("bad generation pointer \"{current}\"")))?;
        let gen_dir = dir.join(&current);

        let raced = |err: &io::Error| {
            err.kind() == io::ErrorKind::NotFound
                && read_current(dir).is_ok_and(|now| now != current)
        };

        let index_bytes = match fs::read(gen_dir.join(INDEX_FILE)) {
            Ok(bytes) => bytes,
            Err(ref e) if chases < POINTER_CHASES && raced(e) => {
                chases += 1;
                continue;
            }
            Err(e) => return Err(corrupt(format!("{INDEX_FILE} unreadable: {e}"))),
        };
        let table_bytes = match fs::read(gen_dir.join(CHUNKS_FILE)) {
            Ok(bytes) => bytes,
            Err(ref e) if chases < POINTER_CHASES && raced(e) => {
                chases += 1;
                continue;
            }
            Err(e) => return Err(corrupt(format!("{CHUNKS_FILE} unreadable: {e}"))),
        };
        return Ok((generation, index_bytes, table_bytes));
    }
}

/// Extend `index` and `chunks` with a batch, assigning ids past the current
/// maximum, and wrap the result into a snapshot.
fn assemble(
    name: &str,
    created_at: DateTime<Utc>,
    generation: u64,
    mut index: FlatIndex,
    mut chunks: BTreeMap<ChunkId, Chunk>,
    batch: Vec<EmbeddedChunk>,
) -> Result<KnowledgeBase> {
    let mut next = chunks.keys().next_back().map_or(0, |id| id.0 + 1);
    for (candidate, vector) in batch {
        let id = ChunkId(next);
        next += 1;
        index.insert(id.0, &vector).map_err(|e| match e {
            IndexError::DimensionMismatch { expected, got } => Error::EmbeddingFailure {
                store: name.to_string(),
                detail: format!(
                    "chunk {id} from \"{}\" has dimension {got}, store expects {expected}",
                    candidate.document
                ),
            },
            other => Error::from_index(name, other),
        })?;
        chunks.insert(id, Chunk::from_candidate(candidate, id, name));
    }
    Ok(KnowledgeBase {
        name: name.to_string(),
        created_at,
        generation,
        index,
        chunks,
    })
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = |detail: &str| {
        Err(Error::InvalidName {
            name: name.to_string(),
            detail: detail.to_string(),
        })
    };
    if name.is_empty() {
        return invalid("name is empty");
    }
    if name.len() > 128 {
        return invalid("name exceeds 128 bytes");
    }
    if name.starts_with('.') {
        return invalid("name may not start with '.'");
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' '))
    {
        return invalid("allowed characters: alphanumerics, '-', '_', '.', ' '");
    }
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::Embedder;
    use crate::embedder::mock::MockEmbedder;
    use crate::loader::SourceKind;

    fn batch(texts: &[&str]) -> Vec<EmbeddedChunk> {
        let embedder = MockEmbedder::new(8);
        texts
            .iter()
            .map(|t| {
                (
                    ChunkCandidate {
                        text: t.to_string(),
                        document: "doc.pdf".to_string(),
                        source: SourceKind::PdfPage { page: 1 },
                        span: (0, t.chars().count()),
                    },
                    embedder.embed(t).unwrap(),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_create_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::open(dir.path()).unwrap();

        let kb = manager
            .create("demo", batch(&["alpha", "beta", "gamma"]))
            .await
            .unwrap();
        assert_eq!(kb.chunk_count(), 3);
        assert_eq!(kb.generation(), 1);

        let loaded = manager.load("demo").unwrap();
        assert_eq!(loaded.chunk_count(), 3);
        assert_eq!(loaded.dimension(), 8);
        assert_eq!(loaded.generation(), 1);
        assert_eq!(loaded.created_at(), kb.created_at());
        let texts: Vec<&str> = loaded.chunks().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["alpha", "beta", "gamma"]);
        assert_eq!(loaded.get(ChunkId(0)).unwrap().store, "demo");
    }

    #[tokio::test]
    async fn test_create_rejects_existing_name() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::open(dir.path()).unwrap();
        manager.create("demo", batch(&["a"])).await.unwrap();

        let err = manager.create("demo", batch(&["b"])).await.unwrap_err();
        assert!(matches!(err, Error::NameConflict { .. }));

        // The losing attempt must not disturb the existing store
        assert_eq!(manager.load("demo").unwrap().chunk_count(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::open(dir.path()).unwrap();
        let err = manager.create("demo", Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::EmptyInput { .. }));
        assert!(!manager.exists("demo"));
    }

    #[tokio::test]
    async fn test_create_rejects_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::open(dir.path()).unwrap();
        for name in ["", ".hidden", "..", "a/b", "a\\b", "nul\0byte"] {
            let err = manager.create(name, batch(&["x"])).await.unwrap_err();
            assert!(
                matches!(err, Error::InvalidName { .. }),
                "{name:?} should be invalid"
            );
        }
    }

    #[tokio::test]
    async fn test_append_extends_ids_and_bumps_generation() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::open(dir.path()).unwrap();
        let kb = manager.create("demo", batch(&["a", "b"])).await.unwrap();

        let kb = manager.append(&kb, batch(&["c", "d"])).await.unwrap();
        assert_eq!(kb.chunk_count(), 4);
        assert_eq!(kb.generation(), 2);
        let ids: Vec<u64> = kb.chunks().map(|c| c.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);

        // Old generation pruned, pointer repointed
        let store = dir.path().join("demo");
        assert!(!store.join("000001").exists());
        assert_eq!(read_current(&store).unwrap(), "000002");

        let loaded = manager.load("demo").unwrap();
        assert_eq!(loaded.chunk_count(), 4);
    }

    #[tokio::test]
    async fn test_append_empty_batch_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::open(dir.path()).unwrap();
        let kb = manager.create("demo", batch(&["a"])).await.unwrap();

        let same = manager.append(&kb, Vec::new()).await.unwrap();
        assert_eq!(same.generation(), 1);
        assert_eq!(same.chunk_count(), 1);
        assert_eq!(read_current(&dir.path().join("demo")).unwrap(), "000001");
    }

    #[tokio::test]
    async fn test_append_with_stale_handle_keeps_interleaved_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::open(dir.path()).unwrap();
        let first = manager.create("demo", batch(&["a"])).await.unwrap();

        let _second = manager.append(&first, batch(&["b"])).await.unwrap();
        // `first` is stale now; appending through it must still see "b"
        let third = manager.append(&first, batch(&["c"])).await.unwrap();

        assert_eq!(third.chunk_count(), 3);
        assert_eq!(third.generation(), 3);
        let texts: Vec<&str> = third.chunks().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_concurrent_appends_both_land() {
        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(StoreManager::open(dir.path()).unwrap());
        let kb = manager.create("demo", batch(&["base"])).await.unwrap();

        let (m1, kb1) = (manager.clone(), kb.clone());
        let t1 = tokio::spawn(async move { m1.append(&kb1, batch(&["one"])).await });
        let (m2, kb2) = (manager.clone(), kb.clone());
        let t2 = tokio::spawn(async move { m2.append(&kb2, batch(&["two"])).await });
        t1.await.unwrap().unwrap();
        t2.await.unwrap().unwrap();

        let final_kb = manager.load("demo").unwrap();
        assert_eq!(final_kb.chunk_count(), 3);
        assert_eq!(final_kb.generation(), 3);
        let texts: Vec<&str> = final_kb.chunks().map(|c| c.text.as_str()).collect();
        assert!(texts.contains(&"one") && texts.contains(&"two"));
    }

    #[tokio::test]
    async fn test_load_missing_store() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::open(dir.path()).unwrap();
        let err = manager.load("nope").unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_readers_stay_consistent_while_appends_prune() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let dir = tempfile::tempdir().unwrap();
        let manager = Arc::new(StoreManager::open(dir.path()).unwrap());
        let kb = manager.create("races", batch(&["base"])).await.unwrap();

        // Every append prunes the generation the readers may have just
        // resolved; none of them may surface that as corruption
        let done = Arc::new(AtomicBool::new(false));
        let writer = {
            let (manager, done) = (Arc::clone(&manager), Arc::clone(&done));
            tokio::spawn(async move {
                let mut kb = kb;
                for i in 0..24 {
                    let text = format!("row {i}");
                    kb = manager.append(&kb, batch(&[text.as_str()])).await.unwrap();
                }
                done.store(true, Ordering::Release);
            })
        };

        let mut readers = Vec::new();
        for _ in 0..3 {
            let (manager, done) = (Arc::clone(&manager), Arc::clone(&done));
            readers.push(tokio::task::spawn_blocking(move || {
                let mut loads = 0usize;
                while !done.load(Ordering::Acquire) {
                    let kb = manager.load("races")?;
                    assert!(kb.chunk_count() >= 1);
                    assert_eq!(manager.list()?, vec!["races"]);
                    loads += 1;
                }
                Ok::<usize, Error>(loads)
            }));
        }

        writer.await.unwrap();
        for reader in readers {
            let loads = reader.await.unwrap().expect("reader hit an error mid-append");
            assert!(loads > 0, "reader never observed the store");
        }
        assert_eq!(manager.load("races").unwrap().chunk_count(), 25);
        assert_eq!(manager.load("races").unwrap().generation(), 25);
    }

    #[tokio::test]
    async fn test_load_detects_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::open(dir.path()).unwrap();
        manager.create("demo", batch(&["a", "b"])).await.unwrap();

        let table_path = dir.path().join("demo").join("000001").join(CHUNKS_FILE);
        let mut table: serde_json::Value =
            serde_json::from_slice(&fs::read(&table_path).unwrap()).unwrap();
        table["chunks"].as_array_mut().unwrap().pop();
        fs::write(&table_path, serde_json::to_vec(&table).unwrap()).unwrap();

        let err = manager.load("demo").unwrap_err();
        match err {
            Error::CorruptStore { detail, .. } => assert!(detail.contains("chunk table")),
            other => panic!("expected CorruptStore, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_detects_corrupt_index_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::open(dir.path()).unwrap();
        manager.create("demo", batch(&["a"])).await.unwrap();

        let index_path = dir.path().join("demo").join("000001").join(INDEX_FILE);
        fs::write(&index_path, b"scrambled").unwrap();

        let err = manager.load("demo").unwrap_err();
        assert!(matches!(err, Error::CorruptStore { .. }));
    }

    #[tokio::test]
    async fn test_load_detects_missing_pointer() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::open(dir.path()).unwrap();
        manager.create("demo", batch(&["a"])).await.unwrap();

        fs::remove_file(dir.path().join("demo").join(CURRENT_FILE)).unwrap();
        let err = manager.load("demo").unwrap_err();
        assert!(matches!(err, Error::CorruptStore { .. }));
    }

    #[tokio::test]
    async fn test_list_sorts_and_skips_non_stores() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::open(dir.path()).unwrap();
        manager.create("beta", batch(&["x"])).await.unwrap();
        manager.create("alpha", batch(&["y"])).await.unwrap();

        fs::create_dir(dir.path().join("not-a-store")).unwrap();
        fs::create_dir(dir.path().join(".stage-leftover")).unwrap();
        fs::write(dir.path().join("notes.txt"), b"stray file").unwrap();

        assert_eq!(manager.list().unwrap(), vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_list_on_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::open(dir.path().join("sub")).unwrap();
        fs::remove_dir_all(dir.path().join("sub")).unwrap();
        assert!(manager.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::open(dir.path()).unwrap();
        manager.create("demo", batch(&["a"])).await.unwrap();

        assert!(manager.delete("demo").await.unwrap());
        assert!(!manager.exists("demo"));
        assert!(!manager.delete("demo").await.unwrap());
        assert!(!manager.delete("never-existed").await.unwrap());
    }

    #[tokio::test]
    async fn test_info_reports_live_state() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::open(dir.path()).unwrap();
        let kb = manager.create("demo", batch(&["a", "b"])).await.unwrap();
        manager.append(&kb, batch(&["c"])).await.unwrap();

        let info = manager.info("demo").unwrap();
        assert_eq!(info.name, "demo");
        assert_eq!(info.chunk_count, 3);
        assert_eq!(info.dimension, 8);
        assert_eq!(info.generation, 2);
        assert_eq!(info.created_at, kb.created_at());

        assert!(matches!(
            manager.info("ghost").unwrap_err(),
            Error::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_mixed_vector_dimensions_report_the_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::open(dir.path()).unwrap();

        let mut bad = batch(&["a", "b"]);
        bad[1].1 = vec![0.5; 4];
        let err = manager.create("demo", bad).await.unwrap_err();
        match err {
            Error::EmbeddingFailure { detail, .. } => {
                assert!(detail.contains("chunk 1"), "detail was: {detail}");
            }
            other => panic!("expected EmbeddingFailure, got {other:?}"),
        }
        // Nothing may be left on disk after the failed create
        assert!(!manager.exists("demo"));
        assert_eq!(manager.list().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_chunk_citation() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StoreManager::open(dir.path()).unwrap();
        let kb = manager.create("demo", batch(&["a"])).await.unwrap();
        assert_eq!(kb.get(ChunkId(0)).unwrap().citation(), "doc.pdf, page 1");
    }
}
