/// On-disk layout of a store directory.
///
/// ```text
/// <root>/<name>/
///   meta.json     store identity: name, creation time, vector dimension
///   CURRENT       name of the live generation directory
///   000001/       a generation, immutable once CURRENT points at it
///     index.bin
///     chunks.json
/// ```
///
/// A commit writes a complete generation (or, on create, a complete staged
/// store) and then makes it visible with a single atomic rename. Readers
/// resolve CURRENT and read only inside that generation, re-resolving the
/// pointer if an append prunes the generation from under them, so a crash
/// mid-commit leaves the previous state live and at worst an orphan
/// directory behind.
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

pub(crate) const META_FILE: &str = "meta.json";
pub(crate) const CURRENT_FILE: &str = "CURRENT";
pub(crate) const INDEX_FILE: &str = "index.bin";
pub(crate) const CHUNKS_FILE: &str = "chunks.json";
pub(crate) const STORE_FORMAT_VERSION: u32 = 1;

pub(crate) fn store_dir(root: &Path, name: &str) -> PathBuf {
    root.join(name)
}

pub(crate) fn generation_dir_name(generation: u64) -> String {
    format!("{generation:06}")
}

pub(crate) fn parse_generation(name: &str) -> Option<u64> {
    name.parse().ok()
}

/// Read the live generation directory name.
pub(crate) fn read_current(store: &Path) -> io::Result<String> {
    Ok(fs::read_to_string(store.join(CURRENT_FILE))?.trim().to_string())
}

/// Point CURRENT at `generation` via write-to-temp plus atomic rename.
pub(crate) fn write_current(store: &Path, generation: u64) -> io::Result<()> {
    let tmp = store.join(".CURRENT.tmp");
    {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(generation_dir_name(generation).as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&tmp, store.join(CURRENT_FILE))
}

static STAGE_SEQ: AtomicU64 = AtomicU64::new(0);

/// A unique scratch directory under `root` for staging a new store.
/// Dot-prefixed so listings never report half-built stores; the pid plus a
/// process-wide sequence number keep concurrent stagings apart.
pub(crate) fn stage_dir(root: &Path) -> PathBuf {
    let seq = STAGE_SEQ.fetch_add(1, Ordering::Relaxed);
    root.join(format!(".stage-{}-{seq}", std::process::id()))
}

/// Whether `dir` holds a store with a resolvable live generation. An
/// append racing this check can prune the resolved generation; re-reading
/// CURRENT settles the answer either way.
pub(crate) fn has_live_generation(dir: &Path) -> bool {
    let Ok(mut current) = read_current(dir) else {
        return false;
    };
    loop {
        if dir.join(&current).join(INDEX_FILE).is_file() {
            return true;
        }
        match read_current(dir) {
            Ok(now) if now != current => current = now,
            _ => return false,
        }
    }
}
