/// Brute-force flat index: exact cosine top-k over row-major `f32` storage.
///
/// Also owns the on-disk artifact format. The layout is little-endian and
/// self-describing so any conforming reader can decode it:
///
/// ```text
/// magic "RDIX" | format_version u32 | kind u8 | dimension u32 | count u64
/// then per vector: id u64 | dimension * f32
/// ```
use std::collections::HashSet;

use super::{IndexError, SearchHit, VectorIndex};

const MAGIC: &[u8; 4] = b"RDIX";
const FORMAT_VERSION: u32 = 1;
const KIND_FLAT: u8 = 1;
const HEADER_LEN: usize = 21;

#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimension: usize,
    ids: Vec<u64>,
    vectors: Vec<f32>,
    seen: HashSet<u64>,
}

impl FlatIndex {
    /// Create an empty index whose vectors must all have `dimension` entries.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ids: Vec::new(),
            vectors: Vec::new(),
            seen: HashSet::new(),
        }
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.vectors[i * self.dimension..(i + 1) * self.dimension]
    }

    /// Every vector id held, in insertion order.
    pub(crate) fn ids(&self) -> &[u64] {
        &self.ids
    }

    /// Decode an artifact produced by [`VectorIndex::encode`].
    ///
    /// Rejects anything it does not fully understand: wrong magic, unknown
    /// format version or index kind, truncated or oversized payloads, and
    /// duplicate ids.
    pub fn decode(bytes: &[u8]) -> Result<Self, IndexError> {
        if bytes.len() < HEADER_LEN {
            return Err(IndexError::Corrupt(format!(
                "artifact is {} bytes, shorter than the {HEADER_LEN}-byte header",
                bytes.len()
            )));
        }
        if &bytes[0..4] != MAGIC {
            return Err(IndexError::Corrupt("bad magic, not an index artifact".to_string()));
        }
        let version = read_u32(&bytes[4..8]);
        if version != FORMAT_VERSION {
            return Err(IndexError::Corrupt(format!(
                "unsupported format version {version} (expected {FORMAT_VERSION})"
            )));
        }
        let kind = bytes[8];
        if kind != KIND_FLAT {
            return Err(IndexError::Corrupt(format!("unknown index kind {kind}")));
        }
        let dimension = read_u32(&bytes[9..13]) as usize;
        if dimension == 0 {
            return Err(IndexError::Corrupt("zero vector dimension".to_string()));
        }
        let count = read_u64(&bytes[13..21]) as usize;

        // Checked so a corrupted count cannot wrap the expected length
        let row_len = 8usize
            .checked_add(dimension.checked_mul(4).ok_or_else(too_large)?)
            .ok_or_else(too_large)?;
        let expected = count
            .checked_mul(row_len)
            .and_then(|n| n.checked_add(HEADER_LEN))
            .ok_or_else(too_large)?;
        if bytes.len() != expected {
            return Err(IndexError::Corrupt(format!(
                "artifact is {} bytes, expected {expected} for {count} vectors of dimension {dimension}",
                bytes.len()
            )));
        }

        let mut index = Self::new(dimension);
        index.ids.reserve(count);
        index.vectors.reserve(count * dimension);
        let mut pos = HEADER_LEN;
        for _ in 0..count {
            let id = read_u64(&bytes[pos..pos + 8]);
            pos += 8;
            if !index.seen.insert(id) {
                return Err(IndexError::Corrupt(format!("duplicate vector id {id}")));
            }
            index.ids.push(id);
            for _ in 0..dimension {
                index.vectors.push(f32::from_le_bytes([
                    bytes[pos],
                    bytes[pos + 1],
                    bytes[pos + 2],
                    bytes[pos + 3],
                ]));
                pos += 4;
            }
        }
        Ok(index)
    }
}

impl VectorIndex for FlatIndex {
    fn insert(&mut self, id: u64, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        if !self.seen.insert(id) {
            return Err(IndexError::DuplicateId(id));
        }
        self.ids.push(id);
        self.vectors.extend_from_slice(vector);
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if self.ids.is_empty() {
            return Err(IndexError::Empty);
        }
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                got: query.len(),
            });
        }

        let mut hits: Vec<SearchHit> = self
            .ids
            .iter()
            .enumerate()
            .map(|(i, &id)| SearchHit {
                id,
                score: cosine(query, self.row(i)),
            })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.id.cmp(&b.id)));
        hits.truncate(k);
        Ok(hits)
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self) -> Vec<u8> {
        let row_len = 8 + self.dimension * 4;
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.ids.len() * row_len);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.push(KIND_FLAT);
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.ids.len() as u64).to_le_bytes());
        for (i, &id) in self.ids.iter().enumerate() {
            bytes.extend_from_slice(&id.to_le_bytes());
            for v in self.row(i) {
                bytes.extend_from_slice(&v.to_le_bytes());
            }
        }
        bytes
    }
}

/// Cosine similarity; zero-magnitude vectors score 0.0 rather than NaN.
fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

fn too_large() -> IndexError {
    IndexError::Corrupt("declared sizes overflow".to_string())
}

fn read_u32(b: &[u8]) -> u32 {
    u32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

fn read_u64(b: &[u8]) -> u64 {
    u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
}
