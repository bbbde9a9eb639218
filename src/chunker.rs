/// Character-window chunking with soft boundaries.
///
/// Windows are `chunk_size` chars and advance by `chunk_size - overlap` from
/// the previous window's start. A window's end is pulled back to the nearest
/// paragraph, sentence, or word break within a bounded lookback; a window's
/// start is pushed forward to the next word start within a bounded advance.
/// The two bounds split the overlap between them, so a chunk always begins at
/// or before the previous chunk's end: no character of the input is ever
/// skipped, and the original text can be rebuilt from spans alone.
///
/// Offsets are `char` offsets, not byte offsets, so multibyte text never
/// lands on an invalid boundary.
use crate::error::{Error, Result};
use crate::loader::{SourceKind, TextUnit};

/// A chunk cut from one text unit, not yet assigned an id or a store.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkCandidate {
    pub text: String,
    pub document: String,
    pub source: SourceKind,
    /// Half-open char-offset range within the originating text unit.
    pub span: (usize, usize),
}

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    /// Requires `chunk_size > 0` and `overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 || overlap >= chunk_size {
            return Err(Error::InvalidChunking {
                chunk_size,
                overlap,
            });
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Split one text unit into overlapping chunks. Empty units yield no
    /// chunks; units no longer than `chunk_size` yield exactly one.
    pub fn split(&self, unit: &TextUnit) -> Vec<ChunkCandidate> {
        let chars: Vec<char> = unit.text.chars().collect();
        let total = chars.len();
        if total == 0 {
            return Vec::new();
        }
        if total <= self.chunk_size {
            return vec![candidate(unit, &chars, 0, total)];
        }

        let stride = self.chunk_size - self.overlap;
        // The overlap budget is split between pulling ends back and pushing
        // starts forward; together they can never open a gap between chunks.
        let lookback = self.overlap / 2;
        let advance = self.overlap - lookback;

        let mut chunks = Vec::new();
        let mut start = 0;
        while start < total {
            let raw_end = start + self.chunk_size;
            let end = if raw_end >= total {
                total
            } else {
                soften_end(&chars, raw_end, lookback)
            };
            chunks.push(candidate(unit, &chars, start, end));

            let next = start + stride;
            if next >= total {
                break;
            }
            start = if self.overlap == 0 {
                next
            } else {
                advance_to_word_start(&chars, next, advance)
            };
        }
        chunks
    }

    /// Split every unit in order, concatenating the results.
    pub fn split_units(&self, units: &[TextUnit]) -> Vec<ChunkCandidate> {
        units.iter().flat_map(|u| self.split(u)).collect()
    }
}

fn candidate(unit: &TextUnit, chars: &[char], start: usize, end: usize) -> ChunkCandidate {
    ChunkCandidate {
        text: chars[start..end].iter().collect(),
        document: unit.document.clone(),
        source: unit.source.clone(),
        span: (start, end),
    }
}

/// Pick a cut at or before `raw_end`, preferring paragraph breaks, then
/// sentence ends, then word breaks, searching back at most `lookback` chars.
fn soften_end(chars: &[char], raw_end: usize, lookback: usize) -> usize {
    let floor = raw_end - lookback;
    for i in (floor..=raw_end).rev() {
        if i >= 2 && chars[i - 1] == '\n' && chars[i - 2] == '\n' {
            return i;
        }
    }
    for i in (floor..=raw_end).rev() {
        if i >= 1 && matches!(chars[i - 1], '.' | '!' | '?' | '。' | '\n') {
            return i;
        }
    }
    for i in (floor..=raw_end).rev() {
        if i >= 1 && chars[i - 1].is_whitespace() {
            return i;
        }
    }
    raw_end
}

/// Move `raw_start` forward to the next word start, at most `limit` chars.
fn advance_to_word_start(chars: &[char], raw_start: usize, limit: usize) -> usize {
    let cap = (raw_start + limit).min(chars.len() - 1);
    for p in raw_start..=cap {
        if chars[p - 1].is_whitespace() && !chars[p].is_whitespace() {
            return p;
        }
    }
    raw_start
}
