/// PDF decoding via `lopdf`: one text unit per page.
use lopdf::Document;
use tracing::debug;

use super::{SourceKind, TextUnit};
use crate::error::{Error, Result};

pub(crate) fn extract_units(bytes: &[u8], document: &str) -> Result<Vec<TextUnit>> {
    let pdf = Document::load_mem(bytes).map_err(|e| Error::CorruptDocument {
        document: document.to_string(),
        detail: e.to_string(),
    })?;

    // get_pages is keyed by 1-based page number in reading order
    let pages = pdf.get_pages();
    let mut units = Vec::with_capacity(pages.len());
    for &page in pages.keys() {
        let text = pdf.extract_text(&[page]).map_err(|e| Error::CorruptDocument {
            document: document.to_string(),
            detail: format!("page {page}: {e}"),
        })?;
        units.push(TextUnit {
            text,
            document: document.to_string(),
            source: SourceKind::PdfPage {
                page: page as usize,
            },
        });
    }

    debug!("Decoded {} PDF page(s) from {document}", units.len());
    Ok(units)
}
