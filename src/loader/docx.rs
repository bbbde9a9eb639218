/// DOCX decoding via `docx-rs`: every paragraph newline-terminated and
/// concatenated into a single text unit, matching how word processors
/// linearize body text.
use docx_rs::{DocumentChild, Paragraph, ParagraphChild, RunChild, read_docx};
use tracing::debug;

use super::{SourceKind, TextUnit};
use crate::error::{Error, Result};

pub(crate) fn extract_units(bytes: &[u8], document: &str) -> Result<Vec<TextUnit>> {
    let docx = read_docx(bytes).map_err(|e| Error::CorruptDocument {
        document: document.to_string(),
        detail: e.to_string(),
    })?;

    let mut text = String::new();
    let mut paragraphs = 0usize;
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(para) = child {
            text.push_str(&paragraph_text(para));
            text.push('\n');
            paragraphs += 1;
        }
    }

    debug!("Decoded {paragraphs} DOCX paragraph(s) from {document}");
    Ok(vec![TextUnit {
        text,
        document: document.to_string(),
        source: SourceKind::Docx,
    }])
}

fn paragraph_text(para: &Paragraph) -> String {
    let mut text = String::new();
    for child in &para.children {
        if let ParagraphChild::Run(run) = child {
            for rc in &run.children {
                match rc {
                    RunChild::Text(t) => text.push_str(&t.text),
                    RunChild::Tab(_) => text.push('\t'),
                    RunChild::Break(_) => text.push('\n'),
                    _ => {}
                }
            }
        }
    }
    text
}
