/// Answer synthesis seam.
///
/// Retrieval produces scored context; turning that context into prose is
/// delegated behind a trait so the engine never depends on a particular
/// LLM. The in-tree mock is deterministic, for tests and keyless setups.
use std::collections::HashSet;

use thiserror::Error;

use crate::retriever::{QueryResult, ScoredChunk};

#[derive(Debug, Error)]
#[error("{0}")]
pub struct SynthesisError(pub String);

/// Sentence returned when the context offers nothing to answer from.
pub const NO_ANSWER: &str = "I cannot find the answer in the provided documents.";

pub trait AnswerSynthesizer: Send + Sync {
    /// Produce an answer to `question` grounded in `context`, best match
    /// first. Implementations must not invent answers for empty context.
    fn answer(&self, question: &str, context: &[ScoredChunk]) -> Result<String, SynthesisError>;
}

/// Drop repeated chunk texts, keeping the best-scored occurrence. Identical
/// passages retrieved twice add nothing to a prompt.
pub fn dedup_context(results: QueryResult) -> Vec<ScoredChunk> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.chunk.text.clone()))
        .collect()
}

/// Render context passages as a numbered prompt section with citations.
pub fn format_context(context: &[ScoredChunk]) -> String {
    let mut out = String::new();
    for (i, scored) in context.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&format!(
            "[{}] {}\n{}\n",
            i + 1,
            scored.chunk.citation(),
            scored.chunk.text
        ));
    }
    out
}

/// Deterministic synthesizer: echoes the grounding context instead of
/// calling a model.
pub struct MockSynthesizer;

impl AnswerSynthesizer for MockSynthesizer {
    fn answer(&self, question: &str, context: &[ScoredChunk]) -> Result<String, SynthesisError> {
        if context.is_empty() {
            return Ok(NO_ANSWER.to_string());
        }
        Ok(format!(
            "Question: {question}\nAnswered from {} passage(s):\n\n{}",
            context.len(),
            format_context(context)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::SourceKind;
    use crate::store::models::{Chunk, ChunkId};

    fn scored(id: u64, text: &str, score: f32) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                id: ChunkId(id),
                text: text.to_string(),
                document: "d.pdf".to_string(),
                source: SourceKind::PdfPage { page: 2 },
                span: (0, text.chars().count()),
                store: "demo".to_string(),
            },
            score,
        }
    }

    #[test]
    fn test_dedup_keeps_order_and_drops_repeats() {
        let results = vec![
            scored(0, "first", 0.9),
            scored(1, "second", 0.8),
            scored(2, "first", 0.7),
            scored(3, "third", 0.6),
        ];
        let context = dedup_context(results);
        let texts: Vec<&str> = context.iter().map(|c| c.chunk.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert_eq!(context[0].score, 0.9, "best-scored duplicate survives");
    }

    #[test]
    fn test_format_context_numbers_and_cites() {
        let rendered = format_context(&[scored(0, "alpha", 0.9), scored(1, "beta", 0.8)]);
        assert!(rendered.contains("[1] d.pdf, page 2\nalpha"));
        assert!(rendered.contains("[2] d.pdf, page 2\nbeta"));
    }

    #[test]
    fn test_mock_refuses_to_answer_without_context() {
        let answer = MockSynthesizer.answer("why?", &[]).unwrap();
        assert_eq!(answer, NO_ANSWER);
    }

    #[test]
    fn test_mock_answer_grounds_in_context() {
        let answer = MockSynthesizer
            .answer("what is alpha?", &[scored(0, "alpha facts", 0.9)])
            .unwrap();
        assert!(answer.contains("what is alpha?"));
        assert!(answer.contains("alpha facts"));
        assert!(answer.contains("1 passage(s)"));
    }
}
