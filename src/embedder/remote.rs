/// Remote embedder speaking the OpenAI-compatible `/embeddings` protocol
/// over a blocking HTTP client.
use std::env;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Embedder, EmbedderError};
use crate::config::EmbeddingConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable consulted when the config carries no API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug)]
pub struct RemoteEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    dimensions: usize,
}

impl RemoteEmbedder {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: &str,
        dimensions: usize,
    ) -> Result<Self, EmbedderError> {
        if api_key.is_empty() {
            return Err(EmbedderError::Misconfigured(
                "no API key (set embedding.api_key or OPENAI_API_KEY)".to_string(),
            ));
        }
        if dimensions == 0 {
            return Err(EmbedderError::Misconfigured(
                "embedding dimensions must be positive".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("ragdex/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EmbedderError::Misconfigured(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            api_key: api_key.to_string(),
            dimensions,
        })
    }

    /// Build from config, falling back to the `OPENAI_API_KEY` environment
    /// variable when the config has no key.
    pub fn from_config(cfg: &EmbeddingConfig) -> Result<Self, EmbedderError> {
        let key = cfg
            .api_key
            .clone()
            .or_else(|| env::var(API_KEY_ENV).ok())
            .unwrap_or_default();
        Self::new(&cfg.base_url, &cfg.model, &key, cfg.dimensions)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    index: usize,
    embedding: Vec<f32>,
}

impl Embedder for RemoteEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let mut batch = self.embed_batch(&[text])?;
        batch
            .pop()
            .ok_or_else(|| EmbedderError::InvalidResponse("endpoint returned no embedding".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Embedding {} text(s) via {}", texts.len(), self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .map_err(|e| EmbedderError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(EmbedderError::RequestFailed(format!(
                "{} returned {status}",
                self.endpoint
            )));
        }

        let body: EmbeddingResponse = response
            .json()
            .map_err(|e| EmbedderError::InvalidResponse(e.to_string()))?;
        if body.data.len() != texts.len() {
            return Err(EmbedderError::InvalidResponse(format!(
                "got {} embeddings for {} inputs",
                body.data.len(),
                texts.len()
            )));
        }

        // The API may return rows out of order; `index` restores input order
        let mut rows = body.data;
        rows.sort_by_key(|r| r.index);
        let mut vectors = Vec::with_capacity(rows.len());
        for row in rows {
            if row.embedding.len() != self.dimensions {
                return Err(EmbedderError::InvalidResponse(format!(
                    "embedding has dimension {}, expected {}",
                    row.embedding.len(),
                    self.dimensions
                )));
            }
            vectors.push(row.embedding);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_rejected() {
        let err = RemoteEmbedder::new("https://api.openai.com/v1", "text-embedding-3-large", "", 3072)
            .unwrap_err();
        assert!(matches!(err, EmbedderError::Misconfigured(_)));
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let err = RemoteEmbedder::new("https://api.openai.com/v1", "m", "sk-test", 0).unwrap_err();
        assert!(matches!(err, EmbedderError::Misconfigured(_)));
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let embedder =
            RemoteEmbedder::new("https://api.openai.com/v1/", "m", "sk-test", 8).unwrap();
        assert_eq!(embedder.endpoint, "https://api.openai.com/v1/embeddings");
    }

    #[test]
    fn test_request_wire_shape() {
        let req = EmbeddingRequest {
            model: "text-embedding-3-large",
            input: &["alpha", "beta"],
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"{"model":"text-embedding-3-large","input":["alpha","beta"]}"#
        );
    }

    #[test]
    fn test_response_wire_shape() {
        let json = r#"{
            "object": "list",
            "data": [
                {"object": "embedding", "index": 1, "embedding": [0.25, -0.5]},
                {"object": "embedding", "index": 0, "embedding": [1.0, 2.0]}
            ],
            "model": "text-embedding-3-large",
            "usage": {"prompt_tokens": 4, "total_tokens": 4}
        }"#;
        let mut body: EmbeddingResponse = serde_json::from_str(json).unwrap();
        body.data.sort_by_key(|r| r.index);
        assert_eq!(body.data.len(), 2);
        assert_eq!(body.data[0].embedding, vec![1.0, 2.0]);
        assert_eq!(body.data[1].embedding, vec![0.25, -0.5]);
    }
}
