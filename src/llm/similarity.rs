/// Topic classifier client for the remote similarity endpoint.
///
/// Sends every document's classification text (title + abstract) and the
/// topic label list in one `POST {base}/similarity` call and receives a
/// dense similarity matrix, one row per document and one column per topic,
/// in request order. The call is all-or-nothing: a non-success status, a
/// malformed body, or a wrong-shaped matrix each surface as a single error
/// and nothing downstream is touched.
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::TrendlensConfig;
use crate::engine::{self, SimilarityMatrix};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /similarity`.
#[derive(Debug, Serialize)]
struct SimilarityRequest<'a> {
    model: &'a str,
    docs: &'a [String],
    topics: &'a [String],
    precision: u32,
}

/// Response body from `POST /similarity`.
#[derive(Debug, Deserialize)]
struct SimilarityResponse {
    similarity: SimilarityMatrix,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Synchronous similarity-endpoint client.
///
/// Created from the resolved config and reused for the lifetime of one
/// classification run. Carries no state between calls.
#[derive(Debug)]
pub struct SimilarityClient {
    base_url: String,
    token: String,
    model: String,
    precision: u32,
    timeout: Duration,
}

impl SimilarityClient {
    /// Build a client from the resolved config.
    pub fn from_config(config: &TrendlensConfig) -> Self {
        Self {
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            token: config.api.token.clone(),
            model: config.classify.embedding_model.clone(),
            precision: config.classify.precision,
            timeout: Duration::from_millis(config.api.timeout_ms),
        }
    }

    /// Classify `docs` against `topics` and return the similarity matrix.
    ///
    /// Validates the response shape before returning so a wrong-shaped
    /// matrix surfaces here, at the call site, rather than corrupting the
    /// aggregation later.
    pub fn similarity(&self, docs: &[String], topics: &[String]) -> Result<SimilarityMatrix> {
        let url = format!("{}/similarity", self.base_url);

        let body = SimilarityRequest {
            model: &self.model,
            docs,
            topics,
            precision: self.precision,
        };

        let mut request = ureq::post(&url).timeout(self.timeout);
        if !self.token.is_empty() {
            request = request.set("Authorization", &format!("Bearer {}", self.token));
        }

        let resp = request
            .send_json(&body)
            .context("similarity request failed")?;

        let parsed: SimilarityResponse = resp
            .into_json()
            .context("failed to parse similarity response")?;

        engine::validate_matrix_shape(&parsed.similarity, docs.len(), topics.len())
            .context("similarity endpoint returned a wrong-shaped matrix")?;

        Ok(parsed.similarity)
    }

    /// Return the model name for display.
    pub fn model_name(&self) -> &str {
        &self.model
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_from_default_config() {
        let config = TrendlensConfig::default();
        let client = SimilarityClient::from_config(&config);
        assert_eq!(client.base_url, "https://llmfoundry.straive.com");
        assert_eq!(client.model, "text-embedding-3-small");
        assert_eq!(client.precision, 5);
        assert_eq!(client.timeout, Duration::from_millis(180_000));
    }

    #[test]
    fn client_strips_trailing_slash() {
        let mut config = TrendlensConfig::default();
        config.api.base_url = "http://localhost:8080/".to_string();
        let client = SimilarityClient::from_config(&config);
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn request_serializes_to_expected_json() {
        let docs = vec!["Title\nAbstract".to_string()];
        let topics = vec!["t1".to_string(), "t2".to_string()];
        let body = SimilarityRequest {
            model: "text-embedding-3-small",
            docs: &docs,
            topics: &topics,
            precision: 5,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "text-embedding-3-small");
        assert_eq!(json["docs"][0], "Title\nAbstract");
        assert_eq!(json["topics"][1], "t2");
        assert_eq!(json["precision"], 5);
    }

    #[test]
    fn response_deserializes_matrix() {
        let json = r#"{"similarity": [[0.9, 0.1], [0.2, 0.8]]}"#;
        let parsed: SimilarityResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.similarity.len(), 2);
        assert_eq!(parsed.similarity[0], vec![0.9, 0.1]);
    }
}
