/// Remote service clients — similarity classification and trend
/// interpretation.
///
/// Both clients talk to the same service base URL with the synchronous
/// `ureq` HTTP client and bearer-token auth:
///
/// - [`similarity::SimilarityClient`] — `POST {base}/similarity` with the
///   document texts and topic labels; returns the dense similarity matrix
///   the engine derives assignments from. All-or-nothing: any non-success
///   status or malformed body is a single reported error, prior state is
///   left untouched, and the caller may retry manually.
///
/// - [`chat::ChatClient`] — `POST {base}/openai/v1/chat/completions` with
///   `stream: true`; parses the SSE response and delivers ordered text
///   increments through a callback, independent of any rendering surface.
///
/// Neither client retries automatically and no partial results are kept:
/// every failure is reported once and the caller re-triggers manually.
use anyhow::Result;

pub mod chat;
pub mod prompts;
pub mod similarity;

use crate::config::TrendlensConfig;

/// A single message in a chat conversation.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Classify a corpus against a topic list and return the similarity matrix.
///
/// Thin convenience over [`similarity::SimilarityClient`] for callers that
/// hold a config rather than a client.
pub fn classify(
    config: &TrendlensConfig,
    docs: &[String],
    topics: &[String],
) -> Result<Vec<Vec<f64>>> {
    let client = similarity::SimilarityClient::from_config(config);
    client.similarity(docs, topics)
}
