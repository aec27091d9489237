/// Trend interpreter client for the streaming chat-completion endpoint.
///
/// Sends `POST {base}/openai/v1/chat/completions` with `stream: true` and
/// parses the server-sent-events response body line by line, delivering each
/// content delta to a caller-supplied callback in arrival order. The stream
/// is modeled as a plain sequence of text increments with append semantics —
/// the caller decides whether those increments feed a terminal, a chunked
/// HTTP response, or a test buffer.
///
/// A transport or parse error mid-stream surfaces as the call's error; the
/// caller replaces any partially-rendered output with a notice. No retry.
use std::io::{BufRead, BufReader};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::ChatMessage;
use crate::config::TrendlensConfig;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /openai/v1/chat/completions`.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: &'a [ChatMessage],
}

/// One SSE chunk: `{"choices": [{"delta": {"content": "..."}}]}`.
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Outcome of parsing one SSE line.
#[derive(Debug, PartialEq)]
enum SseEvent {
    /// A content increment to append.
    Content(String),
    /// End-of-stream marker (`data: [DONE]`).
    Done,
    /// Comment, empty line, or a chunk without content — nothing to emit.
    Skip,
}

/// Parse a single line of the SSE body.
///
/// Unparseable `data:` payloads are treated as an error rather than skipped:
/// silently dropping increments would corrupt the rendered text with no
/// visible failure.
fn parse_sse_line(line: &str) -> Result<SseEvent> {
    let Some(payload) = line.strip_prefix("data:") else {
        return Ok(SseEvent::Skip);
    };
    let payload = payload.trim();

    if payload.is_empty() {
        return Ok(SseEvent::Skip);
    }
    if payload == "[DONE]" {
        return Ok(SseEvent::Done);
    }

    let chunk: ChatChunk =
        serde_json::from_str(payload).context("failed to parse stream chunk")?;
    match chunk
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.delta.content)
    {
        Some(content) if !content.is_empty() => Ok(SseEvent::Content(content)),
        _ => Ok(SseEvent::Skip),
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Synchronous streaming chat client.
#[derive(Debug)]
pub struct ChatClient {
    base_url: String,
    token: String,
    model: String,
    timeout: Duration,
}

impl ChatClient {
    /// Build a client from the resolved config.
    pub fn from_config(config: &TrendlensConfig) -> Self {
        Self {
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            token: config.api.token.clone(),
            model: config.interpret.chat_model.clone(),
            timeout: Duration::from_millis(config.api.timeout_ms),
        }
    }

    /// Stream a chat completion, invoking `on_delta` for every content
    /// increment in arrival order. Returns the full concatenated text once
    /// the stream finishes.
    pub fn stream_chat(
        &self,
        messages: &[ChatMessage],
        mut on_delta: impl FnMut(&str),
    ) -> Result<String> {
        let url = format!("{}/openai/v1/chat/completions", self.base_url);

        let body = ChatRequest {
            model: &self.model,
            stream: true,
            messages,
        };

        let mut request = ureq::post(&url).timeout(self.timeout);
        if !self.token.is_empty() {
            request = request.set("Authorization", &format!("Bearer {}", self.token));
        }

        let resp = request
            .send_json(&body)
            .context("interpretation request failed")?;

        let reader = BufReader::new(resp.into_reader());
        let mut full = String::new();

        for line in reader.lines() {
            let line = line.context("interpretation stream broke mid-read")?;
            match parse_sse_line(&line)? {
                SseEvent::Content(delta) => {
                    full.push_str(&delta);
                    on_delta(&delta);
                }
                SseEvent::Done => break,
                SseEvent::Skip => {}
            }
        }

        if full.trim().is_empty() {
            anyhow::bail!("interpretation endpoint returned an empty stream");
        }

        Ok(full)
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
    fn parses_content_chunk() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#;
        assert_eq!(
            parse_sse_line(line).unwrap(),
            SseEvent::Content("Hello".to_string())
        );
    }

    #[test]
    fn parses_done_marker() {
        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), SseEvent::Done);
    }

    #[test]
    fn skips_empty_and_comment_lines() {
        assert_eq!(parse_sse_line("").unwrap(), SseEvent::Skip);
        assert_eq!(parse_sse_line(": keep-alive").unwrap(), SseEvent::Skip);
        assert_eq!(parse_sse_line("data:").unwrap(), SseEvent::Skip);
    }

    #[test]
    fn skips_chunk_without_content() {
        let line = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_sse_line(line).unwrap(), SseEvent::Skip);
        let finish = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_sse_line(finish).unwrap(), SseEvent::Skip);
    }

    #[test]
    fn malformed_chunk_is_an_error() {
        assert!(parse_sse_line("data: {not json").is_err());
    }

    #[test]
    fn increments_concatenate_in_order() {
        let lines = [
            r#"data: {"choices":[{"delta":{"content":"The "}}]}"#,
            r#"data: {"choices":[{"delta":{"content":"trend "}}]}"#,
            r#"data: {"choices":[{"delta":{"content":"rises."}}]}"#,
            "data: [DONE]",
        ];
        let mut text = String::new();
        for line in lines {
            if let SseEvent::Content(delta) = parse_sse_line(line).unwrap() {
                text.push_str(&delta);
            }
        }
        assert_eq!(text, "The trend rises.");
    }

    #[test]
    fn request_serializes_with_stream_flag() {
        let messages = vec![
            ChatMessage::system("Interpret the trend."),
            ChatMessage::user("t1: 1, 2, 3"),
        ];
        let body = ChatRequest {
            model: "gpt-4.1-mini",
            stream: true,
            messages: &messages,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], true);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "t1: 1, 2, 3");
    }

    #[test]
    fn client_from_default_config() {
        let config = TrendlensConfig::default();
        let client = ChatClient::from_config(&config);
        assert_eq!(client.model, "gpt-4.1-mini");
        assert_eq!(client.base_url, "https://llmfoundry.straive.com");
    }
}
