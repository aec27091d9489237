//! JSON API handlers for the dashboard.
//!
//! Each handler corresponds to an endpoint, takes the shared [`Session`]
//! and/or config plus the request input, and returns a `ResponseBox` with
//! JSON content — except `/api/interpret`, which streams server-sent events
//! from a worker thread.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tiny_http::{Response, ResponseBox, StatusCode};

use crate::chart;
use crate::config::TrendlensConfig;
use crate::corpus::{Corpus, Document};
use crate::llm::{self, ChatMessage, chat::ChatClient, prompts};
use crate::session::Session;

use super::{content_type_json, stream_response};

/// External link target for a document, from its corpus `id`.
const DOC_LINK_BASE: &str = "https://arxiv.org/abs/";

/// Tooltip/modal abstracts are cut at this many characters.
const EXCERPT_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// JSON types
// ---------------------------------------------------------------------------

/// One demo card.
#[derive(Serialize)]
struct DemoResponse {
    name: String,
    icon: String,
    topics: Vec<String>,
}

/// Corpus selection request: a configured demo or a direct file path.
#[derive(Deserialize)]
struct CorpusRequest {
    #[serde(default)]
    demo: Option<String>,
    #[serde(default)]
    file: Option<String>,
}

/// Corpus summary returned after loading.
#[derive(Serialize)]
struct CorpusResponse {
    name: String,
    documents: usize,
    min_year: String,
    max_year: String,
    topics: Vec<String>,
}

/// Classification request from the explorer panel.
#[derive(Deserialize)]
struct ClassifyRequest {
    topics: Vec<String>,
    #[serde(default)]
    cutoff: Option<f64>,
}

/// The full chart view: SVG plus the data the frontend needs for tooltips,
/// drill-down counts, and the interpretation prefill.
#[derive(Serialize)]
struct ViewResponse {
    svg: String,
    cutoff: f64,
    years: Vec<String>,
    topics: Vec<TopicView>,
    /// Plain-text series summary, the interpreter's user message.
    trend_text: String,
    default_prompt: String,
}

#[derive(Serialize)]
struct TopicView {
    topic: String,
    color: String,
    visible: bool,
    points: Vec<PointView>,
}

#[derive(Serialize)]
struct PointView {
    year: String,
    count: usize,
    /// First matching document, for the hover tooltip.
    example: Option<DocView>,
}

/// A document as shown in tooltips and the drill-down list.
#[derive(Serialize)]
struct DocView {
    title: String,
    link: String,
    excerpt: String,
}

/// Legend toggle request/response.
#[derive(Deserialize)]
struct ToggleRequest {
    topic: String,
}

#[derive(Serialize)]
struct ToggleResponse {
    topic: String,
    visible: bool,
    opacity: f64,
    /// Visibility of every topic in the current series, request order.
    state: Vec<TopicVisibility>,
}

#[derive(Serialize)]
struct TopicVisibility {
    topic: String,
    visible: bool,
}

/// Interpretation request.
#[derive(Deserialize)]
struct InterpretRequest {
    #[serde(default)]
    prompt: String,
}

/// Health summary.
#[derive(Serialize)]
struct HealthResponse {
    base_url: String,
    token_set: bool,
    embedding_model: String,
    chat_model: String,
    demo_count: usize,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a JSON success response.
fn json_response<T: Serialize>(data: &T) -> Result<ResponseBox> {
    let body = serde_json::to_string(data).context("failed to serialize JSON response")?;
    Ok(Response::from_data(body.into_bytes())
        .with_header(content_type_json())
        .with_status_code(StatusCode(200))
        .boxed())
}

/// Extract and percent-decode a query parameter from a URL.
fn query_param(url: &str, key: &str) -> Option<String> {
    url.split('?').nth(1)?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        if k == key { Some(percent_decode(v)) } else { None }
    })
}

/// Minimal percent-decoding for query values (`%XX` and `+`).
fn percent_decode(value: &str) -> String {
    let mut bytes = Vec::with_capacity(value.len());
    let mut chars = value.bytes();
    while let Some(b) = chars.next() {
        match b {
            b'+' => bytes.push(b' '),
            b'%' => {
                let hi = chars.next();
                let lo = chars.next();
                match (hi, lo) {
                    (Some(hi), Some(lo)) => {
                        let hex = [hi, lo];
                        match u8::from_str_radix(std::str::from_utf8(&hex).unwrap_or(""), 16) {
                            Ok(decoded) => bytes.push(decoded),
                            Err(_) => {
                                bytes.push(b'%');
                                bytes.extend_from_slice(&hex);
                            }
                        }
                    }
                    _ => bytes.push(b'%'),
                }
            }
            other => bytes.push(other),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Abstract excerpt: first [`EXCERPT_CHARS`] characters plus an ellipsis
/// when truncated.
fn excerpt(text: &str) -> String {
    let cut: String = text.chars().take(EXCERPT_CHARS).collect();
    if cut.len() < text.len() {
        format!("{cut}...")
    } else {
        cut
    }
}

fn doc_view(doc: &Document) -> DocView {
    DocView {
        title: doc.title.clone(),
        link: format!("{DOC_LINK_BASE}{}", doc.id),
        excerpt: excerpt(&doc.abstract_text),
    }
}

/// Assemble the chart view payload from the session's derived series.
fn view_payload(session: &Session) -> Result<ViewResponse> {
    let series = session
        .series()
        .context("nothing classified yet — run a classification first")?;

    let svg = chart::render_svg(series, session.visibility());
    let documents = session.documents();
    let demo_name = session.demo_name.as_deref().unwrap_or("selected");

    let topics = series
        .topics
        .iter()
        .enumerate()
        .map(|(ti, topic)| TopicView {
            topic: topic.topic.clone(),
            color: chart::topic_color(ti).to_string(),
            visible: session.visibility().is_visible(&topic.topic),
            points: topic
                .points
                .iter()
                .map(|p| PointView {
                    year: p.year.clone(),
                    count: p.count,
                    example: p.doc_indices.first().map(|&i| doc_view(&documents[i])),
                })
                .collect(),
        })
        .collect();

    Ok(ViewResponse {
        svg,
        cutoff: session.cutoff(),
        years: series.years.clone(),
        topics,
        trend_text: prompts::trend_text(series),
        default_prompt: prompts::default_interpretation_prompt(demo_name),
    })
}

// ---------------------------------------------------------------------------
// API Handlers
// ---------------------------------------------------------------------------

/// `GET /api/demos` — configured demos for the landing cards.
pub fn get_demos(cfg: &TrendlensConfig) -> Result<ResponseBox> {
    let demos: Vec<DemoResponse> = cfg
        .demos
        .iter()
        .map(|d| DemoResponse {
            name: d.name.clone(),
            icon: d.icon.clone(),
            topics: d.topics.clone(),
        })
        .collect();
    json_response(&demos)
}

/// `POST /api/corpus` — load a demo or file corpus into the session.
pub fn post_corpus(
    cfg: &TrendlensConfig,
    session: &mut Session,
    body: &str,
) -> Result<ResponseBox> {
    let req: CorpusRequest = serde_json::from_str(body).context("invalid corpus request")?;

    let (path, name, topics) = match (req.demo, req.file) {
        (Some(demo_name), _) => {
            let demo = cfg
                .find_demo(&demo_name)
                .with_context(|| format!("no demo named '{demo_name}'"))?;
            (
                demo.file.clone(),
                demo.name.clone(),
                demo.topics.clone(),
            )
        }
        (None, Some(file)) => (file.clone(), file, Vec::new()),
        (None, None) => anyhow::bail!("corpus request needs a 'demo' name or a 'file' path"),
    };

    let corpus = Corpus::load(std::path::Path::new(&path))?;
    let (min_year, max_year) = corpus.year_range().unwrap_or_default();
    let documents = corpus.len();

    session.set_corpus(corpus, Some(name.clone()), topics.clone());

    json_response(&CorpusResponse {
        name,
        documents,
        min_year,
        max_year,
        topics,
    })
}

/// `POST /api/classify` — call the similarity endpoint and derive the view.
///
/// The result is applied through the session's generation tag, so a
/// response that was superseded while in flight is dropped rather than
/// clobbering newer state.
pub fn post_classify(
    cfg: &TrendlensConfig,
    session: &mut Session,
    body: &str,
) -> Result<ResponseBox> {
    let req: ClassifyRequest = serde_json::from_str(body).context("invalid classify request")?;

    let topics: Vec<String> = req
        .topics
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if topics.is_empty() {
        anyhow::bail!("enter at least one topic");
    }
    if let Some(cutoff) = req.cutoff {
        if !(0.0..=1.0).contains(&cutoff) {
            anyhow::bail!("cutoff must be in [0, 1]");
        }
        session.set_cutoff(cutoff)?;
    }

    let docs = session
        .corpus()
        .context("no corpus loaded — select a demo first")?
        .classification_texts();

    let tag = session.begin_classify(topics.clone());
    let matrix = llm::classify(cfg, &docs, &topics).context("classification failed")?;
    if !session.apply_classification(tag, matrix)? {
        anyhow::bail!("classification superseded by a newer request");
    }

    json_response(&view_payload(session)?)
}

/// `GET /api/series?cutoff=F` — re-derive the view at a new cutoff from the
/// stored matrix, without calling the classifier again.
pub fn get_series(session: &mut Session, url: &str) -> Result<ResponseBox> {
    let cutoff: f64 = query_param(url, "cutoff")
        .context("missing cutoff parameter")?
        .parse()
        .context("cutoff must be a number")?;
    if !(0.0..=1.0).contains(&cutoff) {
        anyhow::bail!("cutoff must be in [0, 1]");
    }
    if !session.has_classification() {
        anyhow::bail!("nothing classified yet");
    }

    session.set_cutoff(cutoff)?;
    json_response(&view_payload(session)?)
}

/// `POST /api/chart/toggle` — flip a topic's legend visibility.
pub fn post_toggle(session: &mut Session, body: &str) -> Result<ResponseBox> {
    let req: ToggleRequest = serde_json::from_str(body).context("invalid toggle request")?;
    let visible = session.toggle_topic(&req.topic);

    let state = session
        .series()
        .map(|series| {
            series
                .topics
                .iter()
                .map(|t| TopicVisibility {
                    topic: t.topic.clone(),
                    visible: session.visibility().is_visible(&t.topic),
                })
                .collect()
        })
        .unwrap_or_default();

    json_response(&ToggleResponse {
        visible,
        opacity: session.visibility().opacity(&req.topic),
        topic: req.topic,
        state,
    })
}

/// `GET /api/docs?topic=T&year=Y` — drill-down document list for a marker.
pub fn get_docs(session: &Session, url: &str) -> Result<ResponseBox> {
    let topic = query_param(url, "topic").context("missing topic parameter")?;
    let year = query_param(url, "year").context("missing year parameter")?;

    let docs: Vec<DocView> = session
        .documents_for(&topic, &year)
        .into_iter()
        .map(doc_view)
        .collect();

    json_response(&serde_json::json!({
        "topic": topic,
        "year": year,
        "documents": docs,
    }))
}

/// `POST /api/interpret` — stream the trend interpretation as server-sent
/// events: `{"delta": …}` per increment, then `{"done": true}`, or
/// `{"error": …}` if the upstream stream fails.
pub fn post_interpret(
    cfg: &TrendlensConfig,
    session: &Session,
    body: &str,
) -> Result<ResponseBox> {
    let req: InterpretRequest = serde_json::from_str(body).context("invalid interpret request")?;

    let series = session
        .series()
        .context("no trend data available to interpret")?;
    let system_prompt = req.prompt.trim();
    if system_prompt.is_empty() {
        anyhow::bail!("enter a prompt for interpretation");
    }

    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(prompts::trend_text(series)),
    ];
    let client = ChatClient::from_config(cfg);

    let (tx, rx) = std::sync::mpsc::channel::<Vec<u8>>();
    std::thread::spawn(move || {
        let sender = tx.clone();
        let result = client.stream_chat(&messages, |delta| {
            let event = serde_json::json!({ "delta": delta });
            let _ = sender.send(format!("data: {event}\n\n").into_bytes());
        });
        let last = match result {
            Ok(_) => serde_json::json!({ "done": true }),
            Err(e) => serde_json::json!({ "error": e.to_string() }),
        };
        let _ = tx.send(format!("data: {last}\n\n").into_bytes());
        // tx drops here; the response reader sees EOF
    });

    Ok(stream_response(rx))
}

/// `GET /api/health` — configuration summary.
pub fn get_health(cfg: &TrendlensConfig) -> Result<ResponseBox> {
    json_response(&HealthResponse {
        base_url: cfg.api.base_url.clone(),
        token_set: !cfg.api.token.is_empty(),
        embedding_model: cfg.classify.embedding_model.clone(),
        chat_model: cfg.interpret.chat_model.clone(),
        demo_count: cfg.demos.len(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_param_extracts_and_decodes() {
        assert_eq!(
            query_param("/api/docs?topic=Deep%20learning&year=2020", "topic"),
            Some("Deep learning".to_string())
        );
        assert_eq!(
            query_param("/api/docs?topic=a+b", "topic"),
            Some("a b".to_string())
        );
        assert_eq!(query_param("/api/series?cutoff=0.4", "cutoff"), Some("0.4".to_string()));
        assert_eq!(query_param("/api/series", "cutoff"), None);
    }

    #[test]
    fn percent_decode_leaves_malformed_sequences() {
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("a%2Gb"), "a%2Gb");
    }

    #[test]
    fn excerpt_truncates_at_100_chars() {
        let long = "x".repeat(150);
        let cut = excerpt(&long);
        assert_eq!(cut.chars().count(), 103); // 100 + "..."
        assert!(cut.ends_with("..."));

        let short = "short abstract";
        assert_eq!(excerpt(short), "short abstract");
    }

    #[test]
    fn classify_request_deserializes() {
        let json = r#"{"topics": ["t1", "t2"], "cutoff": 0.4}"#;
        let req: ClassifyRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.topics.len(), 2);
        assert_eq!(req.cutoff, Some(0.4));

        let no_cutoff: ClassifyRequest = serde_json::from_str(r#"{"topics": []}"#).unwrap();
        assert_eq!(no_cutoff.cutoff, None);
    }

    #[test]
    fn corpus_request_accepts_demo_or_file() {
        let demo: CorpusRequest = serde_json::from_str(r#"{"demo": "ML"}"#).unwrap();
        assert_eq!(demo.demo.as_deref(), Some("ML"));
        let file: CorpusRequest = serde_json::from_str(r#"{"file": "x.csv"}"#).unwrap();
        assert_eq!(file.file.as_deref(), Some("x.csv"));
    }

    #[test]
    fn toggle_response_serializes() {
        let resp = ToggleResponse {
            topic: "t1".to_string(),
            visible: false,
            opacity: 0.1,
            state: vec![TopicVisibility {
                topic: "t1".to_string(),
                visible: false,
            }],
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"visible\":false"));
        assert!(json.contains("\"opacity\":0.1"));
        assert!(json.contains("\"state\""));
    }
}
