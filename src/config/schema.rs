/// Configuration schema and defaults for trendlens.
///
/// Defines the TOML-serializable structure with all sections: `[api]`,
/// `[classify]`, `[interpret]`, `[web]`, and the `[[demos]]` registry of
/// named, preconfigured corpus + topic-list pairings.
///
/// Every field has a sensible built-in default. Users only need to set the
/// values they want to override — typically the API base URL, the token,
/// and their demos.
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level trendlens configuration.
///
/// Maps directly to the `~/.trendlens/config.toml` and `.trendlens.toml`
/// file schemas. All sections and fields are optional — missing values fall
/// back to built-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendlensConfig {
    pub api: ApiConfig,
    pub classify: ClassifyConfig,
    pub interpret: InterpretConfig,
    pub web: WebConfig,
    pub demos: Vec<DemoConfig>,
}

// ---------------------------------------------------------------------------
// [api]
// ---------------------------------------------------------------------------

/// Remote service settings shared by both clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the service hosting `/similarity` and
    /// `/openai/v1/chat/completions`.
    pub base_url: String,
    /// Bearer token sent as `Authorization`. Empty string omits the header
    /// (for unauthenticated or self-hosted endpoints).
    pub token: String,
    /// Request timeout in milliseconds. Classification of a large corpus can
    /// take 60-120 s on a cold cache, so the default is generous.
    pub timeout_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://llmfoundry.straive.com".to_string(),
            token: String::new(),
            timeout_ms: 180_000,
        }
    }
}

// ---------------------------------------------------------------------------
// [classify]
// ---------------------------------------------------------------------------

/// Classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Embedding model identifier sent to the similarity endpoint.
    pub embedding_model: String,
    /// Decimal precision requested for similarity scores.
    pub precision: u32,
    /// Minimum similarity score required to accept a topic assignment,
    /// in [0, 1]. Adjustable per run without re-calling the endpoint.
    pub default_cutoff: f64,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            embedding_model: "text-embedding-3-small".to_string(),
            precision: 5,
            default_cutoff: 0.3,
        }
    }
}

// ---------------------------------------------------------------------------
// [interpret]
// ---------------------------------------------------------------------------

/// Trend interpretation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpretConfig {
    /// Chat model identifier for the streaming completion endpoint.
    pub chat_model: String,
}

impl Default for InterpretConfig {
    fn default() -> Self {
        Self {
            chat_model: "gpt-4.1-mini".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [web]
// ---------------------------------------------------------------------------

/// Embedded dashboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Bind address for `trendlens serve`.
    pub addr: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9748".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [[demos]]
// ---------------------------------------------------------------------------

/// A named, preconfigured corpus + topic-list pairing offered to the user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Display name shown on the demo card and in `trendlens demos`.
    pub name: String,
    /// Icon identifier for the dashboard card.
    pub icon: String,
    /// Path to the demo's CSV corpus file.
    pub file: String,
    /// Default topic list, editable before classification.
    pub topics: Vec<String>,
}

impl TrendlensConfig {
    /// Find a demo by display name (case-insensitive).
    pub fn find_demo(&self, name: &str) -> Option<&DemoConfig> {
        self.demos
            .iter()
            .find(|d| d.name.eq_ignore_ascii_case(name))
    }
}

// ---------------------------------------------------------------------------
// Default TOML content
// ---------------------------------------------------------------------------

impl TrendlensConfig {
    /// Generate the annotated default TOML config file content.
    ///
    /// Used by `trendlens config init` to create a starting config file with
    /// all settings documented.
    pub fn default_toml() -> String {
        r#"# trendlens Configuration
# Topic-trend exploration for document corpora
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (TRENDLENS_*)
#   2. Project config (.trendlens.toml in current directory)
#   3. User global config (~/.trendlens/config.toml)
#   4. Built-in defaults

[api]
base_url = "https://llmfoundry.straive.com"
token = ""                            # Or set TRENDLENS_API_TOKEN
timeout_ms = 180000                   # Cold classification can take 60-120 s

[classify]
embedding_model = "text-embedding-3-small"
precision = 5
default_cutoff = 0.3                  # Minimum score to accept an assignment

[interpret]
chat_model = "gpt-4.1-mini"

[web]
addr = "127.0.0.1:9748"

# Each [[demos]] entry pairs a CSV corpus with a default topic list.
# The CSV needs `title`, `abstract`, `id`, and `update_date` columns.
#
# [[demos]]
# name = "Machine Learning"
# icon = "carbon:machine-learning-model"
# file = "data/arxiv-cs-lg.csv"
# topics = [
#   "Deep learning architectures",
#   "Reinforcement learning",
#   "Natural language processing",
# ]
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = TrendlensConfig::default();
        assert_eq!(config.classify.default_cutoff, 0.3);
        assert_eq!(config.classify.precision, 5);
        assert_eq!(config.classify.embedding_model, "text-embedding-3-small");
        assert_eq!(config.interpret.chat_model, "gpt-4.1-mini");
        assert!(config.demos.is_empty());
    }

    #[test]
    fn default_toml_parses_back() {
        let toml_str = TrendlensConfig::default_toml();
        let parsed: TrendlensConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.api.timeout_ms, 180_000);
        assert_eq!(parsed.web.addr, "127.0.0.1:9748");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: TrendlensConfig = toml::from_str("[api]\ntoken = \"abc\"\n").unwrap();
        assert_eq!(parsed.api.token, "abc");
        assert_eq!(parsed.api.base_url, "https://llmfoundry.straive.com");
        assert_eq!(parsed.classify.default_cutoff, 0.3);
    }

    #[test]
    fn demos_deserialize_from_toml() {
        let toml_str = r#"
[[demos]]
name = "Robotics"
icon = "carbon:bot"
file = "data/robotics.csv"
topics = ["Manipulation", "SLAM"]

[[demos]]
name = "Databases"
file = "data/db.csv"
"#;
        let parsed: TrendlensConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(parsed.demos.len(), 2);
        assert_eq!(parsed.demos[0].topics.len(), 2);
        assert!(parsed.demos[1].topics.is_empty());
        assert!(parsed.find_demo("robotics").is_some());
        assert!(parsed.find_demo("nope").is_none());
    }
}
