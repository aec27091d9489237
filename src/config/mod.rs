//! Layered configuration for trendlens.
//!
//! Four layers, later ones winning:
//!
//! 1. built-in defaults ([`schema::TrendlensConfig::default()`])
//! 2. `~/.trendlens/config.toml` (user-global)
//! 3. `.trendlens.toml` in the working directory (per-project)
//! 4. `TRENDLENS_*` environment variables
//!
//! Each TOML layer deserializes with `serde(default)`, so a file that sets
//! only `[api] token` still yields a complete config. A layer that is
//! present replaces the merged state wholesale; since its unset keys carry
//! the built-in defaults, the effect is "defaults plus whatever that file
//! set". A malformed or unreadable file is skipped silently — the tool
//! stays usable on defaults while the user fixes it.

pub mod schema;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

pub use schema::TrendlensConfig;

/// Resolve the effective configuration from all layers.
pub fn load() -> TrendlensConfig {
    let mut config = TrendlensConfig::default();

    for path in [user_config_path(), project_config_path()] {
        if let Some(layer) = read_layer(path) {
            config = layer;
        }
    }

    env_overrides(&mut config);
    config
}

/// Deserialize one TOML layer, or `None` if the file is absent, unreadable,
/// or malformed.
fn read_layer(path: Option<PathBuf>) -> Option<TrendlensConfig> {
    let content = fs::read_to_string(path?).ok()?;
    toml::from_str(&content).ok()
}

// ---------------------------------------------------------------------------
// Config file locations
// ---------------------------------------------------------------------------

fn user_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".trendlens").join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir().ok().map(|d| d.join(".trendlens.toml"))
}

/// `~/.trendlens/config.toml`, for display and editing commands.
pub fn global_config_file() -> Option<PathBuf> {
    user_config_path()
}

/// `.trendlens.toml` in the working directory, for display.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment layer
// ---------------------------------------------------------------------------

/// Overlay `TRENDLENS_*` variables onto the merged config.
///
/// Recognized: `TRENDLENS_API_BASE`, `TRENDLENS_API_TOKEN`,
/// `TRENDLENS_TIMEOUT_MS`, `TRENDLENS_EMBEDDING_MODEL`,
/// `TRENDLENS_CHAT_MODEL`, `TRENDLENS_CUTOFF`. Unparseable or out-of-range
/// values are ignored rather than erroring at startup.
fn env_overrides(config: &mut TrendlensConfig) {
    fn var(name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }

    if let Some(base) = var("TRENDLENS_API_BASE") {
        config.api.base_url = base;
    }
    if let Some(token) = var("TRENDLENS_API_TOKEN") {
        config.api.token = token;
    }
    if let Some(ms) = var("TRENDLENS_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
        config.api.timeout_ms = ms;
    }
    if let Some(model) = var("TRENDLENS_EMBEDDING_MODEL") {
        config.classify.embedding_model = model;
    }
    if let Some(model) = var("TRENDLENS_CHAT_MODEL") {
        config.interpret.chat_model = model;
    }
    if let Some(cutoff) = var("TRENDLENS_CUTOFF").and_then(|v| v.parse::<f64>().ok()) {
        if (0.0..=1.0).contains(&cutoff) {
            config.classify.default_cutoff = cutoff;
        }
    }
}

// ---------------------------------------------------------------------------
// Editing commands (init / set / reset / show)
// ---------------------------------------------------------------------------

/// Write the annotated default config to `~/.trendlens/config.toml`,
/// creating the directory as needed. Refuses to clobber an existing file
/// unless `force` is set.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = user_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    fs::write(&path, TrendlensConfig::default_toml())
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(path)
}

/// Overwrite the global config file with defaults.
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Update one dotted key (e.g. `classify.default_cutoff`) in the global
/// config file, creating the file from defaults if it does not exist yet.
///
/// The edit happens on a raw `toml::Value` tree so keys the schema does not
/// know (user comments aside) survive a round trip, and the replacement
/// value is parsed to match the type already stored under the key.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = user_config_path().context("could not determine home directory")?;

    let mut tree: toml::Value = if path.exists() {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("{} is not valid TOML", path.display()))?
    } else {
        let defaults = toml::to_string_pretty(&TrendlensConfig::default())
            .context("failed to serialize defaults")?;
        toml::from_str(&defaults).context("failed to parse serialized defaults")?
    };

    update_key(&mut tree, key, value)?;

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let output = toml::to_string_pretty(&tree).context("failed to serialize config")?;
    fs::write(&path, output).with_context(|| format!("failed to write {}", path.display()))?;

    Ok(())
}

/// Apply a dotted-key update inside a TOML value tree.
fn update_key(tree: &mut toml::Value, key: &str, raw: &str) -> Result<()> {
    let Some((sections, leaf)) = split_key(key) else {
        anyhow::bail!("empty config key");
    };

    let mut node = tree;
    for section in &sections {
        node = node
            .get_mut(section)
            .with_context(|| format!("unknown config section '{section}' in '{key}'"))?;
    }

    let table = node
        .as_table_mut()
        .with_context(|| format!("'{}' is not a table", sections.join(".")))?;

    let parsed = coerce(table.get(leaf), key, raw)?;
    table.insert(leaf.to_string(), parsed);
    Ok(())
}

/// Split `a.b.c` into (`["a", "b"]`, `"c"`).
fn split_key(key: &str) -> Option<(Vec<&str>, &str)> {
    let mut parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
    let leaf = parts.pop()?;
    Some((parts, leaf))
}

/// Parse `raw` to the same TOML type the key currently holds. A key with no
/// current value (or a string) stores the raw text as-is.
fn coerce(current: Option<&toml::Value>, key: &str, raw: &str) -> Result<toml::Value> {
    let value = match current {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(matches!(
            raw.to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )),
        Some(toml::Value::Integer(_)) => toml::Value::Integer(
            raw.parse()
                .with_context(|| format!("'{key}' holds an integer, got '{raw}'"))?,
        ),
        Some(toml::Value::Float(_)) => toml::Value::Float(
            raw.parse()
                .with_context(|| format!("'{key}' holds a number, got '{raw}'"))?,
        ),
        Some(toml::Value::Array(_)) => toml::Value::Array(
            raw.split(',')
                .map(|item| toml::Value::String(item.trim().to_string()))
                .collect(),
        ),
        _ => toml::Value::String(raw.to_string()),
    };
    Ok(value)
}

/// Serialize the fully merged config back to TOML for display.
pub fn show_effective_config() -> Result<String> {
    toml::to_string_pretty(&load()).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(toml_str: &str) -> toml::Value {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn load_without_files_yields_defaults() {
        // On a machine with a real ~/.trendlens/config.toml this reflects
        // that file instead; the invariant that always holds is a usable
        // non-empty base URL.
        let config = load();
        assert!(!config.api.base_url.is_empty());
    }

    #[test]
    fn update_key_replaces_a_string() {
        let mut root = tree("[api]\nbase_url = \"https://llmfoundry.straive.com\"\n");
        update_key(&mut root, "api.base_url", "http://localhost:8080").unwrap();
        assert_eq!(
            root["api"]["base_url"].as_str(),
            Some("http://localhost:8080")
        );
    }

    #[test]
    fn update_key_keeps_numeric_types() {
        let mut root = tree("[api]\ntimeout_ms = 180000\n\n[classify]\ndefault_cutoff = 0.3\n");

        update_key(&mut root, "api.timeout_ms", "60000").unwrap();
        assert_eq!(root["api"]["timeout_ms"].as_integer(), Some(60_000));

        update_key(&mut root, "classify.default_cutoff", "0.5").unwrap();
        let cutoff = root["classify"]["default_cutoff"].as_float().unwrap();
        assert!((cutoff - 0.5).abs() < f64::EPSILON);

        assert!(update_key(&mut root, "api.timeout_ms", "not-a-number").is_err());
    }

    #[test]
    fn update_key_rejects_unknown_sections() {
        let mut root = tree("[api]\ntoken = \"\"\n");
        assert!(update_key(&mut root, "nonexistent.key", "value").is_err());
        assert!(update_key(&mut root, "", "value").is_err());
    }

    #[test]
    fn split_key_separates_sections_from_leaf() {
        assert_eq!(split_key("api.base_url"), Some((vec!["api"], "base_url")));
        assert_eq!(split_key("token"), Some((vec![], "token")));
        assert_eq!(split_key(""), None);
    }

    #[test]
    fn effective_config_round_trips_as_toml() {
        let rendered = show_effective_config().unwrap();
        let _: TrendlensConfig = toml::from_str(&rendered).unwrap();
    }
}
