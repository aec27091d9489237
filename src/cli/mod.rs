//! CLI command implementations for trendlens.
//!
//! One handler per subcommand:
//! - `trendlens demos` — list configured demos
//! - `trendlens classify` — run the classification pipeline and print counts
//! - `trendlens interpret` — classify, then stream the trend interpretation
//! - `trendlens health` — check config, token, endpoint, demo files
//! - `trendlens config show|init|set|reset` — configuration management

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::chart::{self, Visibility};
use crate::config::{self, TrendlensConfig};
use crate::corpus::Corpus;
use crate::engine::TrendSeries;
use crate::llm::{self, ChatMessage, chat::ChatClient, prompts};
use crate::session::Session;

/// Output format for listing commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl OutputFormat {
    /// Parse a `--format` value; anything unrecognized falls back to a table.
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s.unwrap_or("table") {
            "json" => Self::Json,
            "csv" => Self::Csv,
            _ => Self::Table,
        }
    }
}

/// Corpus and topic selection shared by `classify` and `interpret`.
#[derive(Debug, Default)]
pub struct PipelineArgs {
    /// Configured demo name (mutually exclusive with `file`).
    pub demo: Option<String>,
    /// Direct path to a corpus CSV.
    pub file: Option<PathBuf>,
    /// Comma-separated topic list override.
    pub topics: Option<String>,
    /// File with one topic per line (overrides `topics`).
    pub topics_file: Option<PathBuf>,
    /// Cutoff override; falls back to the configured default.
    pub cutoff: Option<f64>,
}

// ---------------------------------------------------------------------------
// trendlens demos
// ---------------------------------------------------------------------------

/// List the configured demos.
pub fn run_demos(format: OutputFormat) -> Result<()> {
    let cfg = config::load();

    if cfg.demos.is_empty() {
        println!(
            "{}",
            "No demos configured. Add [[demos]] entries to ~/.trendlens/config.toml.".yellow()
        );
        return Ok(());
    }

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&cfg.demos)?);
        }
        OutputFormat::Csv | OutputFormat::Table => {
            println!("{}", "Configured Demos".bold().cyan());
            println!("{}", "=".repeat(60));
            println!("  {:<24} {:<28} Topics", "Name", "File");
            println!("  {}", "-".repeat(58));
            for demo in &cfg.demos {
                println!(
                    "  {:<24} {:<28} {}",
                    truncate(&demo.name, 24),
                    truncate(&demo.file, 28),
                    demo.topics.len(),
                );
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// trendlens classify
// ---------------------------------------------------------------------------

/// Run the full classification pipeline and print the per-topic per-year
/// counts. Optionally write the chart SVG to `svg_out`.
pub fn run_classify(args: &PipelineArgs, format: OutputFormat, svg_out: Option<&Path>) -> Result<()> {
    let cfg = config::load();
    let mut session = prepare_session(&cfg, args)?;
    classify_session(&cfg, &mut session)?;

    let series = session
        .series()
        .context("classification produced no series")?;

    match format {
        OutputFormat::Json => print_series_json(series, session.cutoff())?,
        OutputFormat::Csv => print_series_csv(series),
        OutputFormat::Table => print_series_table(series, &session),
    }

    if let Some(path) = svg_out {
        let svg = chart::render_svg(series, &Visibility::new());
        std::fs::write(path, svg)
            .with_context(|| format!("failed to write chart to {}", path.display()))?;
        eprintln!("{} Chart written to {}", "✓".green().bold(), path.display());
    }

    Ok(())
}

fn print_series_table(series: &TrendSeries, session: &Session) {
    println!("{}", "Topic Trends by Year".bold().cyan());
    println!("{}", "=".repeat(60));

    let total: usize = session.documents().len();
    let unclassified: usize = series.unclassified.iter().map(|p| p.count).sum();
    println!(
        "  {} {} documents, {} classified, {} unclassified (cutoff {:.0}%)",
        "Summary:".bold(),
        total,
        total - unclassified,
        unclassified,
        session.cutoff() * 100.0,
    );
    println!();

    // Header: topic column then one column per year
    print!("  {:<28}", "Topic");
    for year in &series.years {
        print!(" {year:>6}");
    }
    println!();
    println!("  {}", "-".repeat(28 + series.years.len() * 7));

    for (i, topic) in series.topics.iter().enumerate() {
        let mut line = format!("  {:<28}", truncate(&topic.topic, 28));
        for point in &topic.points {
            line.push_str(&format!(" {:>6}", point.count));
        }
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }
}

fn print_series_json(series: &TrendSeries, cutoff: f64) -> Result<()> {
    let value = serde_json::json!({
        "cutoff": cutoff,
        "years": series.years,
        "topics": series.topics.iter().map(|t| serde_json::json!({
            "topic": t.topic,
            "counts": t.points.iter().map(|p| p.count).collect::<Vec<_>>(),
        })).collect::<Vec<_>>(),
    });

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn print_series_csv(series: &TrendSeries) {
    println!("topic,{}", series.years.join(","));
    for topic in &series.topics {
        let counts: Vec<String> = topic.points.iter().map(|p| p.count.to_string()).collect();
        println!("{},{}", topic.topic.replace(',', ";"), counts.join(","));
    }
}

// ---------------------------------------------------------------------------
// trendlens interpret
// ---------------------------------------------------------------------------

/// Classify, then stream the trend interpretation to stdout as increments
/// arrive.
pub fn run_interpret(args: &PipelineArgs, prompt: Option<&str>) -> Result<()> {
    let cfg = config::load();
    let mut session = prepare_session(&cfg, args)?;
    classify_session(&cfg, &mut session)?;

    let series = session
        .series()
        .context("classification produced no series")?;

    let demo_name = session.demo_name.as_deref().unwrap_or("selected");
    let system_prompt = match prompt {
        Some(p) if !p.trim().is_empty() => p.to_string(),
        _ => prompts::default_interpretation_prompt(demo_name),
    };
    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(prompts::trend_text(series)),
    ];

    let client = ChatClient::from_config(&cfg);
    eprintln!(
        "{} Interpreting with {}...",
        "→".cyan().bold(),
        client.model_name()
    );

    let mut stdout = std::io::stdout();
    client.stream_chat(&messages, |delta| {
        print!("{delta}");
        let _ = stdout.flush();
    })?;
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Pipeline plumbing
// ---------------------------------------------------------------------------

/// Resolve the corpus and topic list from the CLI arguments and load them
/// into a fresh session.
fn prepare_session(cfg: &TrendlensConfig, args: &PipelineArgs) -> Result<Session> {
    let (file, demo_name, demo_topics) = match (&args.demo, &args.file) {
        (Some(name), None) => {
            let demo = cfg
                .find_demo(name)
                .with_context(|| format!("no demo named '{name}' in the configuration"))?;
            (
                PathBuf::from(&demo.file),
                Some(demo.name.clone()),
                demo.topics.clone(),
            )
        }
        (None, Some(path)) => (path.clone(), None, Vec::new()),
        (Some(_), Some(_)) => anyhow::bail!("pass either --demo or --file, not both"),
        (None, None) => anyhow::bail!("pass --demo NAME or --file PATH to select a corpus"),
    };

    let topics = resolve_topics(args, demo_topics)?;
    if topics.is_empty() {
        anyhow::bail!("no topics given — use --topics, --topics-file, or a demo with defaults");
    }

    let corpus = Corpus::load(&file)?;
    if corpus.is_empty() {
        anyhow::bail!("corpus {} contains no documents", file.display());
    }

    let cutoff = args.cutoff.unwrap_or(cfg.classify.default_cutoff);
    if !(0.0..=1.0).contains(&cutoff) {
        anyhow::bail!("cutoff must be in [0, 1], got {cutoff}");
    }

    let mut session = Session::new(cutoff);
    session.set_corpus(corpus, demo_name, topics);
    Ok(session)
}

/// Topic list precedence: --topics-file, then --topics, then demo defaults.
fn resolve_topics(args: &PipelineArgs, demo_topics: Vec<String>) -> Result<Vec<String>> {
    if let Some(path) = &args.topics_file {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read topics file {}", path.display()))?;
        return Ok(parse_topic_lines(&content));
    }
    if let Some(list) = &args.topics {
        return Ok(list
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect());
    }
    Ok(demo_topics)
}

/// One topic per line, trimmed, blanks dropped.
pub fn parse_topic_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Call the similarity endpoint and apply the result to the session.
fn classify_session(cfg: &TrendlensConfig, session: &mut Session) -> Result<()> {
    let docs = session
        .corpus()
        .context("no corpus loaded")?
        .classification_texts();
    let topics = session.topics().to_vec();

    eprintln!(
        "{} Classifying {} documents against {} topics (may take 60-120 s on a cold cache)...",
        "→".cyan().bold(),
        docs.len(),
        topics.len(),
    );

    let tag = session.begin_classify(topics.clone());
    let matrix = llm::classify(cfg, &docs, &topics).context("classification failed")?;
    session.apply_classification(tag, matrix)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// trendlens health
// ---------------------------------------------------------------------------

/// Check system health: config files, token, endpoint reachability, demo
/// corpus files.
pub fn run_health() -> Result<()> {
    println!("{}", "trendlens Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let cfg = config::load();

    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.trendlens/config.toml found"
        } else {
            "not found (run `trendlens config init` to create)"
        },
    );
    print_health_item(
        "Project config",
        project_exists,
        if project_exists {
            ".trendlens.toml found"
        } else {
            "none (optional)"
        },
    );

    let has_token = !cfg.api.token.is_empty();
    print_health_item(
        "API token",
        has_token,
        if has_token {
            "set"
        } else {
            "empty (set TRENDLENS_API_TOKEN if the endpoint needs auth)"
        },
    );

    let reachable = endpoint_reachable(&cfg.api.base_url);
    let detail = if reachable {
        format!("reachable at {}", cfg.api.base_url)
    } else {
        format!("{} not reachable", cfg.api.base_url)
    };
    print_health_item("Endpoint", reachable, &detail);

    print_health_item("Embedding model", true, &cfg.classify.embedding_model);
    print_health_item("Chat model", true, &cfg.interpret.chat_model);

    if cfg.demos.is_empty() {
        print_health_item("Demos", false, "none configured");
    } else {
        for demo in &cfg.demos {
            let exists = Path::new(&demo.file).exists();
            let detail = if exists {
                demo.file.clone()
            } else {
                format!("{} missing", demo.file)
            };
            print_health_item(&format!("Demo '{}'", demo.name), exists, &detail);
        }
    }

    Ok(())
}

/// A transport-level connection counts as reachable even if the service
/// answers with an HTTP error (auth is checked at call time, not here).
fn endpoint_reachable(base_url: &str) -> bool {
    match ureq::get(base_url).timeout(Duration::from_secs(5)).call() {
        Ok(_) => true,
        Err(ureq::Error::Status(_, _)) => true,
        Err(_) => false,
    }
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<25} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// trendlens config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective trendlens Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    println!("  {} {}", "·".dimmed(), "~/.trendlens/config.toml".dimmed());
    println!("  {} {}", "·".dimmed(), ".trendlens.toml".dimmed());
    println!(
        "  {} {}",
        "·".dimmed(),
        "TRENDLENS_* environment variables".dimmed()
    );

    Ok(())
}

/// Initialize a default config file at `~/.trendlens/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    println!(
        "  {}",
        "Edit the file to set your API token and demos.".dimmed()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Shorten `s` to at most `max_len` characters, ellipsizing the tail.
fn truncate(s: &str, max_len: usize) -> String {
    match s.char_indices().nth(max_len) {
        None => s.to_string(),
        Some(_) => {
            let head: String = s.chars().take(max_len.saturating_sub(1)).collect();
            format!("{head}…")
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
