use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use trendlens::{cli, config, web};

#[derive(Debug, Parser)]
#[command(name = "trendlens")]
#[command(about = "Classify documents into topics and chart how they trend over time")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the configured demo datasets
    Demos {
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Classify a corpus against a topic list and print the trend counts
    Classify {
        /// Configured demo name
        #[arg(long)]
        demo: Option<String>,
        /// Path to a corpus CSV (alternative to --demo)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Comma-separated topic list (defaults to the demo's topics)
        #[arg(long)]
        topics: Option<String>,
        /// File with one topic per line (overrides --topics)
        #[arg(long)]
        topics_file: Option<PathBuf>,
        /// Similarity cutoff in [0, 1]
        #[arg(long)]
        cutoff: Option<f64>,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
        /// Also write the trend chart as SVG to this path
        #[arg(long)]
        svg: Option<PathBuf>,
    },
    /// Classify, then stream an LLM interpretation of the trend
    Interpret {
        /// Configured demo name
        #[arg(long)]
        demo: Option<String>,
        /// Path to a corpus CSV (alternative to --demo)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Comma-separated topic list (defaults to the demo's topics)
        #[arg(long)]
        topics: Option<String>,
        /// File with one topic per line (overrides --topics)
        #[arg(long)]
        topics_file: Option<PathBuf>,
        /// Similarity cutoff in [0, 1]
        #[arg(long)]
        cutoff: Option<f64>,
        /// Custom system prompt for the interpretation
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Start the interactive web explorer
    Serve {
        /// Bind address, e.g. 127.0.0.1:9748 (overrides the config)
        #[arg(long)]
        addr: Option<String>,
    },
    /// Check configuration, API reachability, and demo files
    Health,
    /// Inspect or edit the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Print the effective merged configuration
    Show,
    /// Write a default config file to ~/.trendlens/config.toml
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Set a single value by dotted key, e.g. classify.default_cutoff
    Set { key: String, value: String },
    /// Reset the config file to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();

    match app.command {
        Commands::Demos { format } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            cli::run_demos(fmt)
        }
        Commands::Classify {
            demo,
            file,
            topics,
            topics_file,
            cutoff,
            format,
            svg,
        } => {
            let fmt = cli::OutputFormat::from_str_opt(Some(&format));
            let args = cli::PipelineArgs {
                demo,
                file,
                topics,
                topics_file,
                cutoff,
            };
            cli::run_classify(&args, fmt, svg.as_deref())
        }
        Commands::Interpret {
            demo,
            file,
            topics,
            topics_file,
            cutoff,
            prompt,
        } => {
            let args = cli::PipelineArgs {
                demo,
                file,
                topics,
                topics_file,
                cutoff,
            };
            cli::run_interpret(&args, prompt.as_deref())
        }
        Commands::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config::load().web.addr);
            web::serve(&addr)
        }
        Commands::Health => cli::run_health(),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
    }
}
