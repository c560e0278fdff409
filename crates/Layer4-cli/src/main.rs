//! Counsel CLI - Main entry point

mod commands;
mod documents;

use anyhow::Context;
use clap::{Parser, Subcommand};
use counsel_agent::AgentContext;
use counsel_foundation::{CounselConfig, UsageAccumulator};
use counsel_provider::GeminiBackend;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Counsel - legal research assistant for the terminal
#[derive(Parser, Debug)]
#[command(name = "counsel")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Gemini API key (overrides env and config)
    #[arg(long)]
    api_key: Option<String>,

    /// Read settings from this file instead of the global/project config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive chat
    Chat {
        /// Reference document attached to the first message (repeatable)
        #[arg(long = "doc")]
        docs: Vec<PathBuf>,
    },
    /// Research a legal question with case-law and statutes roles
    Research {
        query: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Draft a document from instructions and reference documents
    Draft {
        instructions: String,

        /// Reference document (repeatable)
        #[arg(long = "doc")]
        docs: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => CounselConfig::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => CounselConfig::load().unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config: {}", e);
            let mut config = CounselConfig::new();
            config.apply_env();
            config
        }),
    };

    if let Some(api_key) = args.api_key {
        config.api.api_key = Some(api_key);
    }

    let backend = GeminiBackend::from_settings(&config.api)?;
    let ctx = AgentContext::new(Arc::new(backend), config);

    let accumulator = UsageAccumulator::new();
    ctx.usage.subscribe(accumulator.clone());
    tracing::debug!(backend = ctx.backend_name(), "Backend ready");

    let result = match args.command {
        Command::Chat { docs } => commands::chat(ctx, &docs).await,
        Command::Research { query, json } => commands::research(ctx, &query, json).await,
        Command::Draft { instructions, docs } => {
            commands::draft(ctx, &instructions, &docs).await
        }
    };

    eprintln!(
        "\nSession usage: {} tokens across {} call(s)",
        accumulator.total(),
        accumulator.calls()
    );

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_draft_with_documents() {
        let args = Args::try_parse_from([
            "counsel",
            "--debug",
            "draft",
            "Draft a relocation notice",
            "--doc",
            "order.txt",
            "--doc",
            "scan.pdf",
        ])
        .unwrap();

        assert!(args.debug);
        match args.command {
            Command::Draft { instructions, docs } => {
                assert_eq!(instructions, "Draft a relocation notice");
                assert_eq!(docs, vec![PathBuf::from("order.txt"), PathBuf::from("scan.pdf")]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_research_requires_query() {
        assert!(Args::try_parse_from(["counsel", "research"]).is_err());
    }
}
