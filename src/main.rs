//! llm-consensus - send one prompt to several LLMs and check agreement

use anyhow::{bail, Result};
use clap::Parser;
use std::io::Read;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use llm_consensus::{Aggregator, AnalysisReport, Config, ModelSelector, Outcome};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Prompt to send (read from stdin when omitted)
    prompt: Option<String>,

    /// Model to query, as provider:model (repeatable; defaults from config)
    #[arg(short, long = "model", value_name = "PROVIDER:MODEL")]
    models: Vec<ModelSelector>,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Query all models concurrently
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Print the full report as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// List registered models and exit
    #[arg(long, default_value_t = false)]
    list_models: bool,

    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = Config::load(args.config.as_deref())?;

    if args.list_models {
        for selector in config.selectors() {
            println!("{}", selector);
        }
        return Ok(());
    }

    let prompt = read_prompt(args.prompt)?;
    let parallel = args.parallel || config.analysis.parallel;
    let aggregator = Aggregator::new(config)?.parallel(parallel);

    let selectors = (!args.models.is_empty()).then_some(args.models.as_slice());
    let report = aggregator.analyze(&prompt, selectors).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

fn read_prompt(arg: Option<String>) -> Result<String> {
    if let Some(prompt) = arg {
        return Ok(prompt);
    }
    if atty::is(atty::Stream::Stdin) {
        bail!("No prompt given. Pass it as an argument or pipe it on stdin.");
    }

    let mut prompt = String::new();
    std::io::stdin().read_to_string(&mut prompt)?;
    let prompt = prompt.trim().to_string();
    if prompt.is_empty() {
        bail!("Prompt on stdin was empty");
    }
    Ok(prompt)
}

fn print_summary(report: &AnalysisReport) {
    for (key, outcome) in &report.results {
        match outcome {
            Outcome::Failed { error } => println!("✗ {}: {}", key, error),
            Outcome::Response(body) => {
                let text = outcome
                    .preview()
                    .map(str::to_string)
                    .unwrap_or_else(|| body.to_string());
                let marker = if outcome.is_error() { "✗" } else { "✓" };
                println!("{} {}: {}", marker, key, truncate(text.trim(), 200));
            }
        }
    }
    println!();
    println!("Consensus: {}", report.consensus);
}

/// Truncate to at most `max_chars` characters
fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
