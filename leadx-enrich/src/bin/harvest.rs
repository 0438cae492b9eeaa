//! leadx-harvest - nightly training-data harvester
//!
//! Asks the hosted model for `ZIP, City, State` completions of a fixed prompt
//! set and appends new pairs to the local model training corpus.

use anyhow::{bail, Context, Result};
use clap::Parser;
use leadx_common::config::load_config;
use leadx_enrich::config::ResolvedKeys;
use leadx_enrich::logging::init_tracing;
use leadx_enrich::prompt::TRAINING_SYSTEM_PROMPT;
use leadx_enrich::providers::OpenAIClient;
use leadx_enrich::training::{
    default_harvest_prompts, harvest, seed_examples, TrainingCorpus, DEFAULT_CORPUS_FILE,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "leadx-harvest")]
#[command(about = "Append hosted-model completions to the local model training corpus")]
#[command(version)]
struct Args {
    /// Training corpus (JSON list of prompt/completion pairs)
    #[arg(long, default_value = DEFAULT_CORPUS_FILE, env = "LEADX_TRAINING_CORPUS")]
    corpus: PathBuf,

    /// Configuration file (default: <config_dir>/leadx/config.toml)
    #[arg(short, long, env = "LEADX_CONFIG")]
    config: Option<PathBuf>,

    /// Also add the hand-written seed examples
    #[arg(long)]
    seed: bool,

    /// Prompt to harvest (repeatable; defaults to the nightly set)
    #[arg(long = "prompt")]
    prompts: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging)?;

    let keys = ResolvedKeys::resolve(&config);
    let Some(api_key) = keys.openai else {
        bail!(
            "OpenAI API key not configured. Set LEADX_OPENAI_API_KEY (or OPENAI_API_KEY) \
             or openai_api_key in the config file"
        );
    };

    let mut client = OpenAIClient::new(api_key)
        .context("Failed to build OpenAI client")?
        .with_system_prompt(TRAINING_SYSTEM_PROMPT);
    if let Some(model) = &config.openai_model {
        client = client.with_model(model.as_str());
    }

    let mut corpus = TrainingCorpus::load(&args.corpus)
        .with_context(|| format!("Failed to load training corpus {}", args.corpus.display()))?;
    info!(path = %args.corpus.display(), examples = corpus.len(), "Training corpus loaded");

    if args.seed {
        let added = seed_examples()
            .into_iter()
            .filter(|example| corpus.push(example.clone()))
            .count();
        info!(added, "Seed examples applied");
    }

    let prompts = if args.prompts.is_empty() {
        default_harvest_prompts()
    } else {
        args.prompts
    };

    let report = harvest(&mut corpus, &client, &prompts).await;
    corpus
        .save()
        .with_context(|| format!("Failed to save training corpus {}", args.corpus.display()))?;

    info!(
        requested = report.requested,
        added = report.added,
        duplicates = report.duplicates,
        failed = report.failed,
        "Harvest complete"
    );
    println!(
        "[{}] Training data updated.",
        report.finished_at.format("%Y-%m-%d %H:%M:%S")
    );

    Ok(())
}
