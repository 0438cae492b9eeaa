//! leadx-enrich - lead address enrichment CLI
//!
//! Reads a lead table, fills missing postal code / city / state from the
//! configured providers, and writes the table sorted by postal code.
//!
//! Tiers, in order:
//! 1. Google Geocoding (needs a Google Maps key)
//! 2. Local model via `ollama run` (full mode)
//!    or OpenAI chat completion (zip-only mode, needs an OpenAI key)

use anyhow::{Context, Result};
use clap::Parser;
use leadx_common::config::{load_config, write_toml_config};
use leadx_enrich::audit::{AuditLog, VerboseSample, DEFAULT_AUDIT_LOG};
use leadx_enrich::config::ResolvedKeys;
use leadx_enrich::logging::init_tracing;
use leadx_enrich::providers::{GoogleGeocodeClient, OllamaCli, OpenAIClient};
use leadx_enrich::table::Table;
use leadx_enrich::zip_only::ZipOnlyResolver;
use leadx_enrich::{
    BatchDriver, BatchOptions, CompletionProvider, EnrichMode, GeocodeProvider, Resolver,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Rows echoed after the summary
const SAMPLE_ROWS: usize = 3;

/// Command-line arguments for leadx-enrich
#[derive(Parser, Debug)]
#[command(name = "leadx-enrich")]
#[command(about = "Fill missing ZIP, city and state on lead records")]
#[command(version)]
struct Args {
    /// Input lead table (CSV with header row)
    #[arg(short, long, default_value = "data/leads_cleaned.csv", env = "LEADX_INPUT")]
    input: PathBuf,

    /// Output table
    #[arg(short, long, default_value = "data/leads_enriched.csv", env = "LEADX_OUTPUT")]
    output: PathBuf,

    /// Configuration file (default: <config_dir>/leadx/config.toml)
    #[arg(short, long, env = "LEADX_CONFIG")]
    config: Option<PathBuf>,

    /// Audit log file, truncated at start
    #[arg(long, env = "LEADX_AUDIT_LOG")]
    audit_log: Option<PathBuf>,

    /// Number of leading records that get an audit entry
    #[arg(long, env = "LEADX_VERBOSE_RECORDS")]
    verbose_records: Option<usize>,

    /// Records resolved concurrently
    #[arg(long, default_value_t = 1, env = "LEADX_CONCURRENCY")]
    concurrency: usize,

    /// Resolution policy
    #[arg(long, value_enum, default_value_t = EnrichMode::Full)]
    mode: EnrichMode,

    /// Add a `tags` column (High Value / Cold Lead)
    #[arg(long)]
    tag_leads: bool,

    /// Local model name (overrides config)
    #[arg(long, env = "LEADX_LOCAL_MODEL")]
    model: Option<String>,

    /// Save the effective configuration (file plus overrides) to this path and exit
    #[arg(long, value_name = "PATH")]
    write_config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        load_config(args.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging)?;

    info!("Starting leadx-enrich v{}", env!("CARGO_PKG_VERSION"));

    if let Some(model) = &args.model {
        config.local_model.model = model.clone();
    }
    if let Some(path) = &args.audit_log {
        config.audit_log = Some(path.clone());
    }
    if let Some(count) = args.verbose_records {
        config.verbose_records = Some(count);
    }

    if let Some(target) = &args.write_config {
        write_toml_config(&config, target)
            .with_context(|| format!("Failed to write config {}", target.display()))?;
        info!(path = %target.display(), "Configuration written");
        println!("Configuration written to {}", target.display());
        return Ok(());
    }

    let keys = ResolvedKeys::resolve(&config);

    let geocoder: Option<Arc<dyn GeocodeProvider>> = match &keys.google_maps {
        Some(key) => Some(Arc::new(
            GoogleGeocodeClient::new(key.as_str()).context("Failed to build geocoding client")?,
        )),
        None => None,
    };

    let local_model = &config.local_model;
    let ollama: Arc<dyn CompletionProvider> = Arc::new(OllamaCli::from_config(local_model));
    info!(
        program = %local_model.program,
        model = %local_model.model,
        timeout_secs = local_model.timeout_secs,
        "Local model configured"
    );

    let cloud: Option<Arc<dyn CompletionProvider>> = match (&args.mode, &keys.openai) {
        (EnrichMode::ZipOnly, Some(key)) => {
            let mut client =
                OpenAIClient::new(key.as_str()).context("Failed to build OpenAI client")?;
            if let Some(model) = &config.openai_model {
                client = client.with_model(model.as_str());
            }
            Some(Arc::new(client))
        }
        (EnrichMode::ZipOnly, None) => {
            warn!("Zip-only mode without an OpenAI key; only the geocoder will be consulted");
            None
        }
        (EnrichMode::Full, _) => None,
    };

    let resolver = Resolver::new(geocoder.clone(), Some(ollama));
    let zip_only = ZipOnlyResolver::new(geocoder, cloud);

    let audit_path = config
        .audit_log
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_AUDIT_LOG));
    let audit = AuditLog::create(&audit_path)
        .await
        .with_context(|| format!("Failed to create audit log {}", audit_path.display()))?;

    let verbose_records = config.verbose_records();

    let options = BatchOptions {
        concurrency: args.concurrency.max(1),
        verbose: VerboseSample::first(verbose_records),
        mode: args.mode,
        tag_leads: args.tag_leads,
    };

    let driver = BatchDriver::new(resolver, zip_only, options, Some(audit));
    let (table, summary) = driver
        .run(&args.input, &args.output)
        .await
        .with_context(|| format!("Enrichment of {} failed", args.input.display()))?;

    println!("{}", summary);
    print_sample(&table, SAMPLE_ROWS);
    println!("Enriched data saved to {}", args.output.display());

    Ok(())
}

fn print_sample(table: &Table, rows: usize) {
    let headers = table.output_headers();
    println!("{}", headers.join(" | "));
    for record in table.records.iter().take(rows) {
        let cells: Vec<&str> = headers
            .iter()
            .map(|h| record.get(h).unwrap_or(""))
            .collect();
        println!("{}", cells.join(" | "));
    }
}
