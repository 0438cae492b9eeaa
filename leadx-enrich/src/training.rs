//! Training corpus for local model tuning
//!
//! A JSON list of `{prompt, completion}` pairs. Examples are appended with an
//! exact-equality duplicate check, never edited in place, and the file is
//! rewritten atomically on save.

use crate::error::EnrichResult;
use crate::prompt::location_prompt;
use crate::types::{AddressQuery, CompletionProvider};
use chrono::{DateTime, Utc};
use leadx_common::config::write_atomic;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default corpus file name
pub const DEFAULT_CORPUS_FILE: &str = "ollama_training_data.json";

/// One prompt with its expected completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub prompt: String,
    pub completion: String,
}

impl TrainingExample {
    pub fn new(prompt: impl Into<String>, completion: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            completion: completion.into(),
        }
    }
}

/// JSON-backed list of training examples
#[derive(Debug, Clone)]
pub struct TrainingCorpus {
    path: PathBuf,
    examples: Vec<TrainingExample>,
}

impl TrainingCorpus {
    /// Load the corpus; a missing file is an empty corpus
    pub fn load(path: impl AsRef<Path>) -> EnrichResult<Self> {
        let path = path.as_ref().to_path_buf();
        let examples = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };
        Ok(Self { path, examples })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn examples(&self) -> &[TrainingExample] {
        &self.examples
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Append unless an identical example is already present
    ///
    /// Returns whether the example was added.
    pub fn push(&mut self, example: TrainingExample) -> bool {
        if self.examples.contains(&example) {
            return false;
        }
        self.examples.push(example);
        true
    }

    /// Rewrite the whole file atomically
    pub fn save(&self) -> EnrichResult<()> {
        let json = serde_json::to_string_pretty(&self.examples)?;
        write_atomic(&self.path, json.as_bytes())?;
        info!(
            path = %self.path.display(),
            examples = self.examples.len(),
            "Training data saved"
        );
        Ok(())
    }
}

fn st_louis_query(address_line: &str) -> AddressQuery {
    AddressQuery {
        address_line: address_line.to_string(),
        locality: "St. Louis".to_string(),
        region: "MO".to_string(),
        postal_code: String::new(),
    }
}

/// Hand-written examples the corpus starts from
pub fn seed_examples() -> Vec<TrainingExample> {
    vec![
        TrainingExample::new(
            location_prompt(&AddressQuery {
                address_line: "722 Aramis Drive, Creve Coeur 63141".to_string(),
                locality: "Creve Coeur".to_string(),
                region: String::new(),
                postal_code: "63141".to_string(),
            }),
            "63141, Creve Coeur, MO",
        ),
        TrainingExample::new(
            location_prompt(&AddressQuery {
                address_line: "519 BENTON ST, VALLEY PARK 63088".to_string(),
                locality: "VALLEY PARK".to_string(),
                region: String::new(),
                postal_code: "63088".to_string(),
            }),
            "63088, Valley Park, MO",
        ),
    ]
}

/// Prompts the scheduled harvest asks about when none are given
pub fn default_harvest_prompts() -> Vec<String> {
    vec![
        location_prompt(&st_louis_query("1000 Market St, St. Louis")),
        location_prompt(&st_louis_query("1 Cardinal Way, St. Louis")),
    ]
}

/// Summary of one harvest run
#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub requested: usize,
    pub added: usize,
    pub duplicates: usize,
    pub failed: usize,
    pub finished_at: DateTime<Utc>,
}

/// Ask `provider` for a completion of each prompt and append new examples
///
/// A failed or empty completion is counted and skipped; the corpus is not
/// saved here.
pub async fn harvest(
    corpus: &mut TrainingCorpus,
    provider: &dyn CompletionProvider,
    prompts: &[String],
) -> HarvestReport {
    let mut added = 0;
    let mut duplicates = 0;
    let mut failed = 0;

    for prompt in prompts {
        match provider.complete(prompt).await {
            Ok(completion) if !completion.is_empty() => {
                if corpus.push(TrainingExample::new(prompt.clone(), completion)) {
                    added += 1;
                } else {
                    duplicates += 1;
                }
            }
            Ok(_) => {
                warn!(provider = provider.name(), "Empty completion, skipping prompt");
                failed += 1;
            }
            Err(e) => {
                warn!(provider = provider.name(), error = %e, "Completion failed, skipping prompt");
                failed += 1;
            }
        }
    }

    HarvestReport {
        requested: prompts.len(),
        added,
        duplicates,
        failed,
        finished_at: Utc::now(),
    }
}
