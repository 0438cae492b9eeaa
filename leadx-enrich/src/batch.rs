//! Batch Driver
//!
//! Loads a lead table, resolves every record, sorts by postal code and
//! writes the result.
//!
//! Records are independent: each is moved into its own future, resolved, and
//! moved back, so no two records ever share mutable state. Concurrency is
//! bounded by `BatchOptions::concurrency` and output order before sorting is
//! input order.

use crate::audit::{format_entry, AuditLog, VerboseSample};
use crate::engine::{ResolutionAttempt, Resolver};
use crate::error::EnrichResult;
use crate::fields::{self, LogicalField};
use crate::table::Table;
use crate::tagging::tag_record;
use crate::types::Record;
use crate::zip_only::ZipOnlyResolver;
use futures::stream::{self, StreamExt};
use leadx_common::config::DEFAULT_VERBOSE_RECORDS;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// Which resolution policy the batch applies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum EnrichMode {
    /// Geocoder, then local model, for postal code, locality and region
    #[default]
    Full,
    /// Geocoder, then hosted model, for postal codes only
    ZipOnly,
}

/// Batch options
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Maximum records resolved at once (1 = sequential)
    pub concurrency: usize,
    /// Records that get an audit entry
    pub verbose: VerboseSample,
    pub mode: EnrichMode,
    /// Write the `tags` column for every record
    pub tag_leads: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            verbose: VerboseSample::first(DEFAULT_VERBOSE_RECORDS),
            mode: EnrichMode::Full,
            tag_leads: false,
        }
    }
}

/// Counts reported after a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    /// Records that needed at least one field
    pub attempted: usize,
    /// Attempts per audit label
    pub by_source: BTreeMap<String, usize>,
    /// Records still without a valid postal code after the batch
    pub unresolved_postal_codes: usize,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Records: {}", self.total)?;
        writeln!(f, "Resolution attempted: {}", self.attempted)?;
        for (source, count) in &self.by_source {
            writeln!(f, "  {}: {}", source, count)?;
        }
        write!(f, "Missing postal codes: {}", self.unresolved_postal_codes)
    }
}

/// Applies a resolver to every record of a table
pub struct BatchDriver {
    resolver: Resolver,
    zip_only: ZipOnlyResolver,
    options: BatchOptions,
    audit: Option<AuditLog>,
}

impl BatchDriver {
    pub fn new(
        resolver: Resolver,
        zip_only: ZipOnlyResolver,
        options: BatchOptions,
        audit: Option<AuditLog>,
    ) -> Self {
        Self {
            resolver,
            zip_only,
            options,
            audit,
        }
    }

    /// Read `input`, enrich, sort, write `output`
    ///
    /// Only I/O on the two tables can fail; provider failures are absorbed
    /// per record.
    pub async fn run(&self, input: &Path, output: &Path) -> EnrichResult<(Table, BatchSummary)> {
        let mut table = Table::read_path(input)?;
        info!(
            input = %input.display(),
            records = table.records.len(),
            mode = ?self.options.mode,
            concurrency = self.options.concurrency.max(1),
            "Loaded lead table"
        );

        let summary = self.enrich_table(&mut table).await;
        sort_by_postal_code(&mut table.records);

        table.write_path(output)?;
        info!(output = %output.display(), "Enriched table written");

        Ok((table, summary))
    }

    /// Resolve every record of `table` in place
    pub async fn enrich_table(&self, table: &mut Table) -> BatchSummary {
        let records = std::mem::take(&mut table.records);
        let total = records.len();

        let results: Vec<(Record, Option<ResolutionAttempt>)> =
            stream::iter(records.into_iter().enumerate())
                .map(|(index, record)| self.process(index, record))
                .buffered(self.options.concurrency.max(1))
                .collect()
                .await;

        let mut summary = BatchSummary {
            total,
            ..BatchSummary::default()
        };
        for (record, attempt) in results {
            if let Some(attempt) = attempt {
                summary.attempted += 1;
                *summary
                    .by_source
                    .entry(attempt.source.to_string())
                    .or_insert(0) += 1;
            }
            if fields::needs_resolution(&record, LogicalField::PostalCode) {
                summary.unresolved_postal_codes += 1;
            }
            table.records.push(record);
        }

        info!(
            total = summary.total,
            attempted = summary.attempted,
            unresolved_postal_codes = summary.unresolved_postal_codes,
            "Enrichment complete"
        );
        summary
    }

    async fn process(
        &self,
        index: usize,
        mut record: Record,
    ) -> (Record, Option<ResolutionAttempt>) {
        let attempt = match self.options.mode {
            EnrichMode::Full => self.resolver.resolve(&mut record).await,
            EnrichMode::ZipOnly => self.zip_only.resolve(&mut record).await,
        };

        if let Some(attempt) = &attempt {
            if self.options.verbose.contains(index) {
                self.log_verbose(index, attempt).await;
            }
        }

        if self.options.tag_leads {
            tag_record(&mut record);
        }

        (record, attempt)
    }

    async fn log_verbose(&self, index: usize, attempt: &ResolutionAttempt) {
        let entry = format_entry(attempt);
        info!(record_index = index, source = %attempt.source, "{}", entry.trim_end());

        if let Some(audit) = &self.audit {
            if let Err(e) = audit.append(&entry).await {
                warn!(path = %audit.path().display(), error = %e, "Audit log write failed");
            }
        }
    }
}

/// Stable sort by logical postal code, blank values last
pub fn sort_by_postal_code(records: &mut [Record]) {
    records.sort_by_cached_key(|record| {
        let postal_code = fields::read(record, LogicalField::PostalCode);
        (postal_code.is_empty(), postal_code)
    });
}
