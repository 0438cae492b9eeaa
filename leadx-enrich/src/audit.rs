//! Enrichment audit log
//!
//! Plain-text, append-only file truncated at the start of each batch. One
//! block per logged record; concurrent writers are serialized.

use crate::engine::ResolutionAttempt;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Default audit log file name
pub const DEFAULT_AUDIT_LOG: &str = "enrichment_debug.log";

const SEPARATOR_WIDTH: usize = 40;

/// Record indices selected up front for verbose logging
///
/// Replaces a shared "lines logged so far" counter, so workers never need to
/// coordinate on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerboseSample {
    indices: BTreeSet<usize>,
}

impl VerboseSample {
    /// The first `n` records of the batch
    pub fn first(n: usize) -> Self {
        Self {
            indices: (0..n).collect(),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        Self {
            indices: indices.into_iter().collect(),
        }
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Render one audit block
pub fn format_entry(attempt: &ResolutionAttempt) -> String {
    let before = &attempt.original;
    let after = &attempt.result;
    format!(
        "ENRICH: {}, {}, {}, {}\nResult: ZIP={}, City={}, State={} (Source: {})\n{}\n",
        before.address_line,
        before.locality,
        before.region,
        before.postal_code,
        after.postal_code,
        after.locality,
        after.region,
        attempt.source,
        "-".repeat(SEPARATOR_WIDTH)
    )
}

/// Append-only audit log file
pub struct AuditLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl AuditLog {
    /// Create (or truncate) the audit log at `path`
    pub async fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .await?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one block; the whole block is written under the lock
    pub async fn append(&self, entry: &str) -> std::io::Result<()> {
        let mut file = self.file.lock().await;
        file.write_all(entry.as_bytes()).await?;
        file.flush().await
    }

    pub async fn record(&self, attempt: &ResolutionAttempt) -> std::io::Result<()> {
        self.append(&format_entry(attempt)).await
    }
}
