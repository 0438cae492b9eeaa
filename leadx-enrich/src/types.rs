//! Core Types and Trait Definitions for leadx-enrich
//!
//! Defines the record model and the provider capabilities used by the
//! three-tier resolution policy:
//! - **Tier 1:** `GeocodeProvider` (structured geocoding API)
//! - **Tier 2/3:** `CompletionProvider` (hosted or local language model)
//!
//! Providers report failures as typed `ProviderError`s. Deciding that a
//! failure is non-fatal is the resolver's job, not the provider's.

use std::fmt;
use thiserror::Error;

// ============================================================================
// Record
// ============================================================================

/// One lead row: an ordered mapping from column name to cell value
///
/// Column order is insertion order so a written table keeps the input layout.
/// Empty cells are stored as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    fields: Vec<(String, String)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from `(column, value)` pairs, keeping their order
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut record = Self::new();
        for (k, v) in pairs {
            record.insert(k, v);
        }
        record
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == key)
    }

    /// Set `key` to `value`, appending the column if it does not exist yet
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((key, value)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// ============================================================================
// Provider inputs and outputs
// ============================================================================

/// Best-known address fragments for a record
///
/// Fields are empty strings when unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressQuery {
    pub address_line: String,
    pub locality: String,
    pub region: String,
    /// Possibly partial or invalid postal code
    pub postal_code: String,
}

impl AddressQuery {
    /// Join all non-empty fragments into one free-text query
    ///
    /// Order: address, locality, region, postal code.
    pub fn to_free_text(&self) -> String {
        [
            self.address_line.as_str(),
            self.locality.as_str(),
            self.region.as_str(),
            self.postal_code.as_str(),
        ]
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }

    pub fn is_empty(&self) -> bool {
        self.to_free_text().is_empty()
    }
}

/// Structured location triple returned by a provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationFields {
    pub postal_code: Option<String>,
    pub locality: Option<String>,
    pub region: Option<String>,
}

/// Audit label attached to each resolution pass
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResolutionSource {
    /// Structured geocoding API
    GoogleMaps,
    /// Hosted chat-completion model
    OpenAI,
    /// Locally hosted model
    Ollama,
    /// Every consulted tier came back empty
    NotFound,
    /// A tier failed in a way the caller chose to surface in the audit label
    Error(String),
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionSource::GoogleMaps => write!(f, "Google Maps"),
            ResolutionSource::OpenAI => write!(f, "OpenAI"),
            ResolutionSource::Ollama => write!(f, "Ollama"),
            ResolutionSource::NotFound => write!(f, "Not found"),
            ResolutionSource::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}

// ============================================================================
// Provider traits
// ============================================================================

/// Provider failure
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// External API returned an HTTP error or an error payload
    #[error("API error: {0}")]
    Api(String),

    /// Service answered with a non-OK status field
    #[error("Service status: {0}")]
    Status(String),

    /// Failed to parse response
    #[error("Parse error: {0}")]
    Parse(String),

    /// Service answered but had nothing to offer
    #[error("Not available: {0}")]
    NotAvailable(String),

    /// Local process could not be started
    #[error("Failed to launch {program}: {message}")]
    Spawn { program: String, message: String },

    /// Local process exited unsuccessfully
    #[error("Process exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    /// Local process exceeded its wall-clock budget
    #[error("Timed out after {0} seconds")]
    Timeout(u64),
}

/// Structured geocoding capability
///
/// # Example
/// ```rust,ignore
/// let fields = geocoder.geocode(&query).await?;
/// if let Some(zip) = fields.postal_code { ... }
/// ```
#[async_trait::async_trait]
pub trait GeocodeProvider: Send + Sync {
    /// Provider name for diagnostics
    fn name(&self) -> &'static str;

    /// Audit label when this provider supplies a value
    fn source(&self) -> ResolutionSource;

    /// Resolve free-text address fragments to a location triple
    async fn geocode(&self, query: &AddressQuery) -> Result<LocationFields, ProviderError>;
}

/// Free-text completion capability (hosted or local language model)
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Provider name for diagnostics
    fn name(&self) -> &'static str;

    /// Audit label when this provider supplies a value
    fn source(&self) -> ResolutionSource;

    /// Complete `prompt`, returning the trimmed reply text
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

// ============================================================================
// Tests
// ============================================================================
