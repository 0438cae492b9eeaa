//! leadx-enrich library interface
//!
//! Fills missing postal code, locality and region on lead records from a
//! geocoding API, then a language model, and persists the table sorted by
//! postal code.

pub mod audit;
pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod fields;
pub mod logging;
pub mod prompt;
pub mod providers;
pub mod table;
pub mod tagging;
pub mod training;
pub mod types;
pub mod zip_only;

pub use crate::batch::{BatchDriver, BatchOptions, BatchSummary, EnrichMode};
pub use crate::engine::{ResolutionAttempt, Resolver};
pub use crate::error::{EnrichError, EnrichResult};
pub use crate::types::{
    AddressQuery, CompletionProvider, GeocodeProvider, LocationFields, ProviderError, Record,
    ResolutionSource,
};
