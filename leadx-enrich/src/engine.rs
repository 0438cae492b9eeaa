//! Resolution Engine
//!
//! Decides, per record and per missing field, which providers to consult and
//! merges their answers without touching fields that were already valid.
//!
//! # Policy
//! 1. Compute which of postal code / locality / region need resolution
//! 2. Nothing needed → no provider is called, record untouched
//! 3. Geocoder (if configured) once, with every known fragment
//! 4. Anything still missing → fallback model (if configured) once, with a
//!    combined `ZIP, City, State` prompt
//! 5. Attribute the pass: the fallback if it ran and anything was filled,
//!    the geocoder if it filled something and the fallback was not consulted,
//!    else "Not found"
//!
//! Provider failures never escape: each is logged and reduces to
//! "no update from this tier".

use crate::fields::{self, LogicalField};
use crate::prompt::{location_prompt, parse_triple};
use crate::types::{
    AddressQuery, CompletionProvider, GeocodeProvider, LocationFields, Record, ResolutionSource,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Logical fields the engine resolves, in reply order
const RESOLVED_FIELDS: [LogicalField; 3] = [
    LogicalField::PostalCode,
    LogicalField::Locality,
    LogicalField::Region,
];

/// Which resolvable fields a record is missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeededFields {
    pub postal_code: bool,
    pub locality: bool,
    pub region: bool,
}

impl NeededFields {
    pub fn of(record: &Record) -> Self {
        Self {
            postal_code: fields::needs_resolution(record, LogicalField::PostalCode),
            locality: fields::needs_resolution(record, LogicalField::Locality),
            region: fields::needs_resolution(record, LogicalField::Region),
        }
    }

    pub fn any(&self) -> bool {
        self.postal_code || self.locality || self.region
    }

    pub fn contains(&self, field: LogicalField) -> bool {
        match field {
            LogicalField::PostalCode => self.postal_code,
            LogicalField::Locality => self.locality,
            LogicalField::Region => self.region,
            LogicalField::AddressLine => false,
        }
    }

    /// Fields in `self` that are still unresolved in `record`
    fn remaining(&self, record: &Record) -> Self {
        let now = Self::of(record);
        Self {
            postal_code: self.postal_code && now.postal_code,
            locality: self.locality && now.locality,
            region: self.region && now.region,
        }
    }
}

/// Outcome of one provider call within a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutcome {
    /// Provider answered; carries a short rendering of the answer
    Answered(String),
    /// Provider failed; carries the error message
    Failed(String),
}

/// One provider consulted during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderCall {
    pub provider: &'static str,
    pub outcome: CallOutcome,
}

/// Record of one record's resolution pass
///
/// Lives for a single pass; only rendered into the audit log.
#[derive(Debug, Clone)]
pub struct ResolutionAttempt {
    /// Fragments as they were before the pass
    pub original: AddressQuery,
    /// Fields that were missing before the pass
    pub needed: NeededFields,
    /// Providers consulted, in call order
    pub calls: Vec<ProviderCall>,
    /// Fields written during the pass
    pub updated: Vec<LogicalField>,
    /// Fragments after the pass
    pub result: AddressQuery,
    /// Audit label
    pub source: ResolutionSource,
}

impl ResolutionAttempt {
    /// Whether any originally-needed field is still unresolved
    pub fn has_unresolved(&self) -> bool {
        self.needed.postal_code && !fields::is_valid_postal_code(&self.result.postal_code)
            || self.needed.locality && self.result.locality.is_empty()
            || self.needed.region && self.result.region.is_empty()
    }
}

/// Three-tier resolver
///
/// A `None` tier is skipped deterministically (missing credentials or a
/// disabled local model).
#[derive(Clone, Default)]
pub struct Resolver {
    geocoder: Option<Arc<dyn GeocodeProvider>>,
    fallback: Option<Arc<dyn CompletionProvider>>,
}

impl Resolver {
    pub fn new(
        geocoder: Option<Arc<dyn GeocodeProvider>>,
        fallback: Option<Arc<dyn CompletionProvider>>,
    ) -> Self {
        Self { geocoder, fallback }
    }

    /// Resolve one record in place
    ///
    /// Returns `None` when nothing needed resolving; in that case no provider
    /// was called and the record is unchanged.
    pub async fn resolve(&self, record: &mut Record) -> Option<ResolutionAttempt> {
        let needed = NeededFields::of(record);
        if !needed.any() {
            return None;
        }

        let original = fields::address_query(record);
        let mut calls = Vec::new();
        let mut updated = Vec::new();

        // Tier 1: structured geocoding
        let mut geocode_updated = false;
        if let Some(geocoder) = &self.geocoder {
            match geocoder.geocode(&original).await {
                Ok(answer) => {
                    calls.push(ProviderCall {
                        provider: geocoder.name(),
                        outcome: CallOutcome::Answered(render_fields(&answer)),
                    });
                    geocode_updated = apply_fields(record, &needed, &answer, &mut updated);
                }
                Err(e) => {
                    warn!(
                        provider = geocoder.name(),
                        address = %original.to_free_text(),
                        error = %e,
                        "Geocoding failed, continuing with next tier"
                    );
                    calls.push(ProviderCall {
                        provider: geocoder.name(),
                        outcome: CallOutcome::Failed(e.to_string()),
                    });
                }
            }
        }

        // Tier 2: language model fallback for whatever is left
        let mut fallback_updated = false;
        let mut fallback_ran = false;
        let remaining = needed.remaining(record);
        if remaining.any() {
            if let Some(fallback) = &self.fallback {
                fallback_ran = true;
                let prompt = location_prompt(&fields::address_query(record));
                match fallback.complete(&prompt).await {
                    Ok(reply) => {
                        calls.push(ProviderCall {
                            provider: fallback.name(),
                            outcome: CallOutcome::Answered(reply.clone()),
                        });
                        match parse_triple(&reply) {
                            Some(triple) => {
                                let answer = LocationFields {
                                    postal_code: Some(triple.postal_code),
                                    locality: Some(triple.locality),
                                    region: Some(triple.region),
                                };
                                fallback_updated =
                                    apply_fields(record, &remaining, &answer, &mut updated);
                            }
                            None => {
                                debug!(
                                    provider = fallback.name(),
                                    reply = %reply,
                                    "Discarding reply that is not a ZIP, City, State triple"
                                );
                            }
                        }
                    }
                    Err(e) => {
                        warn!(
                            provider = fallback.name(),
                            error = %e,
                            "Language model fallback failed"
                        );
                        calls.push(ProviderCall {
                            provider: fallback.name(),
                            outcome: CallOutcome::Failed(e.to_string()),
                        });
                    }
                }
            }
        }

        // Once the fallback has been consulted the pass is credited to it,
        // including fields the geocoder filled before it.
        let source = match (&self.fallback, &self.geocoder) {
            (Some(fallback), _) if fallback_ran && (geocode_updated || fallback_updated) => {
                fallback.source()
            }
            (_, Some(geocoder)) if !fallback_ran && geocode_updated => geocoder.source(),
            _ => ResolutionSource::NotFound,
        };

        let result = fields::address_query(record);
        debug!(
            before = %original.to_free_text(),
            after = %result.to_free_text(),
            source = %source,
            "Resolution pass complete"
        );

        Some(ResolutionAttempt {
            original,
            needed,
            calls,
            updated,
            result,
            source,
        })
    }
}

/// Write every needed field the answer can fill
///
/// Postal codes must be five digits; locality and region must be non-blank.
/// Returns whether anything was written.
fn apply_fields(
    record: &mut Record,
    needed: &NeededFields,
    answer: &LocationFields,
    updated: &mut Vec<LogicalField>,
) -> bool {
    let mut wrote = false;
    for field in RESOLVED_FIELDS {
        if !needed.contains(field) {
            continue;
        }
        let candidate = match field {
            LogicalField::PostalCode => answer.postal_code.as_deref(),
            LogicalField::Locality => answer.locality.as_deref(),
            LogicalField::Region => answer.region.as_deref(),
            LogicalField::AddressLine => None,
        };
        let Some(value) = candidate.map(str::trim) else {
            continue;
        };
        let accepted = match field {
            LogicalField::PostalCode => fields::is_valid_postal_code(value),
            _ => !value.is_empty(),
        };
        if accepted {
            fields::write(record, field, value);
            if !updated.contains(&field) {
                updated.push(field);
            }
            wrote = true;
        }
    }
    wrote
}

fn render_fields(answer: &LocationFields) -> String {
    format!(
        "{}, {}, {}",
        answer.postal_code.as_deref().unwrap_or(""),
        answer.locality.as_deref().unwrap_or(""),
        answer.region.as_deref().unwrap_or("")
    )
}
