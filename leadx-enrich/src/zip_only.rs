//! Two-tier postal-code resolver
//!
//! Older, narrower entry point kept for callers that only want postal codes:
//! geocoder first, then the hosted model. It never fills locality or region
//! and is only used when selected explicitly; its policy is separate from
//! the three-tier `Resolver`.

use crate::engine::{CallOutcome, NeededFields, ProviderCall, ResolutionAttempt};
use crate::fields::{self, LogicalField};
use crate::prompt::{first_postal_code, postal_code_prompt};
use crate::types::{CompletionProvider, GeocodeProvider, Record, ResolutionSource};
use std::sync::Arc;
use tracing::warn;

/// Geocoder → hosted model resolver for postal codes only
#[derive(Clone, Default)]
pub struct ZipOnlyResolver {
    geocoder: Option<Arc<dyn GeocodeProvider>>,
    cloud: Option<Arc<dyn CompletionProvider>>,
}

impl ZipOnlyResolver {
    pub fn new(
        geocoder: Option<Arc<dyn GeocodeProvider>>,
        cloud: Option<Arc<dyn CompletionProvider>>,
    ) -> Self {
        Self { geocoder, cloud }
    }

    /// Resolve the postal code of one record in place
    ///
    /// Skips records whose postal code is valid, and records with no address,
    /// locality or region to go on.
    pub async fn resolve(&self, record: &mut Record) -> Option<ResolutionAttempt> {
        if !fields::needs_resolution(record, LogicalField::PostalCode) {
            return None;
        }
        let original = fields::address_query(record);
        if original.address_line.is_empty()
            && original.locality.is_empty()
            && original.region.is_empty()
        {
            return None;
        }

        let needed = NeededFields {
            postal_code: true,
            locality: false,
            region: false,
        };
        let mut calls = Vec::new();
        let mut updated = Vec::new();
        let mut source = None;

        if let Some(geocoder) = &self.geocoder {
            match geocoder.geocode(&original).await {
                Ok(answer) => {
                    let zip = answer.postal_code.unwrap_or_default();
                    calls.push(ProviderCall {
                        provider: geocoder.name(),
                        outcome: CallOutcome::Answered(zip.clone()),
                    });
                    if fields::is_valid_postal_code(&zip) {
                        fields::write(record, LogicalField::PostalCode, &zip);
                        updated.push(LogicalField::PostalCode);
                        source = Some(geocoder.source());
                    }
                }
                Err(e) => {
                    warn!(provider = geocoder.name(), error = %e, "Geocoding failed");
                    calls.push(ProviderCall {
                        provider: geocoder.name(),
                        outcome: CallOutcome::Failed(e.to_string()),
                    });
                }
            }
        }

        if source.is_none() {
            if let Some(cloud) = &self.cloud {
                match cloud.complete(&postal_code_prompt(&original)).await {
                    Ok(reply) => {
                        calls.push(ProviderCall {
                            provider: cloud.name(),
                            outcome: CallOutcome::Answered(reply.clone()),
                        });
                        if let Some(zip) = first_postal_code(&reply) {
                            fields::write(record, LogicalField::PostalCode, &zip);
                            updated.push(LogicalField::PostalCode);
                            source = Some(cloud.source());
                        }
                    }
                    Err(e) => {
                        warn!(provider = cloud.name(), error = %e, "Postal code lookup failed");
                        calls.push(ProviderCall {
                            provider: cloud.name(),
                            outcome: CallOutcome::Failed(e.to_string()),
                        });
                        source = Some(ResolutionSource::Error(e.to_string()));
                    }
                }
            }
        }

        Some(ResolutionAttempt {
            original,
            needed,
            calls,
            updated,
            result: fields::address_query(record),
            source: source.unwrap_or(ResolutionSource::NotFound),
        })
    }
}
