//! Google Geocoding Client (Tier 1)
//!
//! Resolves free-text address fragments to a structured
//! (postal code, locality, region) triple.
//!
//! # API Reference
//! - Endpoint: https://maps.googleapis.com/maps/api/geocode/json
//! - Documentation: https://developers.google.com/maps/documentation/geocoding
//!
//! # Component mapping
//! - `postal_code` → postal code (long name)
//! - `locality` → locality (long name)
//! - `administrative_area_level_1` → region (short name, e.g. "MO")

use crate::types::{AddressQuery, GeocodeProvider, LocationFields, ProviderError, ResolutionSource};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Production API base URL
const GEOCODE_BASE_URL: &str = "https://maps.googleapis.com";

/// Endpoint path below the base URL
const GEOCODE_PATH: &str = "/maps/api/geocode/json";

/// Default timeout for geocoding requests
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Google Geocoding client
pub struct GoogleGeocodeClient {
    http_client: Client,
    api_key: String,
    base_url: String,
}

impl GoogleGeocodeClient {
    /// Create new client against the production endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        let http_client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: GEOCODE_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different host (mock servers, proxies)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn lookup(&self, address: &str) -> Result<LocationFields, ProviderError> {
        debug!(address = %address, "Querying geocoding API");

        let url = format!("{}{}", self.base_url, GEOCODE_PATH);
        let response = self
            .http_client
            .get(&url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::Network(format!("Geocoding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!(
                "Geocoding API returned error {}: {}",
                status, body
            )));
        }

        let geocode: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(format!("Failed to parse geocoding response: {}", e)))?;

        if geocode.status != "OK" {
            return Err(ProviderError::Status(match geocode.error_message {
                Some(msg) => format!("{} ({})", geocode.status, msg),
                None => geocode.status,
            }));
        }

        let Some(first) = geocode.results.into_iter().next() else {
            return Err(ProviderError::NotAvailable(
                "Geocoding response has no results".to_string(),
            ));
        };

        Ok(extract_components(&first.address_components))
    }
}

/// Pick postal code, locality and region out of address components
///
/// Later components with the same type win, matching how the API lists
/// broader areas after narrower ones.
fn extract_components(components: &[AddressComponent]) -> LocationFields {
    let mut fields = LocationFields::default();
    for comp in components {
        if comp.has_type("postal_code") {
            fields.postal_code = non_blank(&comp.long_name);
        }
        if comp.has_type("locality") {
            fields.locality = non_blank(&comp.long_name);
        }
        if comp.has_type("administrative_area_level_1") {
            fields.region = non_blank(&comp.short_name);
        }
    }
    fields
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[async_trait]
impl GeocodeProvider for GoogleGeocodeClient {
    fn name(&self) -> &'static str {
        "GoogleGeocode"
    }

    fn source(&self) -> ResolutionSource {
        ResolutionSource::GoogleMaps
    }

    async fn geocode(&self, query: &AddressQuery) -> Result<LocationFields, ProviderError> {
        let address = query.to_free_text();
        if address.is_empty() {
            return Err(ProviderError::NotAvailable(
                "No address fragments to geocode".to_string(),
            ));
        }
        self.lookup(&address).await
    }
}

// ============================================================================
// Geocoding API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    address_components: Vec<AddressComponent>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    long_name: String,
    short_name: String,
    #[serde(default)]
    types: Vec<String>,
}

impl AddressComponent {
    fn has_type(&self, ty: &str) -> bool {
        self.types.iter().any(|t| t == ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(long: &str, short: &str, types: &[&str]) -> AddressComponent {
        AddressComponent {
            long_name: long.to_string(),
            short_name: short.to_string(),
            types: types.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_extract_components() {
        let components = vec![
            component("1000", "1000", &["street_number"]),
            component("Market Street", "Market St", &["route"]),
            component("St. Louis", "St. Louis", &["locality", "political"]),
            component("Missouri", "MO", &["administrative_area_level_1", "political"]),
            component("63101", "63101", &["postal_code"]),
        ];

        let fields = extract_components(&components);

        assert_eq!(fields.postal_code.as_deref(), Some("63101"));
        assert_eq!(fields.locality.as_deref(), Some("St. Louis"));
        assert_eq!(fields.region.as_deref(), Some("MO"));
    }

    #[test]
    fn test_extract_components_partial() {
        let components = vec![component("Missouri", "MO", &["administrative_area_level_1"])];

        let fields = extract_components(&components);

        assert_eq!(fields.postal_code, None);
        assert_eq!(fields.locality, None);
        assert_eq!(fields.region.as_deref(), Some("MO"));
    }

    #[test]
    fn test_client_metadata() {
        let client = GoogleGeocodeClient::new("key").unwrap();
        assert_eq!(client.name(), "GoogleGeocode");
        assert_eq!(client.source(), ResolutionSource::GoogleMaps);
    }
}
