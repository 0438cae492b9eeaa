//! Prompt construction and reply parsing for language-model tiers

use crate::types::AddressQuery;
use once_cell::sync::Lazy;
use regex::Regex;

static FIVE_DIGITS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{5}").unwrap());

/// System instruction for enrichment completions
pub const ENRICHMENT_SYSTEM_PROMPT: &str = "You are a helpful assistant for lead enrichment.";

/// System instruction used when harvesting training completions
pub const TRAINING_SYSTEM_PROMPT: &str = "You are a helpful assistant for lead enrichment. \
Respond with only the ZIP, City, State as a comma-separated string.";

/// Prompt asking for the `ZIP, City, State` triple
pub fn location_prompt(query: &AddressQuery) -> String {
    format!(
        "Given the following info, what are the correct ZIP, City, and State?\n\
         Address: {}\nCity: {}\nState: {}\nZIP: {}\n\
         Respond as: ZIP, City, State. If unknown, use blank.",
        query.address_line, query.locality, query.region, query.postal_code
    )
}

/// Prompt asking only for a 5-digit postal code
pub fn postal_code_prompt(query: &AddressQuery) -> String {
    format!(
        "Given the following info, what is the correct 5-digit ZIP code?\n\
         Address: {}\nCity: {}\nState: {}\nRespond with only the ZIP code.",
        query.address_line, query.locality, query.region
    )
}

/// Parsed `ZIP, City, State` reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationTriple {
    pub postal_code: String,
    pub locality: String,
    pub region: String,
}

/// Split a reply into exactly three trimmed comma-separated parts
///
/// Anything else yields `None`; there is no partial credit.
pub fn parse_triple(reply: &str) -> Option<LocationTriple> {
    let parts: Vec<&str> = reply.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [postal_code, locality, region] => Some(LocationTriple {
            postal_code: postal_code.to_string(),
            locality: locality.to_string(),
            region: region.to_string(),
        }),
        _ => None,
    }
}

/// First run of five digits anywhere in a reply
pub fn first_postal_code(reply: &str) -> Option<String> {
    FIVE_DIGITS_RE.find(reply).map(|m| m.as_str().to_string())
}
