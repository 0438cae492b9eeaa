//! Field Accessor
//!
//! Resolves logical fields against the column-name aliases different lead
//! sources use. The alias table is static; reads and writes are pure
//! functions over a `Record`.

use crate::types::{AddressQuery, Record};
use once_cell::sync::Lazy;
use regex::Regex;

static POSTAL_CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}$").unwrap());

/// Logical lead field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalField {
    PostalCode,
    Locality,
    Region,
    AddressLine,
}

impl LogicalField {
    /// Recognized aliases in priority order; the first is canonical
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            LogicalField::PostalCode => &["zip", "Zip", "service_address_zip"],
            LogicalField::Locality => &[
                "region",
                "Region",
                "service_address_city",
                "Service Address City",
            ],
            LogicalField::Region => &[
                "state",
                "State",
                "service_address_state",
                "Service Address State",
            ],
            LogicalField::AddressLine => &["service_address", "Service Address"],
        }
    }

    pub fn canonical(self) -> &'static str {
        self.aliases()[0]
    }
}

/// Read a logical field
///
/// Returns the trimmed value of the first alias that is present and
/// non-blank, or an empty string.
pub fn read(record: &Record, field: LogicalField) -> String {
    field
        .aliases()
        .iter()
        .filter_map(|alias| record.get(alias))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_default()
}

/// Write a logical field
///
/// Updates the first alias column that already exists in the record,
/// otherwise creates the canonical column.
pub fn write(record: &mut Record, field: LogicalField, value: &str) {
    let key = field
        .aliases()
        .iter()
        .find(|alias| record.contains_key(alias))
        .copied()
        .unwrap_or_else(|| field.canonical());
    record.insert(key, value);
}

/// Strict 5-digit postal code check
pub fn is_valid_postal_code(value: &str) -> bool {
    POSTAL_CODE_RE.is_match(value)
}

/// Whether a logical field still needs resolution
///
/// Blank fields always do; a postal code also does when it is not exactly
/// five digits.
pub fn needs_resolution(record: &Record, field: LogicalField) -> bool {
    let value = read(record, field);
    match field {
        LogicalField::PostalCode => !is_valid_postal_code(&value),
        _ => value.is_empty(),
    }
}

/// Snapshot of a record's address fragments
pub fn address_query(record: &Record) -> AddressQuery {
    AddressQuery {
        address_line: read(record, LogicalField::AddressLine),
        locality: read(record, LogicalField::Locality),
        region: read(record, LogicalField::Region),
        postal_code: read(record, LogicalField::PostalCode),
    }
}
