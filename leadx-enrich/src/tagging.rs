//! Lead tagging from passthrough columns

use crate::types::Record;

/// Column that receives the tags
pub const TAGS_COLUMN: &str = "tags";

pub const TAG_HIGH_VALUE: &str = "High Value";
pub const TAG_COLD_LEAD: &str = "Cold Lead";

fn is_blank(record: &Record, column: &str) -> bool {
    record.get(column).map_or(true, |v| v.trim().is_empty())
}

/// Tags for a record
///
/// - `High Value` when a company is present
/// - `Cold Lead` when there is neither a cleaned email nor a cleaned phone
pub fn tags_for(record: &Record) -> Vec<&'static str> {
    let mut tags = Vec::new();
    if !is_blank(record, "company") {
        tags.push(TAG_HIGH_VALUE);
    }
    if is_blank(record, "email_clean") && is_blank(record, "phone_clean") {
        tags.push(TAG_COLD_LEAD);
    }
    tags
}

/// Write `;`-joined tags into the `tags` column (always set, possibly empty)
pub fn tag_record(record: &mut Record) {
    let tags = tags_for(record).join(";");
    record.insert(TAGS_COLUMN, tags);
}
