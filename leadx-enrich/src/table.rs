//! Tabular lead file I/O
//!
//! Delimited text with a header row. Unknown columns pass through untouched;
//! columns created during enrichment are appended after the input columns.

use crate::error::{EnrichError, EnrichResult};
use crate::types::Record;
use std::io::{Read, Write};
use std::path::Path;
use tracing::warn;

/// Loaded lead table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    /// Read a CSV table from `path`
    pub fn read_path(path: &Path) -> EnrichResult<Self> {
        let file = std::fs::File::open(path)?;
        Self::read_from(file)
    }

    /// Read a CSV table from any reader
    ///
    /// Short rows get empty cells for missing columns; extra cells are dropped
    /// with a warning. Repeated header names get numeric suffixes.
    pub fn read_from<R: Read>(reader: R) -> EnrichResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let raw_headers: Vec<String> = csv_reader
            .headers()?
            .iter()
            .map(|h| h.to_string())
            .collect();
        if raw_headers.is_empty() || raw_headers.iter().all(|h| h.trim().is_empty()) {
            return Err(EnrichError::InvalidInput(
                "Table has no header row".to_string(),
            ));
        }
        let headers = unique_headers(&raw_headers);

        let mut records = Vec::new();
        for row in csv_reader.records() {
            let row = row?;
            if row.len() > headers.len() {
                warn!(
                    line = row.position().map(|p| p.line()).unwrap_or_default(),
                    columns = headers.len(),
                    cells = row.len(),
                    "Dropping cells beyond the header width"
                );
            }
            let record = Record::from_pairs(
                headers
                    .iter()
                    .enumerate()
                    .map(|(i, h)| (h.clone(), row.get(i).unwrap_or("").to_string())),
            );
            records.push(record);
        }

        Ok(Self { headers, records })
    }

    /// Output columns: input headers, then new columns in first-seen order
    pub fn output_headers(&self) -> Vec<String> {
        let mut headers = self.headers.clone();
        for record in &self.records {
            for key in record.keys() {
                if !headers.iter().any(|h| h == key) {
                    headers.push(key.to_string());
                }
            }
        }
        headers
    }

    /// Write the table as CSV to `path` (no index column)
    pub fn write_path(&self, path: &Path) -> EnrichResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(path)?;
        self.write_to(file)
    }

    pub fn write_to<W: Write>(&self, writer: W) -> EnrichResult<()> {
        let headers = self.output_headers();
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&headers)?;
        for record in &self.records {
            csv_writer.write_record(headers.iter().map(|h| record.get(h).unwrap_or("")))?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

/// Make repeated header names unique: `phone`, `phone.1`, `phone.2`
///
/// Suffixes skip names that already appear elsewhere in the header row.
fn unique_headers(raw: &[String]) -> Vec<String> {
    let mut headers: Vec<String> = Vec::with_capacity(raw.len());
    for name in raw {
        let mut candidate = name.clone();
        let mut suffix = 0;
        while headers.contains(&candidate) || (suffix > 0 && raw.contains(&candidate)) {
            suffix += 1;
            candidate = format!("{}.{}", name, suffix);
        }
        if suffix > 0 {
            warn!(column = %name, renamed = %candidate, "Duplicate column renamed");
        }
        headers.push(candidate);
    }
    headers
}
