//! Spreadsheet export of merged listings.
//!
//! Records carry heterogeneous attributes (Yelp has a phone, a Bing hit may
//! only have a website), so the CSV header is `name`, `url`, then the sorted
//! union of every attribute key present. Unknown values become empty cells.

use canlist_sources::Record;
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use crate::error::{CanlistError, Result};

/// Output file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values with a header row.
    Csv,
    /// A pretty-printed JSON array of records.
    Json,
}

impl ExportFormat {
    /// Pick a format from the file extension; anything but `.json` is CSV.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Csv,
        }
    }
}

/// Column names for `records`: `name`, `url`, then sorted attribute keys.
pub fn columns(records: &[Record]) -> Vec<String> {
    let attributes: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.attributes.keys().map(String::as_str))
        .collect();
    ["name", "url"]
        .into_iter()
        .chain(attributes)
        .map(str::to_owned)
        .collect()
}

/// Write `records` as CSV to `writer`.
///
/// # Errors
///
/// Returns [`CanlistError::Export`] if a row cannot be written.
pub fn write_csv<W: Write>(records: &[Record], writer: W) -> Result<()> {
    let header = columns(records);
    let mut csv_writer = csv::WriterBuilder::new().from_writer(writer);
    csv_writer.write_record(&header)?;

    for record in records {
        let row = header.iter().enumerate().map(|(i, column)| match i {
            0 => record.name.as_str(),
            1 => record.identity_key.as_str(),
            _ => record.attribute(column).unwrap_or_default(),
        });
        csv_writer.write_record(row)?;
    }

    csv_writer
        .flush()
        .map_err(|e| CanlistError::Export(format!("flush failed: {e}")))
}

/// Write `records` as a JSON array to `writer`.
///
/// # Errors
///
/// Returns [`CanlistError::Export`] if serialization fails.
pub fn write_json<W: Write>(records: &[Record], writer: W) -> Result<()> {
    serde_json::to_writer_pretty(writer, records).map_err(|e| CanlistError::Export(e.to_string()))
}

/// Write `records` to `path`, creating parent directories as needed.
///
/// The format follows the file extension (see [`ExportFormat::from_path`]).
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn export_to_path(records: &[Record], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);

    match ExportFormat::from_path(path) {
        ExportFormat::Csv => write_csv(records, &mut file)?,
        ExportFormat::Json => write_json(records, &mut file)?,
    }
    file.flush()?;

    tracing::info!(count = records.len(), path = %path.display(), "listings exported");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use canlist_sources::types::{ATTR_PHONE, ATTR_SOURCE, ATTR_WEBSITE};

    fn to_csv(records: &[Record]) -> String {
        let mut buf = Vec::new();
        write_csv(records, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn empty_list_writes_only_header() {
        assert_eq!(to_csv(&[]), "name,url\n");
    }

    #[test]
    fn header_is_union_of_attribute_keys() {
        let records = vec![
            Record::new("Yelp Biz", "https://www.yelp.ca/biz/a")
                .with_attribute(ATTR_PHONE, "(416) 555-0100")
                .with_attribute(ATTR_SOURCE, "Yelp"),
            Record::new("Bing Biz", "https://b.ca/").with_attribute(ATTR_WEBSITE, "https://b.ca/"),
        ];
        let csv = to_csv(&records);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("name,url,phone,source,website"));
        assert_eq!(
            lines.next(),
            Some("Yelp Biz,https://www.yelp.ca/biz/a,(416) 555-0100,Yelp,")
        );
        assert_eq!(lines.next(), Some("Bing Biz,https://b.ca/,,,https://b.ca/"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        let records = vec![Record::new("Smith, Jones & Co", "https://sj.ca/")];
        let csv = to_csv(&records);
        assert!(csv.contains("\"Smith, Jones & Co\""));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(ExportFormat::from_path(Path::new("out.csv")), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("out.JSON")), ExportFormat::Json);
        assert_eq!(ExportFormat::from_path(Path::new("out")), ExportFormat::Csv);
    }

    #[test]
    fn export_to_path_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("bakeries.csv");
        let records = vec![Record::new("A", "https://a.ca/")];

        export_to_path(&records, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "name,url\nA,https://a.ca/\n");
    }

    #[test]
    fn export_json_round_trips_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bakeries.json");
        let records = vec![Record::new("A", "https://a.ca/").with_attribute(ATTR_PHONE, "1")];

        export_to_path(&records, &path).unwrap();

        let loaded: Vec<Record> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded, records);
    }
}
