//! Loading labeled flow rows from headerless CSV.

use crate::dataset::types::{Category, LabeledRecord};
use crate::error::{PipelineError, Result};
use csv::{ReaderBuilder, StringRecord};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Number of fields in a labeled row: `bytes_out,packets,category`.
pub const LABELED_FIELDS: usize = 3;

/// Read every labeled record of a merged file, in file order.
pub fn read_labeled_file(path: &Path) -> Result<Vec<LabeledRecord>> {
    let file = std::fs::File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let records = parse_labeled_records(file, path)?;
    debug!(path = %path.display(), rows = records.len(), "Loaded labeled records");
    Ok(records)
}

/// Parse labeled rows from any reader. `origin` is only used in error messages.
pub fn parse_labeled_records<R: Read>(reader: R, origin: &Path) -> Result<Vec<LabeledRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(b',')
        .from_reader(reader);

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        records.push(parse_row(&row, line, origin)?);
    }
    Ok(records)
}

fn parse_row(row: &StringRecord, line: u64, origin: &Path) -> Result<LabeledRecord> {
    if row.len() != LABELED_FIELDS {
        return Err(PipelineError::SchemaMismatch(format!(
            "{}:{line}: expected {LABELED_FIELDS} fields (bytes_out,packets,type), found {}",
            origin.display(),
            row.len()
        )));
    }

    let bytes_out = parse_count(&row[0], "bytes_out", line, origin)?;
    let packets = parse_count(&row[1], "packets", line, origin)?;
    let category: Category = row[2]
        .parse()
        .map_err(|e| PipelineError::malformed(origin, line, format!("{e}")))?;

    Ok(LabeledRecord::new(bytes_out, packets, category).at_line(line))
}

fn parse_count(field: &str, name: &str, line: u64, origin: &Path) -> Result<u64> {
    field.trim().parse::<u64>().map_err(|e| {
        PipelineError::malformed(origin, line, format!("{name} '{field}' is not a count: {e}"))
    })
}
