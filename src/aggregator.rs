//! File-level feature aggregation: merged labeled CSV in, feature table out.

use crate::config::AggregateConfig;
use crate::core::{aggregate_records, AggregatedRecord, FEATURE_HEADER};
use crate::dataset::read_labeled_file;
use crate::error::{PipelineError, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Summary of one aggregation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateSummary {
    pub rows: usize,
    /// Rows per category token
    pub per_category: BTreeMap<String, usize>,
}

/// Read `config.input`, compute windowed features and write `config.output`.
///
/// The output is only written once every row has been joined.
pub fn aggregate_file(config: &AggregateConfig) -> Result<AggregateSummary> {
    let records = read_labeled_file(&config.input)?;
    if records.is_empty() {
        warn!(path = %config.input.display(), "No labeled rows to aggregate");
    }

    let aggregated = aggregate_records(&records, config.window_size)?;
    write_feature_table(&config.output, &aggregated)?;

    let mut per_category = BTreeMap::new();
    for row in &aggregated {
        *per_category
            .entry(row.record.category.to_string())
            .or_insert(0) += 1;
    }

    info!(
        rows = aggregated.len(),
        categories = per_category.len(),
        window = config.window_size,
        output = %config.output.display(),
        "Aggregated feature table"
    );

    Ok(AggregateSummary {
        rows: aggregated.len(),
        per_category,
    })
}

/// Write the feature table with its fixed header.
pub fn write_feature_table(path: &Path, rows: &[AggregatedRecord]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
    }

    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(FEATURE_HEADER)?;
    for row in rows {
        wtr.write_record(row.to_row())?;
    }
    wtr.flush().map_err(|e| PipelineError::io(path, e))?;
    Ok(())
}
