//! Reshaping a results table for reporting.
//!
//! A headerless numeric table is read, each column's sample standard
//! deviation is computed, and output columns are emitted according to a
//! [`ReshapeSchema`]: either a source column's values or its standard
//! deviation repeated on every row.

use crate::config::ReshapeConfig;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::path::Path;
use tracing::info;

/// What an output column carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Value,
    StdDev,
}

/// One output column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputColumn {
    pub name: String,
    /// Zero-based column of the input table
    pub source: usize,
    pub kind: ColumnKind,
}

/// Ordered output columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReshapeSchema {
    pub columns: Vec<OutputColumn>,
}

/// Models of the historical results layout with their deviation column names.
pub const DEFAULT_MODELS: [(&str, &str); 7] = [
    ("NB", "desvioNB"),
    ("CART", "desvioC"),
    ("R.Forest", "desvioRF"),
    ("Bagging", "desvioB"),
    ("KNN", "desvioKNN"),
    ("SVM", "desvioSVM"),
    ("Adaboost", "desvioAda"),
];

impl ReshapeSchema {
    /// One input column per model, emitted as the value followed by two
    /// copies of its standard deviation (`<dev>` and `<dev>.1`).
    pub fn per_model(models: &[(&str, &str)]) -> Self {
        let mut columns = Vec::with_capacity(models.len() * 3);
        for (source, (model, deviation)) in models.iter().enumerate() {
            columns.push(OutputColumn {
                name: model.to_string(),
                source,
                kind: ColumnKind::Value,
            });
            for name in [deviation.to_string(), format!("{deviation}.1")] {
                columns.push(OutputColumn {
                    name,
                    source,
                    kind: ColumnKind::StdDev,
                });
            }
        }
        Self { columns }
    }

    pub fn header(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

impl Default for ReshapeSchema {
    fn default() -> Self {
        Self::per_model(&DEFAULT_MODELS)
    }
}

/// Rectangular table of numbers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericTable {
    pub rows: Vec<Vec<f64>>,
}

impl NumericTable {
    pub fn n_columns(&self) -> usize {
        self.rows.first().map_or(0, |r| r.len())
    }

    /// Sample standard deviation (n - 1) of every column; NaN below two rows.
    pub fn column_std_devs(&self) -> Vec<f64> {
        (0..self.n_columns())
            .map(|c| self.rows.iter().map(|row| row[c]).std_dev())
            .collect()
    }
}

/// Read a headerless, comma-separated numeric table.
pub fn read_numeric_table(path: &Path) -> Result<NumericTable> {
    let file = std::fs::File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut table = NumericTable::default();
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let row = record
            .iter()
            .map(|field| {
                field.parse::<f64>().map_err(|e| {
                    PipelineError::malformed(path, line, format!("'{field}' is not a number: {e}"))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        if let Some(first) = table.rows.first() {
            if first.len() != row.len() {
                return Err(PipelineError::SchemaMismatch(format!(
                    "{}:{line}: expected {} columns, found {}",
                    path.display(),
                    first.len(),
                    row.len()
                )));
            }
        }
        table.rows.push(row);
    }
    Ok(table)
}

/// Output of [`reshape`]: header names and one row per input row.
#[derive(Debug, Clone, PartialEq)]
pub struct ReshapedTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

/// Apply `schema` to `table`.
pub fn reshape(table: &NumericTable, schema: &ReshapeSchema) -> Result<ReshapedTable> {
    let n_columns = table.n_columns();
    if let Some(bad) = schema.columns.iter().find(|c| c.source >= n_columns) {
        return Err(PipelineError::SchemaMismatch(format!(
            "column '{}' reads input column {} but the table has {n_columns}",
            bad.name, bad.source
        )));
    }

    let std_devs = table.column_std_devs();
    let rows = table
        .rows
        .iter()
        .map(|row| {
            schema
                .columns
                .iter()
                .map(|c| match c.kind {
                    ColumnKind::Value => row[c.source],
                    ColumnKind::StdDev => std_devs[c.source],
                })
                .collect()
        })
        .collect();

    Ok(ReshapedTable {
        header: schema.columns.iter().map(|c| c.name.clone()).collect(),
        rows,
    })
}

/// Write a reshaped table with a leading row-index column.
pub fn write_reshaped(path: &Path, table: &ReshapedTable) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
    }

    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(std::iter::once("").chain(table.header.iter().map(String::as_str)))?;
    for (index, row) in table.rows.iter().enumerate() {
        let cells = std::iter::once(index.to_string()).chain(row.iter().map(|v| format_cell(*v)));
        wtr.write_record(cells)?;
    }
    wtr.flush().map_err(|e| PipelineError::io(path, e))?;
    Ok(())
}

fn format_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Read, reshape and write according to `config`. Returns the row count.
pub fn reshape_file(config: &ReshapeConfig) -> Result<usize> {
    let table = read_numeric_table(&config.input)?;
    let reshaped = reshape(&table, &config.schema)?;
    write_reshaped(&config.output, &reshaped)?;
    info!(
        rows = reshaped.rows.len(),
        columns = reshaped.header.len(),
        output = %config.output.display(),
        "Reshaped results table"
    );
    Ok(reshaped.rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> NumericTable {
        NumericTable {
            rows: vec![vec![1.0, 10.0], vec![2.0, 10.0], vec![3.0, 10.0]],
        }
    }

    #[test]
    fn test_default_schema_layout() {
        let schema = ReshapeSchema::default();
        assert_eq!(schema.columns.len(), 21);
        assert_eq!(
            &schema.header()[..6],
            &["NB", "desvioNB", "desvioNB.1", "CART", "desvioC", "desvioC.1"]
        );
        assert_eq!(schema.columns[20].source, 6);
        assert_eq!(schema.columns[20].kind, ColumnKind::StdDev);
    }

    #[test]
    fn test_sample_std_dev() {
        let std = table().column_std_devs();
        assert!((std[0] - 1.0).abs() < 1e-12);
        assert_eq!(std[1], 0.0);
    }

    #[test]
    fn test_single_row_std_is_nan() {
        let t = NumericTable {
            rows: vec![vec![4.0]],
        };
        assert!(t.column_std_devs()[0].is_nan());
    }

    #[test]
    fn test_reshape_broadcasts_std() {
        let schema = ReshapeSchema::per_model(&[("A", "dA"), ("B", "dB")]);
        let out = reshape(&table(), &schema).unwrap();
        assert_eq!(out.header, vec!["A", "dA", "dA.1", "B", "dB", "dB.1"]);
        assert_eq!(out.rows.len(), 3);
        assert_eq!(out.rows[2], vec![3.0, 1.0, 1.0, 10.0, 0.0, 0.0]);
    }

    #[test]
    fn test_schema_wider_than_table() {
        let err = reshape(&table(), &ReshapeSchema::default()).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch(_)));
    }

    #[test]
    fn test_reshape_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("results.txt");
        std::fs::write(&input, "1,10\n2,10\n3,10\n").unwrap();

        let config = ReshapeConfig {
            input,
            output: dir.path().join("report.csv"),
            schema: ReshapeSchema::per_model(&[("A", "dA"), ("B", "dB")]),
        };
        assert_eq!(reshape_file(&config).unwrap(), 3);

        let written = std::fs::read_to_string(&config.output).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines[0], ",A,dA,dA.1,B,dB,dB.1");
        assert_eq!(lines[1], "0,1,1,1,10,0,0");
        assert_eq!(lines[3], "2,3,1,1,10,0,0");
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("results.txt");
        std::fs::write(&input, "1,2\n3\n").unwrap();
        assert!(matches!(
            read_numeric_table(&input),
            Err(PipelineError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_non_numeric_cell() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("results.txt");
        std::fs::write(&input, "1,x\n").unwrap();
        assert!(matches!(
            read_numeric_table(&input),
            Err(PipelineError::MalformedRecord { line: 1, .. })
        ));
    }
}
