//! Per-category windowed features and their join back onto records.
//!
//! Features for each category are precomputed into an arena, then handed out
//! in file order through an explicit cursor. Running out of tuples, or having
//! tuples left over, is reported as an error instead of being silently
//! tolerated.

use crate::core::windowing::{broadcast_windows, WindowStat};
use crate::dataset::{Category, LabeledRecord};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Header of the aggregated feature table.
pub const FEATURE_HEADER: [&str; 7] = [
    "bytes_out",
    "packets",
    "type",
    "average",
    "min",
    "max",
    "vari",
];

/// Windowed statistics attached to one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureTuple {
    pub average: u64,
    pub min: u64,
    pub max: u64,
    pub vari: u64,
}

/// A labeled record with its feature tuple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedRecord {
    pub record: LabeledRecord,
    pub features: FeatureTuple,
}

impl AggregatedRecord {
    /// Row in [`FEATURE_HEADER`] order.
    pub fn to_row(&self) -> [String; 7] {
        [
            self.record.flow.bytes_out.to_string(),
            self.record.flow.packets.to_string(),
            self.record.category.to_string(),
            self.features.average.to_string(),
            self.features.min.to_string(),
            self.features.max.to_string(),
            self.features.vari.to_string(),
        ]
    }
}

/// Precomputed feature tuples for one category, consumed through a cursor.
#[derive(Debug, Clone, Default)]
pub struct CategoryFeatures {
    tuples: Vec<FeatureTuple>,
    cursor: usize,
}

impl CategoryFeatures {
    /// Compute tuples for a category's packet counts (in encounter order).
    pub fn compute(packets: &[u64], window_size: usize) -> Result<Self> {
        let average = broadcast_windows(packets, window_size, WindowStat::Average)?;
        let min = broadcast_windows(packets, window_size, WindowStat::Min)?;
        let max = broadcast_windows(packets, window_size, WindowStat::Max)?;
        let vari = broadcast_windows(packets, window_size, WindowStat::Variance)?;

        let tuples = (0..packets.len())
            .map(|i| FeatureTuple {
                average: average[i],
                min: min[i],
                max: max[i],
                vari: vari[i],
            })
            .collect();

        Ok(Self { tuples, cursor: 0 })
    }

    /// Take the next tuple, or `None` once all have been handed out.
    pub fn next_tuple(&mut self) -> Option<FeatureTuple> {
        let tuple = self.tuples.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(tuple)
    }

    /// Tuples not yet consumed.
    pub fn remaining(&self) -> usize {
        self.tuples.len() - self.cursor
    }
}

/// Feature arenas for every category present in a record set.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    categories: BTreeMap<Category, CategoryFeatures>,
}

impl FeatureSet {
    /// Group packet counts by category (keeping file order within each
    /// category) and compute their windowed features.
    pub fn compute(records: &[LabeledRecord], window_size: usize) -> Result<Self> {
        let mut packets: BTreeMap<Category, Vec<u64>> = BTreeMap::new();
        for record in records {
            packets
                .entry(record.category)
                .or_default()
                .push(record.flow.packets);
        }

        let mut categories = BTreeMap::new();
        for (category, values) in packets {
            debug!(%category, rows = values.len(), "Computing windowed features");
            categories.insert(category, CategoryFeatures::compute(&values, window_size)?);
        }
        Ok(Self { categories })
    }

    /// Join tuples onto records in file order.
    ///
    /// Every record takes exactly one tuple from its category. Fails with
    /// [`PipelineError::CategoryQueueExhausted`] when a category runs dry and
    /// with [`PipelineError::UnconsumedFeatures`] when tuples remain.
    pub fn join(mut self, records: &[LabeledRecord]) -> Result<Vec<AggregatedRecord>> {
        let mut out = Vec::with_capacity(records.len());

        for (i, record) in records.iter().enumerate() {
            let exhausted = || PipelineError::CategoryQueueExhausted {
                category: record.category,
                row: if record.line > 0 { record.line } else { i as u64 + 1 },
            };
            let features = self
                .categories
                .get_mut(&record.category)
                .ok_or_else(exhausted)?
                .next_tuple()
                .ok_or_else(exhausted)?;

            out.push(AggregatedRecord {
                record: record.clone(),
                features,
            });
        }

        for (category, features) in &self.categories {
            if features.remaining() > 0 {
                return Err(PipelineError::UnconsumedFeatures {
                    category: *category,
                    remaining: features.remaining(),
                });
            }
        }

        Ok(out)
    }
}

/// Compute windowed features for `records` and join them back in file order.
pub fn aggregate_records(
    records: &[LabeledRecord],
    window_size: usize,
) -> Result<Vec<AggregatedRecord>> {
    FeatureSet::compute(records, window_size)?.join(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(packets: u64, category: Category) -> LabeledRecord {
        LabeledRecord::new(packets * 100, packets, category)
    }

    #[test]
    fn test_interleaved_categories_keep_their_own_order() {
        let records = vec![
            rec(10, Category::Laptop),
            rec(1, Category::Netatmo),
            rec(20, Category::Laptop),
            rec(3, Category::Netatmo),
            rec(30, Category::Laptop),
        ];

        let joined = aggregate_records(&records, 2).unwrap();
        assert_eq!(joined.len(), records.len());

        let averages: Vec<u64> = joined.iter().map(|r| r.features.average).collect();
        // laptop [10,20,30] -> [15,15,15]; netatmo [1,3] -> [2,2]
        assert_eq!(averages, vec![15, 2, 15, 2, 15]);

        let mins: Vec<u64> = joined.iter().map(|r| r.features.min).collect();
        assert_eq!(mins, vec![10, 1, 10, 1, 15]);

        let maxes: Vec<u64> = joined.iter().map(|r| r.features.max).collect();
        assert_eq!(maxes, vec![20, 3, 20, 3, 15]);
    }

    #[test]
    fn test_join_preserves_rows() {
        let records = vec![
            rec(4, Category::AmazonEcho),
            rec(8, Category::BabyMonitor),
            rec(6, Category::AmazonEcho),
        ];
        let joined = aggregate_records(&records, 2).unwrap();
        let back: Vec<LabeledRecord> = joined.into_iter().map(|r| r.record).collect();
        assert_eq!(back, records);
    }

    #[test]
    fn test_empty_records() {
        assert!(aggregate_records(&[], 2).unwrap().is_empty());
    }

    #[test]
    fn test_cursor_exhaustion() {
        let mut features = CategoryFeatures::compute(&[1, 2, 3], 2).unwrap();
        assert_eq!(features.remaining(), 3);
        assert!(features.next_tuple().is_some());
        assert!(features.next_tuple().is_some());
        assert_eq!(features.remaining(), 1);
        assert!(features.next_tuple().is_some());
        assert_eq!(features.next_tuple(), None);
        assert_eq!(features.remaining(), 0);
    }

    #[test]
    fn test_join_underflow_is_an_error() {
        let computed_on = vec![rec(1, Category::Laptop)];
        let set = FeatureSet::compute(&computed_on, 2).unwrap();

        let joined_on = vec![
            rec(1, Category::Laptop),
            rec(2, Category::Laptop).at_line(7),
        ];
        let err = set.join(&joined_on).unwrap_err();
        match err {
            PipelineError::CategoryQueueExhausted { category, row } => {
                assert_eq!(category, Category::Laptop);
                assert_eq!(row, 7);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_join_unknown_category_is_an_error() {
        let set = FeatureSet::compute(&[rec(1, Category::Laptop)], 2).unwrap();
        let err = set
            .join(&[rec(1, Category::Laptop), rec(1, Category::Netatmo)])
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::CategoryQueueExhausted {
                category: Category::Netatmo,
                row: 2
            }
        ));
    }

    #[test]
    fn test_join_leftover_is_an_error() {
        let set = FeatureSet::compute(
            &[rec(1, Category::Netatmo), rec(2, Category::Netatmo)],
            2,
        )
        .unwrap();
        let err = set.join(&[rec(1, Category::Netatmo)]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UnconsumedFeatures {
                category: Category::Netatmo,
                remaining: 1
            }
        ));
    }

    #[test]
    fn test_row_layout_matches_header() {
        let joined = aggregate_records(&[rec(10, Category::Laptop)], 2).unwrap();
        let row = joined[0].to_row();
        assert_eq!(row.len(), FEATURE_HEADER.len());
        assert_eq!(row, ["1000", "10", "laptop", "5", "5", "5", "0"].map(String::from));
    }
}
