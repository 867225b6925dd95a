//! Core transform of the toolkit.
//!
//! This module contains:
//! - Fixed-size windowing over a category's packet counts
//! - Feature arenas per category and the file-order join

pub mod features;
pub mod windowing;

// Re-export commonly used types
pub use features::{
    aggregate_records, AggregatedRecord, CategoryFeatures, FeatureSet, FeatureTuple,
    FEATURE_HEADER,
};
pub use windowing::{broadcast_windows, WindowStat, DEFAULT_WINDOW_SIZE};
