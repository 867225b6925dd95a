//! Fixed-size windows over a category's packet counts.
//!
//! Values are grouped into consecutive windows of `size` records (the last
//! window may be shorter). Each window yields a single statistic which is
//! then repeated for every record of that window, so the output always has
//! exactly one value per input value.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Default number of same-category records per window.
pub const DEFAULT_WINDOW_SIZE: usize = 2;

/// Statistic computed over one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStat {
    Average,
    Min,
    Max,
    /// Population variance
    Variance,
}

impl WindowStat {
    pub const ALL: [WindowStat; 4] = [
        WindowStat::Average,
        WindowStat::Min,
        WindowStat::Max,
        WindowStat::Variance,
    ];

    /// Column name in the aggregated feature table.
    pub fn column(&self) -> &'static str {
        match self {
            WindowStat::Average => "average",
            WindowStat::Min => "min",
            WindowStat::Max => "max",
            WindowStat::Variance => "vari",
        }
    }

    /// Compute the statistic for one window of a `size`-wide partition.
    ///
    /// Results are floored to integers and weighted by the window's occupancy
    /// (`window.len() / size`): a full window gives the plain statistic, a
    /// trailing short window is scaled down. The average is therefore always
    /// `sum / size`.
    pub fn compute(&self, window: &[u64], size: usize) -> u64 {
        if window.is_empty() || size == 0 {
            return 0;
        }
        let filled = window.len() as u128;
        let size_u = size as u128;

        match self {
            WindowStat::Average => {
                let sum: u128 = window.iter().map(|&v| v as u128).sum();
                (sum / size_u) as u64
            }
            WindowStat::Min => {
                let min = window.iter().copied().min().unwrap_or(0) as u128;
                (min * filled / size_u) as u64
            }
            WindowStat::Max => {
                let max = window.iter().copied().max().unwrap_or(0) as u128;
                (max * filled / size_u) as u64
            }
            WindowStat::Variance => {
                let variance = window.iter().map(|&v| v as f64).population_variance();
                (variance * window.len() as f64 / size as f64).floor() as u64
            }
        }
    }
}

/// Compute `stat` per window and repeat it for each position in the window.
pub fn broadcast_windows(values: &[u64], size: usize, stat: WindowStat) -> Result<Vec<u64>> {
    if size == 0 {
        return Err(PipelineError::InvalidParameter(
            "window size must be at least 1".to_string(),
        ));
    }

    let mut out = Vec::with_capacity(values.len());
    for window in values.chunks(size) {
        let value = stat.compute(window, size);
        out.extend(std::iter::repeat(value).take(window.len()));
    }
    Ok(out)
}
