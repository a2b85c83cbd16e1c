//! Executor configuration.
//!
//! All thresholds that govern sampling and binning are carried in an explicit
//! [`ExecutorConfig`] value threaded through every entry point; there is no
//! ambient or global state.

use serde::{Deserialize, Serialize};

/// Tuning knobs for the query executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum number of rows fetched for a scatter plot; above this the
    /// fetch becomes a uniform random sample of exactly this many rows.
    pub sampling_cap: usize,

    /// Fraction of the unfiltered table fetched for mark-less (lazy preview)
    /// specs.
    pub sampling_start_fraction: f64,

    /// Filtered row count at or above which an uncolored scatter is
    /// escalated to a binned heatmap.
    pub scatter_row_threshold: usize,

    /// Number of bins per axis for 2-D (heatmap) binning.
    pub heatmap_bin_count: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            sampling_cap: 10_000,
            sampling_start_fraction: 0.2,
            scatter_row_threshold: 5_000,
            heatmap_bin_count: 40,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExecutorConfig::default();
        assert_eq!(config.sampling_cap, 10_000);
        assert_eq!(config.scatter_row_threshold, 5_000);
        assert_eq!(config.heatmap_bin_count, 40);
        assert!((config.sampling_start_fraction - 0.2).abs() < f64::EPSILON);
    }
}
