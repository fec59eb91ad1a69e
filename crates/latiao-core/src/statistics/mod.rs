//! Summary statistics over produced columns.
//!
//! Hosts run a meta-inference pass over every column an execution produces.
//! The engine only triggers it through [`MetaHook`] and ignores the outcome;
//! [`FieldStatistics`] is the default computation hosts and the CLI use.

mod histogram;

pub use histogram::{Histogram, HistogramBucket};

use latiao_common::types::{Column, ColumnData, FieldId, FieldMode};
use latiao_common::utils::hash::FxHashSet;
use serde::Serialize;

/// Default number of histogram buckets.
pub const DEFAULT_BUCKETS: usize = 10;

/// Called after an execution produced columns.
pub trait MetaHook: Send + Sync {
    /// Receives the exported columns of one execution.
    fn on_columns(&self, columns: &[Column]);
}

/// Statistics of a single field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldStatistics {
    /// Field id.
    pub fid: FieldId,
    /// Field mode.
    pub mode: FieldMode,
    /// Number of rows.
    pub count: usize,
    /// Rows holding a finite number, or a non-empty string for text.
    pub valid: usize,
    /// Distinct valid values.
    pub distinct: usize,
    /// Smallest finite value (numeric modes only).
    pub min: Option<f64>,
    /// Largest finite value (numeric modes only).
    pub max: Option<f64>,
    /// Mean of finite values (numeric modes only).
    pub mean: Option<f64>,
    /// Equi-width histogram of finite values (numeric modes only).
    pub histogram: Option<Histogram>,
}

impl FieldStatistics {
    /// Computes statistics with [`DEFAULT_BUCKETS`] histogram buckets.
    #[must_use]
    pub fn compute(column: &Column) -> Self {
        Self::compute_with_buckets(column, DEFAULT_BUCKETS)
    }

    /// Computes statistics with `buckets` histogram buckets.
    #[must_use]
    pub fn compute_with_buckets(column: &Column, buckets: usize) -> Self {
        let mut stats = Self {
            fid: column.token.fid.clone(),
            mode: column.token.mode,
            count: column.len(),
            valid: 0,
            distinct: 0,
            min: None,
            max: None,
            mean: None,
            histogram: None,
        };

        match &column.data {
            ColumnData::Texts(values) => {
                let valid: Vec<&str> = values.iter().map(String::as_str).filter(|s| !s.is_empty()).collect();
                stats.valid = valid.len();
                stats.distinct = valid.into_iter().collect::<FxHashSet<_>>().len();
            }
            ColumnData::Numbers(values) => {
                let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
                stats.valid = finite.len();
                stats.distinct = finite
                    .iter()
                    .map(|v| if *v == 0.0 { 0_u64 } else { v.to_bits() })
                    .collect::<FxHashSet<_>>()
                    .len();
                if !finite.is_empty() {
                    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
                    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    stats.min = Some(min);
                    stats.max = Some(max);
                    stats.mean = Some(finite.iter().sum::<f64>() / finite.len() as f64);
                    stats.histogram = Some(Histogram::equi_width(&finite, min, max, buckets));
                }
            }
        }

        stats
    }
}

/// Hook that computes [`FieldStatistics`] and logs them at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMetaHook;

impl MetaHook for LoggingMetaHook {
    fn on_columns(&self, columns: &[Column]) {
        for column in columns {
            let stats = FieldStatistics::compute(column);
            tracing::debug!(
                fid = %stats.fid,
                count = stats.count,
                valid = stats.valid,
                distinct = stats.distinct,
                "column statistics"
            );
        }
    }
}
