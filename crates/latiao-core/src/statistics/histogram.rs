//! Equi-width histograms.

use serde::Serialize;

/// One histogram bucket, `[lower, upper)`; the last bucket is closed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBucket {
    /// Inclusive lower bound.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
    /// Number of values in the bucket.
    pub count: usize,
}

/// Equi-width histogram over finite values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// Buckets in ascending order.
    pub buckets: Vec<HistogramBucket>,
}

impl Histogram {
    /// Builds a histogram of `values` over `[min, max]`.
    ///
    /// A degenerate range collapses into a single bucket.
    #[must_use]
    pub fn equi_width(values: &[f64], min: f64, max: f64, buckets: usize) -> Self {
        let buckets = if max > min { buckets.max(1) } else { 1 };
        let width = (max - min) / buckets as f64;
        let mut out: Vec<HistogramBucket> = (0..buckets)
            .map(|b| HistogramBucket {
                lower: min + width * b as f64,
                upper: if b + 1 == buckets { max } else { min + width * (b + 1) as f64 },
                count: 0,
            })
            .collect();

        for v in values {
            let idx = if width > 0.0 {
                (((v - min) / width) as usize).min(buckets - 1)
            } else {
                0
            };
            out[idx].count += 1;
        }

        Self { buckets: out }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_lands_in_last_bucket() {
        let h = Histogram::equi_width(&[0.0, 5.0, 10.0], 0.0, 10.0, 2);
        assert_eq!(h.buckets[0].count, 1);
        assert_eq!(h.buckets[1].count, 2);
    }

    #[test]
    fn test_degenerate_range() {
        let h = Histogram::equi_width(&[3.0, 3.0], 3.0, 3.0, 8);
        assert_eq!(h.buckets.len(), 1);
        assert_eq!(h.buckets[0].count, 2);
    }
}
