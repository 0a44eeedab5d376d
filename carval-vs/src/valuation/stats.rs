//! Pure aggregation over listing samples
//!
//! Outlier rejection uses the median absolute deviation rather than the
//! standard deviation: one wildly mispriced listing moves a standard
//! deviation enough to mask itself, while the MAD stays put.

/// One listing's contribution to an aggregate
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub price: f64,
    pub mileage: Option<i64>,
}

/// Aggregate statistics over a filtered listing sample
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub mean: f64,
    pub median: f64,
    /// Mean of the top third by price: the retail tier
    pub retail: f64,
    pub sample_size: usize,
    pub avg_mileage: Option<f64>,
}

/// Median of a non-empty, sorted slice
fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Drop samples whose price is farther than `multiplier` MADs from the
/// median. A MAD of zero (at least half the sample at one price) disables
/// the filter for that batch.
pub fn mad_filter(samples: &[Sample], multiplier: f64) -> Vec<Sample> {
    if samples.len() < 3 {
        return samples.to_vec();
    }

    let mut prices: Vec<f64> = samples.iter().map(|s| s.price).collect();
    prices.sort_by(|a, b| a.total_cmp(b));
    let median = median_of_sorted(&prices);

    let mut deviations: Vec<f64> = prices.iter().map(|p| (p - median).abs()).collect();
    deviations.sort_by(|a, b| a.total_cmp(b));
    let mad = median_of_sorted(&deviations);

    if mad == 0.0 {
        return samples.to_vec();
    }

    let threshold = multiplier * mad;
    samples
        .iter()
        .copied()
        .filter(|s| (s.price - median).abs() <= threshold)
        .collect()
}

/// Aggregate a sample set after MAD filtering.
///
/// Returns `None` when nothing survives (or nothing was given): the caller
/// treats that as "no usable sample", not as an error. Pure: the same
/// sample set always produces the same figures.
pub fn aggregate(samples: &[Sample], mad_multiplier: f64) -> Option<Aggregate> {
    let retained = mad_filter(samples, mad_multiplier);
    if retained.is_empty() {
        return None;
    }

    let n = retained.len();
    let mut prices: Vec<f64> = retained.iter().map(|s| s.price).collect();
    prices.sort_by(|a, b| a.total_cmp(b));

    let mean = prices.iter().sum::<f64>() / n as f64;
    let median = median_of_sorted(&prices);

    // Top third by price, at least one listing
    let top_count = (n / 3).max(1);
    let retail = prices.iter().rev().take(top_count).sum::<f64>() / top_count as f64;

    let mileages: Vec<i64> = retained.iter().filter_map(|s| s.mileage).collect();
    let avg_mileage = if mileages.is_empty() {
        None
    } else {
        Some(mileages.iter().sum::<i64>() as f64 / mileages.len() as f64)
    };

    Some(Aggregate {
        mean,
        median,
        retail,
        sample_size: n,
        avg_mileage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(prices: &[f64]) -> Vec<Sample> {
        prices
            .iter()
            .map(|&price| Sample {
                price,
                mileage: None,
            })
            .collect()
    }

    #[test]
    fn outlier_beyond_mad_threshold_is_excluded() {
        let input = samples(&[18_000.0, 19_000.0, 19_500.0, 95_000.0]);
        let agg = aggregate(&input, 3.5).expect("sample survives");

        assert_eq!(agg.sample_size, 3);
        let expected_mean = (18_000.0 + 19_000.0 + 19_500.0) / 3.0;
        assert!((agg.mean - expected_mean).abs() < 0.01);
        assert_eq!(agg.median, 19_000.0);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let input = samples(&[17_500.0, 18_200.0, 19_000.0, 19_800.0, 21_000.0]);
        let first = aggregate(&input, 3.5).unwrap();
        let second = aggregate(&input, 3.5).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn zero_mad_disables_filtering() {
        // More than half the sample at one price pins the MAD to zero;
        // nothing gets dropped, not even the high listing.
        let input = samples(&[20_000.0, 20_000.0, 20_000.0, 50_000.0]);
        let agg = aggregate(&input, 3.5).unwrap();
        assert_eq!(agg.sample_size, 4);
    }

    #[test]
    fn retail_is_mean_of_top_third() {
        let input = samples(&[10_000.0, 12_000.0, 14_000.0, 16_000.0, 18_000.0, 20_000.0]);
        let agg = aggregate(&input, 3.5).unwrap();
        // top 2 of 6: 20000, 18000
        assert_eq!(agg.retail, 19_000.0);
    }

    #[test]
    fn single_listing_aggregates_to_itself() {
        let agg = aggregate(&samples(&[15_000.0]), 3.5).unwrap();
        assert_eq!(agg.sample_size, 1);
        assert_eq!(agg.mean, 15_000.0);
        assert_eq!(agg.median, 15_000.0);
        assert_eq!(agg.retail, 15_000.0);
    }

    #[test]
    fn empty_sample_is_none() {
        assert!(aggregate(&[], 3.5).is_none());
    }

    #[test]
    fn avg_mileage_uses_only_reported_mileages() {
        let input = vec![
            Sample {
                price: 18_000.0,
                mileage: Some(30_000),
            },
            Sample {
                price: 19_000.0,
                mileage: None,
            },
            Sample {
                price: 20_000.0,
                mileage: Some(50_000),
            },
        ];
        let agg = aggregate(&input, 3.5).unwrap();
        assert_eq!(agg.avg_mileage, Some(40_000.0));
    }
}
