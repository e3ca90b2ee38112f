//! Rank-based, equal-population bucketing.
//!
//! Values are ranked ascending with ties broken by input position, then the
//! rank range is split into `buckets` contiguous slices. After tie-breaking
//! every value is distinct, so each bucket holds either `floor(n / k)` or
//! `ceil(n / k)` members and none is ever empty.

use crate::errors::ScoringError;

/// Returns a zero-based bucket index for every input value, in input order.
///
/// Bucket `0` holds the smallest values. Fails when there are fewer values
/// than buckets.
pub fn quantile_buckets<T: Ord>(
    metric: &'static str,
    values: &[T],
    buckets: usize,
) -> Result<Vec<usize>, ScoringError> {
    let population = values.len();
    if buckets == 0 || population < buckets {
        return Err(ScoringError::InsufficientPopulation {
            metric,
            required: buckets,
            available: population,
        });
    }

    let mut order: Vec<usize> = (0..population).collect();
    // sort_by is stable: equal values keep input order.
    order.sort_by(|left, right| values[*left].cmp(&values[*right]));

    let mut assigned = vec![0; population];
    for (rank, position) in order.into_iter().enumerate() {
        assigned[position] = rank * buckets / population;
    }
    Ok(assigned)
}

/// Scores `1..=buckets` where larger values earn larger scores.
pub fn ascending_scores<T: Ord>(
    metric: &'static str,
    values: &[T],
    buckets: usize,
) -> Result<Vec<u8>, ScoringError> {
    Ok(quantile_buckets(metric, values, buckets)?
        .into_iter()
        .map(|bucket| to_score(bucket + 1))
        .collect())
}

/// Scores `1..=buckets` where smaller values earn larger scores.
pub fn descending_scores<T: Ord>(
    metric: &'static str,
    values: &[T],
    buckets: usize,
) -> Result<Vec<u8>, ScoringError> {
    Ok(quantile_buckets(metric, values, buckets)?
        .into_iter()
        .map(|bucket| to_score(buckets - bucket))
        .collect())
}

fn to_score(value: usize) -> u8 {
    u8::try_from(value).unwrap_or(u8::MAX)
}
