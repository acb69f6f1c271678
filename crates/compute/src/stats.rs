//! Batch-level statistics shared by the preprocessor, detectors and the
//! threshold estimator.

use fraudlens_core::FeatureMatrix;

/// Compute per-column mean and standard deviation.
///
/// Returns (means, stddevs). A zero-variance column gets a stddev of 1.0 so
/// that standardizing it yields zeros instead of dividing by zero.
pub fn column_stats(matrix: &FeatureMatrix) -> (Vec<f64>, Vec<f64>) {
    let dim = matrix.cols();
    if matrix.is_empty() {
        return (vec![0.0; dim], vec![1.0; dim]);
    }

    let n = matrix.rows() as f64;

    let mut means = vec![0.0; dim];
    for row in matrix.iter_rows() {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v;
        }
    }
    for m in &mut means {
        *m /= n;
    }

    let mut variance = vec![0.0; dim];
    for row in matrix.iter_rows() {
        for i in 0..dim {
            let diff = row[i] - means[i];
            variance[i] += diff * diff;
        }
    }

    let stddevs = variance
        .iter()
        .map(|v| {
            let sd = (v / n).sqrt();
            if sd > f64::EPSILON { sd } else { 1.0 }
        })
        .collect();

    (means, stddevs)
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance (divides by N).
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Rescale into [0, 1]. A flat vector maps to all zeros.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    if values.is_empty() || !range.is_finite() || range <= f64::EPSILON {
        return vec![0.0; values.len()];
    }

    values
        .iter()
        .map(|v| ((v - min) / range).clamp(0.0, 1.0))
        .collect()
}

/// `p`-th percentile (0..=100) with linear interpolation between closest ranks.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;

    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

pub fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_stats_basic() {
        let m = FeatureMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let (means, stddevs) = column_stats(&m);
        assert!((means[0] - 2.0).abs() < 1e-10);
        assert!((means[1] - 3.0).abs() < 1e-10);
        assert!((stddevs[0] - 1.0).abs() < 1e-10);
    }

    #[test]
    fn constant_column_gets_unit_std() {
        let m = FeatureMatrix::from_rows(vec![vec![5.0, 1.0], vec![5.0, 3.0]]).unwrap();
        let (_, stddevs) = column_stats(&m);
        assert_eq!(stddevs[0], 1.0);
    }

    #[test]
    fn normalize_spans_unit_interval() {
        let n = min_max_normalize(&[2.0, 4.0, 6.0]);
        assert_eq!(n, vec![0.0, 0.5, 1.0]);
    }

    #[test]
    fn normalize_flat_is_zero() {
        assert_eq!(min_max_normalize(&[3.0, 3.0, 3.0]), vec![0.0; 3]);
        assert!(min_max_normalize(&[]).is_empty());
    }

    #[test]
    fn percentile_interpolates() {
        let v: Vec<f64> = (1..=5).map(f64::from).collect();
        assert_eq!(percentile(&v, 0.0), 1.0);
        assert_eq!(percentile(&v, 50.0), 3.0);
        assert_eq!(percentile(&v, 100.0), 5.0);
        // rank = 0.9 * 4 = 3.6 -> 4 + 0.6 * (5 - 4)
        assert!((percentile(&v, 90.0) - 4.6).abs() < 1e-12);
    }

    #[test]
    fn variance_is_population_variance() {
        assert!((variance(&[1.0, 3.0]) - 1.0).abs() < 1e-12);
        assert_eq!(variance(&[]), 0.0);
    }
}
