//! Summary statistics over per-fold score arrays.
use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;

/// Mean of the non-NaN entries; NaN when there are none.
pub fn nanmean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Population standard deviation (ddof = 0) of the fold scores.
pub fn population_std_dev(values: &[f64]) -> f64 {
    values.iter().population_std_dev()
}

/// Standard error of the mean (sample standard deviation over sqrt(n)).
pub fn standard_error(values: &[f64]) -> f64 {
    values.iter().std_dev() / (values.len() as f64).sqrt()
}

/// Half-width of the `confidence` interval around the mean of `values`,
/// returned together with the standard error.
///
/// The t quantile uses `n` degrees of freedom.
pub fn confidence_bound(values: &[f64], confidence: f64) -> (f64, f64) {
    let std_err = standard_error(values);
    if values.is_empty() || !std_err.is_finite() {
        return (f64::NAN, std_err);
    }
    let quantile = match StudentsT::new(0.0, 1.0, values.len() as f64) {
        Ok(t) => t.inverse_cdf((1.0 + confidence) / 2.0),
        Err(_) => f64::NAN,
    };
    (std_err * quantile, std_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nanmean_skips_nan() {
        assert!((nanmean(&[1.0, f64::NAN, 3.0]) - 2.0).abs() < 1e-12);
        assert!(nanmean(&[f64::NAN]).is_nan());
        assert!(nanmean(&[]).is_nan());
    }

    #[test]
    fn test_std_and_sem() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std_dev(&v) - 2.0).abs() < 1e-12);
        let sample_std = (32.0f64 / 7.0).sqrt();
        assert!((standard_error(&v) - sample_std / 8f64.sqrt()).abs() < 1e-12);
        assert!(standard_error(&[0.5]).is_nan());
        assert_eq!(population_std_dev(&[0.5]), 0.0);
    }

    #[test]
    fn test_confidence_bound() {
        let v = [0.8, 0.82, 0.78, 0.81, 0.79];
        let (bound, sem) = confidence_bound(&v, 0.95);
        // t(0.975, df=5) ~= 2.5706
        assert!((bound / sem - 2.5706).abs() < 1e-3);
        let (bound, _) = confidence_bound(&[0.5], 0.95);
        assert!(bound.is_nan());
    }
}
