use statrs::function::beta::inv_beta_reg;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IntervalError {
    #[error("successes ({successes}) exceed trials ({trials})")]
    SuccessesExceedTrials { successes: u64, trials: u64 },
    #[error("an interval needs at least one trial")]
    NoTrials,
    #[error("confidence must lie strictly between 0 and 1, got {0}")]
    InvalidConfidence(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

/// Quantile of Beta(alpha, beta) at `p`; callers keep both shapes positive and `p` in (0, 1).
fn beta_quantile(alpha: f64, beta: f64, p: f64) -> f64 {
    inv_beta_reg(alpha, beta, p).clamp(0.0, 1.0)
}

/// Exact (Clopper–Pearson) two-sided interval for `successes / trials`.
///
/// The bounds are beta quantiles, so they stay inside [0, 1] for every count;
/// the lower bound is exactly 0 with no successes and the upper bound exactly 1
/// when every trial succeeds.
pub fn clopper_pearson(
    successes: u64,
    trials: u64,
    confidence: f64,
) -> Result<Interval, IntervalError> {
    if trials == 0 {
        return Err(IntervalError::NoTrials);
    }
    if successes > trials {
        return Err(IntervalError::SuccessesExceedTrials { successes, trials });
    }
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(IntervalError::InvalidConfidence(confidence));
    }

    let tail = (1.0 - confidence) / 2.0;
    let x = successes as f64;
    let n = trials as f64;

    let lower = if successes == 0 {
        0.0
    } else {
        beta_quantile(x, n - x + 1.0, tail)
    };
    let upper = if successes == trials {
        1.0
    } else {
        beta_quantile(x + 1.0, n - x, 1.0 - tail)
    };

    Ok(Interval { lower, upper })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::round3;

    fn rounded(successes: u64, trials: u64, confidence: f64) -> (f64, f64) {
        let interval = clopper_pearson(successes, trials, confidence).expect("valid counts");
        (round3(interval.lower), round3(interval.upper))
    }

    #[test]
    fn zero_successes_has_positive_upper_bound() {
        let interval = clopper_pearson(0, 10, 0.95).expect("valid counts");
        assert_eq!(interval.lower, 0.0);
        // 1 - 0.025^(1/10)
        assert!((interval.upper - 0.308_497_107_8).abs() < 1e-8, "{interval:?}");
    }

    #[test]
    fn all_successes_has_lower_bound_below_one() {
        let interval = clopper_pearson(10, 10, 0.95).expect("valid counts");
        assert_eq!(interval.upper, 1.0);
        assert!((interval.lower - 0.691_502_892_2).abs() < 1e-8, "{interval:?}");
    }

    #[test]
    fn matches_reference_bounds_at_three_decimals() {
        // statsmodels proportion_confint(x, n, alpha=0.05, method="beta")
        let cases = [
            (0, 10, (0.0, 0.308)),
            (1, 9, (0.003, 0.482)),
            (1, 2, (0.013, 0.987)),
            (3, 7, (0.099, 0.816)),
            (2, 20, (0.012, 0.317)),
            (5, 10, (0.187, 0.813)),
            (7, 12, (0.277, 0.848)),
            (1, 16, (0.002, 0.302)),
            (4, 5, (0.284, 0.995)),
            (0, 3, (0.0, 0.708)),
            (12, 40, (0.166, 0.465)),
        ];
        for (successes, trials, expected) in cases {
            assert_eq!(
                rounded(successes, trials, 0.95),
                expected,
                "{successes}/{trials}"
            );
        }
    }

    #[test]
    fn unrounded_bounds_are_tight() {
        let interval = clopper_pearson(1, 9, 0.95).expect("valid counts");
        assert!((interval.lower - 0.002_809_136_7).abs() < 1e-8, "{interval:?}");
        assert!((interval.upper - 0.482_496_514_9).abs() < 1e-8, "{interval:?}");
    }

    #[test]
    fn honours_confidence_level() {
        assert_eq!(rounded(3, 10, 0.90), (0.087, 0.607));
    }

    #[test]
    fn single_trial() {
        let hit = clopper_pearson(1, 1, 0.95).expect("valid counts");
        assert!((hit.lower - 0.025).abs() < 1e-8);
        assert_eq!(hit.upper, 1.0);

        let miss = clopper_pearson(0, 1, 0.95).expect("valid counts");
        assert_eq!(miss.lower, 0.0);
        assert!((miss.upper - 0.975).abs() < 1e-8);
    }

    #[test]
    fn rejects_invalid_inputs() {
        assert_eq!(clopper_pearson(0, 0, 0.95), Err(IntervalError::NoTrials));
        assert!(matches!(
            clopper_pearson(4, 3, 0.95),
            Err(IntervalError::SuccessesExceedTrials { .. })
        ));
        assert!(matches!(
            clopper_pearson(1, 3, 1.0),
            Err(IntervalError::InvalidConfidence(_))
        ));
    }
}
