//! Welch's unequal-variance two-sample t-test

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Smallest group size for which the test is run
pub const MIN_GROUP_SIZE: usize = 2;

/// Running count, mean and sum of squared deviations (Welford)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SampleSummary {
    count: usize,
    mean: f64,
    m2: f64,
}

impl SampleSummary {
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut summary = Self::default();
        for v in values {
            summary.push(v);
        }
        summary
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// `None` for an empty sample
    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Sample variance (n - 1 denominator); `None` below two observations
    pub fn variance(&self) -> Option<f64> {
        (self.count >= 2).then(|| self.m2 / (self.count - 1) as f64)
    }
}

/// Outcome of a Welch test of group B against group A
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WelchTest {
    /// Positive when B's mean is above A's
    pub t_statistic: f64,
    /// Welch-Satterthwaite degrees of freedom
    pub degrees_of_freedom: f64,
    /// Two-sided p-value
    pub p_value: f64,
}

/// Run the test; `None` when either group is below [`MIN_GROUP_SIZE`] or
/// both groups are constant with equal means (the statistic is 0/0).
///
/// Two constant groups with different means give an infinite statistic and
/// a p-value of 0.
pub fn welch_t_test(a: &SampleSummary, b: &SampleSummary) -> Option<WelchTest> {
    if a.count < MIN_GROUP_SIZE || b.count < MIN_GROUP_SIZE {
        return None;
    }

    let n_a = a.count as f64;
    let n_b = b.count as f64;
    let se_a = a.variance()? / n_a;
    let se_b = b.variance()? / n_b;
    let se2 = se_a + se_b;
    let diff = b.mean - a.mean;

    if se2 == 0.0 {
        if diff == 0.0 {
            return None;
        }
        return Some(WelchTest {
            t_statistic: f64::INFINITY.copysign(diff),
            degrees_of_freedom: n_a + n_b - 2.0,
            p_value: 0.0,
        });
    }

    let t = diff / se2.sqrt();
    let dof = se2 * se2 / (se_a * se_a / (n_a - 1.0) + se_b * se_b / (n_b - 1.0));
    let dist = StudentsT::new(0.0, 1.0, dof).ok()?;
    let p_value = (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0);

    Some(WelchTest {
        t_statistic: t,
        degrees_of_freedom: dof,
        p_value,
    })
}
