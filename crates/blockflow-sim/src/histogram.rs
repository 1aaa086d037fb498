// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Empirical throughput histograms.

use blockflow_core::num::throughput::{Throughput, cmp_throughput, throughput_to_f64};
use blockflow_engine::{distribution::Distribution, error::InvalidDistributionError};

/// Observed throughput values and how often each occurred, sorted by value.
///
/// # Examples
///
/// ```rust
/// # use blockflow_sim::histogram::EmpiricalDistribution;
/// let mut histogram = EmpiricalDistribution::new();
/// histogram.record(3u32);
/// histogram.record(0);
/// histogram.record(3);
/// assert_eq!(histogram.trials(), 3);
/// assert_eq!(histogram.count_of(3), 2);
/// assert!((histogram.mean() - 2.0).abs() < 1e-12);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmpiricalDistribution<T> {
    counts: Vec<(T, u64)>,
    trials: u64,
}

impl<T> EmpiricalDistribution<T>
where
    T: Throughput,
{
    #[inline]
    pub fn new() -> Self {
        Self {
            counts: Vec::new(),
            trials: 0,
        }
    }

    /// Total number of recorded observations.
    #[inline]
    pub fn trials(&self) -> u64 {
        self.trials
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trials == 0
    }

    /// Number of distinct observed values.
    #[inline]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[inline]
    pub fn counts(&self) -> &[(T, u64)] {
        &self.counts
    }

    pub fn record(&mut self, value: T) {
        self.record_many(value, 1);
    }

    pub fn record_many(&mut self, value: T, count: u64) {
        if count == 0 {
            return;
        }
        match self
            .counts
            .binary_search_by(|probe| cmp_throughput(&probe.0, &value))
        {
            Ok(i) => self.counts[i].1 += count,
            Err(i) => self.counts.insert(i, (value, count)),
        }
        self.trials += count;
    }

    /// Adds every observation of `other` to `self`.
    pub fn merge(&mut self, other: &Self) {
        for &(value, count) in &other.counts {
            self.record_many(value, count);
        }
    }

    pub fn count_of(&self, value: T) -> u64 {
        self.counts
            .binary_search_by(|probe| cmp_throughput(&probe.0, &value))
            .map_or(0, |i| self.counts[i].1)
    }

    /// Relative frequency of `value`; 0 when nothing was recorded.
    pub fn probability_of(&self, value: T) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        self.count_of(value) as f64 / self.trials as f64
    }

    /// Sample mean; 0 when nothing was recorded.
    pub fn mean(&self) -> f64 {
        if self.trials == 0 {
            return 0.0;
        }
        let sum: f64 = self
            .counts
            .iter()
            .map(|&(value, count)| throughput_to_f64(value) * count as f64)
            .sum();
        sum / self.trials as f64
    }

    /// Unbiased sample variance; 0 with fewer than two observations.
    pub fn variance(&self) -> f64 {
        if self.trials < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let squares: f64 = self
            .counts
            .iter()
            .map(|&(value, count)| {
                let deviation = throughput_to_f64(value) - mean;
                deviation * deviation * count as f64
            })
            .sum();
        squares / (self.trials - 1) as f64
    }

    /// Standard error of the sample mean.
    pub fn standard_error(&self) -> f64 {
        if self.trials < 2 {
            return 0.0;
        }
        (self.variance() / self.trials as f64).sqrt()
    }

    /// Converts relative frequencies into a `Distribution`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDistributionError::Empty` if nothing was recorded.
    pub fn to_distribution(&self) -> Result<Distribution<T>, InvalidDistributionError> {
        let trials = self.trials as f64;
        Distribution::from_outcomes(
            self.counts
                .iter()
                .map(|&(value, count)| (value, count as f64 / trials)),
        )
    }
}

impl<T> std::fmt::Display for EmpiricalDistribution<T>
where
    T: Throughput,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (value, count)) in self.counts.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", value, count)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn histogram(values: &[u32]) -> EmpiricalDistribution<u32> {
        let mut histogram = EmpiricalDistribution::new();
        for &v in values {
            histogram.record(v);
        }
        histogram
    }

    #[test]
    fn test_counts_stay_sorted() {
        let h = histogram(&[5, 0, 3, 5, 0, 5]);
        assert_eq!(h.counts(), &[(0, 2), (3, 1), (5, 3)]);
        assert_eq!(h.len(), 3);
        assert_eq!(h.to_string(), "{0: 2, 3: 1, 5: 3}");
    }

    #[test]
    fn test_statistics() {
        let h = histogram(&[0, 2, 4, 6]);
        assert!((h.mean() - 3.0).abs() < 1e-12);
        // sum of squared deviations is 20 over 3 degrees of freedom
        assert!((h.variance() - 20.0 / 3.0).abs() < 1e-12);
        assert!((h.standard_error() - (20.0 / 12.0f64).sqrt()).abs() < 1e-12);
        assert_eq!(h.probability_of(2), 0.25);
        assert_eq!(h.probability_of(7), 0.0);
    }

    #[test]
    fn test_empty_histogram() {
        let h = EmpiricalDistribution::<u32>::new();
        assert!(h.is_empty());
        assert_eq!(h.mean(), 0.0);
        assert_eq!(h.standard_error(), 0.0);
        assert_eq!(h.to_distribution(), Err(InvalidDistributionError::Empty));
    }

    #[test]
    fn test_merge_adds_counts() {
        let mut a = histogram(&[1, 2]);
        let b = histogram(&[2, 3, 3]);
        a.merge(&b);
        assert_eq!(a.counts(), &[(1, 1), (2, 2), (3, 2)]);
        assert_eq!(a.trials(), 5);
    }

    #[test]
    fn test_to_distribution_uses_frequencies() {
        let d = histogram(&[0, 3, 3, 3]).to_distribution().unwrap();
        assert_eq!(d.outcomes(), &[(0, 0.25), (3, 0.75)]);
    }
}
