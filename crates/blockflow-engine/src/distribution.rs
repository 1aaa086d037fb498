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

//! Discrete throughput distributions and the two operators that compose them.
//!
//! A `Distribution` is a sorted list of `(throughput, probability)` outcomes
//! with unique, ascending values and masses that sum to one. Two operators
//! compose independent stages:
//!
//! * `combine` (parallel routes): the throughputs add, `P(a + b) += P(a)·P(b)`.
//! * `following` (series stages): the slower stage limits the line,
//!   `P(min(a, b)) += P(a)·P(b)`.
//!
//! `following` runs as a single linear merge over tail masses,
//! `P(min = x) = P_A(x)·P(B ≥ x) + P_B(x)·P(A > x)`, so it never touches more
//! than `|A| + |B|` outcomes.

use crate::error::InvalidDistributionError;
use blockflow_core::num::{
    probability::{MASS_TOLERANCE, is_unit_mass},
    throughput::{Throughput, cmp_throughput, is_valid_throughput, throughput_to_f64},
};
use smallvec::SmallVec;
use std::cmp::Ordering;

/// Outcomes stored inline before spilling to the heap. Block distributions
/// of small blocks fit without allocation.
const INLINE_OUTCOMES: usize = 8;

type Outcomes<T> = SmallVec<[(T, f64); INLINE_OUTCOMES]>;

/// A probability distribution over throughput values.
///
/// # Invariants
///
/// - at least one outcome;
/// - values are non-negative, unique and strictly ascending;
/// - every stored mass is positive and the masses sum to one within `1e-9`.
#[derive(Clone, Debug, PartialEq)]
pub struct Distribution<T> {
    outcomes: Outcomes<T>,
}

impl<T> Distribution<T>
where
    T: Throughput,
{
    /// Returns the distribution that yields `value` with certainty.
    #[inline]
    pub fn certain(value: T) -> Self {
        let mut outcomes = Outcomes::new();
        outcomes.push((value, 1.0));
        Self { outcomes }
    }

    /// Returns the distribution of a fully blocked stage, `{0: 1}`.
    #[inline]
    pub fn zero() -> Self {
        Self::certain(T::zero())
    }

    /// Returns the distribution of a single machine: `capacity` with
    /// probability `availability`, zero otherwise.
    ///
    /// The caller guarantees a non-negative capacity and an availability in
    /// `[0, 1]`; a validated topology always does.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use blockflow_engine::distribution::Distribution;
    /// let d = Distribution::two_point(5u32, 0.8);
    /// assert_eq!(d.outcomes().len(), 2);
    /// assert!((d.probability_of(0) - 0.2).abs() < 1e-12);
    /// assert!((d.probability_of(5) - 0.8).abs() < 1e-12);
    /// ```
    pub fn two_point(capacity: T, availability: f64) -> Self {
        debug_assert!(is_valid_throughput(capacity));
        debug_assert!((0.0..=1.0).contains(&availability));

        if capacity.is_zero() || availability <= 0.0 {
            return Self::zero();
        }
        if availability >= 1.0 {
            return Self::certain(capacity);
        }

        let mut outcomes = Outcomes::new();
        outcomes.push((T::zero(), 1.0 - availability));
        outcomes.push((capacity, availability));
        Self { outcomes }
    }

    /// Builds a distribution from arbitrary `(value, probability)` pairs.
    ///
    /// Pairs are sorted, equal values are merged and zero masses dropped.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidDistributionError` if a value is negative or NaN, a
    /// mass is negative or not finite, no positive mass remains, or the total
    /// mass drifts from one by more than `1e-6`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use blockflow_engine::distribution::Distribution;
    /// let d = Distribution::from_outcomes([(3u32, 0.25), (0, 0.5), (3, 0.25)]).unwrap();
    /// assert_eq!(d.outcomes(), &[(0, 0.5), (3, 0.5)]);
    ///
    /// assert!(Distribution::from_outcomes([(3u32, 0.5)]).is_err());
    /// ```
    pub fn from_outcomes<I>(outcomes: I) -> Result<Self, InvalidDistributionError>
    where
        I: IntoIterator<Item = (T, f64)>,
    {
        let mut pairs: Outcomes<T> = SmallVec::new();
        for (value, mass) in outcomes {
            if !is_valid_throughput(value) {
                return Err(InvalidDistributionError::InvalidValue {
                    value: throughput_to_f64(value),
                });
            }
            if !mass.is_finite() || mass < 0.0 {
                return Err(InvalidDistributionError::InvalidMass { mass });
            }
            pairs.push((value, mass));
        }

        let distribution = Self::from_unsorted(pairs);
        if distribution.outcomes.is_empty() {
            return Err(InvalidDistributionError::Empty);
        }

        let total = distribution.total_mass();
        if !is_unit_mass(total) {
            return Err(InvalidDistributionError::MassDrift { total });
        }

        Ok(distribution)
    }

    /// Sorts, merges equal values and drops zero masses.
    fn from_unsorted(mut pairs: Outcomes<T>) -> Self {
        pairs.sort_unstable_by(|a, b| cmp_throughput(&a.0, &b.0));

        let mut outcomes: Outcomes<T> = SmallVec::with_capacity(pairs.len());
        for (value, mass) in pairs {
            if mass <= 0.0 {
                continue;
            }
            match outcomes.last_mut() {
                Some(last) if last.0 == value => last.1 += mass,
                _ => outcomes.push((value, mass)),
            }
        }

        Self { outcomes }
    }

    /// Returns the outcomes in ascending value order.
    #[inline]
    pub fn outcomes(&self) -> &[(T, f64)] {
        &self.outcomes
    }

    /// Iterates over the outcomes in ascending value order.
    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &(T, f64)> {
        self.outcomes.iter()
    }

    /// Returns the number of distinct throughput values.
    #[inline]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Returns `true` if a single value carries all the mass.
    #[inline]
    pub fn is_certain(&self) -> bool {
        self.outcomes.len() == 1
    }

    #[inline]
    pub fn total_mass(&self) -> f64 {
        self.outcomes.iter().map(|&(_, p)| p).sum()
    }

    /// Returns the smallest value with positive probability.
    #[inline]
    pub fn min_value(&self) -> T {
        self.outcomes.first().map_or_else(T::zero, |&(v, _)| v)
    }

    /// Returns the largest value with positive probability.
    #[inline]
    pub fn max_value(&self) -> T {
        self.outcomes.last().map_or_else(T::zero, |&(v, _)| v)
    }

    /// Returns the expected throughput.
    pub fn mean(&self) -> f64 {
        self.outcomes
            .iter()
            .map(|&(v, p)| throughput_to_f64(v) * p)
            .sum()
    }

    /// Returns `P(X = value)`.
    pub fn probability_of(&self, value: T) -> f64 {
        self.outcomes
            .binary_search_by(|probe| cmp_throughput(&probe.0, &value))
            .map_or(0.0, |i| self.outcomes[i].1)
    }

    /// Returns `P(X >= threshold)`.
    pub fn probability_at_least(&self, threshold: T) -> f64 {
        let start = self.outcomes.partition_point(|&(v, _)| v < threshold);
        self.outcomes[start..].iter().map(|&(_, p)| p).sum()
    }

    /// Returns `P(X <= value)`.
    pub fn cdf(&self, value: T) -> f64 {
        let end = self.outcomes.partition_point(|&(v, _)| v <= value);
        self.outcomes[..end].iter().map(|&(_, p)| p).sum()
    }

    /// Composes two parallel routes: the throughputs add.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use blockflow_engine::distribution::Distribution;
    /// let a = Distribution::two_point(3u32, 0.5);
    /// let b = Distribution::two_point(3u32, 0.5);
    /// let both = a.combine(&b);
    /// assert_eq!(both.outcomes(), &[(0, 0.25), (3, 0.5), (6, 0.25)]);
    /// ```
    pub fn combine(&self, other: &Self) -> Self {
        if other.is_certain() && other.min_value().is_zero() {
            return self.clone();
        }
        if self.is_certain() && self.min_value().is_zero() {
            return other.clone();
        }

        let mut pairs: Outcomes<T> = SmallVec::with_capacity(self.len() * other.len());
        for &(a, pa) in &self.outcomes {
            for &(b, pb) in &other.outcomes {
                pairs.push((a + b, pa * pb));
            }
        }

        let result = Self::from_unsorted(pairs);
        debug_assert!(
            is_unit_mass(result.total_mass()),
            "`Distribution::combine` lost probability mass: {}",
            result.total_mass()
        );
        result
    }

    /// Composes two stages in series: the smaller throughput limits the line.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use blockflow_engine::distribution::Distribution;
    /// let feeder = Distribution::certain(5u32);
    /// let sink = Distribution::two_point(3u32, 0.5);
    /// let line = feeder.following(&sink);
    /// assert_eq!(line.outcomes(), &[(0, 0.5), (3, 0.5)]);
    /// ```
    pub fn following(&self, other: &Self) -> Self {
        let a = &self.outcomes;
        let b = &other.outcomes;

        // tail[i] = P(X >= values[i]), with a trailing zero.
        let tail_a = tail_masses(a);
        let tail_b = tail_masses(b);

        let mut outcomes: Outcomes<T> = SmallVec::with_capacity(a.len().min(b.len()) + 1);
        let (mut i, mut j) = (0, 0);
        while i < a.len() && j < b.len() {
            let (va, pa) = a[i];
            let (vb, pb) = b[j];
            let (value, mass) = match cmp_throughput(&va, &vb) {
                Ordering::Less => {
                    i += 1;
                    (va, pa * tail_b[j])
                }
                Ordering::Greater => {
                    j += 1;
                    (vb, pb * tail_a[i])
                }
                Ordering::Equal => {
                    i += 1;
                    j += 1;
                    (va, pa * tail_b[j - 1] + pb * tail_a[i])
                }
            };
            if mass > 0.0 {
                outcomes.push((value, mass));
            }
        }

        let result = Self { outcomes };
        debug_assert!(
            is_unit_mass(result.total_mass()),
            "`Distribution::following` lost probability mass: {}",
            result.total_mass()
        );
        result
    }

    /// Returns `true` if both distributions carry the same values with masses
    /// equal within `tolerance`.
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.len() == other.len()
            && self
                .outcomes
                .iter()
                .zip(other.outcomes.iter())
                .all(|(&(va, pa), &(vb, pb))| va == vb && (pa - pb).abs() <= tolerance)
    }

    /// Returns `true` if the masses sum to one within the storage tolerance.
    #[inline]
    pub fn is_normalised(&self) -> bool {
        (self.total_mass() - 1.0).abs() <= MASS_TOLERANCE
    }
}

fn tail_masses<T>(outcomes: &[(T, f64)]) -> SmallVec<[f64; INLINE_OUTCOMES + 1]> {
    let mut tail: SmallVec<[f64; INLINE_OUTCOMES + 1]> = SmallVec::from_elem(0.0, outcomes.len() + 1);
    for i in (0..outcomes.len()).rev() {
        tail[i] = tail[i + 1] + outcomes[i].1;
    }
    tail
}

impl<T> std::fmt::Display for Distribution<T>
where
    T: Throughput,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, (value, mass)) in self.outcomes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:.6}", value, mass)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-9;

    fn dist(pairs: &[(u32, f64)]) -> Distribution<u32> {
        Distribution::from_outcomes(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn test_two_point_edges() {
        assert_eq!(Distribution::two_point(4u32, 1.0), Distribution::certain(4));
        assert_eq!(Distribution::two_point(4u32, 0.0), Distribution::zero());
        assert_eq!(Distribution::two_point(0u32, 0.7), Distribution::zero());
    }

    #[test]
    fn test_from_outcomes_rejects_invalid_input() {
        assert_eq!(
            Distribution::<u32>::from_outcomes([]),
            Err(InvalidDistributionError::Empty)
        );
        assert_eq!(
            Distribution::from_outcomes([(1u32, 0.0), (2, 0.0)]),
            Err(InvalidDistributionError::Empty)
        );
        assert_eq!(
            Distribution::from_outcomes([(-1i32, 1.0)]),
            Err(InvalidDistributionError::InvalidValue { value: -1.0 })
        );
        assert!(matches!(
            Distribution::from_outcomes([(f64::NAN, 1.0)]),
            Err(InvalidDistributionError::InvalidValue { .. })
        ));
        assert_eq!(
            Distribution::from_outcomes([(1u32, -0.5), (2, 1.5)]),
            Err(InvalidDistributionError::InvalidMass { mass: -0.5 })
        );
        assert!(matches!(
            Distribution::from_outcomes([(1u32, f64::INFINITY)]),
            Err(InvalidDistributionError::InvalidMass { .. })
        ));
        assert!(matches!(
            Distribution::from_outcomes([(1u32, 0.4), (2, 0.4)]),
            Err(InvalidDistributionError::MassDrift { .. })
        ));
    }

    #[test]
    fn test_from_outcomes_merges_and_prunes() {
        let d = dist(&[(5, 0.2), (0, 0.3), (5, 0.5), (9, 0.0)]);
        assert_eq!(d.outcomes(), &[(0, 0.3), (5, 0.7)]);
        assert_eq!(d.min_value(), 0);
        assert_eq!(d.max_value(), 5);
    }

    #[test]
    fn test_statistics() {
        let d = dist(&[(0, 0.01), (3, 0.18), (6, 0.81)]);
        assert!((d.mean() - (3.0 * 0.18 + 6.0 * 0.81)).abs() < EPS);
        assert!((d.probability_of(3) - 0.18).abs() < EPS);
        assert_eq!(d.probability_of(4), 0.0);
        assert!((d.probability_at_least(3) - 0.99).abs() < EPS);
        assert!((d.probability_at_least(4) - 0.81).abs() < EPS);
        assert_eq!(d.probability_at_least(7), 0.0);
        assert!((d.cdf(3) - 0.19).abs() < EPS);
        assert!((d.cdf(100) - 1.0).abs() < EPS);
        assert_eq!(d.cdf(0), 0.01);
        assert!(d.is_normalised());
    }

    #[test]
    fn test_following_matches_worked_example() {
        let block1 = dist(&[(0, 0.01), (3, 0.18), (6, 0.81)]);
        let block2 = dist(&[(0, 0.2), (5, 0.8)]);
        let line = block1.following(&block2);

        assert!((line.probability_of(0) - 0.208).abs() < EPS);
        assert!((line.probability_of(3) - 0.144).abs() < EPS);
        assert!((line.probability_of(5) - 0.648).abs() < EPS);
        assert_eq!(line.len(), 3);
        assert!(line.is_normalised());
    }

    #[test]
    fn test_following_blocked_stage_zeroes_line() {
        let a = dist(&[(0, 0.1), (4, 0.3), (8, 0.6)]);
        assert_eq!(a.following(&Distribution::zero()), Distribution::zero());
        assert_eq!(Distribution::zero().following(&a), Distribution::zero());
    }

    #[test]
    fn test_following_certain_values_is_scalar_min() {
        let five = Distribution::certain(5u32);
        assert_eq!(five.following(&five), five);
        assert_eq!(
            Distribution::certain(2u32).following(&Distribution::certain(7u32)),
            Distribution::certain(2)
        );
    }

    #[test]
    fn test_combine_with_zero_is_identity() {
        let a = dist(&[(1, 0.5), (2, 0.5)]);
        assert_eq!(a.combine(&Distribution::zero()), a);
        assert_eq!(Distribution::zero().combine(&a), a);
    }

    #[test]
    fn test_combine_float_throughput() {
        let a = Distribution::two_point(1.5f64, 0.5);
        let b = Distribution::two_point(2.5f64, 0.5);
        let c = a.combine(&b);
        assert_eq!(c.len(), 4);
        assert!((c.probability_of(4.0) - 0.25).abs() < EPS);
        assert!((c.mean() - 2.0).abs() < EPS);
    }

    #[test]
    fn test_display() {
        let d = dist(&[(0, 0.25), (3, 0.75)]);
        assert_eq!(d.to_string(), "{0: 0.250000, 3: 0.750000}");
    }

    fn arb_distribution() -> impl Strategy<Value = Distribution<u32>> {
        prop::collection::vec((0u32..12, 0.05f64..1.0), 1..6).prop_map(|pairs| {
            let total: f64 = pairs.iter().map(|&(_, w)| w).sum();
            Distribution::from_outcomes(pairs.into_iter().map(|(v, w)| (v, w / total))).unwrap()
        })
    }

    proptest! {
        #[test]
        fn prop_combine_is_commutative(a in arb_distribution(), b in arb_distribution()) {
            prop_assert!(a.combine(&b).approx_eq(&b.combine(&a), EPS));
        }

        #[test]
        fn prop_combine_is_associative(
            a in arb_distribution(),
            b in arb_distribution(),
            c in arb_distribution(),
        ) {
            let left = a.combine(&b).combine(&c);
            let right = a.combine(&b.combine(&c));
            prop_assert!(left.approx_eq(&right, EPS));
        }

        #[test]
        fn prop_combine_preserves_mass(a in arb_distribution(), b in arb_distribution()) {
            let c = a.combine(&b);
            prop_assert!(c.is_normalised());
            prop_assert!((c.mean() - (a.mean() + b.mean())).abs() < 1e-6);
        }

        #[test]
        fn prop_following_is_commutative(a in arb_distribution(), b in arb_distribution()) {
            prop_assert!(a.following(&b).approx_eq(&b.following(&a), EPS));
        }

        #[test]
        fn prop_following_matches_pairwise_min(a in arb_distribution(), b in arb_distribution()) {
            let mut pairs = Vec::new();
            for &(va, pa) in a.outcomes() {
                for &(vb, pb) in b.outcomes() {
                    pairs.push((va.min(vb), pa * pb));
                }
            }
            let expected = Distribution::from_outcomes(pairs).unwrap();
            let actual = a.following(&b);
            prop_assert!(actual.approx_eq(&expected, EPS));
            prop_assert!(actual.is_normalised());
            prop_assert!(actual.max_value() <= a.max_value().min(b.max_value()));
        }
    }
}
