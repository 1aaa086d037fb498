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

//! Probability helpers and the tolerances that guard probability-mass
//! invariants.
//!
//! Distributions are expected to sum to one within `MASS_TOLERANCE`. Drift up
//! to `MASS_DRIFT_LIMIT` is accepted as accumulated rounding; anything beyond
//! it is a broken invariant and is reported, never renormalised.

/// Expected accuracy of a distribution's total mass.
pub const MASS_TOLERANCE: f64 = 1e-9;

/// Largest deviation of a total mass from one that is still accepted.
pub const MASS_DRIFT_LIMIT: f64 = 1e-6;

/// Returns `true` if `p` is a finite probability in `[0, 1]`.
///
/// # Examples
///
/// ```rust
/// # use blockflow_core::num::probability::is_probability;
/// assert!(is_probability(0.0));
/// assert!(is_probability(0.75));
/// assert!(!is_probability(1.5));
/// assert!(!is_probability(f64::NAN));
/// ```
#[inline]
pub fn is_probability(p: f64) -> bool {
    (0.0..=1.0).contains(&p)
}

/// Probability of a machine being in the given state.
///
/// `availability` is the probability of the machine operating.
#[inline(always)]
pub fn state_probability(availability: f64, up: bool) -> f64 {
    if up { availability } else { 1.0 - availability }
}

/// Returns `true` if `total` is within `MASS_DRIFT_LIMIT` of one.
#[inline]
pub fn is_unit_mass(total: f64) -> bool {
    (total - 1.0).abs() <= MASS_DRIFT_LIMIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_probability_bounds() {
        assert!(is_probability(0.0));
        assert!(is_probability(1.0));
        assert!(!is_probability(-f64::EPSILON));
        assert!(!is_probability(1.0 + 1e-12));
        assert!(!is_probability(f64::INFINITY));
    }

    #[test]
    fn test_state_probability() {
        assert_eq!(state_probability(0.9, true), 0.9);
        assert!((state_probability(0.9, false) - 0.1).abs() < 1e-15);
        assert_eq!(state_probability(1.0, false), 0.0);
    }

    #[test]
    fn test_is_unit_mass() {
        assert!(is_unit_mass(1.0));
        assert!(is_unit_mass(1.0 - 1e-9));
        assert!(!is_unit_mass(1.0 + 1e-5));
        assert!(!is_unit_mass(0.5));
        assert!(!is_unit_mass(f64::NAN));
    }
}
