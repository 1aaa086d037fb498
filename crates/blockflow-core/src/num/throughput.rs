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

//! # Throughput Numeric Trait
//!
//! `Throughput` collects the bounds required from a capacity type into a
//! single alias, keeping generic signatures across the workspace short.
//!
//! ## Requirements
//!
//! - `Copy + PartialOrd`: values are compared when taking series minima and
//!   when keeping distribution keys sorted.
//! - `Zero + Add`: block capacities are summed, parallel routes are summed.
//! - `ToPrimitive`: statistics (means, variances) are computed in `f64`.
//! - `Send + Sync`: tables and plans are shared across simulation threads.
//!
//! The trait is blanket-implemented, so `u32`, `u64`, `i64`, `f32` and `f64`
//! all qualify.

use num_traits::{ToPrimitive, Zero};
use std::cmp::Ordering;

/// A numeric type that can represent machine capacities and line throughput.
pub trait Throughput:
    Copy
    + PartialOrd
    + Zero
    + ToPrimitive
    + std::ops::Add<Output = Self>
    + std::fmt::Debug
    + std::fmt::Display
    + Send
    + Sync
{
}

impl<T> Throughput for T where
    T: Copy
        + PartialOrd
        + Zero
        + ToPrimitive
        + std::ops::Add<Output = Self>
        + std::fmt::Debug
        + std::fmt::Display
        + Send
        + Sync
{
}

/// Returns `true` if `value` is a valid throughput: not negative and finite.
///
/// `NaN` compares neither greater nor equal to zero and is rejected, as are
/// infinities.
///
/// # Examples
///
/// ```rust
/// # use blockflow_core::num::throughput::is_valid_throughput;
/// assert!(is_valid_throughput(0u32));
/// assert!(is_valid_throughput(2.5f64));
/// assert!(!is_valid_throughput(-1i64));
/// assert!(!is_valid_throughput(f64::NAN));
/// assert!(!is_valid_throughput(f64::INFINITY));
/// ```
#[inline]
pub fn is_valid_throughput<T>(value: T) -> bool
where
    T: Throughput,
{
    value >= T::zero() && value.to_f64().is_some_and(f64::is_finite)
}

/// Total order over throughput values, treating incomparable pairs as equal.
///
/// Only valid throughputs (see `is_valid_throughput`) ever reach a sorted
/// container, so the fallback branch is unreachable in practice.
#[inline]
pub fn cmp_throughput<T>(a: &T, b: &T) -> Ordering
where
    T: Throughput,
{
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// The smaller of two throughputs.
#[inline(always)]
pub fn min_throughput<T>(a: T, b: T) -> T
where
    T: Throughput,
{
    if b < a { b } else { a }
}

/// Converts a throughput to `f64`, mapping unrepresentable values to `NaN`.
#[inline]
pub fn throughput_to_f64<T>(value: T) -> f64
where
    T: Throughput,
{
    value.to_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_throughput_accepts_zero_and_positive() {
        assert!(is_valid_throughput(0i64));
        assert!(is_valid_throughput(7u64));
        assert!(is_valid_throughput(0.0f64));
        assert!(is_valid_throughput(u64::MAX));
    }

    #[test]
    fn test_valid_throughput_rejects_infinity() {
        assert!(!is_valid_throughput(f64::INFINITY));
        assert!(!is_valid_throughput(f32::INFINITY));
    }

    #[test]
    fn test_valid_throughput_rejects_negative_and_nan() {
        assert!(!is_valid_throughput(-3i32));
        assert!(!is_valid_throughput(-0.5f64));
        assert!(!is_valid_throughput(f32::NAN));
    }

    #[test]
    fn test_min_throughput() {
        assert_eq!(min_throughput(3u32, 5u32), 3);
        assert_eq!(min_throughput(5u32, 3u32), 3);
        assert_eq!(min_throughput(2.5f64, 2.5f64), 2.5);
    }

    #[test]
    fn test_cmp_throughput_orders_values() {
        let mut values = vec![3.0f64, 0.0, 1.5];
        values.sort_by(cmp_throughput);
        assert_eq!(values, vec![0.0, 1.5, 3.0]);
    }

    #[test]
    fn test_throughput_to_f64() {
        assert_eq!(throughput_to_f64(12u32), 12.0);
        assert_eq!(throughput_to_f64(0.25f32), 0.25);
    }
}
