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

//! A single machine: the smallest unit with its own capacity and its own,
//! independent probability of operating.

use blockflow_core::num::{
    probability::is_probability,
    throughput::{Throughput, is_valid_throughput},
};

/// A machine description as handed to the `TopologyBuilder`.
///
/// `availability` is the probability that the machine is operational. The
/// value is not checked here; `TopologyBuilder::build` rejects machines with
/// a negative capacity or an availability outside `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Machine<T> {
    id: String,
    capacity: T,
    availability: f64,
}

impl<T> Machine<T>
where
    T: Throughput,
{
    /// Creates a new machine description.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use blockflow_model::machine::Machine;
    /// let m = Machine::new("Stacker_1", 3u32, 0.9);
    /// assert_eq!(m.id(), "Stacker_1");
    /// assert_eq!(m.capacity(), 3);
    /// assert_eq!(m.availability(), 0.9);
    /// ```
    #[inline]
    pub fn new(id: impl Into<String>, capacity: T, availability: f64) -> Self {
        Self {
            id: id.into(),
            capacity,
            availability,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn capacity(&self) -> T {
        self.capacity
    }

    #[inline]
    pub fn availability(&self) -> f64 {
        self.availability
    }

    /// Returns `true` if the capacity is a finite non-negative number and the
    /// availability a probability.
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        is_valid_throughput(self.capacity) && is_probability(self.availability)
    }

    /// Returns `true` if the machine can ever contribute throughput.
    ///
    /// A machine with zero capacity or zero availability is structurally
    /// absent rather than merely failed.
    #[inline]
    pub fn contributes(&self) -> bool {
        self.capacity > T::zero() && self.availability > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_machine() {
        assert!(Machine::new("a", 2u32, 0.5).is_well_formed());
        assert!(Machine::new("b", 0.0f64, 1.0).is_well_formed());
    }

    #[test]
    fn test_malformed_machines() {
        assert!(!Machine::new("neg", -1i64, 0.5).is_well_formed());
        assert!(!Machine::new("nan", f64::NAN, 0.5).is_well_formed());
        assert!(!Machine::new("inf", f64::INFINITY, 0.5).is_well_formed());
        assert!(!Machine::new("prob", 1u32, 1.5).is_well_formed());
        assert!(!Machine::new("prob", 1u32, -0.1).is_well_formed());
    }

    #[test]
    fn test_contributes() {
        assert!(Machine::new("a", 2u32, 0.5).contributes());
        assert!(!Machine::new("b", 0u32, 0.5).contributes());
        assert!(!Machine::new("c", 2u32, 0.0).contributes());
    }
}
