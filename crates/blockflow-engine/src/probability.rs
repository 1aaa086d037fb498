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

//! Probability of one concrete machine state.

use crate::error::MaskCardinalityError;
use blockflow_core::num::{probability::state_probability, throughput::Throughput};
use blockflow_model::topology::Topology;

/// Returns `∏ (availability_i if up_i else 1 - availability_i)`, the
/// probability that exactly the machines flagged `true` operate.
///
/// # Errors
///
/// Returns a `MaskCardinalityError` if `up` does not hold one flag per
/// machine of `topology`.
///
/// # Examples
///
/// ```rust
/// # use blockflow_engine::probability::configuration_probability;
/// # use blockflow_model::{machine::Machine, topology::TopologyBuilder};
/// let mut builder = TopologyBuilder::<u32>::new();
/// builder
///     .ordinary("Block1", [Machine::new("a1", 3, 0.9), Machine::new("a2", 3, 0.9)])
///     .ordinary("Block2", [Machine::new("b1", 5, 0.8)]);
/// let topology = builder.build().unwrap();
///
/// let p = configuration_probability(&topology, &[true, true, true]).unwrap();
/// assert!((p - 0.648).abs() < 1e-12);
/// ```
pub fn configuration_probability<T>(
    topology: &Topology<T>,
    up: &[bool],
) -> Result<f64, MaskCardinalityError>
where
    T: Throughput,
{
    let availabilities = topology.availabilities();
    if up.len() != availabilities.len() {
        return Err(MaskCardinalityError::MachineCount {
            expected: availabilities.len(),
            actual: up.len(),
        });
    }

    Ok(availabilities
        .iter()
        .zip(up)
        .map(|(&availability, &up)| state_probability(availability, up))
        .product())
}
