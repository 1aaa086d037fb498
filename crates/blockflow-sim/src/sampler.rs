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

//! Random machine states.

use blockflow_core::num::throughput::Throughput;
use blockflow_engine::{error::MaskCardinalityError, mask::MaintenancePlan};
use blockflow_model::topology::Topology;
use rand::Rng;

/// Draws independent up/down states for every machine of a topology.
///
/// A machine in service is up with probability equal to its availability.
/// A machine the maintenance plan pulls is always down.
#[derive(Clone, Debug, PartialEq)]
pub struct MachineSampler {
    availabilities: Vec<f64>,
}

impl MachineSampler {
    /// Creates a sampler with every machine in service.
    pub fn new<T>(topology: &Topology<T>) -> Self
    where
        T: Throughput,
    {
        Self {
            availabilities: topology.availabilities().to_vec(),
        }
    }

    /// Creates a sampler that keeps the machines `plan` pulls down.
    ///
    /// # Errors
    ///
    /// Returns a `MaskCardinalityError` if `plan` does not fit `topology`.
    pub fn with_plan<T>(
        topology: &Topology<T>,
        plan: &MaintenancePlan,
    ) -> Result<Self, MaskCardinalityError>
    where
        T: Throughput,
    {
        plan.validate(topology)?;
        let availabilities = topology
            .availabilities()
            .iter()
            .zip(plan.machine_flags(topology))
            .map(|(&availability, in_service)| if in_service { availability } else { 0.0 })
            .collect();
        Ok(Self { availabilities })
    }

    #[inline]
    pub fn num_machines(&self) -> usize {
        self.availabilities.len()
    }

    /// Overwrites `up` with a fresh state, one flag per machine.
    #[inline]
    pub fn sample_into<R>(&self, rng: &mut R, up: &mut Vec<bool>)
    where
        R: Rng,
    {
        up.clear();
        up.extend(
            self.availabilities
                .iter()
                .map(|&availability| rng.random_bool(availability)),
        );
    }
}
