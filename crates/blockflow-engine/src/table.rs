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

//! Precomputed per-block throughput distributions.
//!
//! For every block and every maintenance mask the table holds the
//! distribution of the block's throughput: the sum of the capacities of
//! the in-service machines that happen to be operating. Entries are built
//! with a subset recurrence over masks,
//!
//! ```text
//! dist(0)    = {0: 1}
//! dist(mask) = combine(dist(mask without its highest machine), twoPoint(highest machine))
//! ```
//!
//! so each block costs `2^m` combines and every later lookup is a slice index.

use crate::{distribution::Distribution, error::MaskCardinalityError, mask::{BlockMask, MaintenancePlan}};
use blockflow_core::num::throughput::Throughput;
use blockflow_model::{index::BlockIndex, topology::Topology};

/// `(block, mask) -> Distribution`, read-only after construction.
#[derive(Clone, Debug)]
pub struct BlockDistributionTable<T> {
    offsets: Vec<usize>,         // len = num_blocks + 1
    machine_counts: Vec<usize>,  // len = num_blocks
    entries: Vec<Distribution<T>>,
}

impl<T> BlockDistributionTable<T>
where
    T: Throughput,
{
    /// Builds the table for every block of `topology`.
    pub fn new(topology: &Topology<T>) -> Self {
        let total: usize = topology
            .blocks()
            .map(|b| 1usize << topology.num_block_machines(b))
            .sum();

        let mut offsets = Vec::with_capacity(topology.num_blocks() + 1);
        let mut machine_counts = Vec::with_capacity(topology.num_blocks());
        let mut entries = Vec::with_capacity(total);
        offsets.push(0);

        for block in topology.blocks() {
            let capacities = topology.block_capacities(block);
            let availabilities = topology.block_availabilities(block);
            let start = entries.len();

            entries.push(Distribution::zero());
            for bits in 1..(1u32 << capacities.len()) {
                // Peel the highest machine so capacities add in ascending
                // machine order, the order the fast evaluator sums them in.
                let highest = (31 - bits.leading_zeros()) as usize;
                let rest = (bits & !(1 << highest)) as usize;
                let machine =
                    Distribution::two_point(capacities[highest], availabilities[highest]);
                let entry = entries[start + rest].combine(&machine);
                entries.push(entry);
            }

            tracing::debug!(
                block = topology.block_identifier(block),
                machines = capacities.len(),
                masks = entries.len() - start,
                outcomes = entries.last().map_or(0, Distribution::len),
                "tabulated block distributions"
            );

            machine_counts.push(capacities.len());
            offsets.push(entries.len());
        }

        Self {
            offsets,
            machine_counts,
            entries,
        }
    }

    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.machine_counts.len()
    }

    /// Returns the total number of stored distributions.
    #[inline]
    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    /// Returns the number of machines of the given block.
    #[inline]
    pub fn num_block_machines(&self, block: BlockIndex) -> usize {
        self.machine_counts[block.get()]
    }

    /// Returns the distribution of `block` under `mask`.
    ///
    /// # Panics
    ///
    /// Panics if `block` is out of bounds or `mask` selects a machine the
    /// block does not have.
    #[inline]
    pub fn get(&self, block: BlockIndex, mask: BlockMask) -> &Distribution<T> {
        let index = block.get();
        let start = self.offsets[index];
        let offset = mask.bits() as usize;
        assert!(
            start + offset < self.offsets[index + 1],
            "called `BlockDistributionTable::get` with mask {} for block {} with {} machines",
            mask,
            index,
            self.machine_counts[index]
        );

        &self.entries[start + offset]
    }

    /// Returns all distributions of one block, indexed by mask bits.
    #[inline]
    pub fn block_entries(&self, block: BlockIndex) -> &[Distribution<T>] {
        let index = block.get();
        &self.entries[self.offsets[index]..self.offsets[index + 1]]
    }

    /// Checks that `plan` has one fitting mask per tabulated block.
    pub fn check_plan(&self, plan: &MaintenancePlan) -> Result<(), MaskCardinalityError> {
        if plan.num_blocks() != self.num_blocks() {
            return Err(MaskCardinalityError::BlockCount {
                expected: self.num_blocks(),
                actual: plan.num_blocks(),
            });
        }

        for (index, (&mask, &machines)) in plan.masks().iter().zip(&self.machine_counts).enumerate() {
            if !mask.fits(machines) {
                return Err(MaskCardinalityError::MaskWidth {
                    block: index,
                    mask: mask.bits(),
                    machines,
                });
            }
        }

        Ok(())
    }
}
