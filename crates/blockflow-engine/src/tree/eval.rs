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

//! Bottom-up evaluation of an operation tree.

use super::node::{Node, OperationTree};
use crate::{
    distribution::Distribution, error::MaskCardinalityError, mask::MaintenancePlan,
    table::BlockDistributionTable,
};
use blockflow_core::num::throughput::Throughput;
use std::borrow::Cow;

impl OperationTree {
    /// Evaluates the tree under `plan`: leaves look up the tabulated block
    /// distribution for the block's mask, `Series` nodes apply `following`
    /// and `Combine` nodes apply `combine`.
    ///
    /// # Errors
    ///
    /// Returns a `MaskCardinalityError` if `plan` does not have one fitting
    /// mask per tabulated block.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use blockflow_engine::{mask::MaintenancePlan, table::BlockDistributionTable, tree::node::OperationTree};
    /// # use blockflow_model::{machine::Machine, topology::TopologyBuilder};
    /// let mut builder = TopologyBuilder::<u32>::new();
    /// builder
    ///     .ordinary("Block1", [Machine::new("a1", 3, 0.9), Machine::new("a2", 3, 0.9)])
    ///     .ordinary("Block2", [Machine::new("b1", 5, 0.8)]);
    /// let topology = builder.build().unwrap();
    /// let table = BlockDistributionTable::new(&topology);
    /// let tree = OperationTree::from_topology(&topology).unwrap();
    ///
    /// let line = tree.evaluate(&table, &MaintenancePlan::all_in_service(&topology)).unwrap();
    /// assert!((line.probability_of(0) - 0.208).abs() < 1e-9);
    /// ```
    pub fn evaluate<T>(
        &self,
        table: &BlockDistributionTable<T>,
        plan: &MaintenancePlan,
    ) -> Result<Distribution<T>, MaskCardinalityError>
    where
        T: Throughput,
    {
        table.check_plan(plan)?;

        // Every node is the operand of at most one parent, so operands are
        // moved out of `values` once consumed.
        let mut values: Vec<Cow<'_, Distribution<T>>> = Vec::with_capacity(self.num_nodes());
        for node in self.nodes() {
            let value = match *node {
                Node::Leaf(block) => Cow::Borrowed(table.get(block, plan.mask(block))),
                Node::Series(left, right) => {
                    let left = take(&mut values, left.get());
                    let right = take(&mut values, right.get());
                    Cow::Owned(left.following(&right))
                }
                Node::Combine(left, right) => {
                    let left = take(&mut values, left.get());
                    let right = take(&mut values, right.get());
                    Cow::Owned(left.combine(&right))
                }
            };
            values.push(value);
        }

        Ok(take(&mut values, self.root().get()).into_owned())
    }
}

#[inline]
fn take<'t, T>(values: &mut [Cow<'t, Distribution<T>>], index: usize) -> Cow<'t, Distribution<T>>
where
    T: Throughput,
{
    std::mem::replace(&mut values[index], Cow::Owned(Distribution::zero()))
}

#[cfg(test)]
mod tests {
    use crate::{
        distribution::Distribution,
        mask::{BlockMask, MaintenancePlan},
        table::BlockDistributionTable,
        tree::node::OperationTree,
    };
    use blockflow_model::{
        index::BlockIndex,
        machine::Machine,
        topology::{Topology, TopologyBuilder},
    };

    const EPS: f64 = 1e-9;

    fn evaluate(topology: &Topology<u32>, plan: &MaintenancePlan) -> Distribution<u32> {
        let table = BlockDistributionTable::new(topology);
        let tree = OperationTree::from_topology(topology).unwrap();
        tree.evaluate(&table, plan).unwrap()
    }

    fn worked_example() -> Topology<u32> {
        let mut builder = TopologyBuilder::new();
        builder
            .ordinary("Block1", [Machine::new("a1", 3, 0.9), Machine::new("a2", 3, 0.9)])
            .ordinary("Block2", [Machine::new("b1", 5, 0.8)]);
        builder.build().unwrap()
    }

    #[test]
    fn test_series_of_two_blocks() {
        let topology = worked_example();
        let line = evaluate(&topology, &MaintenancePlan::all_in_service(&topology));
        let expected = Distribution::from_outcomes([(0u32, 0.208), (3, 0.144), (5, 0.648)]).unwrap();
        assert!(line.approx_eq(&expected, EPS), "{}", line);
    }

    #[test]
    fn test_maintenance_pulls_machines() {
        let topology = worked_example();
        let mut plan = MaintenancePlan::all_in_service(&topology);
        plan.set_mask(BlockIndex::new(0), BlockMask::from_bits(0b01));
        let line = evaluate(&topology, &plan);
        // {0: 0.1, 3: 0.9} following {0: 0.2, 5: 0.8}
        let expected = Distribution::from_outcomes([(0u32, 0.28), (3, 0.72)]).unwrap();
        assert!(line.approx_eq(&expected, EPS), "{}", line);

        plan.set_mask(BlockIndex::new(1), BlockMask::EMPTY);
        assert_eq!(evaluate(&topology, &plan), Distribution::zero());
    }

    #[test]
    fn test_skip_scope_adds_routes() {
        let mut builder = TopologyBuilder::new();
        builder
            .skip_start("s", "Skip", [Machine::new("s1", 2u32, 0.5)])
            .ordinary("Cont", [Machine::new("c1", 3, 0.5)])
            .skip_end("s");
        let topology = builder.build().unwrap();
        let line = evaluate(&topology, &MaintenancePlan::all_in_service(&topology));
        let expected =
            Distribution::from_outcomes([(0u32, 0.25), (2, 0.25), (3, 0.25), (5, 0.25)]).unwrap();
        assert!(line.approx_eq(&expected, EPS));
    }

    #[test]
    fn test_stockpile_path_equals_its_own_leaf() {
        let mut builder = TopologyBuilder::new();
        builder
            .ordinary("Weak", [Machine::new("w1", 1u32, 0.1)])
            .ordinary("Stockpile_1", [Machine::new("p1", 6, 0.7), Machine::new("p2", 2, 0.9)]);
        let topology = builder.build().unwrap();
        let table = BlockDistributionTable::new(&topology);
        let plan = MaintenancePlan::all_in_service(&topology);

        let line = evaluate(&topology, &plan);
        assert_eq!(&line, table.get(BlockIndex::new(1), plan.mask(BlockIndex::new(1))));
    }

    #[test]
    fn test_plan_must_match_topology() {
        let topology = worked_example();
        let table = BlockDistributionTable::new(&topology);
        let tree = OperationTree::from_topology(&topology).unwrap();
        assert!(tree.evaluate(&table, &MaintenancePlan::new(vec![])).is_err());
    }

    #[test]
    fn test_result_is_normalised_on_nested_topology() {
        let mut builder = TopologyBuilder::new();
        builder
            .ordinary("Feed", [Machine::new("f1", 8u32, 0.95), Machine::new("f2", 4, 0.9)])
            .skip_start("outer", "Bypass", [Machine::new("b1", 3, 0.8)])
            .ordinary("Stacker", [Machine::new("st1", 4, 0.85)])
            .skip_start("inner", "Shortcut", [Machine::new("sc1", 2, 0.6)])
            .ordinary("Reclaimer", [Machine::new("r1", 5, 0.9), Machine::new("r2", 5, 0.9)])
            .skip_end("inner")
            .skip_end("outer")
            .ordinary("Sink", [Machine::new("k1", 10, 0.99)]);
        let topology = builder.build().unwrap();
        let line = evaluate(&topology, &MaintenancePlan::all_in_service(&topology));
        assert!(line.is_normalised());
        assert!(line.max_value() <= 10);
    }
}
