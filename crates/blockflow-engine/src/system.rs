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

//! The `ThroughputSystem` facade.
//!
//! A system owns a validated topology together with everything derived from
//! it once: the block distribution table, the operation tree and the fast
//! evaluator's reduction plan. All derived state is immutable, so a system
//! can be shared by reference across threads.

use crate::{
    cache::CachedTreeEvaluator,
    distribution::Distribution,
    error::EngineError,
    fast::FastThroughputEvaluator,
    mask::MaintenancePlan,
    probability::configuration_probability,
    table::BlockDistributionTable,
    tree::node::OperationTree,
};
use blockflow_core::num::throughput::{Throughput, cmp_throughput};
use blockflow_model::topology::Topology;

/// Largest machine count `enumerate_distribution` accepts.
pub const MAX_ENUMERATED_MACHINES: usize = 24;

/// A production line ready for evaluation.
///
/// # Examples
///
/// ```rust
/// # use blockflow_engine::{mask::MaintenancePlan, system::ThroughputSystem};
/// # use blockflow_model::{machine::Machine, topology::TopologyBuilder};
/// let mut builder = TopologyBuilder::<u32>::new();
/// builder
///     .ordinary("Block1", [Machine::new("a1", 3, 0.9), Machine::new("a2", 3, 0.9)])
///     .ordinary("Block2", [Machine::new("b1", 5, 0.8)]);
/// let system = ThroughputSystem::new(builder.build().unwrap()).unwrap();
///
/// let plan = MaintenancePlan::all_in_service(system.topology());
/// let line = system.distribution(&plan).unwrap();
/// assert!((line.probability_of(0) - 0.208).abs() < 1e-9);
/// assert_eq!(system.throughput(&[true, false, true]).unwrap(), 3);
/// ```
#[derive(Clone, Debug)]
pub struct ThroughputSystem<T> {
    topology: Topology<T>,
    table: BlockDistributionTable<T>,
    tree: OperationTree,
    fast: FastThroughputEvaluator<T>,
}

impl<T> ThroughputSystem<T>
where
    T: Throughput,
{
    /// Derives the table, tree and reduction plan of `topology`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Structure` if the topology's block stream does
    /// not compile into an operation tree.
    pub fn new(topology: Topology<T>) -> Result<Self, EngineError> {
        let tree = OperationTree::from_topology(&topology)?;
        let table = BlockDistributionTable::new(&topology);
        let fast = FastThroughputEvaluator::new(&topology, &tree);

        tracing::debug!(
            blocks = topology.num_blocks(),
            machines = topology.num_machines(),
            table_entries = table.num_entries(),
            tree_nodes = tree.num_nodes(),
            "throughput system ready"
        );

        Ok(Self {
            topology,
            table,
            tree,
            fast,
        })
    }

    #[inline]
    pub fn topology(&self) -> &Topology<T> {
        &self.topology
    }

    #[inline]
    pub fn table(&self) -> &BlockDistributionTable<T> {
        &self.table
    }

    #[inline]
    pub fn tree(&self) -> &OperationTree {
        &self.tree
    }

    #[inline]
    pub fn fast_evaluator(&self) -> &FastThroughputEvaluator<T> {
        &self.fast
    }

    /// Returns the exact throughput distribution under `plan`.
    pub fn distribution(&self, plan: &MaintenancePlan) -> Result<Distribution<T>, EngineError> {
        Ok(self.tree.evaluate(&self.table, plan)?)
    }

    /// Returns the exact throughput distribution with every machine in service.
    pub fn distribution_all_in_service(&self) -> Distribution<T> {
        let plan = MaintenancePlan::all_in_service(&self.topology);
        // The plan is derived from this topology and always fits the table.
        self.tree
            .evaluate(&self.table, &plan)
            .unwrap_or_else(|_| Distribution::zero())
    }

    /// Returns the expected throughput under `plan`.
    pub fn expected_throughput(&self, plan: &MaintenancePlan) -> Result<f64, EngineError> {
        Ok(self.distribution(plan)?.mean())
    }

    /// Returns the throughput when exactly the machines flagged `true` operate.
    pub fn throughput(&self, up: &[bool]) -> Result<T, EngineError> {
        Ok(self.fast.evaluate(up)?)
    }

    /// Returns the probability that exactly the machines flagged `true` operate.
    pub fn configuration_probability(&self, up: &[bool]) -> Result<f64, EngineError> {
        Ok(configuration_probability(&self.topology, up)?)
    }

    /// Returns a memoising tree evaluator bound to this system.
    pub fn cached_evaluator(&self, capacity: usize) -> CachedTreeEvaluator<'_, T> {
        CachedTreeEvaluator::new(&self.tree, &self.table, capacity)
    }

    /// Computes the throughput distribution by enumerating every machine
    /// state, weighting the fast evaluator's value by the state's probability.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::EnumerationTooLarge` if the topology has more
    /// than `MAX_ENUMERATED_MACHINES` machines.
    pub fn enumerate_distribution(&self) -> Result<Distribution<T>, EngineError> {
        let machines = self.topology.num_machines();
        if machines > MAX_ENUMERATED_MACHINES {
            return Err(EngineError::EnumerationTooLarge {
                machines,
                limit: MAX_ENUMERATED_MACHINES,
            });
        }

        let mut scratch = self.fast.scratch();
        let mut up = vec![false; machines];
        let mut outcomes: Vec<(T, f64)> = Vec::new();

        for state in 0u64..(1u64 << machines) {
            for (i, flag) in up.iter_mut().enumerate() {
                *flag = (state >> i) & 1 == 1;
            }

            let probability = configuration_probability(&self.topology, &up)?;
            if probability == 0.0 {
                continue;
            }
            let value = self.fast.evaluate_with(&mut scratch, &up)?;

            match outcomes.binary_search_by(|probe| cmp_throughput(&probe.0, &value)) {
                Ok(i) => outcomes[i].1 += probability,
                Err(i) => outcomes.insert(i, (value, probability)),
            }
        }

        tracing::debug!(
            machines,
            states = 1u64 << machines,
            outcomes = outcomes.len(),
            "enumerated machine states"
        );

        Ok(Distribution::from_outcomes(outcomes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::BlockMask;
    use blockflow_model::{index::BlockIndex, machine::Machine, topology::TopologyBuilder};

    const EPS: f64 = 1e-9;

    fn conveyor_line() -> ThroughputSystem<u32> {
        let mut builder = TopologyBuilder::new();
        builder
            .ordinary("Feed", [Machine::new("f1", 6, 0.9), Machine::new("f2", 3, 0.8)])
            .skip_start("outer", "Bypass", [Machine::new("b1", 3, 0.7)])
            .ordinary("Stacker", [Machine::new("st1", 4, 0.85)])
            .ordinary("Stockpile_Yard", [Machine::new("y1", 5, 0.95)])
            .skip_start("inner", "Shortcut", [Machine::new("sc1", 2, 0.6)])
            .ordinary("Reclaimer", [Machine::new("r1", 3, 0.9), Machine::new("r2", 3, 0.9)])
            .skip_end("inner")
            .ordinary("Conveyor", [Machine::new("cv1", 6, 0.95)])
            .skip_end("outer")
            .ordinary("Sink", [Machine::new("k1", 9, 0.99)]);
        ThroughputSystem::new(builder.build().unwrap()).unwrap()
    }

    #[test]
    fn test_enumeration_matches_tree() {
        let system = conveyor_line();
        let exact = system.distribution_all_in_service();
        let enumerated = system.enumerate_distribution().unwrap();
        assert!(exact.approx_eq(&enumerated, EPS), "{} vs {}", exact, enumerated);
    }

    #[test]
    fn test_expected_throughput_is_mean() {
        let system = conveyor_line();
        let plan = MaintenancePlan::all_in_service(system.topology());
        let expected = system.expected_throughput(&plan).unwrap();
        assert!((expected - system.distribution(&plan).unwrap().mean()).abs() < EPS);
        assert!(expected > 0.0 && expected <= 9.0);
    }

    #[test]
    fn test_maintenance_lowers_expected_throughput() {
        let system = conveyor_line();
        let full = MaintenancePlan::all_in_service(system.topology());
        let mut pulled = full.clone();
        pulled.set_mask(BlockIndex::new(0), BlockMask::from_bits(0b10));
        assert!(
            system.expected_throughput(&pulled).unwrap() < system.expected_throughput(&full).unwrap()
        );
    }

    #[test]
    fn test_errors_surface_as_engine_errors() {
        let system = conveyor_line();
        assert!(matches!(
            system.throughput(&[true]),
            Err(EngineError::MaskCardinality(_))
        ));
        assert!(matches!(
            system.configuration_probability(&[]),
            Err(EngineError::MaskCardinality(_))
        ));
        assert!(matches!(
            system.distribution(&MaintenancePlan::new(vec![])),
            Err(EngineError::MaskCardinality(_))
        ));
    }

    #[test]
    fn test_enumeration_limit() {
        let mut builder = TopologyBuilder::new();
        for b in 0..2 {
            let machines: Vec<Machine<u32>> = (0..13)
                .map(|i| Machine::new(format!("m{}_{}", b, i), 1, 0.5))
                .collect();
            builder.ordinary(format!("B{}", b), machines);
        }
        let system = ThroughputSystem::new(builder.build().unwrap()).unwrap();
        assert_eq!(
            system.enumerate_distribution(),
            Err(EngineError::EnumerationTooLarge {
                machines: 26,
                limit: MAX_ENUMERATED_MACHINES
            })
        );
    }

    #[test]
    fn test_cached_evaluator_agrees_with_system() {
        let system = conveyor_line();
        let mut cache = system.cached_evaluator(8);
        let plan = MaintenancePlan::all_in_service(system.topology());
        assert_eq!(cache.evaluate(&plan).unwrap(), &system.distribution(&plan).unwrap());
    }

    #[test]
    fn test_float_capacities() {
        let mut builder = TopologyBuilder::new();
        builder
            .ordinary("A", [Machine::new("a1", 2.5f64, 0.5), Machine::new("a2", 1.5, 0.5)])
            .ordinary("B", [Machine::new("b1", 3.0, 1.0)]);
        let system = ThroughputSystem::new(builder.build().unwrap()).unwrap();
        let line = system.distribution_all_in_service();
        // min(A, 3): A in {0, 1.5, 2.5, 4}
        assert!((line.probability_of(3.0) - 0.25).abs() < EPS);
        assert!((line.mean() - (1.5 + 2.5 + 3.0) / 4.0).abs() < EPS);
        assert_eq!(system.throughput(&[true, true, true]).unwrap(), 3.0);
    }

    #[test]
    fn test_float_evaluators_agree_exactly() {
        let mut builder = TopologyBuilder::new();
        builder.ordinary("Tripper", [
            Machine::new("t1", 0.1f64, 1.0),
            Machine::new("t2", 0.2, 1.0),
            Machine::new("t3", 0.3, 1.0),
        ]);
        let system = ThroughputSystem::new(builder.build().unwrap()).unwrap();
        let value = system.throughput(&[true, true, true]).unwrap();
        assert_eq!(system.distribution_all_in_service(), Distribution::certain(value));

        let mut builder = TopologyBuilder::new();
        builder
            .ordinary("Feed", [Machine::new("f1", 0.1f64, 0.9), Machine::new("f2", 0.2, 0.8)])
            .skip_start("s", "Bypass", [Machine::new("b1", 0.3, 0.7), Machine::new("b2", 0.6, 0.5)])
            .ordinary("Main", [Machine::new("m1", 0.1, 0.9), Machine::new("m2", 0.7, 0.6)])
            .skip_end("s")
            .ordinary("Sink", [Machine::new("k1", 1.7, 0.95)]);
        let system = ThroughputSystem::new(builder.build().unwrap()).unwrap();
        let exact = system.distribution_all_in_service();
        let enumerated = system.enumerate_distribution().unwrap();
        assert!(exact.approx_eq(&enumerated, EPS), "{} vs {}", exact, enumerated);
    }
}
