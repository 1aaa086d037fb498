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

//! Bounded memoisation of tree evaluations.
//!
//! Tree evaluation is a pure function of the maintenance plan, so repeated
//! plans (planning sweeps, what-if loops) can reuse earlier results. The
//! cache keys on the full mask vector and holds at most
//! `min(capacity, number of distinct plans)` entries, expiring the oldest
//! entry first once full. One cache per thread; it is not synchronised.

use crate::{
    distribution::Distribution, error::MaskCardinalityError, mask::{BlockMask, MaintenancePlan},
    table::BlockDistributionTable, tree::node::OperationTree,
};
use blockflow_core::num::throughput::Throughput;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Hit, miss and eviction counters of a `CachedTreeEvaluator`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStatistics {
    #[inline]
    pub fn lookups(&self) -> u64 {
        self.hits.saturating_add(self.misses)
    }

    /// Returns the fraction of lookups served from the cache.
    #[inline]
    pub fn hit_rate(&self) -> f64 {
        match self.lookups() {
            0 => 0.0,
            lookups => self.hits as f64 / lookups as f64,
        }
    }
}

impl std::fmt::Display for CacheStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Evaluation Cache Statistics:")?;
        writeln!(f, "   Hits:        {}", self.hits)?;
        writeln!(f, "   Misses:      {}", self.misses)?;
        writeln!(f, "   Evictions:   {}", self.evictions)?;
        writeln!(f, "   Hit Rate:    {:.2}%", self.hit_rate() * 100.0)?;
        Ok(())
    }
}

/// A tree evaluator that remembers recent plans.
///
/// # Examples
///
/// ```rust
/// # use blockflow_engine::{cache::CachedTreeEvaluator, mask::MaintenancePlan, table::BlockDistributionTable, tree::node::OperationTree};
/// # use blockflow_model::{machine::Machine, topology::TopologyBuilder};
/// let mut builder = TopologyBuilder::<u32>::new();
/// builder.ordinary("A", [Machine::new("a1", 3, 0.9)]);
/// let topology = builder.build().unwrap();
/// let table = BlockDistributionTable::new(&topology);
/// let tree = OperationTree::from_topology(&topology).unwrap();
///
/// let mut cache = CachedTreeEvaluator::new(&tree, &table, 16);
/// let plan = MaintenancePlan::all_in_service(&topology);
/// let first = cache.evaluate(&plan).unwrap().clone();
/// assert_eq!(cache.evaluate(&plan).unwrap(), &first);
/// assert_eq!(cache.statistics().hits, 1);
/// ```
#[derive(Debug)]
pub struct CachedTreeEvaluator<'a, T> {
    tree: &'a OperationTree,
    table: &'a BlockDistributionTable<T>,
    capacity: usize,
    entries: FxHashMap<Box<[BlockMask]>, Distribution<T>>,
    order: VecDeque<Box<[BlockMask]>>, // insertion order, oldest first
    statistics: CacheStatistics,
}

impl<'a, T> CachedTreeEvaluator<'a, T>
where
    T: Throughput,
{
    /// Creates an empty cache holding at most `capacity` results.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(
        tree: &'a OperationTree,
        table: &'a BlockDistributionTable<T>,
        capacity: usize,
    ) -> Self {
        assert!(capacity > 0, "called `CachedTreeEvaluator::new()` with zero capacity");

        // The number of distinct plans is 2^(total machines).
        let total_machines: usize = (0..table.num_blocks())
            .map(|b| table.num_block_machines(blockflow_model::index::BlockIndex::new(b)))
            .sum();
        let plan_space = u32::try_from(total_machines)
            .ok()
            .and_then(|bits| 1usize.checked_shl(bits))
            .unwrap_or(usize::MAX);
        let capacity = capacity.min(plan_space);

        Self {
            tree,
            table,
            capacity,
            entries: FxHashMap::default(),
            order: VecDeque::new(),
            statistics: CacheStatistics::default(),
        }
    }

    /// Returns the effective bound on stored results.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn statistics(&self) -> CacheStatistics {
        self.statistics
    }

    /// Drops every stored result. Statistics are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    /// Evaluates `plan`, serving repeated plans from the cache.
    ///
    /// # Errors
    ///
    /// Returns a `MaskCardinalityError` if `plan` does not fit the table.
    pub fn evaluate(&mut self, plan: &MaintenancePlan) -> Result<&Distribution<T>, MaskCardinalityError> {
        let key = plan.masks();
        if self.entries.contains_key(key) {
            self.statistics.hits = self.statistics.hits.saturating_add(1);
            return Ok(&self.entries[key]);
        }

        let distribution = self.tree.evaluate(self.table, plan)?;
        self.statistics.misses = self.statistics.misses.saturating_add(1);

        if self.entries.len() >= self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.entries.remove(&oldest);
            self.statistics.evictions = self.statistics.evictions.saturating_add(1);
        }

        let owned: Box<[BlockMask]> = key.into();
        self.order.push_back(owned.clone());
        self.entries.insert(owned, distribution);

        Ok(&self.entries[key])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockflow_model::{index::BlockIndex, machine::Machine, topology::{Topology, TopologyBuilder}};

    fn topology() -> Topology<u32> {
        let mut builder = TopologyBuilder::new();
        builder
            .ordinary("A", [Machine::new("a1", 3, 0.9), Machine::new("a2", 3, 0.9)])
            .ordinary("B", [Machine::new("b1", 5, 0.8)]);
        builder.build().unwrap()
    }

    fn plan(a: u32, b: u32) -> MaintenancePlan {
        MaintenancePlan::new(vec![BlockMask::from_bits(a), BlockMask::from_bits(b)])
    }

    #[test]
    fn test_hit_returns_identical_distribution() {
        let topology = topology();
        let table = BlockDistributionTable::new(&topology);
        let tree = OperationTree::from_topology(&topology).unwrap();
        let mut cache = CachedTreeEvaluator::new(&tree, &table, 4);

        let direct = tree.evaluate(&table, &plan(0b11, 1)).unwrap();
        assert_eq!(cache.evaluate(&plan(0b11, 1)).unwrap(), &direct);
        assert_eq!(cache.evaluate(&plan(0b11, 1)).unwrap(), &direct);

        let stats = cache.statistics();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_capacity_bounded_by_plan_space() {
        let topology = topology();
        let table = BlockDistributionTable::new(&topology);
        let tree = OperationTree::from_topology(&topology).unwrap();
        let cache = CachedTreeEvaluator::new(&tree, &table, 1000);
        assert_eq!(cache.capacity(), 8);
    }

    #[test]
    fn test_evicts_oldest_entry_when_full() {
        let topology = topology();
        let table = BlockDistributionTable::new(&topology);
        let tree = OperationTree::from_topology(&topology).unwrap();
        let mut cache = CachedTreeEvaluator::new(&tree, &table, 2);

        cache.evaluate(&plan(0b11, 1)).unwrap();
        cache.evaluate(&plan(0b01, 1)).unwrap();
        cache.evaluate(&plan(0b10, 1)).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.statistics().evictions, 1);

        // The first plan was evicted and misses again.
        cache.evaluate(&plan(0b11, 1)).unwrap();
        assert_eq!(cache.statistics().misses, 4);
        assert_eq!(cache.statistics().hits, 0);

        // The third plan is still cached.
        cache.evaluate(&plan(0b10, 1)).unwrap();
        assert_eq!(cache.statistics().hits, 1);
        assert!(cache.len() <= cache.capacity());
    }

    #[test]
    fn test_invalid_plan_is_not_cached() {
        let topology = topology();
        let table = BlockDistributionTable::new(&topology);
        let tree = OperationTree::from_topology(&topology).unwrap();
        let mut cache = CachedTreeEvaluator::new(&tree, &table, 2);
        assert!(cache.evaluate(&MaintenancePlan::new(vec![BlockMask::EMPTY])).is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.statistics().lookups(), 0);

        let mut plan = MaintenancePlan::all_in_service(&topology);
        plan.set_mask(BlockIndex::new(1), BlockMask::from_bits(0b10));
        assert!(cache.evaluate(&plan).is_err());
    }

    #[test]
    #[should_panic(expected = "called `CachedTreeEvaluator::new()` with zero capacity")]
    fn test_zero_capacity_panics() {
        let topology = topology();
        let table = BlockDistributionTable::new(&topology);
        let tree = OperationTree::from_topology(&topology).unwrap();
        let _ = CachedTreeEvaluator::new(&tree, &table, 0);
    }
}
