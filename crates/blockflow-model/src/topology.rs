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

//! The validated, immutable production-line topology and its builder.
//!
//! `TopologyBuilder` collects owned `Block` descriptions in flow order and
//! `TopologyBuilder::build` checks every structural rule once:
//!
//! - each machine-bearing block has between one and `MAX_MACHINES_PER_BLOCK`
//!   machines, at least one of which can operate, and every machine is well formed;
//! - block identifiers are unique;
//! - skip scopes open with their first `SkipStart`, close with exactly one
//!   later `SkipEnd`, nest without overlapping and are never reopened;
//! - every scope bypasses something (its continuation path is non-empty);
//! - no stockpile opens a scope or directly precedes a scope's end.
//!
//! The resulting `Topology` stores machines in flat vectors with one offset
//! window per block.

use crate::{
    block::{Block, BlockKind, MAX_MACHINES_PER_BLOCK, is_stockpile_identifier},
    error::StructuralTopologyError,
    index::{BlockIndex, MachineIndex},
    machine::Machine,
};
use blockflow_core::num::{
    probability::is_probability,
    throughput::{Throughput, is_valid_throughput},
};
use std::collections::{HashMap, HashSet};
use std::ops::Range;

/// An immutable, validated production line.
///
/// Blocks are stored in flow order. Machine data is flattened:
/// `capacities[machine_range(b)]` are the capacities of block `b`.
///
/// Construction:
/// - Use `TopologyBuilder` and call `TopologyBuilder::build`.
#[derive(Clone, Debug)]
pub struct Topology<T> {
    kinds: Vec<BlockKind>,        // len = num_blocks
    identifiers: Vec<String>,     // len = num_blocks
    machine_offsets: Vec<usize>,  // len = num_blocks + 1
    machine_ids: Vec<String>,     // len = num_machines
    capacities: Vec<T>,           // len = num_machines
    availabilities: Vec<f64>,     // len = num_machines
    index_by_identifier: HashMap<String, BlockIndex>,
}

impl<T> Topology<T>
where
    T: Throughput,
{
    /// Returns the number of blocks, scope markers included.
    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.kinds.len()
    }

    /// Returns the number of machines across all blocks.
    #[inline]
    pub fn num_machines(&self) -> usize {
        self.capacities.len()
    }

    /// Iterates over all block indices in flow order.
    #[inline]
    pub fn blocks(&self) -> impl DoubleEndedIterator<Item = BlockIndex> + ExactSizeIterator {
        BlockIndex::range(self.num_blocks())
    }

    /// Returns the kind of the given block.
    ///
    /// # Panics
    ///
    /// Panics if `block_index` is out of bounds.
    #[inline]
    pub fn block_kind(&self, block_index: BlockIndex) -> &BlockKind {
        &self.kinds[block_index.get()]
    }

    /// Returns the identifier of the given block.
    ///
    /// # Panics
    ///
    /// Panics if `block_index` is out of bounds.
    #[inline]
    pub fn block_identifier(&self, block_index: BlockIndex) -> &str {
        &self.identifiers[block_index.get()]
    }

    /// Looks up a block by identifier.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use blockflow_model::{machine::Machine, topology::TopologyBuilder};
    /// let mut builder = TopologyBuilder::<u32>::new();
    /// builder.ordinary("Feeder", [Machine::new("F1", 3, 0.9)]);
    /// builder.ordinary("Sink", [Machine::new("S1", 5, 0.8)]);
    /// let topology = builder.build().unwrap();
    /// assert_eq!(topology.block_index("Sink").map(|b| b.get()), Some(1));
    /// assert!(topology.block_index("Missing").is_none());
    /// ```
    #[inline]
    pub fn block_index(&self, identifier: &str) -> Option<BlockIndex> {
        self.index_by_identifier.get(identifier).copied()
    }

    /// Returns the window of the given block in the flattened machine vectors.
    ///
    /// # Panics
    ///
    /// Panics if `block_index` is out of bounds.
    #[inline]
    pub fn machine_range(&self, block_index: BlockIndex) -> Range<usize> {
        let index = block_index.get();
        debug_assert!(
            index < self.num_blocks(),
            "called `Topology::machine_range` with block index out of bounds: the len is {} but the index is {}",
            self.num_blocks(),
            index
        );

        self.machine_offsets[index]..self.machine_offsets[index + 1]
    }

    /// Returns the number of machines of the given block.
    #[inline]
    pub fn num_block_machines(&self, block_index: BlockIndex) -> usize {
        self.machine_range(block_index).len()
    }

    /// Returns the largest machine count of any block.
    #[inline]
    pub fn max_block_machines(&self) -> usize {
        self.blocks()
            .map(|b| self.num_block_machines(b))
            .max()
            .unwrap_or(0)
    }

    /// Returns the capacities of the machines of the given block.
    #[inline]
    pub fn block_capacities(&self, block_index: BlockIndex) -> &[T] {
        &self.capacities[self.machine_range(block_index)]
    }

    /// Returns the availabilities of the machines of the given block.
    #[inline]
    pub fn block_availabilities(&self, block_index: BlockIndex) -> &[f64] {
        &self.availabilities[self.machine_range(block_index)]
    }

    /// Returns `true` if the block is a machine-bearing stockpile.
    #[inline]
    pub fn is_stockpile(&self, block_index: BlockIndex) -> bool {
        let index = block_index.get();
        !self.kinds[index].is_skip_end() && is_stockpile_identifier(&self.identifiers[index])
    }

    /// Returns all machine capacities in flow order.
    #[inline]
    pub fn capacities(&self) -> &[T] {
        &self.capacities
    }

    /// Returns all machine availabilities in flow order.
    #[inline]
    pub fn availabilities(&self) -> &[f64] {
        &self.availabilities
    }

    /// Returns the id of the given machine.
    ///
    /// # Panics
    ///
    /// Panics if `machine_index` is out of bounds.
    #[inline]
    pub fn machine_id(&self, machine_index: MachineIndex) -> &str {
        &self.machine_ids[machine_index.get()]
    }

    /// Returns the capacity of the given machine.
    ///
    /// # Panics
    ///
    /// Panics if `machine_index` is out of bounds.
    #[inline]
    pub fn machine_capacity(&self, machine_index: MachineIndex) -> T {
        self.capacities[machine_index.get()]
    }

    /// Returns the availability of the given machine.
    ///
    /// # Panics
    ///
    /// Panics if `machine_index` is out of bounds.
    #[inline]
    pub fn machine_availability(&self, machine_index: MachineIndex) -> f64 {
        self.availabilities[machine_index.get()]
    }
}

impl<T> std::fmt::Display for Topology<T>
where
    T: Throughput,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Topology ({} blocks, {} machines)",
            self.num_blocks(),
            self.num_machines()
        )?;
        for block in self.blocks() {
            writeln!(
                f,
                "   {:<24} | {:<20} | {} machines",
                self.block_identifier(block),
                self.block_kind(block).to_string(),
                self.num_block_machines(block)
            )?;
        }
        Ok(())
    }
}

/// Assembles a `Topology` block by block in flow order.
///
/// # Examples
///
/// ```rust
/// # use blockflow_model::{machine::Machine, topology::TopologyBuilder};
/// let mut builder = TopologyBuilder::<u32>::new();
/// builder
///     .ordinary("Feeder", [Machine::new("F1", 6, 0.95)])
///     .skip_start("Bypass", "Shiploader", [Machine::new("SL1", 4, 0.9)])
///     .ordinary("Stacker", [Machine::new("ST1", 3, 0.9), Machine::new("ST2", 3, 0.9)])
///     .skip_end("Bypass")
///     .ordinary("Sink", [Machine::new("S1", 8, 0.99)]);
///
/// let topology = builder.build().unwrap();
/// assert_eq!(topology.num_blocks(), 5);
/// assert_eq!(topology.num_machines(), 5);
/// ```
#[derive(Clone, Debug)]
pub struct TopologyBuilder<T> {
    blocks: Vec<Block<T>>,
}

impl<T> Default for TopologyBuilder<T>
where
    T: Throughput,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TopologyBuilder<T>
where
    T: Throughput,
{
    /// Creates an empty builder.
    #[inline]
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// Creates an empty builder with room for `num_blocks` blocks.
    #[inline]
    pub fn with_capacity(num_blocks: usize) -> Self {
        Self {
            blocks: Vec::with_capacity(num_blocks),
        }
    }

    /// Returns the number of blocks added so far.
    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Appends a block description.
    #[inline]
    pub fn add_block(&mut self, block: Block<T>) -> &mut Self {
        self.blocks.push(block);
        self
    }

    /// Appends an ordinary block.
    #[inline]
    pub fn ordinary<I>(&mut self, identifier: impl Into<String>, machines: I) -> &mut Self
    where
        I: IntoIterator<Item = Machine<T>>,
    {
        self.add_block(Block::new(
            BlockKind::Ordinary,
            identifier,
            machines.into_iter().collect(),
        ))
    }

    /// Appends a block to the skip path of `scope`, opening the scope if it
    /// is the first block of that scope.
    #[inline]
    pub fn skip_start<I>(
        &mut self,
        scope: impl Into<String>,
        identifier: impl Into<String>,
        machines: I,
    ) -> &mut Self
    where
        I: IntoIterator<Item = Machine<T>>,
    {
        self.add_block(Block::new(
            BlockKind::SkipStart(scope.into()),
            identifier,
            machines.into_iter().collect(),
        ))
    }

    /// Appends the marker closing `scope`.
    #[inline]
    pub fn skip_end(&mut self, scope: impl Into<String>) -> &mut Self {
        self.add_block(Block::skip_end(scope))
    }

    /// Validates the collected blocks and produces the immutable `Topology`.
    pub fn build(self) -> Result<Topology<T>, StructuralTopologyError> {
        let num_blocks = self.blocks.len();
        let num_machines: usize = self.blocks.iter().map(|b| b.machines().len()).sum();

        let mut topology = Topology {
            kinds: Vec::with_capacity(num_blocks),
            identifiers: Vec::with_capacity(num_blocks),
            machine_offsets: Vec::with_capacity(num_blocks + 1),
            machine_ids: Vec::with_capacity(num_machines),
            capacities: Vec::with_capacity(num_machines),
            availabilities: Vec::with_capacity(num_machines),
            index_by_identifier: HashMap::with_capacity(num_blocks),
        };
        topology.machine_offsets.push(0);

        for block in self.blocks {
            let (kind, identifier, machines) = block.into_parts();
            validate_block(&kind, &identifier, &machines)?;

            if let Some(&existing) = topology.index_by_identifier.get(&identifier) {
                // A generated `{scope}_end` marker name taken by a real block.
                let marker = [&kind, &topology.kinds[existing.get()]]
                    .into_iter()
                    .find_map(|k| match k {
                        BlockKind::SkipEnd(scope) => Some(scope.clone()),
                        _ => None,
                    });
                return Err(match marker {
                    Some(scope) => StructuralTopologyError::SkipEndIdentifierClash { identifier, scope },
                    None => StructuralTopologyError::DuplicateBlockIdentifier { identifier },
                });
            }
            let block_index = BlockIndex::new(topology.kinds.len());
            topology
                .index_by_identifier
                .insert(identifier.clone(), block_index);

            for machine in machines {
                topology.capacities.push(machine.capacity());
                topology.availabilities.push(machine.availability());
                topology.machine_ids.push(machine.id().to_string());
            }
            topology.machine_offsets.push(topology.capacities.len());
            topology.kinds.push(kind);
            topology.identifiers.push(identifier);
        }

        if topology.kinds.iter().all(BlockKind::is_skip_end) {
            return Err(StructuralTopologyError::EmptyTopology);
        }

        validate_scopes(&topology.kinds, &topology.identifiers)?;

        tracing::debug!(
            blocks = topology.num_blocks(),
            machines = topology.num_machines(),
            "built topology"
        );

        Ok(topology)
    }
}

fn validate_block<T>(
    kind: &BlockKind,
    identifier: &str,
    machines: &[Machine<T>],
) -> Result<(), StructuralTopologyError>
where
    T: Throughput,
{
    if let BlockKind::SkipEnd(scope) = kind {
        if !machines.is_empty() {
            return Err(StructuralTopologyError::SkipEndWithMachines {
                scope: scope.clone(),
            });
        }
        return Ok(());
    }

    if machines.len() > MAX_MACHINES_PER_BLOCK {
        return Err(StructuralTopologyError::TooManyMachines {
            identifier: identifier.to_string(),
            count: machines.len(),
            limit: MAX_MACHINES_PER_BLOCK,
        });
    }

    for machine in machines {
        let reason = if !is_valid_throughput(machine.capacity()) {
            Some("capacity must be a finite non-negative number")
        } else if !is_probability(machine.availability()) {
            Some("availability must lie in [0, 1]")
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(StructuralTopologyError::InvalidMachine {
                block: identifier.to_string(),
                machine: machine.id().to_string(),
                reason,
            });
        }
    }

    if !machines.iter().any(Machine::contributes) {
        return Err(StructuralTopologyError::EmptyBlock {
            identifier: identifier.to_string(),
        });
    }

    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ScopePath {
    Skip,
    Continuation,
}

#[derive(Debug)]
struct OpenScope<'a> {
    scope: &'a str,
    active: ScopePath,
    has_continuation: bool,
}

/// Checks the pairing, nesting and boundary rules of skip scopes.
fn validate_scopes(
    kinds: &[BlockKind],
    identifiers: &[String],
) -> Result<(), StructuralTopologyError> {
    let mut open: Vec<OpenScope<'_>> = Vec::new();
    let mut closed: HashSet<&str> = HashSet::new();
    let is_stockpile =
        |i: usize| !kinds[i].is_skip_end() && is_stockpile_identifier(&identifiers[i]);

    for (i, kind) in kinds.iter().enumerate() {
        match kind {
            BlockKind::Ordinary => {
                if let Some(top) = open.last_mut() {
                    top.active = ScopePath::Continuation;
                    top.has_continuation = true;
                }
            }
            BlockKind::SkipStart(scope) => {
                match open.iter().rposition(|o| o.scope == scope) {
                    Some(pos) if pos + 1 == open.len() => open[pos].active = ScopePath::Skip,
                    Some(_) => {
                        let inner = open.last().map(|o| o.scope).unwrap_or_default();
                        return Err(StructuralTopologyError::OverlappingScopes {
                            outer: scope.clone(),
                            inner: inner.to_string(),
                        });
                    }
                    None => {
                        if closed.contains(scope.as_str()) {
                            return Err(StructuralTopologyError::ReopenedScope {
                                scope: scope.clone(),
                            });
                        }
                        if is_stockpile(i) {
                            return Err(StructuralTopologyError::StockpileOnScopeBoundary {
                                identifier: identifiers[i].clone(),
                                scope: scope.clone(),
                            });
                        }
                        open.push(OpenScope {
                            scope,
                            active: ScopePath::Skip,
                            has_continuation: false,
                        });
                    }
                }
            }
            BlockKind::SkipEnd(scope) => {
                let Some(top) = open.last() else {
                    return Err(StructuralTopologyError::UnmatchedSkipEnd {
                        scope: scope.clone(),
                    });
                };

                if top.scope != scope {
                    return Err(if open.iter().any(|o| o.scope == scope) {
                        StructuralTopologyError::OverlappingScopes {
                            outer: scope.clone(),
                            inner: top.scope.to_string(),
                        }
                    } else {
                        StructuralTopologyError::UnmatchedSkipEnd {
                            scope: scope.clone(),
                        }
                    });
                }

                if !top.has_continuation {
                    return Err(StructuralTopologyError::EmptyContinuation {
                        scope: scope.clone(),
                    });
                }

                if i > 0 && is_stockpile(i - 1) {
                    return Err(StructuralTopologyError::StockpileOnScopeBoundary {
                        identifier: identifiers[i - 1].clone(),
                        scope: scope.clone(),
                    });
                }

                open.pop();
                closed.insert(scope.as_str());

                // A nested scope's result joins its parent's active path.
                if let Some(parent) = open.last_mut()
                    && parent.active == ScopePath::Continuation
                {
                    parent.has_continuation = true;
                }
            }
        }
    }

    if let Some(top) = open.last() {
        return Err(StructuralTopologyError::UnterminatedScope {
            scope: top.scope.to_string(),
        });
    }

    Ok(())
}
