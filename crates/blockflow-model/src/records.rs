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

//! Normalisation of flat component records into a `Topology`.
//!
//! Component tables list one machine per row together with the block it
//! belongs to and, for bypass blocks, the block the bypass rejoins. The rules:
//!
//! - rows group into blocks by `block_id`, in first-appearance order;
//! - a block with a non-empty `skips_to` becomes `SkipStart(block_id)` and a
//!   `SkipEnd(block_id)` marker is placed immediately before the first later
//!   block whose id equals `skips_to`; several markers landing on the same
//!   block close the innermost scope first;
//! - machines with zero capacity or zero availability are structurally
//!   absent and dropped; a block left without machines is dropped too (its
//!   position still receives any markers scheduled there).

use crate::{
    block::{Block, BlockKind},
    error::StructuralTopologyError,
    machine::Machine,
    topology::{Topology, TopologyBuilder},
};
use blockflow_core::num::throughput::Throughput;
use num_traits::Zero;
use std::collections::HashMap;

/// One already-parsed row of a component table.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentRecord<T> {
    /// Machine identifier.
    pub component: String,
    /// Identifier of the block the machine belongs to.
    pub block_id: String,
    /// Identifier of the block a bypass rejoins before; empty for ordinary blocks.
    pub skips_to: String,
    pub capacity: T,
    /// Probability that the machine is operational.
    pub availability: f64,
}

impl<T> ComponentRecord<T>
where
    T: Throughput,
{
    /// Creates a record of an ordinary block.
    #[inline]
    pub fn new(
        component: impl Into<String>,
        block_id: impl Into<String>,
        capacity: T,
        availability: f64,
    ) -> Self {
        Self {
            component: component.into(),
            block_id: block_id.into(),
            skips_to: String::new(),
            capacity,
            availability,
        }
    }

    /// Marks the record's block as a bypass rejoining before `target`.
    #[inline]
    pub fn skipping_to(mut self, target: impl Into<String>) -> Self {
        self.skips_to = target.into();
        self
    }

    #[inline]
    fn is_absent(&self) -> bool {
        self.capacity.is_zero() || self.availability == 0.0
    }
}

#[derive(Debug)]
struct GroupedBlock<T> {
    block_id: String,
    skips_to: Option<String>,
    machines: Vec<Machine<T>>,
}

/// Groups records by block, in first-appearance order.
fn group_records<T>(records: &[ComponentRecord<T>]) -> Vec<GroupedBlock<T>>
where
    T: Throughput,
{
    let mut groups: Vec<GroupedBlock<T>> = Vec::new();
    let mut position: HashMap<&str, usize> = HashMap::new();

    for record in records {
        let index = *position.entry(record.block_id.as_str()).or_insert_with(|| {
            groups.push(GroupedBlock {
                block_id: record.block_id.clone(),
                skips_to: None,
                machines: Vec::new(),
            });
            groups.len() - 1
        });

        let group = &mut groups[index];
        if group.skips_to.is_none() && !record.skips_to.is_empty() {
            group.skips_to = Some(record.skips_to.clone());
        }

        if record.is_absent() {
            tracing::debug!(
                component = %record.component,
                block = %record.block_id,
                "dropping structurally absent machine"
            );
            continue;
        }
        group.machines.push(Machine::new(
            record.component.clone(),
            record.capacity,
            record.availability,
        ));
    }

    groups
}

/// Builds a validated `Topology` from component records.
///
/// # Errors
///
/// Returns a `StructuralTopologyError` if the normalised block sequence
/// violates any structural rule, for example when a `skips_to` target never
/// appears after its bypass block.
///
/// # Examples
///
/// ```rust
/// # use blockflow_model::records::{ComponentRecord, topology_from_records};
/// let records = vec![
///     ComponentRecord::new("F1", "Feeder", 6u32, 0.95),
///     ComponentRecord::new("SL1", "Shiploader", 4, 0.9).skipping_to("Sink"),
///     ComponentRecord::new("ST1", "Stacker", 3, 0.9),
///     ComponentRecord::new("ST2", "Stacker", 0, 0.9),
///     ComponentRecord::new("S1", "Sink", 8, 0.99),
/// ];
/// let topology = topology_from_records(&records).unwrap();
/// // Feeder, Shiploader, Stacker, Shiploader_end, Sink
/// assert_eq!(topology.num_blocks(), 5);
/// // ST2 has zero capacity and is dropped.
/// assert_eq!(topology.num_machines(), 4);
/// ```
pub fn topology_from_records<T>(
    records: &[ComponentRecord<T>],
) -> Result<Topology<T>, StructuralTopologyError>
where
    T: Throughput,
{
    let groups = group_records(records);
    let mut builder = TopologyBuilder::with_capacity(groups.len() * 2);
    // target block id -> scopes to close before it, in opening order
    let mut pending_ends: HashMap<String, Vec<String>> = HashMap::new();

    for group in groups {
        if let Some(scopes) = pending_ends.remove(&group.block_id) {
            for scope in scopes.into_iter().rev() {
                builder.skip_end(scope);
            }
        }

        if group.machines.is_empty() {
            tracing::debug!(block = %group.block_id, "dropping block without machines");
            continue;
        }

        let kind = match group.skips_to {
            Some(target) => {
                pending_ends
                    .entry(target)
                    .or_default()
                    .push(group.block_id.clone());
                BlockKind::SkipStart(group.block_id.clone())
            }
            None => BlockKind::Ordinary,
        };
        builder.add_block(Block::new(kind, group.block_id, group.machines));
    }

    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::BlockIndex;

    fn kinds(topology: &Topology<u32>) -> Vec<String> {
        topology
            .blocks()
            .map(|b| topology.block_kind(b).to_string())
            .collect()
    }

    fn identifiers(topology: &Topology<u32>) -> Vec<&str> {
        topology
            .blocks()
            .map(|b| topology.block_identifier(b))
            .collect()
    }

    #[test]
    fn test_records_group_in_first_appearance_order() {
        let records = vec![
            ComponentRecord::new("a1", "A", 2u32, 0.9),
            ComponentRecord::new("b1", "B", 3, 0.8),
            ComponentRecord::new("a2", "A", 2, 0.9),
        ];
        let topology = topology_from_records(&records).unwrap();
        assert_eq!(identifiers(&topology), vec!["A", "B"]);
        assert_eq!(topology.block_capacities(BlockIndex::new(0)), &[2, 2]);
    }

    #[test]
    fn test_absent_machines_are_dropped() {
        let records = vec![
            ComponentRecord::new("a1", "A", 2u32, 0.9),
            ComponentRecord::new("a2", "A", 0, 0.9),
            ComponentRecord::new("a3", "A", 5, 0.0),
            ComponentRecord::new("b1", "B", 0, 1.0),
            ComponentRecord::new("c1", "C", 4, 0.7),
        ];
        let topology = topology_from_records(&records).unwrap();
        assert_eq!(identifiers(&topology), vec!["A", "C"]);
        assert_eq!(topology.num_machines(), 2);
    }

    #[test]
    fn test_block_named_like_skip_end_reports_clash() {
        let records = vec![
            ComponentRecord::new("s", "Skip", 4u32, 0.9).skipping_to("Sink"),
            ComponentRecord::new("c", "Skip_end", 3, 0.9),
            ComponentRecord::new("k", "Sink", 6, 0.9),
        ];
        assert_eq!(
            topology_from_records(&records).unwrap_err(),
            StructuralTopologyError::SkipEndIdentifierClash {
                identifier: "Skip_end".to_string(),
                scope: "Skip".to_string(),
            }
        );
    }

    #[test]
    fn test_skip_end_placed_before_target() {
        let records = vec![
            ComponentRecord::new("f", "Feed", 5u32, 0.9),
            ComponentRecord::new("s", "Skip", 4, 0.9).skipping_to("Sink"),
            ComponentRecord::new("c", "Cont", 3, 0.9),
            ComponentRecord::new("k", "Sink", 6, 0.9),
        ];
        let topology = topology_from_records(&records).unwrap();
        assert_eq!(
            kinds(&topology),
            vec![
                "Ordinary",
                "SkipStart(Skip)",
                "Ordinary",
                "SkipEnd(Skip)",
                "Ordinary"
            ]
        );
        assert_eq!(topology.block_identifier(BlockIndex::new(3)), "Skip_end");
    }

    #[test]
    fn test_nested_ends_close_innermost_first() {
        let records = vec![
            ComponentRecord::new("o", "Outer", 4u32, 0.9).skipping_to("Sink"),
            ComponentRecord::new("c1", "C1", 3, 0.9),
            ComponentRecord::new("i", "Inner", 2, 0.9).skipping_to("Sink"),
            ComponentRecord::new("c2", "C2", 3, 0.9),
            ComponentRecord::new("k", "Sink", 6, 0.9),
        ];
        let topology = topology_from_records(&records).unwrap();
        assert_eq!(
            kinds(&topology),
            vec![
                "SkipStart(Outer)",
                "Ordinary",
                "SkipStart(Inner)",
                "Ordinary",
                "SkipEnd(Inner)",
                "SkipEnd(Outer)",
                "Ordinary"
            ]
        );
    }

    #[test]
    fn test_dropped_target_still_receives_marker() {
        let records = vec![
            ComponentRecord::new("s", "Skip", 4u32, 0.9).skipping_to("Gone"),
            ComponentRecord::new("c", "Cont", 3, 0.9),
            ComponentRecord::new("g", "Gone", 0, 0.9),
            ComponentRecord::new("k", "Sink", 6, 0.9),
        ];
        let topology = topology_from_records(&records).unwrap();
        assert_eq!(identifiers(&topology), vec!["Skip", "Cont", "Skip_end", "Sink"]);
    }

    #[test]
    fn test_dropped_bypass_opens_no_scope() {
        let records = vec![
            ComponentRecord::new("s", "Skip", 4u32, 0.0).skipping_to("Sink"),
            ComponentRecord::new("c", "Cont", 3, 0.9),
            ComponentRecord::new("k", "Sink", 6, 0.9),
        ];
        let topology = topology_from_records(&records).unwrap();
        assert_eq!(identifiers(&topology), vec!["Cont", "Sink"]);
    }

    #[test]
    fn test_missing_target_is_unterminated() {
        let records = vec![
            ComponentRecord::new("s", "Skip", 4u32, 0.9).skipping_to("Nowhere"),
            ComponentRecord::new("c", "Cont", 3, 0.9),
        ];
        assert_eq!(
            topology_from_records(&records).unwrap_err(),
            StructuralTopologyError::UnterminatedScope {
                scope: "Skip".into()
            }
        );
    }

    #[test]
    fn test_backward_target_is_unterminated() {
        let records = vec![
            ComponentRecord::new("a", "A", 4u32, 0.9),
            ComponentRecord::new("s", "Skip", 4, 0.9).skipping_to("A"),
            ComponentRecord::new("c", "Cont", 3, 0.9),
        ];
        assert!(matches!(
            topology_from_records(&records),
            Err(StructuralTopologyError::UnterminatedScope { .. })
        ));
    }

    #[test]
    fn test_no_records_is_empty_topology() {
        let records: Vec<ComponentRecord<u32>> = Vec::new();
        assert_eq!(
            topology_from_records(&records).unwrap_err(),
            StructuralTopologyError::EmptyTopology
        );
    }
}
