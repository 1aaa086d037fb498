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

//! Maintenance masks.
//!
//! A `BlockMask` marks which machines of one block are in service (bit `i`
//! set) and which are pulled for planned maintenance (bit `i` clear). A
//! `MaintenancePlan` holds one mask per block of a topology, in flow order.

use crate::error::MaskCardinalityError;
use blockflow_core::num::throughput::Throughput;
use blockflow_model::{index::BlockIndex, topology::Topology};

/// Per-block bitmask of machines in service.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockMask(u32);

impl BlockMask {
    /// No machine in service.
    pub const EMPTY: Self = Self(0);

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns the mask with the first `num_machines` machines in service.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use blockflow_engine::mask::BlockMask;
    /// assert_eq!(BlockMask::all(3).bits(), 0b111);
    /// assert_eq!(BlockMask::all(0), BlockMask::EMPTY);
    /// ```
    #[inline]
    pub const fn all(num_machines: usize) -> Self {
        debug_assert!(num_machines < 32);
        Self((1u32 << num_machines) - 1)
    }

    /// Builds a mask from per-machine in-service flags.
    #[inline]
    pub fn from_flags(flags: &[bool]) -> Self {
        debug_assert!(flags.len() < 32);
        Self(
            flags
                .iter()
                .enumerate()
                .fold(0u32, |bits, (i, &up)| bits | (u32::from(up) << i)),
        )
    }

    #[inline]
    pub const fn is_in_service(self, machine: usize) -> bool {
        (self.0 >> machine) & 1 == 1
    }

    #[inline]
    pub const fn count_in_service(self) -> u32 {
        self.0.count_ones()
    }

    /// Returns the mask with `machine` pulled for maintenance.
    #[inline]
    pub const fn without(self, machine: usize) -> Self {
        Self(self.0 & !(1u32 << machine))
    }

    /// Returns `true` if no bit beyond the first `num_machines` is set.
    #[inline]
    pub const fn fits(self, num_machines: usize) -> bool {
        num_machines >= 32 || self.0 >> num_machines == 0
    }
}

impl std::fmt::Display for BlockMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#b}", self.0)
    }
}

/// One maintenance mask per block, in topology order.
///
/// # Examples
///
/// ```rust
/// # use blockflow_engine::mask::{BlockMask, MaintenancePlan};
/// # use blockflow_model::{machine::Machine, topology::TopologyBuilder, index::BlockIndex};
/// let mut builder = TopologyBuilder::<u32>::new();
/// builder.ordinary("A", [Machine::new("a1", 3, 0.9), Machine::new("a2", 3, 0.9)]);
/// builder.ordinary("B", [Machine::new("b1", 5, 0.8)]);
/// let topology = builder.build().unwrap();
///
/// let plan = MaintenancePlan::from_machine_flags(&topology, &[true, false, true]).unwrap();
/// assert_eq!(plan.mask(BlockIndex::new(0)), BlockMask::from_bits(0b01));
/// assert_eq!(plan.mask(BlockIndex::new(1)), BlockMask::from_bits(0b1));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MaintenancePlan {
    masks: Vec<BlockMask>,
}

impl MaintenancePlan {
    /// Wraps raw masks without checking them against a topology.
    ///
    /// Evaluators validate the plan before use.
    #[inline]
    pub fn new(masks: Vec<BlockMask>) -> Self {
        Self { masks }
    }

    /// Returns the plan with every machine in service.
    pub fn all_in_service<T>(topology: &Topology<T>) -> Self
    where
        T: Throughput,
    {
        Self {
            masks: topology
                .blocks()
                .map(|b| BlockMask::all(topology.num_block_machines(b)))
                .collect(),
        }
    }

    /// Builds a validated plan from one mask per block.
    pub fn from_masks<T>(
        topology: &Topology<T>,
        masks: Vec<BlockMask>,
    ) -> Result<Self, MaskCardinalityError>
    where
        T: Throughput,
    {
        let plan = Self { masks };
        plan.validate(topology)?;
        Ok(plan)
    }

    /// Builds a plan from per-block in-service flags.
    pub fn from_block_flags<T, F>(
        topology: &Topology<T>,
        flags: &[F],
    ) -> Result<Self, MaskCardinalityError>
    where
        T: Throughput,
        F: AsRef<[bool]>,
    {
        if flags.len() != topology.num_blocks() {
            return Err(MaskCardinalityError::BlockCount {
                expected: topology.num_blocks(),
                actual: flags.len(),
            });
        }

        let mut masks = Vec::with_capacity(flags.len());
        for (block, block_flags) in topology.blocks().zip(flags) {
            let block_flags = block_flags.as_ref();
            let expected = topology.num_block_machines(block);
            if block_flags.len() != expected {
                return Err(MaskCardinalityError::MachineCount {
                    expected,
                    actual: block_flags.len(),
                });
            }
            masks.push(BlockMask::from_flags(block_flags));
        }

        Ok(Self { masks })
    }

    /// Builds a plan from one in-service flag per machine, in flattened
    /// machine order.
    pub fn from_machine_flags<T>(
        topology: &Topology<T>,
        flags: &[bool],
    ) -> Result<Self, MaskCardinalityError>
    where
        T: Throughput,
    {
        if flags.len() != topology.num_machines() {
            return Err(MaskCardinalityError::MachineCount {
                expected: topology.num_machines(),
                actual: flags.len(),
            });
        }

        Ok(Self {
            masks: topology
                .blocks()
                .map(|b| BlockMask::from_flags(&flags[topology.machine_range(b)]))
                .collect(),
        })
    }

    /// Checks the plan's block count and mask widths against `topology`.
    pub fn validate<T>(&self, topology: &Topology<T>) -> Result<(), MaskCardinalityError>
    where
        T: Throughput,
    {
        if self.masks.len() != topology.num_blocks() {
            return Err(MaskCardinalityError::BlockCount {
                expected: topology.num_blocks(),
                actual: self.masks.len(),
            });
        }

        for (block, &mask) in topology.blocks().zip(&self.masks) {
            let machines = topology.num_block_machines(block);
            if !mask.fits(machines) {
                return Err(MaskCardinalityError::MaskWidth {
                    block: block.get(),
                    mask: mask.bits(),
                    machines,
                });
            }
        }

        Ok(())
    }

    #[inline]
    pub fn masks(&self) -> &[BlockMask] {
        &self.masks
    }

    #[inline]
    pub fn num_blocks(&self) -> usize {
        self.masks.len()
    }

    /// Returns the mask of the given block.
    ///
    /// # Panics
    ///
    /// Panics if `block` is out of bounds.
    #[inline]
    pub fn mask(&self, block: BlockIndex) -> BlockMask {
        self.masks[block.get()]
    }

    /// Replaces the mask of one block.
    ///
    /// # Panics
    ///
    /// Panics if `block` is out of bounds.
    #[inline]
    pub fn set_mask(&mut self, block: BlockIndex, mask: BlockMask) -> &mut Self {
        self.masks[block.get()] = mask;
        self
    }

    /// Expands the plan to one in-service flag per machine, in flattened
    /// machine order.
    pub fn machine_flags<T>(&self, topology: &Topology<T>) -> Vec<bool>
    where
        T: Throughput,
    {
        let mut flags = Vec::with_capacity(topology.num_machines());
        for (block, &mask) in topology.blocks().zip(&self.masks) {
            flags.extend((0..topology.num_block_machines(block)).map(|i| mask.is_in_service(i)));
        }
        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockflow_model::{machine::Machine, topology::TopologyBuilder};

    fn topology() -> Topology<u32> {
        let mut builder = TopologyBuilder::new();
        builder
            .ordinary("A", [Machine::new("a1", 3, 0.9), Machine::new("a2", 3, 0.9)])
            .skip_start("s", "S", [Machine::new("s1", 2, 0.5)])
            .ordinary("B", [Machine::new("b1", 5, 0.8)])
            .skip_end("s");
        builder.build().unwrap()
    }

    #[test]
    fn test_block_mask_bits() {
        let mask = BlockMask::from_flags(&[true, false, true]);
        assert_eq!(mask.bits(), 0b101);
        assert!(mask.is_in_service(0));
        assert!(!mask.is_in_service(1));
        assert_eq!(mask.count_in_service(), 2);
        assert_eq!(mask.without(0).bits(), 0b100);
        assert!(mask.fits(3));
        assert!(!mask.fits(2));
        assert!(BlockMask::EMPTY.fits(0));
        assert_eq!(mask.to_string(), "0b101");
    }

    #[test]
    fn test_all_in_service_includes_empty_marker_mask() {
        let topology = topology();
        let plan = MaintenancePlan::all_in_service(&topology);
        assert_eq!(
            plan.masks(),
            &[
                BlockMask::from_bits(0b11),
                BlockMask::from_bits(0b1),
                BlockMask::from_bits(0b1),
                BlockMask::EMPTY
            ]
        );
        assert!(plan.validate(&topology).is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_block_count() {
        let topology = topology();
        let plan = MaintenancePlan::new(vec![BlockMask::EMPTY; 3]);
        assert_eq!(
            plan.validate(&topology),
            Err(MaskCardinalityError::BlockCount {
                expected: 4,
                actual: 3
            })
        );
    }

    #[test]
    fn test_validate_rejects_wide_mask() {
        let topology = topology();
        let masks = vec![
            BlockMask::from_bits(0b111),
            BlockMask::EMPTY,
            BlockMask::EMPTY,
            BlockMask::EMPTY,
        ];
        assert_eq!(
            MaintenancePlan::from_masks(&topology, masks),
            Err(MaskCardinalityError::MaskWidth {
                block: 0,
                mask: 0b111,
                machines: 2
            })
        );

        let masks = vec![
            BlockMask::EMPTY,
            BlockMask::EMPTY,
            BlockMask::EMPTY,
            BlockMask::from_bits(1),
        ];
        assert!(matches!(
            MaintenancePlan::from_masks(&topology, masks),
            Err(MaskCardinalityError::MaskWidth { block: 3, .. })
        ));
    }

    #[test]
    fn test_from_block_flags() {
        let topology = topology();
        let flags: Vec<Vec<bool>> = vec![vec![false, true], vec![true], vec![false], vec![]];
        let plan = MaintenancePlan::from_block_flags(&topology, &flags).unwrap();
        assert_eq!(plan.mask(BlockIndex::new(0)).bits(), 0b10);
        assert_eq!(plan.mask(BlockIndex::new(2)), BlockMask::EMPTY);

        let short: Vec<Vec<bool>> = vec![vec![true], vec![true], vec![true], vec![]];
        assert_eq!(
            MaintenancePlan::from_block_flags(&topology, &short),
            Err(MaskCardinalityError::MachineCount {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn test_machine_flags_round_trip_through_topology() {
        let topology = topology();
        let flags = [true, false, false, true];
        let plan = MaintenancePlan::from_machine_flags(&topology, &flags).unwrap();
        assert_eq!(plan.machine_flags(&topology), flags.to_vec());

        assert_eq!(
            MaintenancePlan::from_machine_flags(&topology, &[true]),
            Err(MaskCardinalityError::MachineCount {
                expected: 4,
                actual: 1
            })
        );
    }

    #[test]
    fn test_set_mask() {
        let topology = topology();
        let mut plan = MaintenancePlan::all_in_service(&topology);
        plan.set_mask(BlockIndex::new(0), BlockMask::all(2).without(1));
        assert_eq!(plan.mask(BlockIndex::new(0)).bits(), 0b01);
    }
}
