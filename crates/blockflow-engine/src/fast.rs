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

//! Deterministic throughput of one concrete machine state.
//!
//! The operation tree is compiled once into a `ReductionPlan`: a stack of
//! levels, each a list of windows over the outputs of the level below.
//!
//! * level 0 sums `capacity × up` over each block's machine window;
//! * odd levels take the minimum of each window (stages in series);
//! * even levels from 2 on take the sum of each window (reconverging routes).
//!
//! A line with one layer of bypasses therefore reduces as block sums, rank
//! minima, group sums and a final minimum; each further nesting layer adds
//! one min/sum pair. The top level holds a single window whose output is the
//! line's throughput.

use crate::{
    error::MaskCardinalityError,
    tree::node::{Node, NodeIndex, OperationTree},
};
use blockflow_core::num::throughput::{Throughput, min_throughput};
use blockflow_model::{index::BlockIndex, topology::Topology};

/// A contiguous range `[start, end)` of inputs reduced to one output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// How a level reduces each of its windows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reduction {
    /// Sum of `capacity × up` over machines.
    MachineSum,
    Min,
    Sum,
}

impl Reduction {
    #[inline]
    pub const fn of_level(level: usize) -> Self {
        match level {
            0 => Reduction::MachineSum,
            l if l % 2 == 1 => Reduction::Min,
            _ => Reduction::Sum,
        }
    }
}

/// The tree flattened into n-ary min and sum groups, each tagged with the
/// level at which it is reduced.
enum Flat {
    Leaf(BlockIndex),
    Group { level: usize, children: Vec<Flat> },
}

impl Flat {
    #[inline]
    fn level(&self) -> usize {
        match self {
            Flat::Leaf(_) => 0,
            Flat::Group { level, .. } => *level,
        }
    }

    fn from_tree(tree: &OperationTree, index: NodeIndex) -> Self {
        let (series, children) = match tree.node(index) {
            Node::Leaf(block) => return Flat::Leaf(block),
            Node::Series(..) => {
                let mut children = Vec::new();
                Self::collect_series(tree, index, &mut children);
                (true, children)
            }
            // Kept binary: a sum window folds left to right, and float
            // addition must associate exactly as `combine` does.
            Node::Combine(left, right) => (
                false,
                vec![Self::from_tree(tree, left), Self::from_tree(tree, right)],
            ),
        };

        let highest = children.iter().map(Flat::level).max().unwrap_or(0);
        let level = if series {
            // smallest odd level above every operand
            if highest % 2 == 1 { highest + 2 } else { highest + 1 }
        } else {
            // smallest even level above every operand
            if highest % 2 == 0 { highest + 2 } else { highest + 1 }
        };

        Flat::Group { level, children }
    }

    /// Gathers the operands of a maximal run of `Series` nodes.
    fn collect_series(tree: &OperationTree, index: NodeIndex, out: &mut Vec<Flat>) {
        match tree.node(index) {
            Node::Series(left, right) => {
                Self::collect_series(tree, left, out);
                Self::collect_series(tree, right, out);
            }
            _ => out.push(Self::from_tree(tree, index)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReductionPlan {
    levels: Vec<Vec<Window>>,
}

impl ReductionPlan {
    /// Compiles `tree` against the machine layout of `topology`.
    pub fn compile<T>(topology: &Topology<T>, tree: &OperationTree) -> Self
    where
        T: Throughput,
    {
        let root = Flat::from_tree(tree, tree.root());
        let top = match root.level() {
            level if level % 2 == 1 => level,
            level => level + 1,
        };

        let mut plan = Self {
            levels: vec![Vec::new(); top + 1],
        };
        plan.emit(topology, &root, top);

        debug_assert_eq!(plan.levels[top].len(), 1);
        plan
    }

    /// Appends the windows of `node` so that its value appears as exactly
    /// one output of level `target`.
    fn emit<T>(&mut self, topology: &Topology<T>, node: &Flat, target: usize)
    where
        T: Throughput,
    {
        let produced = match node {
            Flat::Leaf(block) => {
                let range = topology.machine_range(*block);
                self.levels[0].push(Window::new(range.start, range.end));
                0
            }
            Flat::Group { level, children } => {
                let start = self.levels[level - 1].len();
                for child in children {
                    self.emit(topology, child, level - 1);
                }
                let end = self.levels[level - 1].len();
                self.levels[*level].push(Window::new(start, end));
                *level
            }
        };

        for level in produced + 1..=target {
            let below = self.levels[level - 1].len();
            self.levels[level].push(Window::new(below - 1, below));
        }
    }

    #[inline]
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Returns the windows of one level.
    #[inline]
    pub fn level(&self, level: usize) -> &[Window] {
        &self.levels[level]
    }

    /// Returns the widest level, the scratch size evaluation needs.
    #[inline]
    pub fn max_width(&self) -> usize {
        self.levels.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Reusable buffers for allocation-free evaluation.
#[derive(Clone, Debug, Default)]
pub struct FastScratch<T> {
    current: Vec<T>,
    next: Vec<T>,
}

impl<T> FastScratch<T>
where
    T: Throughput,
{
    #[inline]
    pub fn with_capacity(width: usize) -> Self {
        Self {
            current: Vec::with_capacity(width),
            next: Vec::with_capacity(width),
        }
    }
}

/// Evaluates the deterministic throughput of up/down machine vectors.
///
/// # Examples
///
/// ```rust
/// # use blockflow_engine::{fast::FastThroughputEvaluator, tree::node::OperationTree};
/// # use blockflow_model::{machine::Machine, topology::TopologyBuilder};
/// let mut builder = TopologyBuilder::<u32>::new();
/// builder
///     .ordinary("Block1", [Machine::new("a1", 3, 0.9), Machine::new("a2", 3, 0.9)])
///     .ordinary("Block2", [Machine::new("b1", 5, 0.8)]);
/// let topology = builder.build().unwrap();
/// let tree = OperationTree::from_topology(&topology).unwrap();
/// let fast = FastThroughputEvaluator::new(&topology, &tree);
///
/// assert_eq!(fast.evaluate(&[true, true, true]).unwrap(), 5);
/// assert_eq!(fast.evaluate(&[true, false, true]).unwrap(), 3);
/// assert_eq!(fast.evaluate(&[true, true, false]).unwrap(), 0);
/// ```
#[derive(Clone, Debug)]
pub struct FastThroughputEvaluator<T> {
    capacities: Vec<T>,
    plan: ReductionPlan,
}

impl<T> FastThroughputEvaluator<T>
where
    T: Throughput,
{
    /// Compiles the reduction plan of `tree` for `topology`.
    pub fn new(topology: &Topology<T>, tree: &OperationTree) -> Self {
        let plan = ReductionPlan::compile(topology, tree);
        tracing::debug!(
            levels = plan.num_levels(),
            width = plan.max_width(),
            "compiled reduction plan"
        );

        Self {
            capacities: topology.capacities().to_vec(),
            plan,
        }
    }

    #[inline]
    pub fn num_machines(&self) -> usize {
        self.capacities.len()
    }

    #[inline]
    pub fn plan(&self) -> &ReductionPlan {
        &self.plan
    }

    /// Returns scratch buffers sized for this evaluator.
    #[inline]
    pub fn scratch(&self) -> FastScratch<T> {
        FastScratch::with_capacity(self.plan.max_width())
    }

    /// Returns the throughput of the line when exactly the machines flagged
    /// `true` operate.
    ///
    /// # Errors
    ///
    /// Returns a `MaskCardinalityError` if `up` does not hold one flag per
    /// machine.
    pub fn evaluate(&self, up: &[bool]) -> Result<T, MaskCardinalityError> {
        let mut scratch = self.scratch();
        self.evaluate_with(&mut scratch, up)
    }

    /// Like `evaluate`, reusing caller-owned buffers.
    pub fn evaluate_with(
        &self,
        scratch: &mut FastScratch<T>,
        up: &[bool],
    ) -> Result<T, MaskCardinalityError> {
        if up.len() != self.capacities.len() {
            return Err(MaskCardinalityError::MachineCount {
                expected: self.capacities.len(),
                actual: up.len(),
            });
        }

        let FastScratch { current, next } = scratch;
        current.clear();
        for window in self.plan.level(0) {
            let mut sum = T::zero();
            for machine in window.start..window.end {
                if up[machine] {
                    sum = sum + self.capacities[machine];
                }
            }
            current.push(sum);
        }

        for level in 1..self.plan.num_levels() {
            next.clear();
            let reduction = Reduction::of_level(level);
            for window in self.plan.level(level) {
                let inputs = &current[window.start..window.end];
                let value = match reduction {
                    Reduction::Min => inputs
                        .iter()
                        .copied()
                        .reduce(min_throughput)
                        .unwrap_or_else(T::zero),
                    _ => inputs.iter().fold(T::zero(), |acc, &v| acc + v),
                };
                next.push(value);
            }
            std::mem::swap(current, next);
        }

        Ok(current.first().copied().unwrap_or_else(T::zero))
    }
}
