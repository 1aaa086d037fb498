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

//! # Blockflow Engine
//!
//! **Exact and fast throughput evaluation for block-structured production lines.**
//!
//! Given a validated `blockflow_model::topology::Topology`, the engine answers
//! two questions:
//!
//! 1. *What is the probability distribution of the line's throughput* when
//!    every machine fails independently and some machines are pulled for
//!    planned maintenance? (`tree`, exact)
//! 2. *What is the line's throughput* for one concrete up/down state of all
//!    machines? (`fast`, deterministic, allocation-free in the hot loop)
//!
//! ## Core flow
//!
//! - Tabulate every block's distribution for every maintenance mask (`table`).
//! - Compile the topology into an operation tree of `Series` (min) and
//!   `Combine` (sum) nodes (`tree::builder`).
//! - Evaluate the tree under a `mask::MaintenancePlan` (`tree::eval`), or
//!   compile it further into a windowed `fast::ReductionPlan`.
//! - `system::ThroughputSystem` owns all of the above behind one facade.
//!
//! ## Module map
//!
//! - `distribution`: the `Distribution` type with `combine` and `following`.
//! - `mask`: `BlockMask` and `MaintenancePlan`.
//! - `table`: `BlockDistributionTable`.
//! - `tree`: operation tree arena, builder and evaluator.
//! - `fast`: `ReductionPlan` and `FastThroughputEvaluator`.
//! - `probability`: probability of a concrete machine state.
//! - `cache`: bounded memoisation of tree evaluations.
//! - `system`: the `ThroughputSystem` facade.
//! - `error`: `InvalidDistributionError`, `MaskCardinalityError`, `EngineError`.

pub mod cache;
pub mod distribution;
pub mod error;
pub mod fast;
pub mod mask;
pub mod probability;
pub mod system;
pub mod table;
pub mod tree;
