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

//! # Blockflow Model
//!
//! **The domain model of a block-structured production line.**
//!
//! A line is an ordered sequence of blocks. Each block groups parallel
//! machines that share one stage of the flow; bypass ("skip") scopes let flow
//! detour around a span of blocks and reconverge later. This crate turns
//! block descriptions into a validated, immutable `Topology` that the
//! evaluation engine (`blockflow-engine`) consumes.
//!
//! ## Architecture
//!
//! * **`index`**: strongly typed `BlockIndex` and `MachineIndex`.
//! * **`machine`** / **`block`**: the owned input descriptions handed to the builder.
//! * **`topology`**: the immutable `Topology` (flattened, optimised for
//!   evaluation) and its `TopologyBuilder` (mutable, optimised for assembly).
//! * **`records`**: normalisation of already-parsed component records into a
//!   topology (grouping by block id, skip markers, dropping absent machines).
//! * **`error`**: `StructuralTopologyError`, the single error type of this crate.
//!
//! ## Design Philosophy
//!
//! 1.  **Fail-Fast**: every structural rule is checked once in
//!     `TopologyBuilder::build`; downstream code never sees a malformed line.
//! 2.  **Memory Layout**: machine capacities and availabilities are stored as
//!     flat vectors with per-block offset windows, so the hot evaluation loops
//!     walk contiguous memory.

pub mod block;
pub mod error;
pub mod index;
pub mod machine;
pub mod records;
pub mod topology;
