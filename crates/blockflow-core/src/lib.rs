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

//! # Blockflow Core
//!
//! Foundational numerics and indexing primitives for the blockflow
//! throughput-reliability workspace. Higher-level crates (`blockflow-model`,
//! `blockflow-engine`, `blockflow-sim`) build on these without pulling in any
//! domain types.
//!
//! ## Modules
//!
//! - `num`: the `Throughput` trait alias that collects every bound the engine
//!   needs from a capacity type, and probability helpers with the tolerances
//!   used to police probability-mass invariants.
//! - `utils`: phantom-tagged, strongly typed indices (`TypedIndex<T>`) so that
//!   block positions, machine positions and tree node ids cannot be mixed up.

pub mod num;
pub mod utils;
