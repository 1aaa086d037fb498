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

//! # Blockflow Simulation
//!
//! **Monte Carlo estimation of production line throughput.**
//!
//! The exact evaluator in `blockflow_engine` answers distribution questions
//! in closed form. This crate answers them by sampling instead: it draws
//! independent machine states, evaluates each with the engine's fast
//! evaluator and collects the values into an empirical histogram. Sampling
//! is useful as a cross-check of the exact result and on lines too large
//! for exact enumeration.
//!
//! ## Module map
//!
//! - `simulator`: `SimulationBuilder` and the multi-threaded `Simulator`.
//! - `sampler`: `MachineSampler`, random up/down states under a maintenance plan.
//! - `histogram`: `EmpiricalDistribution`, counts per observed throughput.
//! - `monitor`: per-worker monitors deciding when a run stops.
//! - `outcome`: `SimulationOutcome`, `SimulationStatistics`, `TerminationReason`.
//! - `error`: `SimulationError`.

pub mod error;
pub mod histogram;
pub mod monitor;
pub mod outcome;
pub mod sampler;
pub mod simulator;
