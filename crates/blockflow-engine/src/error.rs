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

//! Error types of the evaluation engine.

use blockflow_model::error::StructuralTopologyError;
use thiserror::Error;

/// A distribution that violates the algebra's preconditions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidDistributionError {
    #[error("distribution has no outcomes")]
    Empty,

    #[error("throughput value {value} is negative or not a number")]
    InvalidValue { value: f64 },

    #[error("probability {mass} is negative or not finite")]
    InvalidMass { mass: f64 },

    /// Masses are never renormalised; drift beyond the limit is rejected.
    #[error("probability mass sums to {total}, expected 1")]
    MassDrift { total: f64 },
}

/// A maintenance plan or machine-state vector that does not fit the topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MaskCardinalityError {
    #[error("expected {expected} block masks, got {actual}")]
    BlockCount { expected: usize, actual: usize },

    #[error("mask {mask:#b} of block {block} selects machines beyond its {machines} machines")]
    MaskWidth {
        block: usize,
        mask: u32,
        machines: usize,
    },

    #[error("expected {expected} machine states, got {actual}")]
    MachineCount { expected: usize, actual: usize },
}

/// Any error the engine can report.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Structure(#[from] StructuralTopologyError),

    #[error(transparent)]
    Distribution(#[from] InvalidDistributionError),

    #[error(transparent)]
    MaskCardinality(#[from] MaskCardinalityError),

    #[error("exact enumeration supports at most {limit} machines, the topology has {machines}")]
    EnumerationTooLarge { machines: usize, limit: usize },
}
