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

//! Structural errors raised while assembling a topology.
//!
//! Every variant is fatal: a topology that fails validation is never
//! repaired, and no partially built topology escapes the builder.

use thiserror::Error;

/// A violation of the structural rules of a production line.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StructuralTopologyError {
    /// The line has no machine-bearing block.
    #[error("topology contains no machine-bearing blocks")]
    EmptyTopology,

    /// Two blocks share an identifier.
    #[error("block identifier '{identifier}' is used more than once")]
    DuplicateBlockIdentifier { identifier: String },

    /// A real block uses the identifier generated for a scope's end marker.
    #[error("block identifier '{identifier}' collides with the end marker of skip scope '{scope}'")]
    SkipEndIdentifierClash { identifier: String, scope: String },

    /// An ordinary or skip block has no machine that can ever operate.
    #[error("block '{identifier}' has no machine with positive capacity and availability")]
    EmptyBlock { identifier: String },

    /// A block exceeds the machine limit of the per-mask precomputation.
    #[error("block '{identifier}' has {count} machines, the limit is {limit}")]
    TooManyMachines {
        identifier: String,
        count: usize,
        limit: usize,
    },

    /// A machine has a negative or undefined capacity, or an availability
    /// outside `[0, 1]`.
    #[error("machine '{machine}' in block '{block}' is malformed: {reason}")]
    InvalidMachine {
        block: String,
        machine: String,
        reason: &'static str,
    },

    /// A scope-closing marker carries machines.
    #[error("skip end of scope '{scope}' must not carry machines")]
    SkipEndWithMachines { scope: String },

    /// A scope was opened and never closed.
    #[error("skip scope '{scope}' is never closed")]
    UnterminatedScope { scope: String },

    /// A scope was closed that is not open.
    #[error("skip end of scope '{scope}' has no matching open skip start")]
    UnmatchedSkipEnd { scope: String },

    /// `outer` was continued or closed while the scope `inner`, opened after
    /// it, was still open.
    #[error("skip scopes '{outer}' and '{inner}' overlap without nesting")]
    OverlappingScopes { outer: String, inner: String },

    /// A scope id was used again after its scope closed.
    #[error("skip scope '{scope}' is reopened after it was closed")]
    ReopenedScope { scope: String },

    /// A scope closed without any block on its continuation path.
    #[error("skip scope '{scope}' bypasses nothing: its continuation path is empty")]
    EmptyContinuation { scope: String },

    /// A stockpile opens a scope or directly precedes a scope's end.
    #[error("stockpile block '{identifier}' sits on the boundary of skip scope '{scope}'")]
    StockpileOnScopeBoundary { identifier: String, scope: String },
}
