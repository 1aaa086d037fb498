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

//! Blocks and the kinds that shape the line.
//!
//! A block is either an ordinary stage of the main flow, a stage on the skip
//! path of a bypass scope (`SkipStart`), or the machine-less marker that
//! closes a scope (`SkipEnd`) where the skip path and the continuation path
//! reconverge.

use crate::machine::Machine;
use blockflow_core::num::throughput::Throughput;

/// Identifier prefix of buffering blocks that decouple a path from its
/// upstream variability.
pub const STOCKPILE_PREFIX: &str = "Stockpile";

/// Upper bound on machines per block.
///
/// The engine precomputes one distribution for each of the `2^m`
/// maintenance masks of a block; the bound keeps that table tractable.
pub const MAX_MACHINES_PER_BLOCK: usize = 20;

/// The role a block plays in the line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// A stage of whichever path it appears on.
    Ordinary,
    /// A stage on the skip path of the named scope. The first block of a
    /// scope id opens the scope.
    SkipStart(String),
    /// Closes the named scope; carries no machines.
    SkipEnd(String),
}

impl BlockKind {
    /// Returns the scope id for skip markers.
    #[inline]
    pub fn scope(&self) -> Option<&str> {
        match self {
            BlockKind::Ordinary => None,
            BlockKind::SkipStart(scope) | BlockKind::SkipEnd(scope) => Some(scope),
        }
    }

    #[inline]
    pub fn is_skip_end(&self) -> bool {
        matches!(self, BlockKind::SkipEnd(_))
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockKind::Ordinary => write!(f, "Ordinary"),
            BlockKind::SkipStart(scope) => write!(f, "SkipStart({})", scope),
            BlockKind::SkipEnd(scope) => write!(f, "SkipEnd({})", scope),
        }
    }
}

/// Returns `true` if `identifier` names a stockpile.
#[inline]
pub fn is_stockpile_identifier(identifier: &str) -> bool {
    identifier.starts_with(STOCKPILE_PREFIX)
}

/// An owned block description as handed to the `TopologyBuilder`.
#[derive(Debug, Clone, PartialEq)]
pub struct Block<T> {
    kind: BlockKind,
    identifier: String,
    machines: Vec<Machine<T>>,
}

impl<T> Block<T>
where
    T: Throughput,
{
    /// Creates a new block description.
    #[inline]
    pub fn new(kind: BlockKind, identifier: impl Into<String>, machines: Vec<Machine<T>>) -> Self {
        Self {
            kind,
            identifier: identifier.into(),
            machines,
        }
    }

    /// Creates the marker closing `scope`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use blockflow_model::block::{Block, BlockKind};
    /// let end = Block::<u32>::skip_end("Bypass");
    /// assert_eq!(end.identifier(), "Bypass_end");
    /// assert_eq!(end.kind(), &BlockKind::SkipEnd("Bypass".to_string()));
    /// assert!(end.machines().is_empty());
    /// ```
    #[inline]
    pub fn skip_end(scope: impl Into<String>) -> Self {
        let scope = scope.into();
        let identifier = format!("{}_end", scope);
        Self::new(BlockKind::SkipEnd(scope), identifier, Vec::new())
    }

    #[inline]
    pub fn kind(&self) -> &BlockKind {
        &self.kind
    }

    #[inline]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    #[inline]
    pub fn machines(&self) -> &[Machine<T>] {
        &self.machines
    }

    /// Returns `true` for machine-bearing blocks whose identifier carries the
    /// stockpile prefix.
    #[inline]
    pub fn is_stockpile(&self) -> bool {
        !self.kind.is_skip_end() && is_stockpile_identifier(&self.identifier)
    }

    #[inline]
    pub(crate) fn into_parts(self) -> (BlockKind, String, Vec<Machine<T>>) {
        (self.kind, self.identifier, self.machines)
    }
}
