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

//! Compiles a topology into its operation tree.
//!
//! A recursive-descent parser walks the block stream once. The main line and
//! the two paths of every open scope accumulate `Series` chains; closing a
//! scope folds its paths into `Combine(skip, continuation)` and appends the
//! result to the enclosing path. A stockpile replaces whatever its path has
//! accumulated so far with its own leaf.
//!
//! The parser's structural errors repeat the checks `TopologyBuilder::build`
//! already runs, so a built topology never reaches them. They keep
//! compilation total over any block stream.

use super::node::{Node, NodeIndex, OperationTree};
use blockflow_core::num::throughput::Throughput;
use blockflow_model::{
    block::BlockKind, error::StructuralTopologyError, index::BlockIndex, topology::Topology,
};

/// The path of an open scope that receives nested scope results.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ActivePath {
    Skip,
    Continuation,
}

struct TreeParser<'a, T> {
    topology: &'a Topology<T>,
    cursor: usize,
    nodes: Vec<Node>,
    open: Vec<&'a str>,
    closed: Vec<&'a str>,
}

impl<'a, T> TreeParser<'a, T>
where
    T: Throughput,
{
    fn new(topology: &'a Topology<T>) -> Self {
        Self {
            topology,
            cursor: 0,
            nodes: Vec::with_capacity(topology.num_blocks() * 2),
            open: Vec::new(),
            closed: Vec::new(),
        }
    }

    #[inline]
    fn alloc(&mut self, node: Node) -> NodeIndex {
        let index = NodeIndex::new(self.nodes.len());
        self.nodes.push(node);
        index
    }

    /// Appends `node` to the path accumulated in `path`.
    #[inline]
    fn extend(&mut self, path: Option<NodeIndex>, node: NodeIndex, resets: bool) -> NodeIndex {
        match path {
            Some(previous) if !resets => self.alloc(Node::Series(previous, node)),
            _ => node,
        }
    }

    /// Consumes the block under the cursor as a leaf. Returns the leaf and
    /// whether the block is a stockpile.
    #[inline]
    fn take_leaf(&mut self) -> (NodeIndex, bool) {
        let block = BlockIndex::new(self.cursor);
        self.cursor += 1;
        (self.alloc(Node::Leaf(block)), self.topology.is_stockpile(block))
    }

    fn parse_main(mut self) -> Result<OperationTree, StructuralTopologyError> {
        let topology = self.topology;
        let mut main: Option<NodeIndex> = None;

        while self.cursor < topology.num_blocks() {
            let node = match topology.block_kind(BlockIndex::new(self.cursor)) {
                BlockKind::Ordinary => {
                    let (leaf, resets) = self.take_leaf();
                    self.extend(main, leaf, resets)
                }
                BlockKind::SkipStart(scope) => {
                    let combined = self.parse_scope(scope)?;
                    self.extend(main, combined, false)
                }
                BlockKind::SkipEnd(scope) => {
                    return Err(StructuralTopologyError::UnmatchedSkipEnd {
                        scope: scope.clone(),
                    });
                }
            };
            main = Some(node);
        }

        let root = main.ok_or(StructuralTopologyError::EmptyTopology)?;
        let (nodes, root) = compact(self.nodes, root);
        Ok(OperationTree::from_arena(nodes, root))
    }

    /// Parses one scope. The cursor points at its opening `SkipStart`; on
    /// return it points past the matching `SkipEnd`.
    fn parse_scope(&mut self, scope: &'a str) -> Result<NodeIndex, StructuralTopologyError> {
        if self.closed.contains(&scope) {
            return Err(StructuralTopologyError::ReopenedScope {
                scope: scope.to_string(),
            });
        }

        let topology = self.topology;
        let (opening, _) = self.take_leaf();
        let mut skip = opening;
        let mut continuation: Option<NodeIndex> = None;
        let mut active = ActivePath::Skip;
        self.open.push(scope);

        loop {
            if self.cursor >= topology.num_blocks() {
                return Err(StructuralTopologyError::UnterminatedScope {
                    scope: scope.to_string(),
                });
            }

            match topology.block_kind(BlockIndex::new(self.cursor)) {
                BlockKind::SkipStart(other) if other == scope => {
                    let (leaf, resets) = self.take_leaf();
                    skip = self.extend(Some(skip), leaf, resets);
                    active = ActivePath::Skip;
                }
                BlockKind::SkipStart(other) => {
                    if self.open.contains(&other.as_str()) {
                        return Err(StructuralTopologyError::OverlappingScopes {
                            outer: other.clone(),
                            inner: scope.to_string(),
                        });
                    }
                    let nested = self.parse_scope(other)?;
                    match active {
                        ActivePath::Skip => skip = self.extend(Some(skip), nested, false),
                        ActivePath::Continuation => {
                            continuation = Some(self.extend(continuation, nested, false))
                        }
                    }
                }
                BlockKind::Ordinary => {
                    let (leaf, resets) = self.take_leaf();
                    continuation = Some(self.extend(continuation, leaf, resets));
                    active = ActivePath::Continuation;
                }
                BlockKind::SkipEnd(other) if other == scope => {
                    self.cursor += 1;
                    break;
                }
                BlockKind::SkipEnd(other) => {
                    return Err(if self.open.contains(&other.as_str()) {
                        StructuralTopologyError::OverlappingScopes {
                            outer: other.clone(),
                            inner: scope.to_string(),
                        }
                    } else {
                        StructuralTopologyError::UnmatchedSkipEnd {
                            scope: other.clone(),
                        }
                    });
                }
            }
        }

        self.open.pop();
        self.closed.push(scope);

        let continuation = continuation.ok_or_else(|| StructuralTopologyError::EmptyContinuation {
            scope: scope.to_string(),
        })?;
        Ok(self.alloc(Node::Combine(skip, continuation)))
    }
}

/// Drops nodes a stockpile reset cut off from the root, keeping the
/// children-before-parents order.
fn compact(nodes: Vec<Node>, root: NodeIndex) -> (Vec<Node>, NodeIndex) {
    let mut reachable = vec![false; nodes.len()];
    let mut stack = vec![root];
    while let Some(index) = stack.pop() {
        reachable[index.get()] = true;
        if let Some((left, right)) = nodes[index.get()].children() {
            stack.push(left);
            stack.push(right);
        }
    }

    if reachable.iter().all(|&r| r) {
        return (nodes, root);
    }

    let mut remap = vec![NodeIndex::new(0); nodes.len()];
    let mut compacted = Vec::with_capacity(nodes.len());
    for (old, node) in nodes.into_iter().enumerate() {
        if !reachable[old] {
            continue;
        }
        remap[old] = NodeIndex::new(compacted.len());
        compacted.push(match node {
            Node::Leaf(block) => Node::Leaf(block),
            Node::Series(l, r) => Node::Series(remap[l.get()], remap[r.get()]),
            Node::Combine(l, r) => Node::Combine(remap[l.get()], remap[r.get()]),
        });
    }

    (compacted, remap[root.get()])
}

impl OperationTree {
    /// Compiles `topology` into its operation tree.
    ///
    /// # Errors
    ///
    /// Returns a `StructuralTopologyError` if the block stream is not a
    /// well-formed scope structure. A topology produced by
    /// `TopologyBuilder::build` always compiles.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use blockflow_engine::tree::node::OperationTree;
    /// # use blockflow_model::{machine::Machine, topology::TopologyBuilder};
    /// let mut builder = TopologyBuilder::<u32>::new();
    /// builder
    ///     .ordinary("A", [Machine::new("a", 3, 0.9)])
    ///     .skip_start("s", "S", [Machine::new("s", 2, 0.9)])
    ///     .ordinary("B", [Machine::new("b", 4, 0.9)])
    ///     .skip_end("s");
    /// let tree = OperationTree::from_topology(&builder.build().unwrap()).unwrap();
    /// assert_eq!(tree.to_string(), "Series(Leaf(0), Combine(Leaf(1), Leaf(2)))");
    /// ```
    pub fn from_topology<T>(topology: &Topology<T>) -> Result<Self, StructuralTopologyError>
    where
        T: Throughput,
    {
        let tree = TreeParser::new(topology).parse_main()?;
        tracing::debug!(nodes = tree.num_nodes(), "compiled operation tree");
        Ok(tree)
    }
}
