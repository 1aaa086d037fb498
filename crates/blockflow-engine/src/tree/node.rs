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

//! Arena nodes of the operation tree.

use blockflow_core::utils::index::{TypedIndex, TypedIndexTag};
use blockflow_model::index::BlockIndex;

/// A tag type for nodes of an `OperationTree`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeIndexTag;

impl TypedIndexTag for NodeIndexTag {
    const NAME: &'static str = "NodeIndex";
}

/// A typed index into the node arena.
pub type NodeIndex = TypedIndex<NodeIndexTag>;

/// One operation of the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Node {
    /// The tabulated distribution of a block.
    Leaf(BlockIndex),
    /// Two stages in series; evaluates with `following`.
    Series(NodeIndex, NodeIndex),
    /// Two parallel routes reconverging; evaluates with `combine`.
    Combine(NodeIndex, NodeIndex),
}

impl Node {
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Returns the two operands of an inner node.
    #[inline]
    pub fn children(&self) -> Option<(NodeIndex, NodeIndex)> {
        match *self {
            Node::Leaf(_) => None,
            Node::Series(left, right) | Node::Combine(left, right) => Some((left, right)),
        }
    }
}

/// An immutable arena of operations. Children always precede their parent,
/// so a forward pass over `nodes()` evaluates bottom-up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationTree {
    nodes: Vec<Node>,
    root: NodeIndex,
}

impl OperationTree {
    #[inline]
    pub(crate) fn from_arena(nodes: Vec<Node>, root: NodeIndex) -> Self {
        debug_assert!(root.get() < nodes.len());
        debug_assert!(nodes.iter().enumerate().all(|(i, node)| {
            node.children()
                .is_none_or(|(l, r)| l.get() < i && r.get() < i)
        }));

        Self { nodes, root }
    }

    #[inline]
    pub fn root(&self) -> NodeIndex {
        self.root
    }

    /// Returns the node stored at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of bounds.
    #[inline]
    pub fn node(&self, index: NodeIndex) -> Node {
        self.nodes[index.get()]
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the blocks reachable from the root, in flow order.
    ///
    /// Blocks upstream of a stockpile on the same path are not reachable.
    pub fn leaves(&self) -> Vec<BlockIndex> {
        let mut leaves = Vec::new();
        let mut stack = vec![self.root];
        while let Some(index) = stack.pop() {
            match self.node(index) {
                Node::Leaf(block) => leaves.push(block),
                Node::Series(left, right) | Node::Combine(left, right) => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }
        leaves
    }

    fn fmt_node(&self, index: NodeIndex, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.node(index) {
            Node::Leaf(block) => write!(f, "Leaf({})", block.get()),
            Node::Series(left, right) => {
                write!(f, "Series(")?;
                self.fmt_node(left, f)?;
                write!(f, ", ")?;
                self.fmt_node(right, f)?;
                write!(f, ")")
            }
            Node::Combine(left, right) => {
                write!(f, "Combine(")?;
                self.fmt_node(left, f)?;
                write!(f, ", ")?;
                self.fmt_node(right, f)?;
                write!(f, ")")
            }
        }
    }
}

impl std::fmt::Display for OperationTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.fmt_node(self.root, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> OperationTree {
        OperationTree::from_arena(
            vec![
                Node::Leaf(BlockIndex::new(0)),
                Node::Leaf(BlockIndex::new(1)),
                Node::Leaf(BlockIndex::new(2)),
                Node::Combine(NodeIndex::new(1), NodeIndex::new(2)),
                Node::Series(NodeIndex::new(0), NodeIndex::new(3)),
            ],
            NodeIndex::new(4),
        )
    }

    #[test]
    fn test_display_renders_nested_operations() {
        assert_eq!(tree().to_string(), "Series(Leaf(0), Combine(Leaf(1), Leaf(2)))");
    }

    #[test]
    fn test_accessors() {
        let tree = tree();
        assert_eq!(tree.num_nodes(), 5);
        assert_eq!(tree.root(), NodeIndex::new(4));
        assert!(tree.node(NodeIndex::new(0)).is_leaf());
        assert_eq!(
            tree.node(NodeIndex::new(3)).children(),
            Some((NodeIndex::new(1), NodeIndex::new(2)))
        );
        let leaves: Vec<usize> = tree.leaves().into_iter().map(|b| b.get()).collect();
        assert_eq!(leaves, vec![0, 1, 2]);
    }
}
