//! Node arena for the byte trie.
//!
//! Nodes live in one `Vec` and refer to each other by index. Nothing is ever
//! removed, so a `NodeId` stays valid for the lifetime of the arena and the
//! node count is simply the arena length.
//!
//! Layout of a node:
//! - `label`: the byte on the edge from its parent (placeholder `0` for the root)
//! - `value`: present iff a key ends here
//! - `parent`: back-reference, structural only
//! - `children`: `(label, id)` pairs sorted ascending by label

use smallvec::SmallVec;

use crate::tracing_helpers::trace_log;

/// Most trie nodes have very few children; four fit inline.
const INLINE_CHILDREN: usize = 4;

type Children = SmallVec<[(u8, NodeId); INLINE_CHILDREN]>;

/// Index of a node in the arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct NodeId(usize);

impl NodeId {
    pub(crate) const ROOT: NodeId = NodeId(0);

    #[inline]
    fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone)]
pub(crate) struct Node<V> {
    label: u8,
    value: Option<V>,
    // Never read by any query; kept so the structure can be walked upwards.
    #[allow(dead_code)]
    parent: Option<NodeId>,
    children: Children,
}

impl<V> Node<V> {
    fn new(label: u8, parent: Option<NodeId>) -> Self {
        Self {
            label,
            value: None,
            parent,
            children: SmallVec::new(),
        }
    }

    #[inline]
    pub(crate) fn label(&self) -> u8 {
        self.label
    }

    #[inline]
    pub(crate) fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in ascending label order.
    #[inline]
    pub(crate) fn children(&self) -> &[(u8, NodeId)] {
        &self.children
    }

    #[inline]
    fn find(&self, label: u8) -> Result<usize, usize> {
        self.children.binary_search_by_key(&label, |&(l, _)| l)
    }
}

#[derive(Clone)]
pub(crate) struct NodeArena<V> {
    nodes: Vec<Node<V>>,
}

impl<V> NodeArena<V> {
    /// Create an arena holding only the root.
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        let mut nodes = Vec::with_capacity(capacity.max(1));
        nodes.push(Node::new(0, None));
        Self { nodes }
    }

    /// Number of nodes including the root.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub(crate) fn node(&self, id: NodeId) -> &Node<V> {
        &self.nodes[id.index()]
    }

    /// Child of `id` labelled `label`, if one exists.
    #[inline]
    pub(crate) fn child(&self, id: NodeId, label: u8) -> Option<NodeId> {
        let node = self.node(id);
        node.find(label).ok().map(|i| node.children[i].1)
    }

    /// Child of `id` labelled `label`, created at its sorted position if missing.
    pub(crate) fn child_or_insert(&mut self, id: NodeId, label: u8) -> NodeId {
        let pos = match self.node(id).find(label) {
            Ok(i) => return self.node(id).children[i].1,
            Err(pos) => pos,
        };

        let child = NodeId(self.nodes.len());
        self.nodes.push(Node::new(label, Some(id)));
        self.nodes[id.index()].children.insert(pos, (label, child));
        trace_log!(
            parent = id.index(),
            child = child.index(),
            label = label,
            "node created"
        );
        child
    }

    /// Follow `path` from the root; `None` as soon as a byte has no child.
    pub(crate) fn descend(&self, path: &[u8]) -> Option<NodeId> {
        path.iter()
            .try_fold(NodeId::ROOT, |id, &label| self.child(id, label))
    }

    /// Store `value` at `id`, returning what was there.
    #[inline]
    pub(crate) fn set_value(&mut self, id: NodeId, value: V) -> Option<V> {
        self.nodes[id.index()].value.replace(value)
    }

    pub(crate) fn memory_usage(&self) -> usize {
        let spilled: usize = self
            .nodes
            .iter()
            .filter(|n| n.children.spilled())
            .map(|n| n.children.capacity() * std::mem::size_of::<(u8, NodeId)>())
            .sum();
        self.nodes.capacity() * std::mem::size_of::<Node<V>>() + spilled
    }

    pub(crate) fn shrink_to_fit(&mut self) {
        self.nodes.shrink_to_fit();
        for node in &mut self.nodes {
            node.children.shrink_to_fit();
        }
    }
}
