//! Live-node ↔ snapshot-id registry.
//!
//! The mirror keys on `backend_node_id`, the stable identity of a live
//! node, so the same node reserialized through a rebuilt arena keeps its
//! snapshot id. The id allocator is owned by the mirror: distinct mirrors
//! can snapshot concurrently without sharing any global state.

use crate::types::{SerializedNodeWithId, SnapshotId, IGNORED_NODE};
use ahash::AHashMap;
use dom::DomNode;

/// Registry contract shared with the recording/replay collaborators.
pub trait Mirror {
    fn has_node(&self, node: &DomNode) -> bool;

    /// The node's snapshot id, or 0 when it was never registered.
    fn get_id(&self, node: &DomNode) -> SnapshotId;

    /// Register a node. Ignored nodes are registered too so sibling
    /// traversal stays coherent.
    fn add(&mut self, node: &DomNode, serialized: &SerializedNodeWithId);

    /// Hand out the next fresh id. The first allocated id is 1.
    fn allocate_id(&mut self) -> SnapshotId;

    /// Forget all registrations and restart the allocator at 1.
    fn reset(&mut self);
}

/// Default bidirectional mirror.
#[derive(Debug)]
pub struct NodeMirror {
    ids: AHashMap<u32, SnapshotId>,
    nodes: AHashMap<SnapshotId, u32>,
    next_id: SnapshotId,
}

impl NodeMirror {
    pub fn new() -> Self {
        Self {
            ids: AHashMap::new(),
            nodes: AHashMap::new(),
            next_id: 1,
        }
    }

    /// Reverse lookup: backend node id for a snapshot id.
    pub fn backend_id(&self, id: SnapshotId) -> Option<u32> {
        self.nodes.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl Default for NodeMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl Mirror for NodeMirror {
    fn has_node(&self, node: &DomNode) -> bool {
        self.ids.contains_key(&node.backend_node_id)
    }

    fn get_id(&self, node: &DomNode) -> SnapshotId {
        self.ids.get(&node.backend_node_id).copied().unwrap_or(0)
    }

    fn add(&mut self, node: &DomNode, serialized: &SerializedNodeWithId) {
        self.ids.insert(node.backend_node_id, serialized.id);
        if serialized.id != IGNORED_NODE {
            self.nodes.insert(serialized.id, node.backend_node_id);
        }
    }

    fn allocate_id(&mut self) -> SnapshotId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn reset(&mut self) {
        self.ids.clear();
        self.nodes.clear();
        self.next_id = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SerializedNode;
    use dom::NodeType;

    fn node(backend: u32) -> DomNode {
        DomNode::new(backend, NodeType::Element, "DIV".to_string())
    }

    fn serialized(id: SnapshotId) -> SerializedNodeWithId {
        SerializedNodeWithId {
            id,
            root_id: None,
            node: SerializedNode::Comment {
                text_content: String::new(),
            },
        }
    }

    #[test]
    fn allocates_from_one() {
        let mut mirror = NodeMirror::new();
        assert_eq!(mirror.allocate_id(), 1);
        assert_eq!(mirror.allocate_id(), 2);
        mirror.reset();
        assert_eq!(mirror.allocate_id(), 1);
    }

    #[test]
    fn registration_round_trips() {
        let mut mirror = NodeMirror::new();
        let n = node(42);
        assert!(!mirror.has_node(&n));
        assert_eq!(mirror.get_id(&n), 0);

        mirror.add(&n, &serialized(3));
        assert!(mirror.has_node(&n));
        assert_eq!(mirror.get_id(&n), 3);
        assert_eq!(mirror.backend_id(3), Some(42));
    }

    #[test]
    fn ignored_nodes_are_registered_one_way() {
        let mut mirror = NodeMirror::new();
        let n = node(7);
        mirror.add(&n, &serialized(IGNORED_NODE));
        assert!(mirror.has_node(&n));
        assert_eq!(mirror.get_id(&n), IGNORED_NODE);
        assert_eq!(mirror.backend_id(IGNORED_NODE), None);
    }
}
