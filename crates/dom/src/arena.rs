//! Arena-based DOM tree storage.
//!
//! The arena eliminates Rc/Arc overhead and keeps nodes sequential in
//! memory; all relationships are u32 indices. A side map from
//! `backend_node_id` to arena index lets callers address nodes by their
//! stable live identity.

use crate::error::{DomError, Result};
use crate::types::{DomNode, NodeId, NodeType};
use ahash::AHashMap;

/// Arena allocator for DOM nodes.
#[derive(Debug, Default)]
pub struct DomArena {
    /// All nodes stored sequentially (cache-friendly).
    nodes: Vec<DomNode>,

    /// Backend node ID → NodeId lookup.
    backend_id_map: AHashMap<u32, NodeId>,

    /// Root node ID (if set).
    root_id: Option<NodeId>,
}

impl DomArena {
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(1024), // Pre-allocate for typical page
            backend_id_map: AHashMap::with_capacity(1024),
            root_id: None,
        }
    }

    /// Add a node to the arena, returns its ID. The node's `node_id`
    /// field is overwritten with the assigned index.
    pub fn add_node(&mut self, mut node: DomNode) -> NodeId {
        let node_id = self.nodes.len() as NodeId;
        node.node_id = node_id;
        self.backend_id_map.insert(node.backend_node_id, node_id);
        self.nodes.push(node);
        node_id
    }

    pub fn get(&self, node_id: NodeId) -> Result<&DomNode> {
        self.nodes
            .get(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    pub fn get_mut(&mut self, node_id: NodeId) -> Result<&mut DomNode> {
        self.nodes
            .get_mut(node_id as usize)
            .ok_or(DomError::NodeNotFound(node_id))
    }

    /// Get node ID by backend node ID.
    pub fn get_node_id_by_backend(&self, backend_id: u32) -> Option<NodeId> {
        self.backend_id_map.get(&backend_id).copied()
    }

    pub fn set_root(&mut self, node_id: NodeId) -> Result<()> {
        self.get(node_id)?;
        self.root_id = Some(node_id);
        Ok(())
    }

    pub fn root_id(&self) -> Option<NodeId> {
        self.root_id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DomNode> {
        self.nodes.iter()
    }

    pub fn children(&self, node_id: NodeId) -> Result<Vec<&DomNode>> {
        let node = self.get(node_id)?;
        node.children_ids
            .iter()
            .map(|&child_id| self.get(child_id))
            .collect()
    }

    pub fn parent(&self, node_id: NodeId) -> Result<Option<&DomNode>> {
        let node = self.get(node_id)?;
        match node.parent_id {
            Some(parent_id) => Ok(Some(self.get(parent_id)?)),
            None => Ok(None),
        }
    }

    /// Walk the parent chain, starting from the node's parent.
    pub fn ancestors(&self, node_id: NodeId) -> impl Iterator<Item = &DomNode> {
        let mut current = self
            .get(node_id)
            .ok()
            .and_then(|n| n.parent_id)
            .and_then(|p| self.get(p).ok());
        std::iter::from_fn(move || {
            let node = current?;
            current = node.parent_id.and_then(|p| self.get(p).ok());
            Some(node)
        })
    }

    /// Nearest enclosing element, skipping shadow-root fragments.
    pub fn parent_element(&self, node_id: NodeId) -> Option<&DomNode> {
        self.ancestors(node_id).find(|n| n.is_element())
    }

    /// The document this node belongs to: itself if it is a document,
    /// otherwise the nearest Document ancestor. Parent links cross
    /// shadow-root fragments and iframe content boundaries, so a node
    /// inside an inlined iframe resolves to that frame's document.
    pub fn owner_document(&self, node_id: NodeId) -> Option<NodeId> {
        let node = self.get(node_id).ok()?;
        if node.node_type == NodeType::Document {
            return Some(node.node_id);
        }
        self.ancestors(node_id)
            .find(|n| n.node_type == NodeType::Document)
            .map(|n| n.node_id)
    }

    /// True for DocumentFragment nodes backing a real (non-polyfill)
    /// shadow root.
    pub fn is_native_shadow_root(&self, node_id: NodeId) -> bool {
        self.get(node_id).map_or(false, |n| {
            n.node_type == NodeType::DocumentFragment
                && n.shadow_root_type.map_or(false, |t| t.is_native())
        })
    }

    /// The class tokens of an element, in source order.
    pub fn class_list(&self, node_id: NodeId) -> impl Iterator<Item = &str> {
        self.get(node_id)
            .ok()
            .and_then(|n| n.attr("class"))
            .unwrap_or("")
            .split_whitespace()
    }
}
