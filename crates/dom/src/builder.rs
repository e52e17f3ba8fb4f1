//! Tree construction from CDP-flavoured JSON.
//!
//! Consumes the node shape of `DOM.getDocument` (`nodeId`/`backendNodeId`/
//! `nodeType`/`nodeName`/paired `attributes`/`children`/`contentDocument`/
//! `shadowRoots`) extended with the live-state fields a snapshot needs:
//! scroll offsets, bounds, form values, media/canvas/image state,
//! stylesheet text, and iframe readiness.
//!
//! ```json
//! {
//!   "root": {
//!     "backendNodeId": 1,
//!     "nodeType": 9,
//!     "nodeName": "#document",
//!     "documentURL": "https://example.com/",
//!     "children": [...]
//!   }
//! }
//! ```

use crate::arena::DomArena;
use crate::error::{DomError, Result};
use crate::types::*;
use serde_json::Value;
use std::collections::HashMap;

/// Builds a [`DomArena`] from a JSON tree payload.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    arena: DomArena,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            arena: DomArena::new(),
        }
    }

    /// Parse a full payload (`{"root": {...}}`) into an arena with its
    /// root set.
    pub fn build(payload: &Value) -> Result<DomArena> {
        let root = payload.get("root").ok_or(DomError::MissingField("root"))?;

        let mut builder = Self::new();
        let root_id = builder.parse_node(root, None)?;
        builder.arena.set_root(root_id)?;
        Ok(builder.arena)
    }

    /// Recursively parse one node and its subtrees.
    fn parse_node(&mut self, value: &Value, parent_id: Option<NodeId>) -> Result<NodeId> {
        let backend_node_id = value["backendNodeId"]
            .as_u64()
            .ok_or(DomError::MissingField("backendNodeId"))? as u32;

        let node_type_val = value["nodeType"]
            .as_u64()
            .ok_or(DomError::MissingField("nodeType"))?;
        let node_type =
            NodeType::from_u8(node_type_val as u8).ok_or(DomError::InvalidNodeType(node_type_val))?;

        let node_name = value["nodeName"].as_str().unwrap_or("").to_string();

        let mut node = DomNode::new(backend_node_id, node_type, node_name);
        node.node_value = value["nodeValue"].as_str().unwrap_or("").to_string();
        node.parent_id = parent_id;

        // Attributes come as a flat [name, value, name, value, ...] array.
        let mut attributes = HashMap::new();
        if let Some(attrs) = value["attributes"].as_array() {
            let mut i = 0;
            while i + 1 < attrs.len() {
                if let (Some(key), Some(val)) = (attrs[i].as_str(), attrs[i + 1].as_str()) {
                    attributes.insert(key.to_lowercase(), val.to_string());
                }
                i += 2;
            }
        }
        node.attributes = attributes;

        node.namespace = value["namespaceURI"].as_str().map(String::from);
        node.public_id = value["publicId"].as_str().unwrap_or("").to_string();
        node.system_id = value["systemId"].as_str().unwrap_or("").to_string();
        node.compat_mode = value["compatMode"].as_str().map(String::from);
        node.document_url = value["documentURL"].as_str().map(String::from);
        node.base_url = value["baseURL"].as_str().map(String::from);
        node.frame_url = value["frameURL"].as_str().map(String::from);
        node.frame_access = value["frameAccess"].as_bool().unwrap_or(true);
        node.ready_state = value["readyState"].as_str().and_then(ReadyState::parse);

        if let Some(shadow_type) = value.get("shadowRootType").and_then(|v| v.as_str()) {
            node.shadow_root_type = match shadow_type {
                "user-agent" => Some(ShadowRootType::UserAgent),
                "open" => Some(ShadowRootType::Open),
                "closed" => Some(ShadowRootType::Closed),
                _ => None,
            };
        }

        node.scroll_left = value["scrollLeft"].as_f64().unwrap_or(0.0);
        node.scroll_top = value["scrollTop"].as_f64().unwrap_or(0.0);
        node.bounds = parse_rect(&value["bounds"]);
        node.input_value = value["inputValue"].as_str().map(String::from);
        node.checked = value["checked"].as_bool().unwrap_or(false);
        node.selected = value["selected"].as_bool().unwrap_or(false);
        node.custom_element = value["customElement"].as_bool().unwrap_or(false);
        node.newly_added = value["newlyAdded"].as_bool().unwrap_or(false);

        if let Some(media) = value.get("mediaState") {
            node.media = Some(Box::new(MediaState {
                paused: media["paused"].as_bool().unwrap_or(true),
                current_time: media["currentTime"].as_f64().unwrap_or(0.0),
                playback_rate: media["playbackRate"].as_f64().unwrap_or(1.0),
                muted: media["muted"].as_bool().unwrap_or(false),
                looping: media["loop"].as_bool().unwrap_or(false),
                volume: media["volume"].as_f64().unwrap_or(1.0),
            }));
        }

        if let Some(canvas) = value.get("canvasState") {
            node.canvas = Some(Box::new(CanvasState {
                context: canvas["context"].as_str().map(String::from),
                data_url: canvas["dataURL"].as_str().map(String::from),
                pixels_blank: canvas["pixelsBlank"].as_bool().unwrap_or(false),
                blank_data_url: canvas["blankDataURL"].as_str().map(String::from),
            }));
        }

        if let Some(image) = value.get("imageState") {
            node.image = Some(Box::new(ImageState {
                data_url: image["dataURL"].as_str().map(String::from),
                anonymous_data_url: image["anonymousDataURL"].as_str().map(String::from),
            }));
        }

        if let Some(sheet) = value.get("styleSheet") {
            let rules = sheet["rules"]
                .as_array()
                .map(|rules| {
                    rules
                        .iter()
                        .filter_map(|r| r.as_str().map(String::from))
                        .collect()
                })
                .unwrap_or_default();
            node.sheet = Some(Box::new(StyleSheet {
                href: sheet["href"].as_str().map(String::from),
                rules,
                accessible: sheet["accessible"].as_bool().unwrap_or(true),
            }));
        }

        let current_id = self.arena.add_node(node);

        if let Some(children) = value["children"].as_array() {
            let mut child_ids = smallvec::SmallVec::new();
            for child in children {
                child_ids.push(self.parse_node(child, Some(current_id))?);
            }
            if let Ok(node) = self.arena.get_mut(current_id) {
                node.children_ids = child_ids;
            }
        }

        if let Some(content_doc) = value.get("contentDocument") {
            let doc_id = self.parse_node(content_doc, Some(current_id))?;
            if let Ok(node) = self.arena.get_mut(current_id) {
                node.content_document_id = Some(doc_id);
            }
        }

        if let Some(shadow_roots) = value["shadowRoots"].as_array() {
            let mut shadow_ids = smallvec::SmallVec::new();
            for shadow in shadow_roots {
                shadow_ids.push(self.parse_node(shadow, Some(current_id))?);
            }
            if let Ok(node) = self.arena.get_mut(current_id) {
                node.shadow_root_ids = Some(shadow_ids);
            }
        }

        Ok(current_id)
    }
}

fn parse_rect(value: &Value) -> Option<DomRect> {
    if !value.is_object() {
        return None;
    }
    Some(DomRect::new(
        value["x"].as_f64().unwrap_or(0.0),
        value["y"].as_f64().unwrap_or(0.0),
        value["width"].as_f64().unwrap_or(0.0),
        value["height"].as_f64().unwrap_or(0.0),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_simple_tree() {
        let payload = json!({
            "root": {
                "backendNodeId": 1,
                "nodeType": 9,
                "nodeName": "#document",
                "documentURL": "https://example.com/",
                "children": [{
                    "backendNodeId": 2,
                    "nodeType": 1,
                    "nodeName": "HTML",
                    "attributes": ["lang", "en"],
                    "children": [{
                        "backendNodeId": 3,
                        "nodeType": 3,
                        "nodeName": "#text",
                        "nodeValue": "Hello"
                    }]
                }]
            }
        });

        let arena = TreeBuilder::build(&payload).unwrap();
        assert_eq!(arena.len(), 3);

        let root = arena.root_id().unwrap();
        let doc = arena.get(root).unwrap();
        assert_eq!(doc.node_type, NodeType::Document);
        assert_eq!(doc.document_url.as_deref(), Some("https://example.com/"));

        let html = arena.get(doc.children_ids[0]).unwrap();
        assert_eq!(html.attr("lang"), Some("en"));

        let text = arena.get(html.children_ids[0]).unwrap();
        assert_eq!(text.node_value, "Hello");
        assert_eq!(text.parent_id, Some(html.node_id));
    }

    #[test]
    fn parses_content_document_and_shadow_roots() {
        let payload = json!({
            "root": {
                "backendNodeId": 1,
                "nodeType": 1,
                "nodeName": "IFRAME",
                "readyState": "complete",
                "contentDocument": {
                    "backendNodeId": 2,
                    "nodeType": 9,
                    "nodeName": "#document"
                },
                "shadowRoots": [{
                    "backendNodeId": 3,
                    "nodeType": 11,
                    "nodeName": "#document-fragment",
                    "shadowRootType": "open"
                }]
            }
        });

        let arena = TreeBuilder::build(&payload).unwrap();
        let root = arena.get(arena.root_id().unwrap()).unwrap();
        assert_eq!(root.ready_state, Some(ReadyState::Complete));

        let content = arena.get(root.content_document_id.unwrap()).unwrap();
        assert_eq!(content.node_type, NodeType::Document);

        let shadow = arena
            .get(root.shadow_root_ids.as_ref().unwrap()[0])
            .unwrap();
        assert_eq!(shadow.shadow_root_type, Some(ShadowRootType::Open));
    }

    #[test]
    fn parses_live_element_state() {
        let payload = json!({
            "root": {
                "backendNodeId": 1,
                "nodeType": 1,
                "nodeName": "VIDEO",
                "scrollLeft": 10.0,
                "scrollTop": 20.0,
                "bounds": { "x": 0.0, "y": 0.0, "width": 640.0, "height": 360.0 },
                "mediaState": {
                    "paused": false,
                    "currentTime": 3.5,
                    "playbackRate": 1.25,
                    "muted": true,
                    "loop": false,
                    "volume": 0.5
                }
            }
        });

        let arena = TreeBuilder::build(&payload).unwrap();
        let video = arena.get(arena.root_id().unwrap()).unwrap();
        assert_eq!(video.scroll_left, 10.0);
        assert_eq!(video.bounds.unwrap().width, 640.0);
        let media = video.media.as_ref().unwrap();
        assert!(!media.paused);
        assert_eq!(media.current_time, 3.5);
        assert_eq!(media.playback_rate, 1.25);
    }

    #[test]
    fn missing_backend_id_is_an_error() {
        let payload = json!({
            "root": { "nodeType": 1, "nodeName": "DIV" }
        });
        assert!(matches!(
            TreeBuilder::build(&payload),
            Err(DomError::MissingField("backendNodeId"))
        ));
    }
}
