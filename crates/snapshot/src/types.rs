//! Serialized node records.
//!
//! The output algebra is a tagged union with a `type` discriminant and
//! camelCase fields, so serialized trees are plain replayable JSON.
//! Attribute values keep their natural JSON shape (string, number, or
//! boolean) through an untagged enum.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identifier assigned to a serialized node.
pub type SnapshotId = i64;

/// Sentinel for nodes that are mirrored to keep sibling traversal
/// coherent but never emitted in the serialized tree.
pub const IGNORED_NODE: SnapshotId = -2;

/// An attribute value: string, number, or boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Num(f64),
    Str(String),
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Str(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Str(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Num(value)
    }
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Serialized attribute bag. Ordered so emitted JSON is byte-stable
/// across runs.
pub type Attributes = BTreeMap<String, AttrValue>;

/// One serialized node, minus its identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SerializedNode {
    #[serde(rename_all = "camelCase")]
    Document {
        #[serde(skip_serializing_if = "Option::is_none")]
        compat_mode: Option<String>,
        child_nodes: Vec<SerializedNodeWithId>,
    },
    #[serde(rename_all = "camelCase")]
    DocumentType {
        name: String,
        public_id: String,
        system_id: String,
    },
    #[serde(rename_all = "camelCase")]
    Element {
        tag_name: String,
        attributes: Attributes,
        child_nodes: Vec<SerializedNodeWithId>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_svg: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        need_block: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_shadow_host: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_shadow: Option<bool>,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_custom: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    Text {
        text_content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        is_style: Option<bool>,
    },
    #[serde(rename_all = "camelCase")]
    Cdata { text_content: String },
    #[serde(rename_all = "camelCase")]
    Comment { text_content: String },
}

impl SerializedNode {
    pub fn is_element(&self) -> bool {
        matches!(self, SerializedNode::Element { .. })
    }

    /// Tag name when this is an element.
    pub fn element_tag(&self) -> Option<&str> {
        match self {
            SerializedNode::Element { tag_name, .. } => Some(tag_name),
            _ => None,
        }
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            SerializedNode::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    pub fn child_nodes(&self) -> Option<&Vec<SerializedNodeWithId>> {
        match self {
            SerializedNode::Document { child_nodes, .. }
            | SerializedNode::Element { child_nodes, .. } => Some(child_nodes),
            _ => None,
        }
    }

    pub fn child_nodes_mut(&mut self) -> Option<&mut Vec<SerializedNodeWithId>> {
        match self {
            SerializedNode::Document { child_nodes, .. }
            | SerializedNode::Element { child_nodes, .. } => Some(child_nodes),
            _ => None,
        }
    }

    pub fn need_block(&self) -> bool {
        matches!(
            self,
            SerializedNode::Element {
                need_block: Some(true),
                ..
            }
        )
    }

    pub fn set_is_shadow(&mut self) {
        if let SerializedNode::Element { is_shadow, .. } = self {
            *is_shadow = Some(true);
        }
    }

    pub fn set_is_shadow_host(&mut self) {
        if let SerializedNode::Element { is_shadow_host, .. } = self {
            *is_shadow_host = Some(true);
        }
    }
}

/// A serialized node together with its assigned identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedNodeWithId {
    pub id: SnapshotId,
    #[serde(rename = "rootId", skip_serializing_if = "Option::is_none")]
    pub root_id: Option<SnapshotId>,
    #[serde(flatten)]
    pub node: SerializedNode,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn element_serializes_with_type_tag_and_camel_case() {
        let node = SerializedNodeWithId {
            id: 2,
            root_id: None,
            node: SerializedNode::Element {
                tag_name: "div".to_string(),
                attributes: Attributes::from([("class".to_string(), "a".into())]),
                child_nodes: vec![],
                is_svg: None,
                need_block: None,
                is_shadow_host: None,
                is_shadow: None,
                is_custom: None,
            },
        };

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(
            value,
            json!({
                "id": 2,
                "type": "element",
                "tagName": "div",
                "attributes": { "class": "a" },
                "childNodes": []
            })
        );
    }

    #[test]
    fn attr_values_keep_their_json_shape() {
        let attrs = Attributes::from([
            ("checked".to_string(), AttrValue::Bool(true)),
            ("rr_scrollTop".to_string(), AttrValue::Num(12.0)),
            ("class".to_string(), AttrValue::Str("a".to_string())),
        ]);
        let value = serde_json::to_value(&attrs).unwrap();
        assert_eq!(
            value,
            json!({ "checked": true, "rr_scrollTop": 12.0, "class": "a" })
        );
    }

    #[test]
    fn root_id_is_omitted_when_absent() {
        let node = SerializedNodeWithId {
            id: 5,
            root_id: None,
            node: SerializedNode::Comment {
                text_content: "x".to_string(),
            },
        };
        let value = serde_json::to_value(&node).unwrap();
        assert!(value.get("rootId").is_none());
        assert_eq!(value["type"], "comment");
    }
}
