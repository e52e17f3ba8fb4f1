//! Core node types for the host DOM model.
//!
//! Key design principles:
//! 1. Use u32 indices into the arena, not pointers
//! 2. Use SmallVec for child lists (most nodes have <4 children)
//! 3. Use Option<Box<T>> for large optional state (reduce struct size)
//!
//! Besides tree structure, nodes carry the live state a snapshot needs:
//! scroll offsets, layout bounds, form values, media playback, canvas
//! pixel exports, stylesheet rule text, and iframe readiness.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Node identifier (index into arena).
/// u32 allows 4 billion nodes, enough for any webpage.
pub type NodeId = u32;

pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Node type matching the DOM specification numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum NodeType {
    Element = 1,
    Attribute = 2,
    Text = 3,
    CdataSection = 4,
    EntityReference = 5,
    Entity = 6,
    ProcessingInstruction = 7,
    Comment = 8,
    Document = 9,
    DocumentType = 10,
    DocumentFragment = 11,
    Notation = 12,
}

impl NodeType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(NodeType::Element),
            2 => Some(NodeType::Attribute),
            3 => Some(NodeType::Text),
            4 => Some(NodeType::CdataSection),
            5 => Some(NodeType::EntityReference),
            6 => Some(NodeType::Entity),
            7 => Some(NodeType::ProcessingInstruction),
            8 => Some(NodeType::Comment),
            9 => Some(NodeType::Document),
            10 => Some(NodeType::DocumentType),
            11 => Some(NodeType::DocumentFragment),
            12 => Some(NodeType::Notation),
            _ => None,
        }
    }
}

/// Shadow root flavor. `Closed` models polyfill-style roots that must not
/// be flagged as shadow content in the serialized output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShadowRootType {
    UserAgent,
    Open,
    Closed,
}

impl ShadowRootType {
    pub fn is_native(self) -> bool {
        !matches!(self, ShadowRootType::Closed)
    }
}

/// Rectangle with coordinates, as reported by layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl DomRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Document readiness of an iframe's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadyState {
    Loading,
    Interactive,
    Complete,
}

impl ReadyState {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "loading" => Some(ReadyState::Loading),
            "interactive" => Some(ReadyState::Interactive),
            "complete" => Some(ReadyState::Complete),
            _ => None,
        }
    }
}

/// Live playback state of an `<audio>`/`<video>` element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaState {
    pub paused: bool,
    pub current_time: f64,
    pub playback_rate: f64,
    pub muted: bool,
    pub looping: bool,
    pub volume: f64,
}

/// Captured state of a `<canvas>` element.
///
/// `data_url: None` models a tainted canvas whose pixel export throws.
/// `blank_data_url` is the export of a blank canvas with identical
/// dimensions, used to detect unpainted canvases when the context kind
/// was never observed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasState {
    pub context: Option<String>,
    pub data_url: Option<String>,
    pub pixels_blank: bool,
    pub blank_data_url: Option<String>,
}

/// Captured pixel export of an `<img>` element.
///
/// `data_url: None` models a CORS-tainted draw; `anonymous_data_url` is
/// the result of the single retry with an anonymous crossorigin reload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageState {
    pub data_url: Option<String>,
    pub anonymous_data_url: Option<String>,
}

/// A stylesheet attached to a `<style>` or `<link>` element.
///
/// `accessible: false` models a cross-origin sheet whose rule list
/// throws on access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleSheet {
    pub href: Option<String>,
    pub rules: Vec<String>,
    pub accessible: bool,
}

impl StyleSheet {
    pub fn inline(rules: Vec<String>) -> Self {
        Self {
            href: None,
            rules,
            accessible: true,
        }
    }
}

/// One node of the host tree.
///
/// Small fixed-size fields first for packing; large optional state is
/// boxed. `backend_node_id` is the stable identity of the live node and
/// survives arena rebuilds, which is what snapshot mirrors key on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomNode {
    pub node_id: NodeId,
    pub backend_node_id: u32,
    pub node_type: NodeType,

    pub node_name: String,
    pub node_value: String,
    pub attributes: HashMap<String, String>,
    pub namespace: Option<String>,

    pub parent_id: Option<NodeId>,
    pub children_ids: SmallVec<[NodeId; 4]>,

    // Doctype
    pub public_id: String,
    pub system_id: String,

    // Document
    pub compat_mode: Option<String>,
    pub document_url: Option<String>,
    pub base_url: Option<String>,

    // Iframe content
    pub content_document_id: Option<NodeId>,
    pub frame_url: Option<String>,
    pub ready_state: Option<ReadyState>,
    /// False when the frame is cross-origin and any content access throws.
    pub frame_access: bool,

    // Shadow DOM
    pub shadow_root_ids: Option<SmallVec<[NodeId; 2]>>,
    pub shadow_root_type: Option<ShadowRootType>,

    // Live element state
    pub scroll_left: f64,
    pub scroll_top: f64,
    pub bounds: Option<DomRect>,
    pub input_value: Option<String>,
    pub checked: bool,
    pub selected: bool,
    pub custom_element: bool,
    pub newly_added: bool,

    pub media: Option<Box<MediaState>>,
    pub canvas: Option<Box<CanvasState>>,
    pub image: Option<Box<ImageState>>,
    pub sheet: Option<Box<StyleSheet>>,
}

impl DomNode {
    /// Create a node with required fields; tree structure and live state
    /// are filled in by the builder.
    pub fn new(backend_node_id: u32, node_type: NodeType, node_name: String) -> Self {
        Self {
            node_id: 0,
            backend_node_id,
            node_type,
            node_name,
            node_value: String::new(),
            attributes: HashMap::new(),
            namespace: None,
            parent_id: None,
            children_ids: SmallVec::new(),
            public_id: String::new(),
            system_id: String::new(),
            compat_mode: None,
            document_url: None,
            base_url: None,
            content_document_id: None,
            frame_url: None,
            ready_state: None,
            frame_access: true,
            shadow_root_ids: None,
            shadow_root_type: None,
            scroll_left: 0.0,
            scroll_top: 0.0,
            bounds: None,
            input_value: None,
            checked: false,
            selected: false,
            custom_element: false,
            newly_added: false,
            media: None,
            canvas: None,
            image: None,
            sheet: None,
        }
    }

    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    pub fn is_text(&self) -> bool {
        self.node_type == NodeType::Text
    }

    pub fn is_document(&self) -> bool {
        self.node_type == NodeType::Document
    }

    /// Lowercased tag name for element nodes.
    pub fn tag(&self) -> Option<String> {
        self.is_element().then(|| self.node_name.to_lowercase())
    }

    /// Attribute lookup by lowercase name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn is_svg(&self) -> bool {
        self.namespace.as_deref() == Some(SVG_NAMESPACE)
    }
}
