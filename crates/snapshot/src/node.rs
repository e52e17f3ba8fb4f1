//! Single-node serialization: each host node kind to its typed record,
//! with the element-specific capture policies (forms, canvas, images,
//! media, iframes, scroll, blocking).

use dom::{DomNode, NodeType};
use regex::Regex;
use std::sync::OnceLock;

use crate::policy::{mask_input_value, mask_text_value};
use crate::stylesheet::{inline_stylesheet_text, stringify_stylesheet};
use crate::types::{AttrValue, Attributes, SerializedNode};
use crate::url::{absolute_to_stylesheet, doc_href, ignore_attribute, transform_attribute};
use crate::walker::Walker;

fn invalid_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9\-_:]").unwrap())
}

/// Lowercased tag name, collapsed to `div` when it contains characters
/// outside the safe set (a hostile page can make `tagName` lie).
fn valid_tag_name(node_name: &str) -> String {
    let processed = node_name.to_lowercase().trim().to_string();
    if invalid_tag_regex().is_match(&processed) {
        "div".to_string()
    } else {
        processed
    }
}

const MASKED_INPUT_TYPE_EXCEPTIONS: &[&str] = &["radio", "checkbox", "submit", "button"];

impl<'a> Walker<'a> {
    /// Serialize one node in isolation. `None` for node kinds the
    /// snapshot format has no record for.
    pub(crate) fn serialize_node(
        &mut self,
        node: &DomNode,
        needs_mask: bool,
    ) -> Option<SerializedNode> {
        match node.node_type {
            NodeType::Document => Some(self.serialize_document(node)),
            NodeType::DocumentType => Some(SerializedNode::DocumentType {
                name: node.node_name.clone(),
                public_id: node.public_id.clone(),
                system_id: node.system_id.clone(),
            }),
            NodeType::Element => Some(self.serialize_element(node)),
            NodeType::Text => Some(self.serialize_text(node, needs_mask)),
            NodeType::CdataSection => Some(SerializedNode::Cdata {
                text_content: String::new(),
            }),
            NodeType::Comment => Some(SerializedNode::Comment {
                text_content: node.node_value.clone(),
            }),
            _ => None,
        }
    }

    fn serialize_document(&self, node: &DomNode) -> SerializedNode {
        SerializedNode::Document {
            // Only quirks modes are worth replaying.
            compat_mode: node.compat_mode.clone().filter(|m| m != "CSS1Compat"),
            child_nodes: Vec::new(),
        }
    }

    fn serialize_element(&mut self, node: &DomNode) -> SerializedNode {
        let arena = self.arena;
        let doc = self.doc;
        let need_block = self.block.is_blocked(arena, node);
        let tag_name = valid_tag_name(&node.node_name);

        let mut attributes = Attributes::new();
        for (name, value) in &node.attributes {
            if ignore_attribute(&tag_name, name) {
                continue;
            }
            let transformed =
                transform_attribute(self.url_cache, arena, doc, &tag_name, name, value);
            attributes.insert(name.clone(), AttrValue::Str(transformed));
        }

        if tag_name == "link" && self.opts.inline_stylesheet {
            if let Some(sheet) = node.sheet.as_deref() {
                let href = doc_href(arena, doc).unwrap_or_default();
                if let Some(css_text) = inline_stylesheet_text(sheet, &href) {
                    attributes.remove("rel");
                    attributes.remove("href");
                    attributes.insert("_cssText".to_string(), AttrValue::Str(css_text));
                }
            }
        }

        // Dynamic stylesheets: an empty <style> whose sheet was populated
        // through the CSSOM has no text child to capture.
        if tag_name == "style" && !has_meaningful_text_child(self, node) {
            if let Some(sheet) = node.sheet.as_deref() {
                if let Some(css_text) = stringify_stylesheet(sheet) {
                    let href = doc_href(arena, doc).unwrap_or_default();
                    attributes.insert(
                        "_cssText".to_string(),
                        AttrValue::Str(absolute_to_stylesheet(&css_text, &href)),
                    );
                }
            }
        }

        if matches!(tag_name.as_str(), "input" | "textarea" | "select") {
            let value = node.input_value.as_deref().unwrap_or("");
            let input_type = node.attr("type");
            if !input_type.map_or(false, |t| MASKED_INPUT_TYPE_EXCEPTIONS.contains(&t))
                && !value.is_empty()
            {
                let masked = mask_input_value(
                    &self.opts.mask_input,
                    &tag_name,
                    input_type,
                    value,
                    self.callbacks.mask_input_fn.as_ref(),
                    node,
                );
                attributes.insert("value".to_string(), AttrValue::Str(masked));
            } else if node.checked {
                attributes.insert("checked".to_string(), AttrValue::Bool(true));
            }
        }

        if tag_name == "option" {
            // The HTML attribute reflects the initial selection, not the
            // current one; the live flag is authoritative.
            if node.selected && !self.opts.mask_input.select {
                attributes.insert("selected".to_string(), AttrValue::Bool(true));
            } else {
                attributes.remove("selected");
            }
        }

        if tag_name == "canvas" && self.opts.record_canvas {
            if let Some(canvas) = node.canvas.as_deref() {
                match canvas.context.as_deref() {
                    Some("2d") => {
                        if !canvas.pixels_blank {
                            if let Some(data_url) = &canvas.data_url {
                                attributes.insert(
                                    "rr_dataURL".to_string(),
                                    AttrValue::Str(data_url.clone()),
                                );
                            } else {
                                tracing::debug!(
                                    node = node.node_id,
                                    "canvas export unavailable, skipping capture"
                                );
                            }
                        }
                    }
                    None => {
                        // Context never observed: compare against a blank
                        // canvas of identical dimensions.
                        if let (Some(data_url), Some(blank)) =
                            (&canvas.data_url, &canvas.blank_data_url)
                        {
                            if data_url != blank {
                                attributes.insert(
                                    "rr_dataURL".to_string(),
                                    AttrValue::Str(data_url.clone()),
                                );
                            }
                        }
                    }
                    Some(_) => {} // non-2d readback is out of scope
                }
            }
        }

        if tag_name == "img" && self.opts.inline_images {
            if let Some(image) = node.image.as_deref() {
                match image.data_url.as_ref().or(image.anonymous_data_url.as_ref()) {
                    Some(data_url) => {
                        attributes
                            .insert("rr_dataURL".to_string(), AttrValue::Str(data_url.clone()));
                    }
                    None => {
                        tracing::warn!(node = node.node_id, "unable to inline tainted image");
                    }
                }
            }
        }

        if matches!(tag_name.as_str(), "audio" | "video") {
            if let Some(media) = node.media.as_deref() {
                let state = if media.paused { "paused" } else { "played" };
                attributes.insert("rr_mediaState".to_string(), AttrValue::Str(state.into()));
                attributes.insert(
                    "rr_mediaCurrentTime".to_string(),
                    AttrValue::Num(media.current_time),
                );
                attributes.insert(
                    "rr_mediaPlaybackRate".to_string(),
                    AttrValue::Num(media.playback_rate),
                );
                attributes.insert("rr_mediaMuted".to_string(), AttrValue::Bool(media.muted));
                attributes.insert("rr_mediaLoop".to_string(), AttrValue::Bool(media.looping));
                attributes.insert("rr_mediaVolume".to_string(), AttrValue::Num(media.volume));
            }
        }

        // Fresh elements always scroll from zero, and reading offsets
        // forces a reflow.
        if !node.newly_added {
            if node.scroll_left != 0.0 {
                attributes.insert("rr_scrollLeft".to_string(), AttrValue::Num(node.scroll_left));
            }
            if node.scroll_top != 0.0 {
                attributes.insert("rr_scrollTop".to_string(), AttrValue::Num(node.scroll_top));
            }
        }

        if need_block {
            let (width, height) = node
                .bounds
                .map(|b| (b.width, b.height))
                .unwrap_or((0.0, 0.0));
            let class = attributes.remove("class");
            attributes = Attributes::new();
            if let Some(class) = class {
                attributes.insert("class".to_string(), class);
            }
            attributes.insert("rr_width".to_string(), AttrValue::Str(format!("{}px", width)));
            attributes.insert(
                "rr_height".to_string(),
                AttrValue::Str(format!("{}px", height)),
            );
        }

        if tag_name == "iframe" {
            let src = attributes.get("src").and_then(AttrValue::as_str);
            let keep = match (&self.callbacks.keep_iframe_src_fn, src) {
                (Some(f), Some(src)) => f(src),
                _ => false,
            };
            if !keep {
                let content_reachable = node.content_document_id.is_some() && node.frame_access;
                if !content_reachable {
                    // Preserve the target so replay can decide, without
                    // letting the frame auto-load.
                    if let Some(src) = attributes.get("src").cloned() {
                        attributes.insert("rr_src".to_string(), src);
                    }
                }
                attributes.remove("src");
            }
        }

        SerializedNode::Element {
            tag_name,
            attributes,
            child_nodes: Vec::new(),
            is_svg: node.is_svg().then_some(true),
            need_block: need_block.then_some(true),
            is_shadow_host: None,
            is_shadow: None,
            is_custom: node.custom_element.then_some(true),
        }
    }

    fn serialize_text(&mut self, node: &DomNode, needs_mask: bool) -> SerializedNode {
        let arena = self.arena;
        let parent = node.parent_id.and_then(|p| arena.get(p).ok());
        let parent_tag = parent.and_then(|p| p.tag());
        let is_style = parent_tag.as_deref() == Some("style");
        let is_script = parent_tag.as_deref() == Some("script");

        let mut text = node.node_value.clone();

        if is_style {
            if let Some(parent) = parent {
                // The live sheet beats the source text, but only when this
                // is the sole child; mixed content keeps the raw text.
                if parent.children_ids.len() == 1 {
                    if let Some(sheet) = parent.sheet.as_deref() {
                        if let Some(css_text) = stringify_stylesheet(sheet) {
                            text = css_text;
                        }
                    }
                }
            }
            let href = doc_href(arena, self.doc).unwrap_or_default();
            text = absolute_to_stylesheet(&text, &href);
        }

        if is_script {
            text = "SCRIPT_PLACEHOLDER".to_string();
        }

        if !is_style && !is_script && !text.is_empty() && needs_mask {
            text = match &self.callbacks.mask_text_fn {
                Some(f) => f(&text, arena.parent_element(node.node_id)),
                None => mask_text_value(&text),
            };
        }

        SerializedNode::Text {
            text_content: text,
            is_style: is_style.then_some(true),
        }
    }
}

fn has_meaningful_text_child(walker: &Walker<'_>, node: &DomNode) -> bool {
    node.children_ids
        .iter()
        .filter_map(|&c| walker.arena.get(c).ok())
        .any(|c| c.is_text() && !c.node_value.trim().is_empty())
}
