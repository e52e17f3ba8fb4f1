//! Recursive tree walk: id assignment, mask propagation, shadow-root
//! inlining, and deferred-resource scheduling.
//!
//! The walk is fully synchronous. Nodes the slim-DOM filter (or the
//! whitespace rule) drops still get registered in the mirror under
//! `IGNORED_NODE` so sibling traversal stays coherent on the recorder
//! side; they are just never returned.

use dom::{DomArena, DomNode, NodeId, NodeType};

use crate::core::{ResolvedOptions, SnapshotCallbacks};
use crate::hooks::{IframeObservation, PendingResource};
use crate::mirror::Mirror;
use crate::policy::{BlockPolicy, MaskTextPolicy};
use crate::slim::slim_dom_excluded;
use crate::types::{SerializedNode, SerializedNodeWithId, SnapshotId, IGNORED_NODE};
use crate::url::{absolute_to_doc, get_sources_from_srcset, DocUrlCache};

/// Options a parent hands down to its children.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Bypass {
    /// The inherited masking verdict; `None` means "not decided yet",
    /// which triggers the ancestor check once at the subtree root.
    pub needs_mask: Option<bool>,
    pub preserve_white_space: bool,
    pub skip_child: bool,
}

/// One walk over one document, borrowing the session state.
pub(crate) struct Walker<'a> {
    pub arena: &'a DomArena,
    /// The document whose base URLs relative references resolve against.
    pub doc: NodeId,
    pub mirror: &'a mut dyn Mirror,
    pub opts: &'a ResolvedOptions,
    pub block: &'a BlockPolicy,
    pub mask: &'a MaskTextPolicy,
    pub callbacks: &'a mut SnapshotCallbacks,
    pub url_cache: &'a mut DocUrlCache,
    pub pending: &'a mut Vec<PendingResource>,
}

impl<'a> Walker<'a> {
    pub fn serialize_node_with_id(
        &mut self,
        node_id: NodeId,
        bypass: Bypass,
    ) -> Option<SerializedNodeWithId> {
        let arena = self.arena;
        let node = arena.get(node_id).ok()?;

        // A masked verdict is inherited outright; an unmasked one means
        // ancestors are already cleared, so only the node itself needs
        // checking. Undecided (subtree root) checks the full chain.
        let needs_mask = match bypass.needs_mask {
            Some(true) => true,
            Some(false) => self.mask.needs_mask(arena, node_id, false),
            None => self.mask.needs_mask(arena, node_id, true),
        };

        let Some(serialized) = self.serialize_node(node, needs_mask) else {
            tracing::warn!(node = node_id, kind = ?node.node_type, "node not serialized");
            return None;
        };

        let id = if self.mirror.has_node(node) {
            self.mirror.get_id(node)
        } else if slim_dom_excluded(&serialized, &self.opts.slim_dom)
            || (!bypass.preserve_white_space && is_ignorable_whitespace(&serialized))
        {
            IGNORED_NODE
        } else {
            self.mirror.allocate_id()
        };

        let root_id = self.root_id_for(node_id);
        let mut out = SerializedNodeWithId {
            id,
            root_id,
            node: serialized,
        };
        self.mirror.add(node, &out);

        if id == IGNORED_NODE {
            return None;
        }

        if let Some(cb) = self.callbacks.on_serialize.as_mut() {
            cb(node_id);
        }

        let record_child = !bypass.skip_child && !out.node.need_block();

        if node
            .shadow_root_ids
            .as_ref()
            .map_or(false, |roots| roots.iter().any(|&r| arena.is_native_shadow_root(r)))
        {
            out.node.set_is_shadow_host();
        }

        if matches!(node.node_type, NodeType::Document | NodeType::Element) && record_child {
            let mut preserve_white_space = bypass.preserve_white_space;
            if self.opts.slim_dom.head_whitespace && out.node.element_tag() == Some("head") {
                preserve_white_space = false;
            }
            let child_bypass = Bypass {
                needs_mask: Some(needs_mask),
                preserve_white_space,
                skip_child: false,
            };

            // A textarea whose live value is already recorded carries its
            // text in the attribute; recursing would duplicate it.
            let value_recorded = out.node.element_tag() == Some("textarea")
                && out
                    .node
                    .attributes()
                    .map_or(false, |a| a.contains_key("value"));

            if !value_recorded {
                for &child in &node.children_ids {
                    if let Some(serialized_child) = self.serialize_node_with_id(child, child_bypass)
                    {
                        if let Some(children) = out.node.child_nodes_mut() {
                            children.push(serialized_child);
                        }
                    }
                }
            }

            if let Some(roots) = &node.shadow_root_ids {
                for &shadow_root in roots {
                    let native = arena.is_native_shadow_root(shadow_root);
                    let Ok(fragment) = arena.get(shadow_root) else {
                        continue;
                    };
                    for &child in &fragment.children_ids {
                        if let Some(mut serialized_child) =
                            self.serialize_node_with_id(child, child_bypass)
                        {
                            if native {
                                serialized_child.node.set_is_shadow();
                            }
                            if let Some(children) = out.node.child_nodes_mut() {
                                children.push(serialized_child);
                            }
                        }
                    }
                }
            }
        }

        if node
            .parent_id
            .map_or(false, |p| arena.is_native_shadow_root(p))
        {
            out.node.set_is_shadow();
        }

        if out.node.element_tag() == Some("iframe") {
            let src = node
                .attr("src")
                .map(|s| absolute_to_doc(self.url_cache, arena, self.doc, s))
                .unwrap_or_default();
            let keep = self
                .callbacks
                .keep_iframe_src_fn
                .as_ref()
                .map_or(false, |f| f(&src));
            if !keep {
                self.pending.push(PendingResource::Iframe {
                    node: node_id,
                    observed: IframeObservation {
                        ready_state: node.ready_state,
                        frame_url: node.frame_url.clone(),
                        src,
                        frame_access: node.frame_access,
                    },
                    timeout: self.opts.iframe_load_timeout,
                });
            }
        }

        // Links whose sheet is already populated were inlined during the
        // walk; only unloaded ones are armed.
        if out.node.element_tag() == Some("link")
            && node.sheet.is_none()
            && is_stylesheet_link(node)
        {
            self.pending.push(PendingResource::Stylesheet {
                node: node_id,
                timeout: self.opts.stylesheet_load_timeout,
            });
        }

        if self.callbacks.on_asset_detected.is_some() && out.node.is_element() {
            let urls = self.collect_asset_urls(node);
            if !urls.is_empty() {
                if let Some(cb) = self.callbacks.on_asset_detected.as_mut() {
                    cb(&urls);
                }
            }
        }

        Some(out)
    }

    /// The id of the node's owning sub-document, absent for the top
    /// document (id 1) and for documents not yet registered.
    fn root_id_for(&self, node_id: NodeId) -> Option<SnapshotId> {
        let arena = self.arena;
        let doc = arena.owner_document(node_id)?;
        let doc_node = arena.get(doc).ok()?;
        if !self.mirror.has_node(doc_node) {
            return None;
        }
        let id = self.mirror.get_id(doc_node);
        (id != 1).then_some(id)
    }

    /// Every cacheable URL an element references through src/srcset.
    fn collect_asset_urls(&mut self, node: &DomNode) -> Vec<String> {
        let Some(tag) = node.tag() else {
            return Vec::new();
        };
        let arena = self.arena;
        let doc = self.doc;
        let mut urls = Vec::new();

        let mut push_src = |cache: &mut DocUrlCache, urls: &mut Vec<String>, value: Option<&str>| {
            if let Some(value) = value {
                let absolute = absolute_to_doc(cache, arena, doc, value);
                if !absolute.is_empty() {
                    urls.push(absolute);
                }
            }
        };

        match tag.as_str() {
            "img" | "source" => {
                push_src(&mut *self.url_cache, &mut urls, node.attr("src"));
                if let Some(srcset) = node.attr("srcset") {
                    for source in get_sources_from_srcset(srcset) {
                        push_src(&mut *self.url_cache, &mut urls, Some(&source));
                    }
                }
            }
            "video" | "audio" | "embed" | "track" => {
                push_src(&mut *self.url_cache, &mut urls, node.attr("src"));
            }
            "object" => {
                push_src(&mut *self.url_cache, &mut urls, node.attr("data"));
            }
            "input" => {
                if node.attr("type") == Some("image") {
                    push_src(&mut *self.url_cache, &mut urls, node.attr("src"));
                }
            }
            _ => {}
        }

        urls
    }
}

fn is_ignorable_whitespace(serialized: &SerializedNode) -> bool {
    matches!(
        serialized,
        SerializedNode::Text {
            text_content,
            is_style: None,
        } if !text_content.chars().any(|c| !c.is_whitespace())
    )
}

fn is_stylesheet_link(node: &DomNode) -> bool {
    let rel = node.attr("rel").unwrap_or("");
    if rel == "stylesheet" {
        return true;
    }
    rel == "preload" && node.attr("href").map_or(false, has_css_extension)
}

fn has_css_extension(href: &str) -> bool {
    let path = href.split(['?', '#']).next().unwrap_or("");
    path.contains('.')
        && path
            .rsplit('.')
            .next()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("css"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stylesheet_links_are_detected() {
        let mut link = DomNode::new(1, NodeType::Element, "LINK".to_string());
        link.attributes
            .insert("rel".to_string(), "stylesheet".to_string());
        assert!(is_stylesheet_link(&link));

        let mut preload = DomNode::new(2, NodeType::Element, "LINK".to_string());
        preload
            .attributes
            .insert("rel".to_string(), "preload".to_string());
        preload
            .attributes
            .insert("href".to_string(), "http://h/main.css?v=1".to_string());
        assert!(is_stylesheet_link(&preload));

        preload
            .attributes
            .insert("href".to_string(), "http://h/app.js".to_string());
        assert!(!is_stylesheet_link(&preload));
    }

    #[test]
    fn whitespace_text_is_ignorable_unless_style() {
        let ws = SerializedNode::Text {
            text_content: " \n\t ".to_string(),
            is_style: None,
        };
        assert!(is_ignorable_whitespace(&ws));

        let styled = SerializedNode::Text {
            text_content: " ".to_string(),
            is_style: Some(true),
        };
        assert!(!is_ignorable_whitespace(&styled));

        let content = SerializedNode::Text {
            text_content: " a ".to_string(),
            is_style: None,
        };
        assert!(!is_ignorable_whitespace(&content));
    }
}
