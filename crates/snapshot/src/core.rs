//! Snapshot session: options, defaults, and the capture entry points.
//!
//! A [`Snapshotter`] owns what one recording session needs: the mirror
//! with its id allocator, the per-document URL cache, the compiled
//! policies, and the user callbacks. The synchronous walk
//! returns the serialized tree plus the deferred resources (iframes,
//! stylesheets) still waiting on load events; `resolve_pending` drives
//! those to completion.

use std::collections::VecDeque;
use std::time::Duration;

use dom::{DomArena, DomNode, LoadEventBus, NodeId};

use crate::hooks::{once_iframe_loaded, once_stylesheet_loaded, PendingResource, ResolvedCapture};
use crate::mirror::{Mirror, NodeMirror};
use crate::policy::{BlockPolicy, MaskInputFn, MaskInputOptions, MaskTextPolicy, TextMatcher};
use crate::slim::SlimDomOptions;
use crate::types::SerializedNodeWithId;
use crate::url::DocUrlCache;
use crate::walker::{Bypass, Walker};

/// Input-masking coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskInputs {
    /// Mask every input kind.
    All,
    /// Mask only password fields.
    PasswordOnly,
    /// Use the given flags verbatim.
    Custom(MaskInputOptions),
}

impl MaskInputs {
    pub(crate) fn resolve(&self) -> MaskInputOptions {
        match self {
            MaskInputs::All => MaskInputOptions::all(),
            MaskInputs::PasswordOnly => MaskInputOptions::password_only(),
            MaskInputs::Custom(options) => *options,
        }
    }
}

/// Slim-DOM coverage presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlimDom {
    Off,
    /// Every category except description/keywords meta.
    Full,
    /// Every category.
    All,
    Custom(SlimDomOptions),
}

impl SlimDom {
    pub(crate) fn resolve(&self) -> SlimDomOptions {
        match self {
            SlimDom::Off => SlimDomOptions::default(),
            SlimDom::Full => SlimDomOptions::full(),
            SlimDom::All => SlimDomOptions::all(),
            SlimDom::Custom(options) => *options,
        }
    }
}

/// Capture options. `Default` mirrors what a recorder wants out of the
/// box: inline stylesheets, leave images and canvases alone, mask only
/// passwords.
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    pub block_class: TextMatcher,
    pub block_selector: Option<String>,
    pub mask_text_class: TextMatcher,
    pub mask_text_selector: Option<String>,
    pub inline_stylesheet: bool,
    pub inline_images: bool,
    pub record_canvas: bool,
    pub mask_all_inputs: MaskInputs,
    pub slim_dom: SlimDom,
    pub iframe_load_timeout: Duration,
    pub stylesheet_load_timeout: Duration,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            block_class: TextMatcher::class("rr-block"),
            block_selector: None,
            mask_text_class: TextMatcher::class("rr-mask"),
            mask_text_selector: None,
            inline_stylesheet: true,
            inline_images: false,
            record_canvas: false,
            mask_all_inputs: MaskInputs::PasswordOnly,
            slim_dom: SlimDom::Off,
            iframe_load_timeout: Duration::from_millis(5000),
            stylesheet_load_timeout: Duration::from_millis(5000),
        }
    }
}

pub type OnSerializeFn = Box<dyn FnMut(NodeId) + Send>;
pub type OnAssetDetectedFn = Box<dyn FnMut(&[String]) + Send>;
pub type KeepIframeSrcFn = Box<dyn Fn(&str) -> bool + Send + Sync>;
pub type MaskTextFn = Box<dyn Fn(&str, Option<&DomNode>) -> String + Send + Sync>;

/// Optional hooks across the system boundary. All default to absent;
/// `keep_iframe_src_fn` absent behaves as "never keep".
#[derive(Default)]
pub struct SnapshotCallbacks {
    pub on_serialize: Option<OnSerializeFn>,
    pub on_asset_detected: Option<OnAssetDetectedFn>,
    pub keep_iframe_src_fn: Option<KeepIframeSrcFn>,
    pub mask_text_fn: Option<MaskTextFn>,
    pub mask_input_fn: Option<MaskInputFn>,
}

/// Option values consumed during the walk, with presets expanded.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedOptions {
    pub inline_stylesheet: bool,
    pub inline_images: bool,
    pub record_canvas: bool,
    pub mask_input: MaskInputOptions,
    pub slim_dom: SlimDomOptions,
    pub iframe_load_timeout: Duration,
    pub stylesheet_load_timeout: Duration,
}

/// Outcome of one synchronous capture.
#[derive(Debug)]
pub struct SnapshotResult {
    /// The serialized tree; `None` when the root could not be serialized.
    pub tree: Option<SerializedNodeWithId>,
    /// Deferred captures still waiting on load events.
    pub pending: Vec<PendingResource>,
}

/// A capture session. Holds the mirror (and its id allocator), the URL
/// cache, policies, and callbacks for the lifetime of a recording.
pub struct Snapshotter {
    opts: ResolvedOptions,
    block: BlockPolicy,
    mask: MaskTextPolicy,
    callbacks: SnapshotCallbacks,
    mirror: Box<dyn Mirror>,
    url_cache: DocUrlCache,
}

impl Snapshotter {
    pub fn new(options: SnapshotOptions) -> Self {
        Self::with_mirror(options, Box::new(NodeMirror::new()))
    }

    /// Use a caller-supplied mirror shared with the record/replay side.
    pub fn with_mirror(options: SnapshotOptions, mirror: Box<dyn Mirror>) -> Self {
        let block = BlockPolicy::new(options.block_class.clone(), options.block_selector.as_deref());
        let mask = MaskTextPolicy::new(
            options.mask_text_class.clone(),
            options.mask_text_selector.as_deref(),
        );
        Self {
            opts: ResolvedOptions {
                inline_stylesheet: options.inline_stylesheet,
                inline_images: options.inline_images,
                record_canvas: options.record_canvas,
                mask_input: options.mask_all_inputs.resolve(),
                slim_dom: options.slim_dom.resolve(),
                iframe_load_timeout: options.iframe_load_timeout,
                stylesheet_load_timeout: options.stylesheet_load_timeout,
            },
            block,
            mask,
            callbacks: SnapshotCallbacks::default(),
            mirror,
            url_cache: DocUrlCache::new(),
        }
    }

    pub fn callbacks_mut(&mut self) -> &mut SnapshotCallbacks {
        &mut self.callbacks
    }

    pub fn mirror(&self) -> &dyn Mirror {
        &*self.mirror
    }

    /// Serialize the whole tree from the arena root.
    pub fn capture(&mut self, arena: &DomArena) -> SnapshotResult {
        match arena.root_id() {
            Some(root) => self.capture_node(arena, root),
            None => SnapshotResult {
                tree: None,
                pending: Vec::new(),
            },
        }
    }

    /// Recursive entry: serialize any subtree. The base document is the
    /// node's owner document.
    pub fn capture_node(&mut self, arena: &DomArena, node: NodeId) -> SnapshotResult {
        let doc = arena.owner_document(node).unwrap_or(node);
        let mut pending = Vec::new();
        let tree = self.walk_node(arena, node, doc, &mut pending);
        SnapshotResult { tree, pending }
    }

    fn walk_node(
        &mut self,
        arena: &DomArena,
        node: NodeId,
        doc: NodeId,
        pending: &mut Vec<PendingResource>,
    ) -> Option<SerializedNodeWithId> {
        let mut walker = Walker {
            arena,
            doc,
            mirror: &mut *self.mirror,
            opts: &self.opts,
            block: &self.block,
            mask: &self.mask,
            callbacks: &mut self.callbacks,
            url_cache: &mut self.url_cache,
            pending,
        };
        walker.serialize_node_with_id(
            node,
            Bypass {
                needs_mask: None,
                preserve_white_space: true,
                skip_child: false,
            },
        )
    }

    /// Drive deferred captures to completion. Each pending resource runs
    /// its load-event/timeout race; fired iframes are serialized as full
    /// sub-documents (ids continue from the session allocator), fired
    /// stylesheet links are re-serialized with their populated sheet.
    /// Nested iframes discovered along the way are driven too.
    pub async fn resolve_pending(
        &mut self,
        arena: &DomArena,
        events: &LoadEventBus,
        pending: Vec<PendingResource>,
    ) -> Vec<ResolvedCapture> {
        let mut queue: VecDeque<PendingResource> = pending.into();
        let mut resolved = Vec::new();

        while let Some(item) = queue.pop_front() {
            match item {
                PendingResource::Iframe {
                    node,
                    observed,
                    timeout,
                } => {
                    if !once_iframe_loaded(&observed, events, node, timeout).await {
                        continue;
                    }
                    let Ok(el) = arena.get(node) else { continue };
                    if !el.frame_access {
                        continue;
                    }
                    let Some(content) = el.content_document_id else {
                        continue;
                    };
                    let mut nested = Vec::new();
                    let tree = self.walk_node(arena, content, content, &mut nested);
                    queue.extend(nested);
                    if let Some(document) = tree {
                        resolved.push(ResolvedCapture::IframeDocument {
                            iframe: node,
                            document,
                        });
                    }
                }
                PendingResource::Stylesheet { node, timeout } => {
                    if !once_stylesheet_loaded(events, node, timeout).await {
                        continue;
                    }
                    let Some(doc) = arena.owner_document(node).or_else(|| arena.root_id()) else {
                        continue;
                    };
                    let mut nested = Vec::new();
                    let serialized = self.walk_node(arena, node, doc, &mut nested);
                    queue.extend(nested);
                    if let Some(serialized) = serialized {
                        resolved.push(ResolvedCapture::StylesheetLink {
                            link: node,
                            node: serialized,
                        });
                    }
                }
            }
        }

        resolved
    }

    /// Forget all node identities and cached bases; the next capture
    /// starts numbering from 1 again.
    pub fn reset(&mut self) {
        self.mirror.reset();
        self.url_cache.clear();
    }
}

/// One-shot capture with a fresh session.
pub fn snapshot(arena: &DomArena, options: SnapshotOptions) -> SnapshotResult {
    Snapshotter::new(options).capture(arena)
}
