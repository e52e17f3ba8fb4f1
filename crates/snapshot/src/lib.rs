//! Replay-ready DOM snapshot serialization.
//!
//! Walks a host document tree and produces a self-contained, typed JSON
//! description of every node: URLs absolutized, form and media state
//! captured, stylesheets inlined, sensitive content masked or blocked,
//! and every node addressable through a stable integer id shared with
//! the record/replay side via the [`Mirror`].
//!
//! ```text
//! snapshot ─► walker ─► (policies, node serializer ─► url resolver,
//!                        stylesheet extractor, slim-dom filter)
//!                 │
//!                 ├─► mirror (node ↔ id)
//!                 └─► pending iframes/stylesheets ─► resolve_pending
//! ```
//!
//! The synchronous walk never suspends; iframes and stylesheets that are
//! still loading come back as pending resources that
//! [`Snapshotter::resolve_pending`] drives through load-event/timeout
//! races.

pub mod core;
pub mod hooks;
pub mod mirror;
mod node;
pub mod policy;
pub mod slim;
pub mod stylesheet;
pub mod types;
pub mod url;
mod walker;

pub use self::core::{
    snapshot, KeepIframeSrcFn, MaskInputs, MaskTextFn, OnAssetDetectedFn, OnSerializeFn, SlimDom,
    SnapshotCallbacks, SnapshotOptions, SnapshotResult, Snapshotter,
};
pub use hooks::{IframeObservation, PendingResource, ResolvedCapture};
pub use mirror::{Mirror, NodeMirror};
pub use policy::{
    mask_input_value, mask_text_value, BlockPolicy, MaskInputFn, MaskInputOptions, MaskTextPolicy,
    TextMatcher,
};
pub use slim::SlimDomOptions;
pub use stylesheet::stringify_stylesheet;
pub use types::{
    AttrValue, Attributes, SerializedNode, SerializedNodeWithId, SnapshotId, IGNORED_NODE,
};
pub use self::url::{
    absolute_to_doc, absolute_to_stylesheet, get_absolute_srcset_string, get_sources_from_srcset,
    transform_attribute, DocUrlCache,
};
