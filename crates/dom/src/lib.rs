//! Host DOM model for snapshot serialization.
//!
//! An arena-backed representation of a live document tree, built from
//! CDP-flavoured JSON. Nodes carry the live state a serializer needs
//! (scroll offsets, form values, media/canvas exports, stylesheet text,
//! iframe readiness) alongside structure, shadow roots, and inlined
//! iframe content documents.
//!
//! ```text
//! JSON payload → TreeBuilder → DomArena (owned) → snapshot walk
//!                                   ↓
//!                             NodeId (u32)
//! ```

pub mod arena;
pub mod builder;
pub mod error;
pub mod events;
pub mod selector;
pub mod types;

pub use arena::DomArena;
pub use builder::TreeBuilder;
pub use error::{DomError, Result};
pub use events::{LoadEvent, LoadEventBus};
pub use selector::SelectorList;
pub use types::*;
