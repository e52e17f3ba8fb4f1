//! Load-event delivery for deferred resource capture.
//!
//! Design: type-safe events on a tokio broadcast channel. Publishing with
//! no subscribers is not an error; late subscribers only see events sent
//! after they subscribe, which is the semantics a load listener wants.

use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Events fired by the host when deferred resources finish loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadEvent {
    /// An iframe's content document finished loading.
    IframeLoaded { node: NodeId },
    /// A `<link rel=stylesheet>` element's sheet became available.
    StylesheetLoaded { node: NodeId },
}

/// Broadcast bus for load events.
pub struct LoadEventBus {
    tx: broadcast::Sender<LoadEvent>,
}

impl LoadEventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1024);
        Self { tx }
    }

    /// Publish an event. Ignores the error when nobody is listening.
    pub fn publish(&self, event: LoadEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LoadEvent> {
        self.tx.subscribe()
    }
}

impl Default for LoadEventBus {
    fn default() -> Self {
        Self::new()
    }
}
