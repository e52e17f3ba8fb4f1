//! Deferred resource capture: iframe and stylesheet load races.
//!
//! Each hook fires at most once, first-wins between the load event and
//! its timer. The iframe state machine runs on the readiness observed
//! when the hook was armed (during the walk); only the re-serialization
//! reads current host state. There is no cancellation: short of host
//! teardown, an armed timer always fires.

use dom::{LoadEvent, LoadEventBus, NodeId, ReadyState};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;

use crate::types::SerializedNodeWithId;

/// Iframe state captured when the hook was armed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IframeObservation {
    /// None models an unreachable content window.
    pub ready_state: Option<ReadyState>,
    pub frame_url: Option<String>,
    pub src: String,
    pub frame_access: bool,
}

/// A capture deferred until its resource loads.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingResource {
    Iframe {
        node: NodeId,
        observed: IframeObservation,
        timeout: Duration,
    },
    Stylesheet {
        node: NodeId,
        timeout: Duration,
    },
}

/// A deferred capture that fired; the consumer splices it into the tree
/// it received from the synchronous walk.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedCapture {
    /// A same-origin iframe finished loading; its document was
    /// serialized with ids continuing the session counter.
    IframeDocument {
        iframe: NodeId,
        document: SerializedNodeWithId,
    },
    /// A stylesheet link loaded; the link node was re-serialized and now
    /// carries `_cssText`.
    StylesheetLink {
        link: NodeId,
        node: SerializedNodeWithId,
    },
}

async fn wait_for(rx: &mut broadcast::Receiver<LoadEvent>, expected: LoadEvent) {
    loop {
        match rx.recv().await {
            Ok(event) if event == expected => return,
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => {
                // Host torn down: this listener never fires.
                std::future::pending::<()>().await;
            }
        }
    }
}

const ABOUT_BLANK: &str = "about:blank";

/// Wait until an iframe's content can be captured. Returns false when
/// the frame must be skipped (cross-origin or no content window).
pub(crate) async fn once_iframe_loaded(
    observed: &IframeObservation,
    events: &LoadEventBus,
    node: NodeId,
    timeout: Duration,
) -> bool {
    if !observed.frame_access {
        return false;
    }
    let Some(ready) = observed.ready_state else {
        return false;
    };

    if ready != ReadyState::Complete {
        let mut rx = events.subscribe();
        tokio::select! {
            _ = wait_for(&mut rx, LoadEvent::IframeLoaded { node }) => {}
            _ = sleep(timeout) => {
                tracing::debug!(node, "iframe load timed out, capturing current state");
            }
        }
        return true;
    }

    // A frame can report complete while still sitting on about:blank
    // before its real navigation commits. Only the load event settles it.
    let frame_url = observed.frame_url.as_deref().unwrap_or(ABOUT_BLANK);
    if frame_url == ABOUT_BLANK && observed.src != ABOUT_BLANK && !observed.src.is_empty() {
        let mut rx = events.subscribe();
        wait_for(&mut rx, LoadEvent::IframeLoaded { node }).await;
        return true;
    }

    tokio::task::yield_now().await;
    true
}

/// Wait until a stylesheet link's sheet becomes available. Links whose
/// sheet was already populated at walk time are never armed, so this is
/// a plain event/timeout race.
pub(crate) async fn once_stylesheet_loaded(
    events: &LoadEventBus,
    node: NodeId,
    timeout: Duration,
) -> bool {
    let mut rx = events.subscribe();
    tokio::select! {
        _ = wait_for(&mut rx, LoadEvent::StylesheetLoaded { node }) => {}
        _ = sleep(timeout) => {
            tracing::debug!(node, "stylesheet load timed out, capturing current state");
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(ready: Option<ReadyState>) -> IframeObservation {
        IframeObservation {
            ready_state: ready,
            frame_url: Some("http://h/frame.html".to_string()),
            src: "http://h/frame.html".to_string(),
            frame_access: true,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn cross_origin_frames_are_skipped() {
        let events = LoadEventBus::new();
        let mut observed = observation(Some(ReadyState::Complete));
        observed.frame_access = false;
        assert!(!once_iframe_loaded(&observed, &events, 1, Duration::from_secs(5)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn unreachable_content_window_is_skipped() {
        let events = LoadEventBus::new();
        assert!(!once_iframe_loaded(&observation(None), &events, 1, Duration::from_secs(5)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn complete_frames_fire_on_next_tick() {
        let events = LoadEventBus::new();
        let observed = observation(Some(ReadyState::Complete));
        assert!(once_iframe_loaded(&observed, &events, 1, Duration::from_secs(5)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn loading_frames_race_event_against_timer() {
        let events = LoadEventBus::new();
        let observed = observation(Some(ReadyState::Loading));

        let (fired, _) = tokio::join!(
            once_iframe_loaded(&observed, &events, 1, Duration::from_secs(5)),
            async {
                sleep(Duration::from_millis(10)).await;
                events.publish(LoadEvent::IframeLoaded { node: 1 });
            }
        );
        assert!(fired);
    }

    #[tokio::test(start_paused = true)]
    async fn loading_frames_fire_on_timeout_without_event() {
        let events = LoadEventBus::new();
        let observed = observation(Some(ReadyState::Loading));
        assert!(once_iframe_loaded(&observed, &events, 1, Duration::from_millis(50)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_frame_with_real_src_waits_for_load() {
        let events = LoadEventBus::new();
        let observed = IframeObservation {
            ready_state: Some(ReadyState::Complete),
            frame_url: Some(ABOUT_BLANK.to_string()),
            src: "http://h/slow.html".to_string(),
            frame_access: true,
        };

        let (fired, _) = tokio::join!(
            once_iframe_loaded(&observed, &events, 3, Duration::from_millis(10)),
            async {
                // Well past the timeout: only the load event can fire this.
                sleep(Duration::from_secs(60)).await;
                events.publish(LoadEvent::IframeLoaded { node: 3 });
            }
        );
        assert!(fired);
    }

    #[tokio::test(start_paused = true)]
    async fn stylesheet_race_fires_on_event_or_timeout() {
        let events = LoadEventBus::new();

        let (fired, _) = tokio::join!(
            once_stylesheet_loaded(&events, 9, Duration::from_secs(5)),
            async {
                sleep(Duration::from_millis(10)).await;
                events.publish(LoadEvent::StylesheetLoaded { node: 9 });
            }
        );
        assert!(fired);

        assert!(once_stylesheet_loaded(&events, 9, Duration::from_millis(20)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn foreign_events_do_not_fire_the_hook() {
        let events = LoadEventBus::new();
        let observed = observation(Some(ReadyState::Loading));

        let (fired, _) = tokio::join!(
            once_iframe_loaded(&observed, &events, 1, Duration::from_millis(100)),
            async {
                sleep(Duration::from_millis(10)).await;
                events.publish(LoadEvent::IframeLoaded { node: 2 });
                events.publish(LoadEvent::StylesheetLoaded { node: 1 });
            }
        );
        // Fired via the timer, not the unrelated events.
        assert!(fired);
    }
}
