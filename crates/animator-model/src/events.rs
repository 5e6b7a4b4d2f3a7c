//! Document change notifications.

use std::fmt;
use std::str::FromStr;

use animator_common::AnimatorError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Notifications a document delivers to its listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentEvent {
    /// The whole document was replaced (load or reset)
    Load,
    /// Something in the document changed
    Update,
}

impl DocumentEvent {
    /// Event name as used by listeners.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for DocumentEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentEvent {
    type Err = AnimatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "load" => Ok(Self::Load),
            "update" => Ok(Self::Update),
            other => Err(AnimatorError::UnknownEvent(other.to_owned())),
        }
    }
}

/// Failure reported by a listener callback. Logged, never propagated.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ListenerError(pub String);

impl ListenerError {
    /// Creates a listener error from any message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Handle returned when registering a listener, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Callback invoked for document events.
pub type ListenerFn = Box<dyn FnMut(DocumentEvent) -> Result<(), ListenerError> + Send>;

struct Listener {
    id: ListenerId,
    event: DocumentEvent,
    remaining: Option<u32>,
    callback: ListenerFn,
}

/// Listener table of a document.
///
/// Delivery is synchronous and in registration order. A listener registered
/// with a limit is dropped after that many successful deliveries; a failing
/// listener is logged and does not stop delivery to the others.
#[derive(Default)]
pub struct EventListeners {
    listeners: Vec<Listener>,
    next_id: u64,
    suppressed: bool,
}

impl fmt::Debug for EventListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("listeners", &self.listeners.len())
            .field("suppressed", &self.suppressed)
            .finish()
    }
}

impl EventListeners {
    /// Registers a listener. `limit` of `None` or `Some(0)` means unlimited.
    pub fn add(&mut self, event: DocumentEvent, limit: Option<u32>, callback: ListenerFn) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push(Listener {
            id,
            event,
            remaining: limit.filter(|n| *n > 0),
            callback,
        });
        id
    }

    /// Removes a listener. Returns false if it was not registered for `event`.
    pub fn remove(&mut self, event: DocumentEvent, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !(l.id == id && l.event == event));
        self.listeners.len() != before
    }

    /// Number of registered listeners for `event`.
    #[must_use]
    pub fn count(&self, event: DocumentEvent) -> usize {
        self.listeners.iter().filter(|l| l.event == event).count()
    }

    /// Returns true while delivery is suspended.
    #[must_use]
    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// Suspends delivery. Events fired meanwhile are discarded.
    pub fn suppress(&mut self) {
        self.suppressed = true;
    }

    /// Resumes delivery.
    pub fn resume(&mut self) {
        self.suppressed = false;
    }

    /// Delivers `event` to its listeners.
    pub fn fire(&mut self, event: DocumentEvent) {
        if self.suppressed {
            return;
        }
        for listener in self.listeners.iter_mut().filter(|l| l.event == event) {
            match (listener.callback)(event) {
                Ok(()) => {
                    if let Some(remaining) = listener.remaining.as_mut() {
                        *remaining = remaining.saturating_sub(1);
                    }
                },
                Err(e) => error!("Error in {} event listener: {}", event, e),
            }
        }
        self.listeners.retain(|l| l.remaining != Some(0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter(hits: &Arc<AtomicUsize>) -> ListenerFn {
        let hits = Arc::clone(hits);
        Box::new(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_event_names() {
        assert_eq!("load".parse::<DocumentEvent>().ok(), Some(DocumentEvent::Load));
        assert_eq!(DocumentEvent::Update.to_string(), "update");
        assert!("change".parse::<DocumentEvent>().is_err());
    }

    #[test]
    fn test_limit_deregisters() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut listeners = EventListeners::default();
        listeners.add(DocumentEvent::Update, Some(2), counter(&hits));
        for _ in 0..5 {
            listeners.fire(DocumentEvent::Update);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(listeners.count(DocumentEvent::Update), 0);
    }

    #[test]
    fn test_failing_listener_does_not_block_others() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut listeners = EventListeners::default();
        listeners.add(
            DocumentEvent::Load,
            Some(1),
            Box::new(|_| Err(ListenerError::new("boom"))),
        );
        listeners.add(DocumentEvent::Load, None, counter(&hits));
        listeners.fire(DocumentEvent::Load);
        listeners.fire(DocumentEvent::Load);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        // failures do not use up the limit
        assert_eq!(listeners.count(DocumentEvent::Load), 2);
    }

    #[test]
    fn test_suppression_and_removal() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut listeners = EventListeners::default();
        let id = listeners.add(DocumentEvent::Update, None, counter(&hits));

        listeners.suppress();
        listeners.fire(DocumentEvent::Update);
        listeners.resume();
        listeners.fire(DocumentEvent::Load);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        assert!(!listeners.remove(DocumentEvent::Load, id));
        assert!(listeners.remove(DocumentEvent::Update, id));
        listeners.fire(DocumentEvent::Update);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
