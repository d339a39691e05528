//! Event fan-out to subscribers
//!
//! Best-effort delivery over unbounded channels. Publishing never blocks
//! and never fails the operation that produced the event; a subscriber
//! whose receiver is gone is dropped on the next publish.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tokio::sync::mpsc;

use crate::ids::WorkspaceId;
use crate::observability::HealthCheck;

use super::event::AnnotationEvent;

pub type EventSender = mpsc::UnboundedSender<AnnotationEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<AnnotationEvent>;

/// Where committed operations report their notifications.
///
/// `publish` runs before the committing transaction releases its write
/// lock, so events arrive in commit order. It must not block.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: AnnotationEvent);
}

/// Subscriber handle returned by `Dispatcher::subscribe`
pub struct Subscription {
    pub id: u64,
    pub receiver: EventReceiver,
}

#[derive(Debug)]
struct Subscriber {
    /// `None` receives every event
    workspace: Option<WorkspaceId>,
    sender: EventSender,
}

impl Subscriber {
    fn matches(&self, event: &AnnotationEvent) -> bool {
        match self.workspace {
            None => true,
            Some(workspace) => event.workspace_id == Some(workspace),
        }
    }
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    subscribers: RwLock<BTreeMap<u64, Subscriber>>,
    next_subscriber: AtomicU64,
    sequence: AtomicU64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one workspace's events, or to everything with `None`.
    /// Document events carry no workspace and reach only unfiltered subscribers.
    pub fn subscribe(&self, workspace: Option<WorkspaceId>) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = self.next_subscriber.fetch_add(1, Ordering::Relaxed) + 1;

        if let Ok(mut subscribers) = self.subscribers.write() {
            subscribers.insert(id, Subscriber { workspace, sender });
        }

        Subscription { id, receiver }
    }

    pub fn unsubscribe(&self, id: u64) {
        if let Ok(mut subscribers) = self.subscribers.write() {
            subscribers.remove(&id);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Sequence of the last published event
    pub fn last_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Deliver an already-stamped event to every matching subscriber.
    pub fn dispatch(&self, event: &AnnotationEvent) -> DispatchResult {
        let mut result = DispatchResult::default();
        let mut closed = Vec::new();

        {
            let subscribers = match self.subscribers.read() {
                Ok(s) => s,
                Err(_) => return result,
            };

            for (id, subscriber) in subscribers.iter() {
                if !subscriber.matches(event) {
                    continue;
                }
                result.matched += 1;
                match subscriber.sender.send(event.clone()) {
                    Ok(()) => result.delivered += 1,
                    Err(_) => {
                        result.failed += 1;
                        closed.push(*id);
                    }
                }
            }
        }

        if !closed.is_empty() {
            if let Ok(mut subscribers) = self.subscribers.write() {
                for id in closed {
                    subscribers.remove(&id);
                }
            }
        }

        result
    }
}

impl EventSink for Dispatcher {
    fn publish(&self, mut event: AnnotationEvent) {
        event.sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        self.dispatch(&event);
    }
}

impl HealthCheck for Dispatcher {
    fn name(&self) -> &str {
        "dispatcher"
    }

    fn is_healthy(&self) -> bool {
        !self.subscribers.is_poisoned()
    }
}

/// Result of dispatching one event
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchResult {
    /// Subscribers whose filter matched
    pub matched: usize,
    pub delivered: usize,
    /// Receivers already dropped
    pub failed: usize,
}
