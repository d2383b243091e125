//! Listener registry and event delivery

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::trace;

use super::{read, write};
use crate::types::ClientEvent;

/// Observer of client events
///
/// Called synchronously on the thread that caused the event. Listeners may
/// read buffers, query connection state, and call `connect`, `disconnect` or
/// `set_host`. Calling `ingest` or `reset_packets` from inside a data event
/// is not supported.
pub trait Listener: Send + Sync {
    fn on_event(&self, event: &ClientEvent);

    /// Closed listeners are dropped from the registry after the next event
    fn is_closed(&self) -> bool {
        false
    }
}

impl<F> Listener for F
where
    F: Fn(&ClientEvent) + Send + Sync,
{
    fn on_event(&self, event: &ClientEvent) {
        self(event)
    }
}

/// Registration handle returned by `add_listener`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Ordered set of listeners
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn Listener>)>>,
}

impl ListenerRegistry {
    pub(crate) fn add(&self, listener: Arc<dyn Listener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        write(&self.listeners).push((id, listener));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = write(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        read(&self.listeners).len()
    }

    /// Deliver an event to every listener in registration order
    ///
    /// The registry lock is not held while listeners run.
    pub(crate) fn notify(&self, event: &ClientEvent) {
        let snapshot: Vec<Arc<dyn Listener>> =
            read(&self.listeners).iter().map(|(_, l)| Arc::clone(l)).collect();

        trace!(?event, listeners = snapshot.len(), "Notifying listeners");
        let mut saw_closed = false;
        for listener in &snapshot {
            listener.on_event(event);
            saw_closed |= listener.is_closed();
        }

        if saw_closed {
            write(&self.listeners).retain(|(_, l)| !l.is_closed());
        }
    }
}

/// Listener forwarding events into an async stream
pub(crate) struct StreamListener {
    tx: mpsc::UnboundedSender<ClientEvent>,
}

impl StreamListener {
    pub(crate) fn channel() -> (Self, UnboundedReceiverStream<ClientEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, UnboundedReceiverStream::new(rx))
    }
}

impl Listener for StreamListener {
    fn on_event(&self, event: &ClientEvent) {
        let _ = self.tx.send(event.clone());
    }

    fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn notifies_in_registration_order() {
        let registry = ListenerRegistry::default();
        let order = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            registry.add(Arc::new(move |_: &ClientEvent| order.lock().unwrap().push(name)));
        }

        registry.notify(&ClientEvent::ValuesReset);
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn removed_listeners_are_not_called() {
        let registry = ListenerRegistry::default();
        let calls = Arc::new(AtomicU64::new(0));

        let counter = Arc::clone(&calls);
        let id = registry.add(Arc::new(move |_: &ClientEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        registry.notify(&ClientEvent::ValuesChanged);
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        registry.notify(&ClientEvent::ValuesChanged);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropped_streams_are_pruned() {
        let registry = ListenerRegistry::default();
        let (listener, stream) = StreamListener::channel();
        registry.add(Arc::new(listener));
        assert_eq!(registry.len(), 1);

        drop(stream);
        registry.notify(&ClientEvent::ValuesChanged);
        assert_eq!(registry.len(), 0);
    }
}
