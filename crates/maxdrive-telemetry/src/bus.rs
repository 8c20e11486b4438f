//! Per-connector event bus: synchronous publish/subscribe of
//! telemetry snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::snapshot::TelemetrySnapshot;

/// Subscriber callback, invoked synchronously on the task that
/// produced the snapshot.
pub type SnapshotCallback = Arc<dyn Fn(&TelemetrySnapshot) + Send + Sync>;

/// Identity handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Synchronous snapshot fan-out embedded in each connector.
///
/// Dispatch iterates a copy of the subscriber set taken at dispatch
/// start, so a callback may subscribe or unsubscribe re-entrantly
/// without any entry being skipped or fired twice. A subscriber added
/// during dispatch sees only future snapshots; one removed during
/// dispatch still receives the in-flight snapshot.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    subscribers: HashMap<SubscriptionId, SnapshotCallback>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for future snapshots.
    pub fn subscribe(&self, callback: SnapshotCallback) -> SubscriptionId {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = SubscriptionId(inner.next_id);
        inner.subscribers.insert(id, callback);
        id
    }

    /// Remove a subscriber. Returns `false` when the id was not (or no
    /// longer) registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.lock().subscribers.remove(&id).is_some()
    }

    /// Deliver a snapshot to every subscriber present at dispatch
    /// start. Repeated identical snapshots are delivered verbatim; the
    /// bus never de-duplicates.
    pub fn publish(&self, snapshot: &TelemetrySnapshot) {
        let current: Vec<SnapshotCallback> = {
            let inner = self.inner.lock();
            inner.subscribers.values().map(Arc::clone).collect()
        };
        for callback in current {
            callback(snapshot);
        }
    }

    /// Number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot() -> TelemetrySnapshot {
        TelemetrySnapshot::new(true, 50.0, None)
    }

    #[test]
    fn test_subscribe_and_publish() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = Arc::clone(&hits);
        bus.subscribe(Arc::new(move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
        }));

        bus.publish(&snapshot());
        bus.publish(&snapshot());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = Arc::clone(&hits);
        let id = bus.subscribe(Arc::new(move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
        }));

        bus.publish(&snapshot());
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&snapshot());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_reentrant_unsubscribe_still_delivers_inflight() {
        // A subscriber removing itself during dispatch receives the
        // in-flight snapshot exactly once; later dispatches skip it.
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let bus2 = bus.clone();
        let hits2 = Arc::clone(&hits);
        let id_cell: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let id_cell2 = Arc::clone(&id_cell);
        let id = bus.subscribe(Arc::new(move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = *id_cell2.lock() {
                bus2.unsubscribe(id);
            }
        }));
        *id_cell.lock() = Some(id);

        bus.publish(&snapshot());
        bus.publish(&snapshot());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_subscriber_added_during_dispatch_sees_only_future() {
        let bus = EventBus::new();
        let late_hits = Arc::new(AtomicUsize::new(0));

        let bus2 = bus.clone();
        let late_hits2 = Arc::clone(&late_hits);
        let added = Arc::new(AtomicUsize::new(0));
        let added2 = Arc::clone(&added);
        bus.subscribe(Arc::new(move |_| {
            if added2.fetch_add(1, Ordering::SeqCst) == 0 {
                let late_hits3 = Arc::clone(&late_hits2);
                bus2.subscribe(Arc::new(move |_| {
                    late_hits3.fetch_add(1, Ordering::SeqCst);
                }));
            }
        }));

        bus.publish(&snapshot());
        assert_eq!(late_hits.load(Ordering::SeqCst), 0);
        bus.publish(&snapshot());
        assert_eq!(late_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_removed_before_dispatch_receives_nothing() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits2 = Arc::clone(&hits);
        let id = bus.subscribe(Arc::new(move |_| {
            hits2.fetch_add(1, Ordering::SeqCst);
        }));
        bus.unsubscribe(id);
        bus.publish(&snapshot());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
