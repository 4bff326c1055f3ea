use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, error};

use crate::metrics::ACTIVE_SUBSCRIPTIONS;

/// The two record types stored per entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Sections,
    Settings,
}

impl RecordKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sections => "sections",
            Self::Settings => "settings",
        }
    }
}

pub type Callback = Arc<dyn Fn() + Send + Sync>;

type ChannelKey = (String, RecordKind);

/// Registration returned by [`NotificationBus::subscribe`]; pass it back to
/// [`NotificationBus::unsubscribe`] to cancel.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    entity_id: String,
    kind: RecordKind,
    id: u64,
}

impl SubscriptionHandle {
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn kind(&self) -> RecordKind {
        self.kind
    }
}

/// Per `(entity, kind)` set of callbacks.
///
/// `publish` runs callbacks synchronously on the caller's task. Callbacks are
/// cloned out of the map first, so a callback may subscribe or unsubscribe
/// without deadlocking.
#[derive(Default)]
pub struct NotificationBus {
    channels: DashMap<ChannelKey, HashMap<u64, Callback>>,
    next_id: AtomicU64,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, entity_id: &str, kind: RecordKind, callback: F) -> SubscriptionHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.channels
            .entry((entity_id.to_string(), kind))
            .or_default()
            .insert(id, Arc::new(callback));
        ACTIVE_SUBSCRIPTIONS.inc();
        debug!(entity_id, kind = kind.as_str(), id, "subscribed");
        SubscriptionHandle { entity_id: entity_id.to_string(), kind, id }
    }

    /// Remove exactly one registration. Returns false if it was already gone.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let key = (handle.entity_id.clone(), handle.kind);
        let removed = match self.channels.get_mut(&key) {
            Some(mut subs) => subs.remove(&handle.id).is_some(),
            None => false,
        };
        if removed {
            self.channels.remove_if(&key, |_, subs| subs.is_empty());
            ACTIVE_SUBSCRIPTIONS.dec();
            debug!(entity_id = %handle.entity_id, kind = handle.kind.as_str(), id = handle.id, "unsubscribed");
        }
        removed
    }

    /// Invoke every current subscriber of `(entity_id, kind)`. A panicking
    /// callback is logged and skipped. Returns how many callbacks completed.
    pub fn publish(&self, entity_id: &str, kind: RecordKind) -> usize {
        let callbacks: Vec<Callback> = match self.channels.get(&(entity_id.to_string(), kind)) {
            Some(subs) => subs.values().cloned().collect(),
            None => return 0,
        };

        let mut delivered = 0;
        for callback in callbacks {
            match catch_unwind(AssertUnwindSafe(|| (*callback)())) {
                Ok(()) => delivered += 1,
                Err(_) => error!(entity_id, kind = kind.as_str(), "subscriber panicked during publish"),
            }
        }
        delivered
    }

    pub fn subscriber_count(&self, entity_id: &str, kind: RecordKind) -> usize {
        self.channels
            .get(&(entity_id.to_string(), kind))
            .map_or(0, |subs| subs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        (hits, move || {
            h.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn publish_reaches_only_matching_channel() {
        let bus = NotificationBus::new();
        let (lamp_sections, cb1) = counter();
        let (lamp_settings, cb2) = counter();
        let (fan_sections, cb3) = counter();
        bus.subscribe("lamp", RecordKind::Sections, cb1);
        bus.subscribe("lamp", RecordKind::Settings, cb2);
        bus.subscribe("fan", RecordKind::Sections, cb3);

        assert_eq!(bus.publish("lamp", RecordKind::Sections), 1);
        assert_eq!(lamp_sections.load(Ordering::SeqCst), 1);
        assert_eq!(lamp_settings.load(Ordering::SeqCst), 0);
        assert_eq!(fan_sections.load(Ordering::SeqCst), 0);
        assert_eq!(bus.publish("nobody", RecordKind::Settings), 0);
    }

    #[test]
    fn unsubscribe_is_idempotent_and_prunes() {
        let bus = NotificationBus::new();
        let (hits, cb) = counter();
        let (other_hits, other) = counter();
        let handle = bus.subscribe("lamp", RecordKind::Sections, cb);
        let keep = bus.subscribe("lamp", RecordKind::Sections, other);
        assert_eq!(bus.subscriber_count("lamp", RecordKind::Sections), 2);

        assert!(bus.unsubscribe(&handle));
        assert!(!bus.unsubscribe(&handle));
        bus.publish("lamp", RecordKind::Sections);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(other_hits.load(Ordering::SeqCst), 1);

        assert!(bus.unsubscribe(&keep));
        assert_eq!(bus.subscriber_count("lamp", RecordKind::Sections), 0);
        assert!(bus.channels.is_empty());
    }

    #[test]
    fn panicking_subscriber_does_not_block_others() {
        let bus = NotificationBus::new();
        let (hits, cb) = counter();
        bus.subscribe("lamp", RecordKind::Settings, || panic!("boom"));
        bus.subscribe("lamp", RecordKind::Settings, cb);

        assert_eq!(bus.publish("lamp", RecordKind::Settings), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn callback_may_unsubscribe_itself() {
        let bus = Arc::new(NotificationBus::new());
        let slot: Arc<std::sync::Mutex<Option<SubscriptionHandle>>> = Arc::default();
        let (bus2, slot2) = (Arc::clone(&bus), Arc::clone(&slot));
        let handle = bus.subscribe("lamp", RecordKind::Sections, move || {
            if let Some(h) = slot2.lock().unwrap().take() {
                bus2.unsubscribe(&h);
            }
        });
        *slot.lock().unwrap() = Some(handle);

        assert_eq!(bus.publish("lamp", RecordKind::Sections), 1);
        assert_eq!(bus.subscriber_count("lamp", RecordKind::Sections), 0);
    }
}
