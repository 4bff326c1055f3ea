//! Change notifications keyed by entity and record kind.

mod bus;

pub use bus::{Callback, NotificationBus, RecordKind, SubscriptionHandle};
