//! Service layer for the schedule store.
//! - `storage`: opaque blob backends (JSON file, in-memory).
//! - `schedule`: the in-memory registry of sections/settings per entity.
//! - `notify`: per-entity, per-record-kind change subscriptions.
//! - `setup`: one-time single-instance config entry.

pub mod errors;
pub mod metrics;
pub mod notify;
pub mod runtime;
pub mod schedule;
pub mod setup;
pub mod storage;

pub use errors::ServiceError;
pub use notify::{NotificationBus, RecordKind, SubscriptionHandle};
pub use schedule::ScheduleStore;
