//! In-memory registry of per-entity sections and settings.

mod blob;
mod store;

pub use blob::StoreBlob;
pub use store::ScheduleStore;
