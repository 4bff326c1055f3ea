//! Record types shared by the store and the protocol layer.
//! - `schedule`: sections/settings records and their total normalizers.
//! - `entity`: entity identifier validation.

pub mod errors;
pub mod entity;
pub mod schedule;

pub use entity::validate_entity_id;
pub use schedule::{normalize_sections, normalize_settings, Section, Settings, SettingsView};
