//! Domain core for the armorsight backend.
//!
//! Pure types and logic with no I/O beyond reading the static spec table:
//! detection records, the `Detector` capability trait, the per-video
//! summarizer, the vehicle spec table, and registration input rules.

pub mod credentials;
pub mod detection;
pub mod detector;
pub mod error;
pub mod frame;
pub mod spec_table;
pub mod summary;
pub mod types;
