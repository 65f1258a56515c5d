//! Offline-first synchronization between the local store and the remote service.

mod engine;
mod naming;
pub mod registry;
mod report;
pub mod translate;

pub use engine::SyncEngine;
pub use naming::{camel_to_snake, round_trips, snake_to_camel};
pub use registry::{CollectionEntry, Registry};
pub use report::{PhaseOutcome, SyncReport, SYNC_IN_PROGRESS};
