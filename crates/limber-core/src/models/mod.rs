//! Data models for Limber

mod appointment;
mod diary;
mod exercise;
pub(crate) mod record;
mod stable_id;

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use appointment::Appointment;
pub use diary::{JournalEntry, PainEntry, SleepLog, SupplementLog};
pub use exercise::{ExerciseSession, RomMeasurement};
pub use record::{encode_fields, Fields, NewRecord, SnapshotKey, SyncRecord};
pub use stable_id::StableId;

/// A domain type stored in a synchronizable local collection.
///
/// `FIELDS` lists the serialized (camelCase) name of every domain field; the
/// collection registry validates its override and exclusion tables against it.
pub trait SyncEntity: Serialize + DeserializeOwned {
    /// Local collection name
    const COLLECTION: &'static str;
    /// Serialized names of all domain fields
    const FIELDS: &'static [&'static str];
}
