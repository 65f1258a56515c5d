//! Sync-tagged record envelope

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{StableId, SyncEntity};
use crate::error::{Error, Result};

/// Domain field values keyed by local (camelCase) field name
pub type Fields = Map<String, Value>;

/// A record as held by the local store: domain fields plus sync control fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    /// Store-assigned key, unique within the collection. Never a remote identity.
    pub local_key: i64,
    /// Cross-device identity, immutable for the record's lifetime
    pub stable_id: StableId,
    /// Whether this exact revision has been confirmed on the remote service
    pub synced: bool,
    /// Bumped by every local mutation; never transmitted
    pub revision: i64,
    /// Domain fields
    pub fields: Fields,
}

impl SyncRecord {
    /// Key identifying this exact snapshot of the record
    #[must_use]
    pub const fn snapshot_key(&self) -> SnapshotKey {
        SnapshotKey {
            local_key: self.local_key,
            revision: self.revision,
        }
    }

    /// Deserialize the domain fields into a typed entity
    pub fn to_entity<T: SyncEntity>(&self) -> Result<T> {
        decode_fields(&self.fields)
    }
}

/// A record that has not been inserted yet (no local key assigned).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub stable_id: StableId,
    pub synced: bool,
    pub fields: Fields,
}

impl NewRecord {
    /// A locally created record: fresh stable id, pending push
    #[must_use]
    pub fn local(fields: Fields) -> Self {
        Self {
            stable_id: StableId::generate(),
            synced: false,
            fields,
        }
    }

    /// Build a locally created record from a typed entity
    pub fn from_entity<T: SyncEntity>(entity: &T) -> Result<Self> {
        Ok(Self::local(encode_fields(entity)?))
    }
}

/// Identifies one pushed snapshot: the record's key plus the revision that was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotKey {
    pub local_key: i64,
    pub revision: i64,
}

/// Serialize an entity into a field map
pub fn encode_fields<T: Serialize>(entity: &T) -> Result<Fields> {
    match serde_json::to_value(entity)? {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::InvalidInput(format!(
            "entity must serialize to an object, got {other}"
        ))),
    }
}

fn decode_fields<T: DeserializeOwned>(fields: &Fields) -> Result<T> {
    Ok(serde_json::from_value(Value::Object(fields.clone()))?)
}
