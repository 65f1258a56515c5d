//! Pure conversion between local records and remote rows.

use serde_json::Value;

use crate::models::{Fields, NewRecord, StableId, SyncRecord};
use crate::remote::RemoteRow;

use super::registry::{
    CollectionEntry, REMOTE_ACCOUNT_COLUMN, REMOTE_ID_COLUMN, REMOTE_LOCAL_KEY_COLUMN,
    RESERVED_REMOTE_COLUMNS,
};

/// Translate a local record into a remote row scoped to `account_id`.
///
/// Excluded fields are dropped and absent values are omitted rather than sent
/// as `null`. The identity column is attached by [`to_remote_with_identity`].
pub fn to_remote(record: &SyncRecord, entry: &CollectionEntry, account_id: &str) -> RemoteRow {
    let mut row = RemoteRow::new();
    for (field, value) in &record.fields {
        if value.is_null() || !entry.is_transmitted(field) {
            continue;
        }
        row.insert(entry.remote_field(field).into_owned(), value.clone());
    }
    row.insert(
        REMOTE_ACCOUNT_COLUMN.to_string(),
        Value::String(account_id.to_string()),
    );
    row.insert(
        REMOTE_LOCAL_KEY_COLUMN.to_string(),
        Value::from(record.local_key),
    );
    row
}

/// [`to_remote`] plus the identity column populated from the stable id.
pub fn to_remote_with_identity(
    record: &SyncRecord,
    entry: &CollectionEntry,
    account_id: &str,
) -> RemoteRow {
    let mut row = to_remote(record, entry, account_id);
    row.insert(
        REMOTE_ID_COLUMN.to_string(),
        Value::String(record.stable_id.as_str().to_string()),
    );
    row
}

/// Identity of a remote row, if it carries one.
pub fn remote_identity(row: &RemoteRow) -> Option<StableId> {
    match row.get(REMOTE_ID_COLUMN)? {
        Value::String(id) if !id.trim().is_empty() => Some(StableId::from(id.as_str())),
        Value::Number(id) => Some(StableId::from(id.to_string())),
        _ => None,
    }
}

/// Translate a remote row into a new, already-reconciled local record.
///
/// Sync-owned columns never reach the domain fields, and neither do columns
/// that do not map back onto a declared, transmitted field. Callers filter out
/// rows without an identity (see [`remote_identity`]) beforehand.
pub fn to_local(row: &RemoteRow, entry: &CollectionEntry) -> NewRecord {
    let mut fields = Fields::new();
    for (column, value) in row {
        if value.is_null() || RESERVED_REMOTE_COLUMNS.contains(&column.as_str()) {
            continue;
        }
        let local = entry.local_field(column);
        if entry.is_transmitted(&local) {
            fields.insert(local.into_owned(), value.clone());
        }
    }

    NewRecord {
        stable_id: remote_identity(row).unwrap_or_else(|| StableId::from(String::new())),
        synced: true,
        fields,
    }
}
