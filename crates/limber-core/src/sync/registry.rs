//! Collection registry: which local collections sync, where they go, and how
//! their fields are named remotely.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::models::{
    Appointment, ExerciseSession, JournalEntry, PainEntry, RomMeasurement, SleepLog,
    SupplementLog, SyncEntity,
};

use super::naming::{camel_to_snake, round_trips, snake_to_camel};

/// Remote identity column, populated from the local stable id
pub const REMOTE_ID_COLUMN: &str = "id";
/// Remote account scope column
pub const REMOTE_ACCOUNT_COLUMN: &str = "user_id";
/// Diagnostic mirror of the local key; never used for identity
pub const REMOTE_LOCAL_KEY_COLUMN: &str = "local_id";
/// Remote creation timestamp, set by the service
pub const REMOTE_CREATED_AT_COLUMN: &str = "created_at";

/// Columns owned by the sync layer; no domain field may map onto them.
pub const RESERVED_REMOTE_COLUMNS: [&str; 4] = [
    REMOTE_ID_COLUMN,
    REMOTE_ACCOUNT_COLUMN,
    REMOTE_LOCAL_KEY_COLUMN,
    REMOTE_CREATED_AT_COLUMN,
];

/// Maps one local collection to one remote table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionEntry {
    pub local_name: &'static str,
    pub remote_name: &'static str,
    /// Declared domain fields of the entity type
    pub fields: &'static [&'static str],
    /// Local field -> remote column, for names the convention cannot express
    pub overrides: Vec<(&'static str, &'static str)>,
    /// Local fields never transmitted
    pub excluded: Vec<&'static str>,
}

impl CollectionEntry {
    /// Entry for a domain type, using its declared collection name and fields.
    pub fn of<T: SyncEntity>(remote_name: &'static str) -> Self {
        Self {
            local_name: T::COLLECTION,
            remote_name,
            fields: T::FIELDS,
            overrides: Vec::new(),
            excluded: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_override(mut self, local_field: &'static str, remote_field: &'static str) -> Self {
        self.overrides.push((local_field, remote_field));
        self
    }

    #[must_use]
    pub fn excluding(mut self, local_field: &'static str) -> Self {
        self.excluded.push(local_field);
        self
    }

    /// Whether a local field is transmitted at all
    pub fn is_transmitted(&self, local_field: &str) -> bool {
        self.fields.contains(&local_field) && !self.excluded.contains(&local_field)
    }

    /// Remote column name for a local field
    pub fn remote_field<'a>(&self, local_field: &'a str) -> Cow<'a, str> {
        self.overrides
            .iter()
            .find(|(local, _)| *local == local_field)
            .map_or_else(
                || Cow::Owned(camel_to_snake(local_field)),
                |(_, remote)| Cow::Borrowed(*remote),
            )
    }

    /// Local field name for a remote column
    pub fn local_field<'a>(&self, remote_field: &'a str) -> Cow<'a, str> {
        self.overrides
            .iter()
            .find(|(_, remote)| *remote == remote_field)
            .map_or_else(
                || Cow::Owned(snake_to_camel(remote_field)),
                |(local, _)| Cow::Borrowed(*local),
            )
    }

    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let name = self.local_name;

        if !is_table_identifier(self.remote_name) {
            problems.push(format!(
                "{name}: remote name '{}' is not a valid table identifier",
                self.remote_name
            ));
        }

        let mut override_locals = HashSet::new();
        for (local, remote) in &self.overrides {
            if !self.fields.contains(local) {
                problems.push(format!("{name}: override for unknown field '{local}'"));
            }
            if !override_locals.insert(*local) {
                problems.push(format!("{name}: field '{local}' is overridden twice"));
            }
        }

        for excluded in &self.excluded {
            if !self.fields.contains(excluded) {
                problems.push(format!("{name}: exclusion of unknown field '{excluded}'"));
            }
        }

        let mut remote_owners: HashMap<Cow<'_, str>, &str> = HashMap::new();
        for &field in self.fields {
            if !self.is_transmitted(field) {
                continue;
            }
            let remote = self.remote_field(field);
            let overridden = override_locals.contains(&field);

            if !overridden && !round_trips(field) {
                problems.push(format!(
                    "{name}: field '{field}' does not survive the naming round-trip (add an override)"
                ));
            }
            if overridden && self.local_field(&remote) != field {
                problems.push(format!(
                    "{name}: override for '{field}' cannot be reversed from '{remote}'"
                ));
            }
            if RESERVED_REMOTE_COLUMNS.contains(&&*remote) {
                problems.push(format!(
                    "{name}: field '{field}' maps onto reserved column '{remote}'"
                ));
            }
            if let Some(previous) = remote_owners.insert(remote.clone(), field) {
                problems.push(format!(
                    "{name}: fields '{previous}' and '{field}' both map to '{remote}'"
                ));
            }
        }

        problems
    }
}

/// The validated set of synchronizable collections.
#[derive(Debug, Clone)]
pub struct Registry {
    entries: Vec<CollectionEntry>,
}

impl Registry {
    /// Build a registry, rejecting any configuration error up front.
    pub fn new(entries: Vec<CollectionEntry>) -> Result<Self> {
        let registry = Self { entries };
        registry.validate()?;
        Ok(registry)
    }

    /// The collections Limber ships with.
    pub fn standard() -> Result<Self> {
        Self::new(vec![
            CollectionEntry::of::<ExerciseSession>("exercise_sessions")
                .with_override("durationMin", "duration_minutes")
                .excluding("poseFrames"),
            CollectionEntry::of::<RomMeasurement>("rom_measurements").excluding("photoDataUrl"),
            CollectionEntry::of::<PainEntry>("pain_entries"),
            CollectionEntry::of::<SleepLog>("sleep_logs")
                .with_override("hoursSlept", "duration_hours"),
            CollectionEntry::of::<SupplementLog>("supplement_logs"),
            CollectionEntry::of::<Appointment>("appointments")
                .with_override("providerName", "provider"),
            CollectionEntry::of::<JournalEntry>("journal_entries"),
        ])
    }

    pub fn entries(&self) -> &[CollectionEntry] {
        &self.entries
    }

    /// Look up an entry by local collection name
    pub fn get(&self, local_name: &str) -> Option<&CollectionEntry> {
        self.entries
            .iter()
            .find(|entry| entry.local_name == local_name)
    }

    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        let mut local_names = HashSet::new();
        let mut remote_names = HashSet::new();

        for entry in &self.entries {
            if entry.local_name.trim().is_empty() {
                problems.push("collection with empty local name".to_string());
            }
            if !local_names.insert(entry.local_name) {
                problems.push(format!("duplicate local collection '{}'", entry.local_name));
            }
            if !remote_names.insert(entry.remote_name) {
                problems.push(format!(
                    "remote table '{}' is used by more than one collection",
                    entry.remote_name
                ));
            }
            problems.extend(entry.problems());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(problems.join("; ")))
        }
    }
}

fn is_table_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
        && !name.starts_with(|ch: char| ch.is_ascii_digit())
}
