use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use chrono::Utc;
use limber_core::models::{
    Appointment, ExerciseSession, Fields, JournalEntry, NewRecord, PainEntry, RomMeasurement,
    SleepLog, SupplementLog, SyncEntity, SyncRecord,
};
use limber_core::{AppConfig, SqliteStore, SupabaseRemote};
use serde::Serialize;
use serde_json::Value;

use crate::auth::SessionStore;
use crate::cli::Collection;
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct RecordListItem {
    pub local_key: i64,
    pub stable_id: String,
    pub synced: bool,
    pub fields: Fields,
}

impl Collection {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Exercise => ExerciseSession::COLLECTION,
            Self::Rom => RomMeasurement::COLLECTION,
            Self::Pain => PainEntry::COLLECTION,
            Self::Sleep => SleepLog::COLLECTION,
            Self::Supplement => SupplementLog::COLLECTION,
            Self::Appointment => Appointment::COLLECTION,
            Self::Journal => JournalEntry::COLLECTION,
        }
    }

    /// Validate `fields` against the collection's entry type.
    pub fn new_record(self, fields: Fields) -> Result<NewRecord, CliError> {
        match self {
            Self::Exercise => typed_record::<ExerciseSession>(fields),
            Self::Rom => typed_record::<RomMeasurement>(fields),
            Self::Pain => typed_record::<PainEntry>(fields),
            Self::Sleep => typed_record::<SleepLog>(fields),
            Self::Supplement => typed_record::<SupplementLog>(fields),
            Self::Appointment => typed_record::<Appointment>(fields),
            Self::Journal => typed_record::<JournalEntry>(fields),
        }
    }
}

fn typed_record<T: SyncEntity>(fields: Fields) -> Result<NewRecord, CliError> {
    let invalid = |reason: String| CliError::InvalidEntry {
        collection: T::COLLECTION,
        reason,
    };

    if let Some(unknown) = fields.keys().find(|field| !T::FIELDS.contains(&field.as_str())) {
        return Err(invalid(format!("unknown field '{unknown}'")));
    }
    let entity: T =
        serde_json::from_value(Value::Object(fields)).map_err(|error| invalid(error.to_string()))?;
    Ok(NewRecord::from_entity(&entity)?)
}

/// Parse entry fields from the argument, falling back to piped stdin.
pub fn resolve_fields(argument: Option<&str>) -> Result<Fields, CliError> {
    let raw = match argument.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(raw) => raw.to_string(),
        None => read_piped_stdin()?.ok_or(CliError::EmptyFields)?,
    };
    parse_fields(&raw)
}

pub fn parse_fields(raw: &str) -> Result<Fields, CliError> {
    match serde_json::from_str(raw)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(CliError::EmptyFields),
    }
}

fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    let trimmed = buffer.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

pub fn record_to_list_item(record: &SyncRecord) -> RecordListItem {
    RecordListItem {
        local_key: record.local_key,
        stable_id: record.stable_id.to_string(),
        synced: record.synced,
        fields: record.fields.clone(),
    }
}

pub fn format_record_lines(records: &[SyncRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            let short_id = record.stable_id.as_str().chars().take(13).collect::<String>();
            let state = if record.synced { "synced" } else { "pending" };
            let summary = Value::Object(record.fields.clone()).to_string();
            format!(
                "{:>5}  {short_id:<13}  {state:<7}  {}",
                record.local_key,
                compact(&summary, 60)
            )
        })
        .collect()
}

pub fn compact(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept = text.chars().take(max_chars.saturating_sub(3)).collect::<String>();
    format!("{kept}...")
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn now_label() -> String {
    format_sync_timestamp(Utc::now().timestamp_millis())
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os("LIMBER_DB_PATH").map(PathBuf::from)) {
        return Ok(path);
    }
    dirs::data_dir()
        .map(|dir| dir.join("limber").join("limber.db"))
        .ok_or(CliError::NoDataDir)
}

pub fn resolve_config_path(cli_config_path: Option<PathBuf>) -> Option<PathBuf> {
    cli_config_path
        .or_else(|| env::var_os("LIMBER_CONFIG").map(PathBuf::from))
        .or_else(|| dirs::config_dir().map(|dir| dir.join("limber").join("config.json")))
}

/// Config file (when present) with environment overrides applied
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, CliError> {
    let config = match path {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    Ok(config.with_env())
}

pub fn open_store(db_path: &Path) -> Result<SqliteStore, CliError> {
    Ok(SqliteStore::open_path(db_path)?)
}

pub fn build_remote(config: &AppConfig) -> Result<SupabaseRemote<SessionStore>, CliError> {
    let settings = config.supabase()?.ok_or(CliError::SyncNotConfigured)?;
    Ok(SupabaseRemote::new(
        &settings.url,
        settings.anon_key,
        SessionStore::for_project(&settings.url),
    )?)
}
