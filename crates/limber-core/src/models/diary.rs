//! Daily diary logs: pain, sleep, supplements and free-form journal

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::SyncEntity;

/// Pain diary entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PainEntry {
    pub recorded_at: DateTime<Utc>,
    /// 0 (none) to 10 (worst imaginable)
    pub level: u8,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SyncEntity for PainEntry {
    const COLLECTION: &'static str = "painEntries";
    const FIELDS: &'static [&'static str] = &[
        "recordedAt",
        "level",
        "location",
        "quality",
        "triggers",
        "notes",
    ];
}

/// One night of sleep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepLog {
    pub date: NaiveDate,
    pub hours_slept: f64,
    /// Subjective quality, 1-5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wakeups: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SyncEntity for SleepLog {
    const COLLECTION: &'static str = "sleepLogs";
    const FIELDS: &'static [&'static str] = &["date", "hoursSlept", "quality", "wakeups", "notes"];
}

/// A supplement or medication intake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplementLog {
    pub taken_at: DateTime<Utc>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dose_mg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl SyncEntity for SupplementLog {
    const COLLECTION: &'static str = "supplementLogs";
    const FIELDS: &'static [&'static str] = &["takenAt", "name", "doseMg", "notes"];
}

/// Free-form journal entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
    /// 1-5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<u8>,
}

impl SyncEntity for JournalEntry {
    const COLLECTION: &'static str = "journalEntries";
    const FIELDS: &'static [&'static str] = &["date", "title", "body", "mood"];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::encode_fields;
    use chrono::TimeZone;

    fn sorted_keys<T: Serialize>(entity: &T) -> Vec<String> {
        let mut keys: Vec<String> = encode_fields(entity).unwrap().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    fn sorted_declared(fields: &[&str]) -> Vec<String> {
        let mut declared: Vec<String> = fields.iter().map(ToString::to_string).collect();
        declared.sort_unstable();
        declared
    }

    #[test]
    fn pain_entry_fields_match_declaration() {
        let entry = PainEntry {
            recorded_at: Utc.with_ymd_and_hms(2026, 1, 5, 7, 0, 0).unwrap(),
            level: 6,
            location: "right shoulder".to_string(),
            quality: Some("sharp".to_string()),
            triggers: vec!["overhead reach".to_string()],
            notes: Some("after physio".to_string()),
        };
        assert_eq!(sorted_keys(&entry), sorted_declared(PainEntry::FIELDS));
    }

    #[test]
    fn sleep_log_fields_match_declaration() {
        let log = SleepLog {
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            hours_slept: 7.5,
            quality: Some(4),
            wakeups: Some(1),
            notes: Some("woke at 3am".to_string()),
        };
        assert_eq!(sorted_keys(&log), sorted_declared(SleepLog::FIELDS));
    }

    #[test]
    fn supplement_and_journal_fields_match_declaration() {
        let supplement = SupplementLog {
            taken_at: Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap(),
            name: "vitamin d".to_string(),
            dose_mg: Some(0.025),
            notes: Some("with breakfast".to_string()),
        };
        assert_eq!(
            sorted_keys(&supplement),
            sorted_declared(SupplementLog::FIELDS)
        );

        let journal = JournalEntry {
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            title: Some("week two".to_string()),
            body: "Walked without crutches.".to_string(),
            mood: Some(4),
        };
        assert_eq!(sorted_keys(&journal), sorted_declared(JournalEntry::FIELDS));
    }

    #[test]
    fn optional_fields_are_omitted_when_absent() {
        let entry = PainEntry {
            recorded_at: Utc.with_ymd_and_hms(2026, 1, 5, 7, 0, 0).unwrap(),
            level: 2,
            location: "ankle".to_string(),
            quality: None,
            triggers: Vec::new(),
            notes: None,
        };
        let fields = encode_fields(&entry).unwrap();
        assert_eq!(fields.len(), 3);
    }
}
