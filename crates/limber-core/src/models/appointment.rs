//! Clinical appointments

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SyncEntity;

/// A scheduled visit with a physiotherapist, surgeon or other provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub scheduled_at: DateTime<Utc>,
    pub provider_name: String,
    /// `physio`, `surgeon`, `imaging`, ...
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

impl SyncEntity for Appointment {
    const COLLECTION: &'static str = "appointments";
    const FIELDS: &'static [&'static str] = &[
        "scheduledAt",
        "providerName",
        "kind",
        "location",
        "notes",
        "completed",
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::record::encode_fields;
    use chrono::TimeZone;

    #[test]
    fn appointment_fields_match_declaration() {
        let appointment = Appointment {
            scheduled_at: Utc.with_ymd_and_hms(2026, 4, 2, 14, 15, 0).unwrap(),
            provider_name: "Dr. Okafor".to_string(),
            kind: "physio".to_string(),
            location: Some("City Clinic".to_string()),
            notes: Some("bring MRI".to_string()),
            completed: false,
        };
        let mut keys: Vec<String> = encode_fields(&appointment)
            .unwrap()
            .keys()
            .cloned()
            .collect();
        let mut declared: Vec<String> = Appointment::FIELDS
            .iter()
            .map(ToString::to_string)
            .collect();
        keys.sort_unstable();
        declared.sort_unstable();
        assert_eq!(keys, declared);
    }

    #[test]
    fn completed_defaults_to_false() {
        let appointment: Appointment = serde_json::from_value(serde_json::json!({
            "scheduledAt": "2026-04-02T14:15:00Z",
            "providerName": "Dr. Okafor",
            "kind": "physio"
        }))
        .unwrap();
        assert!(!appointment.completed);
    }
}
