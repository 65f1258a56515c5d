//! Exercise sessions and range-of-motion measurements

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SyncEntity;

/// One completed exercise from a rehab protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseSession {
    /// Protocol exercise identifier (e.g. `heel-slides`)
    pub exercise_id: String,
    pub performed_at: DateTime<Utc>,
    pub sets: u32,
    pub reps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_min: Option<u32>,
    /// Pain reported during the exercise, 0-10
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pain_during: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Per-frame joint angles captured by the camera; kept on the device only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pose_frames: Option<Vec<f64>>,
}

impl SyncEntity for ExerciseSession {
    const COLLECTION: &'static str = "exerciseSessions";
    const FIELDS: &'static [&'static str] = &[
        "exerciseId",
        "performedAt",
        "sets",
        "reps",
        "durationMin",
        "painDuring",
        "notes",
        "poseFrames",
    ];
}

/// A joint range-of-motion reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RomMeasurement {
    pub joint: String,
    pub movement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
    pub degrees: f64,
    pub measured_at: DateTime<Utc>,
    /// `goniometer`, `camera`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_data_url: Option<String>,
}

impl SyncEntity for RomMeasurement {
    const COLLECTION: &'static str = "romMeasurements";
    const FIELDS: &'static [&'static str] = &[
        "joint",
        "movement",
        "side",
        "degrees",
        "measuredAt",
        "method",
        "photoDataUrl",
    ];
}
