//! Recording metadata and identifier generation.

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Deserializer, Serialize};

/// A named, timestamped audio memo.
///
/// The audio itself is never embedded here; it lives in the blob store under the
/// same `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    /// Unique identifier (`rec_<epoch_ms>_<suffix>` or `sample_<n>`)
    pub id: String,
    /// Display name
    pub name: String,
    /// Length in whole seconds
    pub duration: u32,
    /// When the recording was made
    #[serde(deserialize_with = "deserialize_date")]
    pub date: DateTime<Local>,
    /// Placeholder URL, kept for compatibility with older stored lists
    #[serde(default)]
    pub url: String,
}

/// Recording fields supplied by the caller of `RecordingStore::add`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecording {
    pub name: String,
    pub duration: u32,
    pub date: DateTime<Local>,
    pub url: String,
}

impl NewRecording {
    /// A recording made now with an empty placeholder URL.
    pub fn new(name: impl Into<String>, duration: u32) -> Self {
        Self {
            name: name.into(),
            duration,
            date: Local::now(),
            url: String::new(),
        }
    }

    pub(crate) fn with_id(self, id: String) -> Recording {
        Recording {
            id,
            name: self.name,
            duration: self.duration,
            date: self.date,
            url: self.url,
        }
    }
}

/// Default name for a recording started at `at`.
pub fn default_recording_name(at: DateTime<Local>) -> String {
    format!("Recording {}", at.format("%Y-%m-%d %H:%M:%S"))
}

/// Formats seconds as `mm:ss`.
pub fn format_duration(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Generates a fresh recording id: `rec_<epoch_ms>_<7 base36 chars>`.
pub fn generate_recording_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut entropy = uuid::Uuid::new_v4().as_u128();
    let suffix: String = (0..7)
        .map(|_| {
            let c = ALPHABET[(entropy % 36) as usize] as char;
            entropy /= 36;
            c
        })
        .collect();
    format!("rec_{}_{}", Local::now().timestamp_millis(), suffix)
}

/// Accepts RFC 3339 strings or epoch milliseconds.
fn deserialize_date<'de, D>(deserializer: D) -> Result<DateTime<Local>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawDate {
        Text(String),
        Millis(i64),
    }

    match RawDate::deserialize(deserializer)? {
        RawDate::Text(text) => DateTime::parse_from_rfc3339(&text)
            .map(|dt| dt.with_timezone(&Local))
            .map_err(|e| serde::de::Error::custom(format!("invalid date '{text}': {e}"))),
        RawDate::Millis(millis) => Local
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {millis}"))),
    }
}
