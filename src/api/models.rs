//! Wire types for the video API and response normalization.
//!
//! The backend has answered the same logical value under several field names
//! over time (`uploadUrl` / `upload_url` / `url`, a list as `{videos: [...]}`,
//! `{data: [...]}` or a bare array). All of that is resolved here, once, into
//! the canonical types below; nothing outside this module looks at raw bodies.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use serde_json::{Map, Value};

/// Names a video id has been sent under, most preferred first.
const VIDEO_ID_NAMES: [&str; 3] = ["id", "videoId", "video_id"];

/// Names an upload time has been sent under, most preferred first.
const UPLOADED_AT_NAMES: [&str; 3] = ["uploadedAt", "uploaded_at", "timestamp"];

/// Video metadata as owned by the backend.
///
/// Historical field names are accepted on input; when a record carries more
/// than one name for the same value, the first non-null one in priority
/// order wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self", rename_all = "camelCase")]
pub struct Video {
    /// Server-assigned id.
    pub id: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Thumbnail URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Display duration (e.g. `"3:42"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    /// File size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Upload time as sent by the server (RFC 3339, date, or epoch seconds).
    #[serde(
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub uploaded_at: Option<String>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl<'de> Deserialize<'de> for Video {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;
        keep_first_present(&mut fields, &VIDEO_ID_NAMES);
        keep_first_present(&mut fields, &UPLOADED_AT_NAMES);
        Video::deserialize(Value::Object(fields)).map_err(de::Error::custom)
    }
}

impl Serialize for Video {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Video::serialize(self, serializer)
    }
}

/// Collapses every name in `names` to `names[0]`, keeping the value of the
/// first name present with a non-null value.
fn keep_first_present(fields: &mut Map<String, Value>, names: &[&str]) {
    let chosen = names
        .iter()
        .find_map(|name| fields.get(*name).filter(|value| !value.is_null()).cloned());
    for name in names {
        fields.remove(*name);
    }
    if let (Some(value), Some(canonical)) = (chosen, names.first()) {
        fields.insert((*canonical).to_string(), value);
    }
}

impl Video {
    /// Parses [`Video::uploaded_at`] into a UTC timestamp when possible.
    #[must_use]
    pub fn uploaded_at_utc(&self) -> Option<DateTime<Utc>> {
        self.uploaded_at.as_deref().and_then(parse_timestamp)
    }
}

/// Parses the timestamp formats the backend and the web client have used.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        let secs: i64 = raw.parse().ok()?;
        return DateTime::from_timestamp(secs, 0);
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        _ => None,
    })
}

/// Optional metadata sent with an upload initiation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadMetadata {
    /// MIME type of the file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// File size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct InitiateUploadRequest<'a> {
    pub(crate) filename: &'a str,
    #[serde(flatten)]
    pub(crate) metadata: &'a UploadMetadata,
}

/// Result of `POST /upload/initiate`.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTicket {
    /// Presigned object-storage URL for the PUT.
    pub upload_url: String,
    /// Id the backend reserved for the new video.
    pub video_id: String,
    /// Any other fields the backend returned.
    pub extra: Map<String, Value>,
}

/// Fields that can be written with `PUT /videos/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoPatch {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Replacement tag list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Original file name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// File size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// MIME type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Display duration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}

impl VideoPatch {
    /// Returns `true` when no field would be sent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn untitled() -> String {
    "Untitled".to_string()
}

/// The part of a [`Video`] kept alongside watch progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(remote = "Self", rename_all = "camelCase")]
pub struct VideoSnapshot {
    /// Video id.
    pub id: String,
    /// Title at the time it was watched.
    #[serde(default = "untitled")]
    pub title: String,
    /// Thumbnail URL.
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Display duration.
    #[serde(default)]
    pub duration: Option<String>,
    /// Upload time as sent by the server.
    #[serde(default, deserialize_with = "string_or_number")]
    pub uploaded_at: Option<String>,
}

impl<'de> Deserialize<'de> for VideoSnapshot {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;
        keep_first_present(&mut fields, &VIDEO_ID_NAMES);
        keep_first_present(&mut fields, &UPLOADED_AT_NAMES);
        VideoSnapshot::deserialize(Value::Object(fields)).map_err(de::Error::custom)
    }
}

impl Serialize for VideoSnapshot {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        VideoSnapshot::serialize(self, serializer)
    }
}

impl VideoSnapshot {
    /// Snapshot holding only an id, titled `"Untitled"`.
    #[must_use]
    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: untitled(),
            thumbnail: None,
            duration: None,
            uploaded_at: None,
        }
    }
}

impl From<&Video> for VideoSnapshot {
    fn from(video: &Video) -> Self {
        Self {
            id: video.id.clone(),
            title: if video.title.trim().is_empty() {
                untitled()
            } else {
                video.title.clone()
            },
            thumbnail: video.thumbnail.clone(),
            duration: video.duration.clone(),
            uploaded_at: video.uploaded_at.clone(),
        }
    }
}

/// A video paired with how far into it a profile has watched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueWatchingEntry {
    /// What was watched.
    pub video: VideoSnapshot,
    /// Fraction watched, in `[0, 1]`.
    pub progress: f64,
    /// RFC 3339 UTC time of the last progress update.
    pub last_watched_at: String,
}

pub(crate) const VIDEO_LIST_FIELDS: &[&str] = &["videos", "data"];
pub(crate) const SEARCH_RESULT_FIELDS: &[&str] = &["videos", "results"];
pub(crate) const CONTINUE_WATCHING_FIELDS: &[&str] = &["videos", "items"];
pub(crate) const PLAYBACK_URL_FIELDS: &[&str] = &["playbackUrl", "url", "playback_url"];
pub(crate) const UPLOAD_URL_FIELDS: &[&str] = &["uploadUrl", "upload_url", "url"];
pub(crate) const UPLOAD_VIDEO_ID_FIELDS: &[&str] = &["videoId", "video_id", "id"];
pub(crate) const SAVED_VIDEO_FIELDS: &[&str] = &["video", "data"];

/// Extracts a list from a bare array or from the first alias holding an array.
///
/// Anything else yields an empty list.
pub(crate) fn take_list(body: Value, aliases: &[&str]) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => aliases
            .iter()
            .find_map(|alias| match map.remove(*alias) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Extracts a non-empty string from a bare string body or the first alias
/// holding one.
pub(crate) fn take_string(body: &Value, aliases: &[&str]) -> Option<String> {
    match body {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Object(map) => aliases.iter().find_map(|alias| match map.get(*alias) {
            Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
            _ => None,
        }),
        _ => None,
    }
}

/// Unwraps `{video: {...}}` / `{data: {...}}` envelopes, else returns the body.
pub(crate) fn take_record(body: Value, aliases: &[&str]) -> Value {
    match body {
        Value::Object(mut map) => {
            for alias in aliases {
                if let Some(Value::Object(inner)) = map.remove(*alias) {
                    return Value::Object(inner);
                }
            }
            Value::Object(map)
        }
        other => other,
    }
}
