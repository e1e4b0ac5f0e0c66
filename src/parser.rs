//! Transcript decoding.
//!
//! A transcript is newline-delimited JSON, one record per line. Lines that
//! fail to decode are dropped and the rest are kept in file order.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::Path;
use tracing::{debug, trace};

use crate::models::Message;

/// A record line as stored on disk.
///
/// Every field is optional and a field holding an unexpected JSON type reads
/// as absent, so a line is only ever dropped for not being JSON at all.
#[derive(Debug, Default, Deserialize)]
struct RawRecord {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    is_user: Option<bool>,
    #[serde(default)]
    mes: Option<Value>,
    #[serde(default)]
    send_date: Option<Value>,
    #[serde(default)]
    create_date: Option<Value>,
    #[serde(default, deserialize_with = "lenient")]
    extra: Option<RawExtra>,
    #[serde(default, deserialize_with = "lenient")]
    swipe_id: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    swipes: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawExtra {
    #[serde(default, deserialize_with = "lenient")]
    image: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
}

/// Reads any JSON value and keeps it only if it has the expected type.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Reads and decodes a transcript file.
///
/// An unreadable file yields no messages. `fallback_speaker` names
/// non-user messages that carry no name. Bodies are returned raw.
pub fn parse_file(path: &Path, fallback_speaker: &str) -> Vec<Message> {
    match std::fs::read(path) {
        Ok(bytes) => parse_str(&String::from_utf8_lossy(&bytes), fallback_speaker),
        Err(e) => {
            debug!("cannot read chat file {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Decodes transcript text line by line.
///
/// Any line that is valid JSON yields a message; a value that is not an
/// object reads as an empty record.
pub fn parse_str(content: &str, fallback_speaker: &str) -> Vec<Message> {
    let mut messages = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => {
                let raw = serde_json::from_value::<RawRecord>(value).unwrap_or_default();
                messages.push(into_message(raw, fallback_speaker));
            }
            Err(e) => trace!("dropping malformed line {}: {}", lineno + 1, e),
        }
    }
    messages
}

fn into_message(raw: RawRecord, fallback_speaker: &str) -> Message {
    let is_user = raw.is_user.unwrap_or(false);
    let speaker = match raw.name {
        Some(name) if !name.is_empty() => name,
        _ if is_user => "User".to_string(),
        _ => fallback_speaker.to_string(),
    };
    let timestamp = [raw.send_date, raw.create_date]
        .into_iter()
        .flatten()
        .find_map(scalar_text)
        .unwrap_or_default();
    let (image, title) = match raw.extra {
        Some(extra) => (extra.image, extra.title),
        None => (None, None),
    };

    Message {
        speaker,
        is_user,
        body: raw.mes.and_then(scalar_text).unwrap_or_default(),
        timestamp,
        image,
        title,
        swipe_count: raw.swipes.map(|s| s.len()).unwrap_or(0),
        selected_swipe: raw.swipe_id,
    }
}

/// Text of a string or number value. Timestamps appear as strings in most
/// backups and as epoch numbers in some.
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
