use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

/// Persisted envelope around a cached value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord<T> {
    pub data: T,
    /// Epoch milliseconds of the most recent successful write
    pub timestamp: i64,
}

impl<T> CacheRecord<T> {
    pub fn new(data: T, timestamp: i64) -> Self {
        Self { data, timestamp }
    }

    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.timestamp)
    }
}

impl<T: Serialize> CacheRecord<T> {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Outcome of decoding a persisted string.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    Valid(T),
    /// Not JSON, or JSON of the wrong shape. The caller deletes the entry.
    Corrupt(String),
}

impl<T> Decoded<T> {
    pub fn ok(self) -> Option<T> {
        match self {
            Decoded::Valid(v) => Some(v),
            Decoded::Corrupt(_) => None,
        }
    }
}

/// Decode a full record. Requires an object carrying both a `data` field
/// that deserializes into `T` and a numeric `timestamp`.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Decoded<CacheRecord<T>> {
    let mut object = match parse_object(raw) {
        Ok(object) => object,
        Err(reason) => return Decoded::Corrupt(reason),
    };

    let Some(timestamp) = object.get("timestamp").and_then(timestamp_ms) else {
        return Decoded::Corrupt("missing or non-numeric timestamp".to_string());
    };
    let Some(data) = object.remove("data") else {
        return Decoded::Corrupt("missing data field".to_string());
    };

    match serde_json::from_value(data) {
        Ok(data) => Decoded::Valid(CacheRecord::new(data, timestamp)),
        Err(e) => Decoded::Corrupt(format!("data has unexpected shape: {}", e)),
    }
}

/// Decode only the write timestamp, for age queries.
pub fn decode_timestamp(raw: &str) -> Decoded<i64> {
    let object = match parse_object(raw) {
        Ok(object) => object,
        Err(reason) => return Decoded::Corrupt(reason),
    };
    match object.get("timestamp").and_then(timestamp_ms) {
        Some(ts) => Decoded::Valid(ts),
        None => Decoded::Corrupt("missing or non-numeric timestamp".to_string()),
    }
}

fn parse_object(raw: &str) -> Result<serde_json::Map<String, Value>, String> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err("envelope is not an object".to_string()),
        Err(e) => Err(format!("invalid JSON: {}", e)),
    }
}

// Envelopes written by other clients may carry float timestamps. Anything
// before the epoch or past the i64 range cannot be a write time.
fn timestamp_ms(value: &Value) -> Option<i64> {
    let ms = match value.as_i64() {
        Some(ms) => ms,
        None => {
            let f = value.as_f64()?;
            if !f.is_finite() || f >= i64::MAX as f64 {
                return None;
            }
            f as i64
        }
    };
    (ms >= 0).then_some(ms)
}

const MINUTE_MS: i64 = 60_000;

/// Human-readable age for inspection output.
pub fn describe_age(age_ms: i64) -> String {
    let minutes = age_ms / MINUTE_MS;
    if minutes < 1 {
        // Also covers clock skew (negative ages)
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        if minutes % 60 >= 30 {
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        if (minutes % 1440) / 60 >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}
