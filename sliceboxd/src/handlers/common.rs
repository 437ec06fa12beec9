//! Request body parsing shared by the JSON handlers.

use axum::body::Bytes;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// Parses a JSON body. An empty body or `null` yields the defaults; any
/// other malformed input is rejected.
pub fn parse_body<T>(body: &Bytes) -> ApiResult<T>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice::<Option<T>>(body)
        .map(Option::unwrap_or_default)
        .map_err(|err| ApiError::bad_request("invalid_json", err))
}

/// Integer field that also accepts floats (truncated) and numeric strings.
pub fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.trunc() as i64))
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("{number} is not an integer"))),
        Some(Value::String(text)) => text
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("{text:?} is not an integer"))),
        Some(other) => Err(de::Error::custom(format!("expected an integer, got {other}"))),
    }
}

/// Free-form JSON flattened to text: strings as-is, anything else as JSON.
pub fn json_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
