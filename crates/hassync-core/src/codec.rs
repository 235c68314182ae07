//! Payload codecs for value cells.
//!
//! A codec is a pair of shared function values: a [`Marshaler`] turning a
//! value into payload bytes and an [`Unmarshaler`] turning payload bytes back
//! into a value.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

/// Encodes values of type `T` into a payload.
pub type Marshaler<T> = Arc<dyn Fn(&T) -> Result<Vec<u8>, CodecError> + Send + Sync>;

/// Decodes a payload into a value of type `T`.
pub type Unmarshaler<T> = Arc<dyn Fn(&[u8]) -> Result<T, CodecError> + Send + Sync>;

/// Marshal strings as raw UTF-8.
#[must_use]
pub fn string_marshaler() -> Marshaler<String> {
    Arc::new(|v: &String| Ok(v.as_bytes().to_vec()))
}

/// Unmarshal payloads as UTF-8 strings.
#[must_use]
pub fn string_unmarshaler() -> Unmarshaler<String> {
    Arc::new(|payload: &[u8]| {
        String::from_utf8(payload.to_vec()).map_err(|e| CodecError::Utf8(e.to_string()))
    })
}

/// Marshal any `Display` value as its text form (integers, vocabulary types).
#[must_use]
pub fn display_marshaler<T: Display + 'static>() -> Marshaler<T> {
    Arc::new(|v: &T| Ok(v.to_string().into_bytes()))
}

/// Unmarshal payloads by parsing their text form with `FromStr`.
#[must_use]
pub fn from_str_unmarshaler<T>() -> Unmarshaler<T>
where
    T: FromStr + 'static,
    T::Err: Display,
{
    Arc::new(|payload: &[u8]| {
        let text = std::str::from_utf8(payload).map_err(|e| CodecError::Utf8(e.to_string()))?;
        text.trim()
            .parse()
            .map_err(|e: T::Err| CodecError::Parse(format!("{text:?}: {e}")))
    })
}

/// Marshal values as JSON.
#[must_use]
pub fn json_marshaler<T: Serialize + 'static>() -> Marshaler<T> {
    Arc::new(|v: &T| serde_json::to_vec(v).map_err(|e| CodecError::Json(e.to_string())))
}

/// Unmarshal JSON payloads.
#[must_use]
pub fn json_unmarshaler<T: DeserializeOwned + 'static>() -> Unmarshaler<T> {
    Arc::new(|payload: &[u8]| {
        serde_json::from_slice(payload).map_err(|e| CodecError::Json(e.to_string()))
    })
}

/// Errors raised by codecs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Payload is not valid UTF-8
    #[error("invalid utf-8 payload: {0}")]
    Utf8(String),
    /// Text payload could not be parsed
    #[error("parse error: {0}")]
    Parse(String),
    /// JSON encoding or decoding failed
    #[error("json error: {0}")]
    Json(String),
}
