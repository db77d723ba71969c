//! Opaque cursor transport encoding.
//!
//! Payloads are compact JSON objects carried as URL-safe base64 without
//! padding. This layer is purely structural: it knows nothing about sort
//! modes or required keys. Semantic checks live in the query builder.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde_json::{Map, Value};
use std::borrow::Cow;
use thiserror::Error;

/// Structured cursor body before transport encoding.
pub type CursorPayload = Map<String, Value>;

const INVALID_CURSOR: &str = "Invalid cursor";
const SORT_MISMATCH: &str = "Cursor sort does not match requested sort";
const INVALID_DATE_RANGE: &str = "Invalid date range";

// Emits unpadded tokens and accepts both padded and unpadded input.
const CURSOR_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Pagination input rejected by the feed engine.
///
/// The message is safe to show to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CursorError {
    message: Cow<'static, str>,
}

impl CursorError {
    /// Malformed, tampered or inconsistent cursor.
    pub fn invalid_cursor() -> Self {
        Self {
            message: Cow::Borrowed(INVALID_CURSOR),
        }
    }

    /// Cursor was issued for a different sort mode.
    pub fn sort_mismatch() -> Self {
        Self {
            message: Cow::Borrowed(SORT_MISMATCH),
        }
    }

    /// Resolved date window has `start > end` or is out of calendar range.
    pub fn invalid_date_range() -> Self {
        Self {
            message: Cow::Borrowed(INVALID_DATE_RANGE),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Serializes `payload` into an opaque URL-safe token.
pub fn encode_cursor(payload: &CursorPayload) -> String {
    let json = Value::Object(payload.clone()).to_string();
    CURSOR_ENGINE.encode(json.as_bytes())
}

/// Reverses `encode_cursor`.
///
/// # Errors
/// - Returns `CursorError::invalid_cursor()` for bad base64, bad JSON, or a
///   JSON value that is not an object.
pub fn decode_cursor(cursor: &str) -> Result<CursorPayload, CursorError> {
    let raw = CURSOR_ENGINE
        .decode(cursor.as_bytes())
        .map_err(|_| CursorError::invalid_cursor())?;
    match serde_json::from_slice::<Value>(&raw) {
        Ok(Value::Object(payload)) => Ok(payload),
        _ => Err(CursorError::invalid_cursor()),
    }
}
