//! Terminator-delimited JSON framing.
//!
//! A frame is the JSON body followed by [`RECORD_SEPARATOR`]. The separator
//! never appears inside valid JSON text, so no escaping is needed.

use serde::Serialize;
use serde::de::DeserializeOwned;

/// ASCII record separator ending every frame.
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Serialize `value` to JSON and append the terminator.
pub fn encode_frame<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut text = serde_json::to_string(value)?;
    text.push(RECORD_SEPARATOR);
    Ok(text)
}

/// Drop one trailing terminator, if present.
pub fn strip_terminator(text: &str) -> &str {
    text.strip_suffix(RECORD_SEPARATOR).unwrap_or(text)
}

/// Split one channel message into the frames it carries.
///
/// Exactly one trailing terminator is dropped, as in [`decode_frame`], and the
/// rest is split on every terminator. An empty piece (a doubled terminator or
/// an empty message) is yielded as is and fails to decode like it would
/// through [`decode_frame`].
pub fn split_frames(text: &str) -> impl Iterator<Item = &str> {
    strip_terminator(text).split(RECORD_SEPARATOR)
}

/// Decode one frame, tolerating input with or without the terminator.
pub fn decode_frame<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(strip_terminator(text))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
