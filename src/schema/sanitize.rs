//! Repairs non-JSON infinity tokens in the shares payload.
//!
//! slurmrestd before v0.0.42 serializes an infinite effective usage as a bare
//! `Infinity` (or `inf`) right after the colon, which no JSON parser accepts.

use std::borrow::Cow;

/// Largest finite double, the value infinite usage is mapped to.
pub const MAX_FLOAT_LITERAL: &str = ": 1.7976931348623157e+308";

/// Longest tokens first so `Infinity` is consumed before the `inf` pass.
const INFINITY_TOKENS: [&str; 4] = [": Infinity", ": infinity", ": Inf", ": inf"];

/// Replaces every bare infinity token with [`MAX_FLOAT_LITERAL`].
///
/// Payloads without any token are returned borrowed.
pub fn cleanse_infinity(body: &[u8]) -> Cow<'_, [u8]> {
    let Ok(text) = std::str::from_utf8(body) else {
        return Cow::Borrowed(body);
    };
    if !INFINITY_TOKENS.iter().any(|t| text.contains(t)) {
        return Cow::Borrowed(body);
    }

    let mut cleaned = text.to_string();
    for token in INFINITY_TOKENS {
        cleaned = cleaned.replace(token, MAX_FLOAT_LITERAL);
    }
    Cow::Owned(cleaned.into_bytes())
}
