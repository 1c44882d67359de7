//! Header and parameter encoders.
//!
//! Encoders turn UTF-8 text into encoded-text lines in a target charset.
//! They carry a mutable "current charset" which is used whenever the caller
//! does not name one, and which is updated through [`Encoder::charset_changed`].
//! One encoder instance is shared by every header a factory builds, so the
//! charset lives behind a lock and all methods take `&self`.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{trace, warn};

use crate::encoding::{base64_len, encode_base64, encode_q, is_q_safe, percent_encode, transcode};
use crate::error::Result;

/// Charset used when nothing else has been configured.
pub const DEFAULT_CHARSET: &str = "utf-8";

/// Line length used when an encoder is asked for a zero-width line.
const DEFAULT_LINE_LENGTH: usize = 75;

/// Common encoder capability.
pub trait Encoder: std::fmt::Debug + Send + Sync {
    /// Encodes `text` into CRLF-separated encoded lines.
    ///
    /// The first line has `max_line_length - first_line_offset` bytes of
    /// room, later lines have `max_line_length`. Characters are never split
    /// across lines. When `charset` is `None` the encoder's current charset
    /// is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the charset is unknown or cannot represent `text`.
    fn encode(
        &self,
        text: &str,
        first_line_offset: usize,
        max_line_length: usize,
        charset: Option<&str>,
    ) -> Result<String>;

    /// Notifies the encoder that the charset has changed.
    fn charset_changed(&self, charset: &str);

    /// Returns the encoder's current charset.
    fn charset(&self) -> String;
}

/// Encoder producing RFC 2047 encoded-text for header words.
pub trait HeaderEncoder: Encoder {
    /// Encoding name used in encoded-words (`"Q"` or `"B"`).
    fn name(&self) -> &'static str;

    /// Returns an independent copy of this encoder.
    fn duplicate(&self) -> Arc<dyn HeaderEncoder>;
}

/// Encoder producing RFC 2231 extended parameter values.
pub trait ParameterEncoder: Encoder {
    /// Returns an independent copy of this encoder.
    fn duplicate(&self) -> Arc<dyn ParameterEncoder>;
}

/// Lock-protected current charset.
#[derive(Debug)]
struct CharsetState(RwLock<String>);

impl CharsetState {
    fn new(charset: impl Into<String>) -> Self {
        Self(RwLock::new(charset.into()))
    }

    fn get(&self) -> String {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set(&self, charset: &str) {
        charset.clone_into(&mut self.0.write().unwrap_or_else(PoisonError::into_inner));
    }

    /// Resolves the charset for one encode call.
    fn resolve(&self, requested: Option<&str>) -> String {
        requested.map_or_else(|| self.get(), str::to_string)
    }
}

/// Transcodes `text` character by character and packs the bytes into lines
/// whose encoded size (per `cost`) stays within the limit.
fn encode_lines(
    text: &str,
    charset: &str,
    first_line_offset: usize,
    max_line_length: usize,
    cost: impl Fn(&[u8]) -> usize,
    encode: impl Fn(&[u8]) -> String,
) -> Result<String> {
    let max_line_length = if max_line_length == 0 {
        DEFAULT_LINE_LENGTH
    } else {
        max_line_length
    };
    let mut limit = max_line_length.saturating_sub(first_line_offset);
    let mut lines: Vec<Vec<u8>> = Vec::new();
    let mut current: Vec<u8> = Vec::new();

    for ch in text.chars() {
        let mut buf = [0u8; 4];
        let bytes = transcode(ch.encode_utf8(&mut buf), charset).inspect_err(|e| {
            warn!(charset, error = %e, "Cannot encode header text");
        })?;

        let previous_len = current.len();
        current.extend_from_slice(&bytes);
        if previous_len > 0 && cost(&current) > limit {
            current.truncate(previous_len);
            lines.push(std::mem::replace(&mut current, bytes));
            limit = max_line_length;
        }
    }
    lines.push(current);

    Ok(lines
        .iter()
        .map(|line| encode(line))
        .collect::<Vec<_>>()
        .join("\r\n"))
}

fn q_cost(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .map(|&b| if is_q_safe(b) || b == b' ' { 1 } else { 3 })
        .sum()
}

fn percent_cost(bytes: &[u8]) -> usize {
    bytes
        .iter()
        .map(|&b| {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
                1
            } else {
                3
            }
        })
        .sum()
}

/// RFC 2047 "Q" header encoder.
#[derive(Debug)]
pub struct QpHeaderEncoder {
    charset: CharsetState,
}

impl QpHeaderEncoder {
    /// Creates a Q encoder with the given current charset.
    #[must_use]
    pub fn new(charset: impl Into<String>) -> Self {
        Self {
            charset: CharsetState::new(charset),
        }
    }
}

impl Default for QpHeaderEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_CHARSET)
    }
}

impl Encoder for QpHeaderEncoder {
    fn encode(
        &self,
        text: &str,
        first_line_offset: usize,
        max_line_length: usize,
        charset: Option<&str>,
    ) -> Result<String> {
        let charset = self.charset.resolve(charset);
        encode_lines(text, &charset, first_line_offset, max_line_length, q_cost, encode_q)
    }

    fn charset_changed(&self, charset: &str) {
        trace!(charset, encoder = "Q", "Encoder charset changed");
        self.charset.set(charset);
    }

    fn charset(&self) -> String {
        self.charset.get()
    }
}

impl HeaderEncoder for QpHeaderEncoder {
    fn name(&self) -> &'static str {
        "Q"
    }

    fn duplicate(&self) -> Arc<dyn HeaderEncoder> {
        Arc::new(Self::new(self.charset()))
    }
}

/// RFC 2047 "B" (base64) header encoder.
#[derive(Debug)]
pub struct Base64HeaderEncoder {
    charset: CharsetState,
}

impl Base64HeaderEncoder {
    /// Creates a B encoder with the given current charset.
    #[must_use]
    pub fn new(charset: impl Into<String>) -> Self {
        Self {
            charset: CharsetState::new(charset),
        }
    }
}

impl Default for Base64HeaderEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_CHARSET)
    }
}

impl Encoder for Base64HeaderEncoder {
    fn encode(
        &self,
        text: &str,
        first_line_offset: usize,
        max_line_length: usize,
        charset: Option<&str>,
    ) -> Result<String> {
        let charset = self.charset.resolve(charset);
        encode_lines(
            text,
            &charset,
            first_line_offset,
            max_line_length,
            |bytes| base64_len(bytes.len()),
            encode_base64,
        )
    }

    fn charset_changed(&self, charset: &str) {
        trace!(charset, encoder = "B", "Encoder charset changed");
        self.charset.set(charset);
    }

    fn charset(&self) -> String {
        self.charset.get()
    }
}

impl HeaderEncoder for Base64HeaderEncoder {
    fn name(&self) -> &'static str {
        "B"
    }

    fn duplicate(&self) -> Arc<dyn HeaderEncoder> {
        Arc::new(Self::new(self.charset()))
    }
}

/// RFC 2231 parameter value encoder.
#[derive(Debug)]
pub struct Rfc2231Encoder {
    charset: CharsetState,
}

impl Rfc2231Encoder {
    /// Creates a parameter encoder with the given current charset.
    #[must_use]
    pub fn new(charset: impl Into<String>) -> Self {
        Self {
            charset: CharsetState::new(charset),
        }
    }
}

impl Default for Rfc2231Encoder {
    fn default() -> Self {
        Self::new(DEFAULT_CHARSET)
    }
}

impl Encoder for Rfc2231Encoder {
    fn encode(
        &self,
        text: &str,
        first_line_offset: usize,
        max_line_length: usize,
        charset: Option<&str>,
    ) -> Result<String> {
        let charset = self.charset.resolve(charset);
        encode_lines(
            text,
            &charset,
            first_line_offset,
            max_line_length,
            percent_cost,
            percent_encode,
        )
    }

    fn charset_changed(&self, charset: &str) {
        trace!(charset, encoder = "rfc2231", "Encoder charset changed");
        self.charset.set(charset);
    }

    fn charset(&self) -> String {
        self.charset.get()
    }
}

impl ParameterEncoder for Rfc2231Encoder {
    fn duplicate(&self) -> Arc<dyn ParameterEncoder> {
        Arc::new(Self::new(self.charset()))
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::encoding::decode_q;

    #[test]
    fn test_q_encoder_plain() {
        let encoder = QpHeaderEncoder::default();
        assert_eq!(encoder.encode("Hello World", 0, 75, None).unwrap(), "Hello_World");
        assert_eq!(encoder.name(), "Q");
    }

    #[test]
    fn test_q_encoder_uses_requested_charset() {
        let encoder = QpHeaderEncoder::default();
        assert_eq!(encoder.encode("é", 0, 75, None).unwrap(), "=C3=A9");
        assert_eq!(encoder.encode("é", 0, 75, Some("iso-8859-1")).unwrap(), "=E9");
    }

    #[test]
    fn test_q_encoder_falls_back_to_current_charset() {
        let encoder = QpHeaderEncoder::default();
        encoder.charset_changed("iso-8859-1");
        assert_eq!(encoder.charset(), "iso-8859-1");
        assert_eq!(encoder.encode("é", 0, 75, None).unwrap(), "=E9");
    }

    #[test]
    fn test_q_encoder_splits_lines_on_characters() {
        let encoder = QpHeaderEncoder::default();
        let text = "ééééééééééééééé";
        let encoded = encoder.encode(text, 0, 20, None).unwrap();
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.len() <= 20, "line too long: {line}");
            // Each line holds whole two-byte characters.
            assert_eq!(line.len() % 6, 0);
        }
        let decoded: Vec<u8> = lines.iter().flat_map(|l| decode_q(l).unwrap()).collect();
        assert_eq!(String::from_utf8(decoded).unwrap(), text);
    }

    #[test]
    fn test_first_line_offset() {
        let encoder = QpHeaderEncoder::default();
        let encoded = encoder.encode("abcdefghij", 6, 10, None).unwrap();
        assert_eq!(encoded, "abcd\r\nefghij");
    }

    #[test]
    fn test_b_encoder() {
        let encoder = Base64HeaderEncoder::default();
        assert_eq!(encoder.name(), "B");
        assert_eq!(encoder.encode("Héllo", 0, 75, None).unwrap(), "SMOpbGxv");

        let encoded = encoder.encode("ééééééééééé", 0, 8, None).unwrap();
        for line in encoded.split("\r\n") {
            assert!(line.len() <= 8);
            let bytes = crate::encoding::decode_base64(line).unwrap();
            assert!(String::from_utf8(bytes).is_ok());
        }
    }

    #[test]
    fn test_rfc2231_encoder() {
        let encoder = Rfc2231Encoder::default();
        assert_eq!(encoder.encode("résumé.pdf", 0, 75, None).unwrap(), "r%C3%A9sum%C3%A9.pdf");
        assert_eq!(
            encoder.encode("é", 0, 75, Some("iso-8859-1")).unwrap(),
            "%E9"
        );
    }

    #[test]
    fn test_unknown_charset() {
        let encoder = QpHeaderEncoder::new("x-unknown");
        assert!(encoder.encode("abc", 0, 75, None).is_err());
    }

    #[test]
    fn test_duplicate_is_independent() {
        let encoder = QpHeaderEncoder::new("utf-8");
        let copy = encoder.duplicate();
        encoder.charset_changed("iso-8859-1");
        assert_eq!(copy.charset(), "utf-8");
        copy.charset_changed("koi8-r");
        assert_eq!(encoder.charset(), "iso-8859-1");

        let params = Rfc2231Encoder::new("utf-8");
        let params_copy = ParameterEncoder::duplicate(&params);
        params.charset_changed("iso-8859-1");
        assert_eq!(params_copy.charset(), "utf-8");
    }
}
