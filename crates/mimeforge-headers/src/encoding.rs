//! Byte-level codecs used by the header and parameter encoders.
//!
//! Supports Base64, the RFC 2047 "Q" encoding, RFC 2231 percent-encoding,
//! charset transcoding, and decoding of RFC 2047 encoded-words.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use encoding_rs::Encoding;
use std::fmt::Write as _;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decodes Base64 data.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    STANDARD.decode(data).map_err(Into::into)
}

/// Returns the length of `n` bytes once Base64 encoded.
#[must_use]
pub const fn base64_len(n: usize) -> usize {
    n.div_ceil(3) * 4
}

/// Transcodes UTF-8 text into the byte representation of `charset`.
///
/// # Errors
///
/// Returns [`Error::UnsupportedCharset`] for unknown labels and
/// [`Error::Unrepresentable`] if a character has no mapping in the charset.
pub fn transcode(text: &str, charset: &str) -> Result<Vec<u8>> {
    // WHATWG maps "us-ascii" onto windows-1252, which would hide non-ASCII input.
    if charset.eq_ignore_ascii_case("us-ascii") || charset.eq_ignore_ascii_case("ascii") {
        return if text.is_ascii() {
            Ok(text.as_bytes().to_vec())
        } else {
            Err(Error::Unrepresentable {
                charset: charset.to_string(),
                text: text.to_string(),
            })
        };
    }

    let encoding = Encoding::for_label(charset.as_bytes())
        .ok_or_else(|| Error::UnsupportedCharset(charset.to_string()))?;

    let (bytes, used, had_errors) = encoding.encode(text);
    if used != encoding {
        // UTF-16 and the replacement encodings only decode.
        return Err(Error::UnsupportedCharset(charset.to_string()));
    }
    if had_errors {
        return Err(Error::Unrepresentable {
            charset: charset.to_string(),
            text: text.to_string(),
        });
    }

    Ok(bytes.into_owned())
}

/// Returns true if the byte passes through the "Q" encoding unchanged.
///
/// This is the restricted set allowed inside a `phrase` (RFC 2047 §5 (3)).
#[must_use]
pub const fn is_q_safe(byte: u8) -> bool {
    matches!(byte, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'!' | b'*' | b'+' | b'-' | b'/')
}

/// Encodes bytes with the RFC 2047 "Q" encoding.
#[must_use]
pub fn encode_q(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len() * 3);
    for &byte in bytes {
        if is_q_safe(byte) {
            result.push(byte as char);
        } else if byte == b' ' {
            result.push('_');
        } else {
            let _ = write!(result, "={byte:02X}");
        }
    }
    result
}

/// Decodes RFC 2047 "Q" encoded text into raw bytes.
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences.
pub fn decode_q(text: &str) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(text.len());
    let mut bytes = text.bytes();

    while let Some(byte) = bytes.next() {
        match byte {
            b'_' => result.push(b' '),
            b'=' => {
                let hex: Vec<u8> = bytes.by_ref().take(2).collect();
                let decoded = std::str::from_utf8(&hex)
                    .ok()
                    .filter(|h| h.len() == 2)
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| {
                        Error::InvalidEncoding("Incomplete escape sequence".to_string())
                    })?;
                result.push(decoded);
            }
            other => result.push(other),
        }
    }

    Ok(result)
}

/// Percent-encodes bytes for an RFC 2231 extended parameter value.
///
/// Only the URL "unreserved" characters are left as-is.
#[must_use]
pub fn percent_encode(bytes: &[u8]) -> String {
    let mut result = String::with_capacity(bytes.len() * 3);
    for &byte in bytes {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~') {
            result.push(byte as char);
        } else {
            let _ = write!(result, "%{byte:02X}");
        }
    }
    result
}

/// Decodes every RFC 2047 encoded-word in `text`.
///
/// Format: `=?charset[*lang]?encoding?encoded-text?=`. Whitespace between
/// two adjacent encoded-words is dropped (RFC 2047 §6.2). Sequences that
/// only look like the start of an encoded-word are kept literally.
///
/// # Errors
///
/// Returns an error if an encoded-word names an unknown encoding or
/// charset, or its payload is malformed.
pub fn decode_encoded_words(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut after_word = false;

    while let Some(start) = rest.find("=?") {
        let (literal, candidate) = rest.split_at(start);
        if let Some((decoded, consumed)) = decode_one_word(candidate)? {
            if !(after_word && literal.chars().all(char::is_whitespace)) {
                out.push_str(literal);
            }
            out.push_str(&decoded);
            rest = &candidate[consumed..];
            after_word = true;
        } else {
            out.push_str(literal);
            out.push_str("=?");
            rest = &candidate[2..];
            after_word = false;
        }
    }

    out.push_str(rest);
    Ok(out)
}

/// Decodes the encoded-word at the start of `s`, returning the text and the
/// number of bytes consumed, or `None` if `s` does not start with one.
fn decode_one_word(s: &str) -> Result<Option<(String, usize)>> {
    let body = &s[2..];
    let Some((charset, rest)) = body.split_once('?') else {
        return Ok(None);
    };
    let Some((encoding, rest)) = rest.split_once('?') else {
        return Ok(None);
    };
    let Some(end) = rest.find("?=") else {
        return Ok(None);
    };
    let payload = &rest[..end];

    if charset.is_empty()
        || charset.contains(char::is_whitespace)
        || encoding.len() != 1
        || payload.contains(char::is_whitespace)
    {
        return Ok(None);
    }

    let bytes = match encoding {
        "B" | "b" => decode_base64(payload)?,
        "Q" | "q" => decode_q(payload)?,
        other => {
            return Err(Error::InvalidEncoding(format!("Unknown encoding: {other}")));
        }
    };

    let label = charset.split_once('*').map_or(charset, |(label, _)| label);
    let decoder = Encoding::for_label(label.as_bytes())
        .ok_or_else(|| Error::UnsupportedCharset(label.to_string()))?;
    let (decoded, _) = decoder.decode_without_bom_handling(&bytes);

    let consumed = 2 + charset.len() + 1 + encoding.len() + 1 + end + 2;
    Ok(Some((decoded.into_owned(), consumed)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::redundant_clone, clippy::manual_string_new, clippy::needless_collect, clippy::unreadable_literal, clippy::used_underscore_items, clippy::similar_names)]
mod tests {
    use super::*;

    #[test]
    fn test_base64_encode_decode() {
        let data = b"Hello, World!";
        let encoded = encode_base64(data);
        assert_eq!(encoded, "SGVsbG8sIFdvcmxkIQ==");
        assert_eq!(base64_len(data.len()), encoded.len());

        let decoded = decode_base64(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn test_transcode() {
        assert_eq!(transcode("Héllo", "utf-8").unwrap(), "Héllo".as_bytes());
        assert_eq!(
            transcode("Héllo", "ISO-8859-1").unwrap(),
            vec![b'H', 0xE9, b'l', b'l', b'o']
        );
        assert!(matches!(
            transcode("Héllo", "us-ascii"),
            Err(Error::Unrepresentable { .. })
        ));
        assert!(matches!(
            transcode("Hello", "x-no-such-charset"),
            Err(Error::UnsupportedCharset(_))
        ));
        assert!(matches!(
            transcode("日本", "iso-8859-1"),
            Err(Error::Unrepresentable { .. })
        ));
    }

    #[test]
    fn test_q_encode() {
        assert_eq!(encode_q(b"Hello"), "Hello");
        assert_eq!(encode_q(b"a b"), "a_b");
        assert_eq!(encode_q(b"a=b?"), "a=3Db=3F");
        assert_eq!(encode_q("é".as_bytes()), "=C3=A9");
    }

    #[test]
    fn test_q_decode() {
        assert_eq!(decode_q("H=C3=A9llo_World").unwrap(), "Héllo World".as_bytes());
        assert!(decode_q("bad=Z").is_err());
        assert!(decode_q("bad=").is_err());
    }

    #[test]
    fn test_percent_encode() {
        assert_eq!(percent_encode(b"file.txt"), "file.txt");
        assert_eq!(percent_encode(b"my file"), "my%20file");
        assert_eq!(percent_encode("é".as_bytes()), "%C3%A9");
    }

    #[test]
    fn test_decode_encoded_words() {
        assert_eq!(decode_encoded_words("Hello").unwrap(), "Hello");
        assert_eq!(decode_encoded_words("=?utf-8?B?SMOpbGxv?=").unwrap(), "Héllo");
        assert_eq!(decode_encoded_words("=?utf-8?Q?H=C3=A9llo?=").unwrap(), "Héllo");
        assert_eq!(decode_encoded_words("=?iso-8859-1?Q?H=E9llo?=").unwrap(), "Héllo");
        assert_eq!(
            decode_encoded_words("Say =?utf-8*en?Q?H=C3=A9llo?=\r\n =?utf-8?Q?_w=C3=B6rld?= now").unwrap(),
            "Say Héllo wörld now"
        );
        assert_eq!(decode_encoded_words("a =? b").unwrap(), "a =? b");
    }

    #[test]
    fn test_decode_unknown_encoding() {
        assert!(matches!(
            decode_encoded_words("=?utf-8?X?abc?="),
            Err(Error::InvalidEncoding(_))
        ));
    }
}
