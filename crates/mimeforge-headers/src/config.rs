//! Factory configuration types.

use std::sync::Arc;

use crate::encoder::{Base64HeaderEncoder, DEFAULT_CHARSET, HeaderEncoder, QpHeaderEncoder};
use crate::header::DEFAULT_MAX_LINE_LENGTH;

/// RFC 2047 encoding used for header words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeaderEncoding {
    /// "Q" encoding, readable for mostly-ASCII text.
    #[default]
    QuotedPrintable,
    /// "B" (base64) encoding.
    Base64,
}

impl HeaderEncoding {
    /// Builds a header encoder of this encoding seeded with `charset`.
    #[must_use]
    pub fn encoder(self, charset: &str) -> Arc<dyn HeaderEncoder> {
        match self {
            Self::QuotedPrintable => Arc::new(QpHeaderEncoder::new(charset)),
            Self::Base64 => Arc::new(Base64HeaderEncoder::new(charset)),
        }
    }
}

/// Header factory configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Charset applied to every new header. `None` leaves headers on the
    /// encoder's charset.
    pub charset: Option<String>,
    /// Encoding for header words.
    pub header_encoding: HeaderEncoding,
    /// Fold width for serialized headers.
    pub max_line_length: usize,
}

impl Config {
    /// Creates a configuration with Q encoding, no charset override, and
    /// 78-column folding.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            charset: None,
            header_encoding: HeaderEncoding::QuotedPrintable,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    /// Creates a configuration builder.
    #[must_use]
    pub const fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Charset the default encoders start with.
    #[must_use]
    pub fn encoder_charset(&self) -> &str {
        self.charset.as_deref().unwrap_or(DEFAULT_CHARSET)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for factory configuration.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    charset: Option<String>,
    header_encoding: HeaderEncoding,
    max_line_length: Option<usize>,
}

impl ConfigBuilder {
    /// Creates a new builder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            charset: None,
            header_encoding: HeaderEncoding::QuotedPrintable,
            max_line_length: None,
        }
    }

    /// Sets the charset.
    #[must_use]
    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    /// Sets the header word encoding.
    #[must_use]
    pub const fn header_encoding(mut self, encoding: HeaderEncoding) -> Self {
        self.header_encoding = encoding;
        self
    }

    /// Sets the fold width.
    #[must_use]
    pub const fn max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = Some(max_line_length);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> Config {
        Config {
            charset: self.charset,
            header_encoding: self.header_encoding,
            // A zero width would fold before every token.
            max_line_length: self
                .max_line_length
                .filter(|&len| len > 0)
                .unwrap_or(DEFAULT_MAX_LINE_LENGTH),
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
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

    #[test]
    fn test_config_new() {
        let config = Config::new();
        assert_eq!(config.charset, None);
        assert_eq!(config.header_encoding, HeaderEncoding::QuotedPrintable);
        assert_eq!(config.max_line_length, 78);
        assert_eq!(config.encoder_charset(), "utf-8");
    }

    #[test]
    fn test_config_builder() {
        let config = Config::builder()
            .charset("iso-8859-1")
            .header_encoding(HeaderEncoding::Base64)
            .max_line_length(100)
            .build();

        assert_eq!(config.charset.as_deref(), Some("iso-8859-1"));
        assert_eq!(config.header_encoding, HeaderEncoding::Base64);
        assert_eq!(config.max_line_length, 100);
        assert_eq!(config.encoder_charset(), "iso-8859-1");
    }

    #[test]
    fn test_config_builder_zero_line_length() {
        let config = Config::builder().max_line_length(0).build();
        assert_eq!(config.max_line_length, 78);
    }

    #[test]
    fn test_header_encoding_encoder() {
        let q = HeaderEncoding::QuotedPrintable.encoder("utf-8");
        assert_eq!(q.name(), "Q");
        let b = HeaderEncoding::Base64.encoder("koi8-r");
        assert_eq!(b.name(), "B");
        assert_eq!(b.charset(), "koi8-r");
    }
}
