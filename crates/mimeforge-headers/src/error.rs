//! Error types for header construction and encoding.

use crate::header::HeaderKind;

/// Result type alias for header operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Header error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Address does not match the RFC 5322 `addr-spec` grammar.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Identifier does not match the RFC 5322 `msg-id` grammar.
    #[error("Invalid id: {0}")]
    InvalidId(String),

    /// Timestamp cannot be represented as a calendar date.
    #[error("Invalid date: timestamp {0} is out of range")]
    InvalidDate(i64),

    /// Parameter name is not an RFC 2045 token.
    #[error("Invalid parameter name: {0}")]
    InvalidParameter(String),

    /// Header field name contains characters outside RFC 5322 `ftext`.
    #[error("Invalid header name: {0}")]
    InvalidHeaderName(String),

    /// Field-body model has the wrong shape for the header.
    #[error("Header {header} expects a {expected:?} field body")]
    ModelMismatch {
        /// Header field name.
        header: String,
        /// Kind of the header that rejected the model.
        expected: HeaderKind,
    },

    /// No encoding is known for the charset label.
    #[error("Unsupported charset: {0}")]
    UnsupportedCharset(String),

    /// Text contains characters the charset cannot represent.
    #[error("Text {text:?} cannot be represented in {charset}")]
    Unrepresentable {
        /// Target charset label.
        charset: String,
        /// Text that failed to encode.
        text: String,
    },

    /// Header needs word encoding but has no header encoder.
    #[error("Header {0} has no header encoder")]
    MissingEncoder(String),

    /// Malformed encoded-word.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),
}
