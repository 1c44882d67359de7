//! Unstructured text headers (Subject, Comments, X-*).

use std::sync::Arc;

use crate::encoder::HeaderEncoder;
use crate::error::Result;
use crate::grammar::Grammar;

use super::{FieldBodyModel, Header, HeaderCore, HeaderKind};

/// A header holding free-form text.
#[derive(Debug, Clone)]
pub struct UnstructuredHeader {
    core: HeaderCore,
    value: String,
}

impl UnstructuredHeader {
    /// Creates an empty text header.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid field name.
    pub fn new(name: &str, encoder: Arc<dyn HeaderEncoder>, grammar: Arc<Grammar>) -> Result<Self> {
        Ok(Self::from_core(HeaderCore::new(name, Some(encoder), grammar)?))
    }

    pub(crate) const fn from_core(core: HeaderCore) -> Self {
        Self {
            core,
            value: String::new(),
        }
    }

    /// Returns the unencoded text.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Sets the unencoded text.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }
}

impl Header for UnstructuredHeader {
    fn core(&self) -> &HeaderCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut HeaderCore {
        &mut self.core
    }

    fn kind(&self) -> HeaderKind {
        HeaderKind::Text
    }

    fn field_body_model(&self) -> FieldBodyModel {
        FieldBodyModel::Text(self.value.clone())
    }

    fn set_field_body_model(&mut self, model: FieldBodyModel) -> Result<()> {
        match model {
            FieldBodyModel::Text(value) => {
                self.value = value;
                Ok(())
            }
            _ => Err(self.core.mismatch(HeaderKind::Text)),
        }
    }

    fn field_body(&self) -> Result<String> {
        self.core.encode_words(&self.value, None)
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
    use crate::encoder::{Base64HeaderEncoder, QpHeaderEncoder};
    use crate::encoding::decode_encoded_words;

    fn header(encoder: Arc<dyn HeaderEncoder>) -> UnstructuredHeader {
        UnstructuredHeader::new("Subject", encoder, Arc::new(Grammar::new())).unwrap()
    }

    #[test]
    fn test_plain_text() {
        let mut header = header(Arc::new(QpHeaderEncoder::default()));
        header.set_value("Hello, World!");
        assert_eq!(header.to_wire().unwrap(), "Subject: Hello, World!\r\n");
    }

    #[test]
    fn test_non_ascii_is_encoded() {
        let mut header = header(Arc::new(QpHeaderEncoder::default()));
        header.set_value("Grüße aus Köln");
        let body = header.field_body().unwrap();
        assert_eq!(body, "=?utf-8?Q?Gr=C3=BC=C3=9Fe?= aus =?utf-8?Q?K=C3=B6ln?=");
        assert_eq!(decode_encoded_words(&body).unwrap(), "Grüße aus Köln");
    }

    #[test]
    fn test_base64_encoder() {
        let mut header = header(Arc::new(Base64HeaderEncoder::default()));
        header.set_value("Héllo");
        assert_eq!(header.field_body().unwrap(), "=?utf-8?B?SMOpbGxv?=");
    }

    #[test]
    fn test_header_charset_override() {
        let mut header = header(Arc::new(QpHeaderEncoder::default()));
        header.set_value("café");
        header.set_charset("iso-8859-1");
        assert_eq!(header.field_body().unwrap(), "=?iso-8859-1?Q?caf=E9?=");
    }

    #[test]
    fn test_crlf_is_never_emitted_raw() {
        let mut header = header(Arc::new(QpHeaderEncoder::default()));
        header.set_value("line\r\nBcc: evil@example.com");
        let wire = header.to_wire().unwrap();
        assert!(!wire.contains("\r\nBcc:"));
    }

    #[test]
    fn test_long_encoded_text_folds() {
        let mut header = header(Arc::new(QpHeaderEncoder::default()));
        let text = "ü".repeat(40);
        header.set_value(text.clone());
        let wire = header.to_wire().unwrap();
        for line in wire.trim_end_matches("\r\n").split("\r\n") {
            assert!(line.len() <= 78, "line too long: {line}");
        }
        let body = header.field_body().unwrap();
        assert_eq!(decode_encoded_words(&body).unwrap(), text);
    }
}
