//! Header factory.
//!
//! The factory is the single entry point for building headers. For each
//! [`HeaderKind`] it picks the variant, wires in the shared encoders the kind
//! is allowed to use (see [`HeaderKind::wiring`]), sets the initial value and
//! finally applies the configured charset.
//!
//! All headers built by one factory share its two encoders. Charset changes
//! sent to the factory reach those encoders, so headers that follow the
//! encoder charset see them too; headers that were given an explicit charset
//! keep it. Cloning a factory duplicates both encoders, which gives the clone
//! an isolated charset state.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::Config;
use crate::encoder::{HeaderEncoder, ParameterEncoder, Rfc2231Encoder};
use crate::error::Result;
use crate::grammar::Grammar;
use crate::header::{
    DateHeader, FieldBodyModel, Header, HeaderCore, HeaderKind, IdentificationHeader, Mailbox,
    MailboxHeader, ParameterizedHeader, PathHeader, UnstructuredHeader,
};

/// Builds headers wired with shared encoders and grammar.
#[derive(Debug)]
pub struct HeaderFactory {
    encoder: Arc<dyn HeaderEncoder>,
    param_encoder: Arc<dyn ParameterEncoder>,
    grammar: Arc<Grammar>,
    charset: Option<String>,
    max_line_length: usize,
}

impl HeaderFactory {
    /// Creates a factory from its collaborators.
    ///
    /// `charset` is applied to every header the factory builds; `None`
    /// leaves new headers on the header encoder's charset.
    #[must_use]
    pub fn new(
        encoder: Arc<dyn HeaderEncoder>,
        param_encoder: Arc<dyn ParameterEncoder>,
        grammar: Arc<Grammar>,
        charset: Option<String>,
    ) -> Self {
        Self {
            encoder,
            param_encoder,
            grammar,
            charset,
            max_line_length: crate::header::DEFAULT_MAX_LINE_LENGTH,
        }
    }

    /// Creates a factory with default encoders seeded from `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        debug!(
            charset = ?config.charset,
            encoding = ?config.header_encoding,
            max_line_length = config.max_line_length,
            "Building header factory"
        );

        let encoder_charset = config.encoder_charset();
        let mut factory = Self::new(
            config.header_encoding.encoder(encoder_charset),
            Arc::new(Rfc2231Encoder::new(encoder_charset)),
            Arc::new(Grammar::new()),
            config.charset.clone(),
        );
        factory.max_line_length = config.max_line_length;
        factory
    }

    /// Returns the shared header encoder.
    #[must_use]
    pub const fn header_encoder(&self) -> &Arc<dyn HeaderEncoder> {
        &self.encoder
    }

    /// Returns the shared parameter encoder.
    #[must_use]
    pub const fn parameter_encoder(&self) -> &Arc<dyn ParameterEncoder> {
        &self.param_encoder
    }

    /// Returns the shared grammar.
    #[must_use]
    pub const fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    /// Returns the charset applied to new headers.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Returns the fold width given to new headers.
    #[must_use]
    pub const fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// Records a new charset and forwards it to both encoders.
    ///
    /// Headers created after this call are given `charset`. Headers created
    /// before keep whatever charset override they hold.
    pub fn charset_changed(&mut self, charset: &str) {
        debug!(charset, "Header factory charset changed");
        self.charset = Some(charset.to_string());
        self.encoder.charset_changed(charset);
        self.param_encoder.charset_changed(charset);
    }

    /// Builds a header of `kind` and sets `model` as its value.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid field name, or if `model`
    /// has the wrong shape or fails validation for the kind.
    pub fn create(
        &self,
        kind: HeaderKind,
        name: &str,
        model: Option<FieldBodyModel>,
    ) -> Result<Box<dyn Header>> {
        let core = self.core(kind, name)?;
        let mut header: Box<dyn Header> = match kind {
            HeaderKind::Mailbox => Box::new(MailboxHeader::from_core(core)),
            HeaderKind::Date => Box::new(DateHeader::from_core(core)),
            HeaderKind::Text => Box::new(UnstructuredHeader::from_core(core)),
            HeaderKind::Parameterized => Box::new(ParameterizedHeader::from_core(
                core,
                self.parameter_encoder_for(kind, name),
            )),
            HeaderKind::Identification => Box::new(IdentificationHeader::from_core(core)),
            HeaderKind::Path => Box::new(PathHeader::from_core(core)),
        };

        if let Some(model) = model {
            header.set_field_body_model(model)?;
        }
        self.apply_charset(header.as_mut());
        Ok(header)
    }

    /// Builds an address-list header.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is invalid or an address does not parse.
    pub fn create_mailbox_header(
        &self,
        name: &str,
        mailboxes: Option<Vec<Mailbox>>,
    ) -> Result<MailboxHeader> {
        let mut header = MailboxHeader::from_core(self.core(HeaderKind::Mailbox, name)?);
        if let Some(mailboxes) = mailboxes {
            header.set_mailboxes(mailboxes)?;
        }
        self.apply_charset(&mut header);
        Ok(header)
    }

    /// Builds a date header from a Unix timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is invalid or the timestamp is out of range.
    pub fn create_date_header(&self, name: &str, timestamp: Option<i64>) -> Result<DateHeader> {
        let mut header = DateHeader::from_core(self.core(HeaderKind::Date, name)?);
        if timestamp.is_some() {
            header.set_timestamp(timestamp)?;
        }
        self.apply_charset(&mut header);
        Ok(header)
    }

    /// Builds an unstructured text header.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is invalid.
    pub fn create_text_header(&self, name: &str, value: Option<&str>) -> Result<UnstructuredHeader> {
        let mut header = UnstructuredHeader::from_core(self.core(HeaderKind::Text, name)?);
        if let Some(value) = value {
            header.set_value(value);
        }
        self.apply_charset(&mut header);
        Ok(header)
    }

    /// Builds a header with a primary value and parameters.
    ///
    /// Parameters are set one at a time in the given order. The parameter
    /// encoder is attached only for `Content-Disposition`.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` or a parameter name is invalid.
    pub fn create_parameterized_header(
        &self,
        name: &str,
        value: Option<&str>,
        params: &[(&str, &str)],
    ) -> Result<ParameterizedHeader> {
        let kind = HeaderKind::Parameterized;
        let mut header =
            ParameterizedHeader::from_core(self.core(kind, name)?, self.parameter_encoder_for(kind, name));
        if let Some(value) = value {
            header.set_value(value);
        }
        for (param, param_value) in params {
            header.set_parameter(param, *param_value)?;
        }
        self.apply_charset(&mut header);
        Ok(header)
    }

    /// Builds a message identifier header.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is invalid or an id is malformed.
    pub fn create_id_header(
        &self,
        name: &str,
        ids: Option<Vec<String>>,
    ) -> Result<IdentificationHeader> {
        let mut header = IdentificationHeader::from_core(self.core(HeaderKind::Identification, name)?);
        if let Some(ids) = ids {
            header.set_ids(ids)?;
        }
        self.apply_charset(&mut header);
        Ok(header)
    }

    /// Builds a routing path header. `Some("")` is the null path.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is invalid or the address is malformed.
    pub fn create_path_header(&self, name: &str, path: Option<&str>) -> Result<PathHeader> {
        let mut header = PathHeader::from_core(self.core(HeaderKind::Path, name)?);
        if path.is_some() {
            header.set_address(path)?;
        }
        self.apply_charset(&mut header);
        Ok(header)
    }

    fn core(&self, kind: HeaderKind, name: &str) -> Result<HeaderCore> {
        let wiring = kind.wiring(name);
        trace!(
            ?kind,
            name,
            header_encoder = wiring.header_encoder,
            parameter_encoder = wiring.parameter_encoder,
            "Creating header"
        );

        let encoder = wiring.header_encoder.then(|| Arc::clone(&self.encoder));
        let mut core = HeaderCore::new(name, encoder, Arc::clone(&self.grammar))?;
        core.set_max_line_length(self.max_line_length);
        Ok(core)
    }

    fn parameter_encoder_for(&self, kind: HeaderKind, name: &str) -> Option<Arc<dyn ParameterEncoder>> {
        kind.wiring(name)
            .parameter_encoder
            .then(|| Arc::clone(&self.param_encoder))
    }

    /// Runs after the value is set.
    fn apply_charset<H: Header + ?Sized>(&self, header: &mut H) {
        if let Some(charset) = &self.charset {
            header.set_charset(charset);
        }
    }
}

impl Default for HeaderFactory {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Duplicates both encoders; the grammar stays shared.
impl Clone for HeaderFactory {
    fn clone(&self) -> Self {
        debug!(charset = ?self.charset, "Duplicating header factory");
        Self {
            encoder: self.encoder.duplicate(),
            param_encoder: self.param_encoder.duplicate(),
            grammar: Arc::clone(&self.grammar),
            charset: self.charset.clone(),
            max_line_length: self.max_line_length,
        }
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
    use crate::config::HeaderEncoding;
    use crate::error::Error;

    #[test]
    fn test_default_factory() {
        let factory = HeaderFactory::default();
        assert_eq!(factory.charset(), None);
        assert_eq!(factory.header_encoder().name(), "Q");
        assert_eq!(factory.header_encoder().charset(), "utf-8");
        assert_eq!(factory.parameter_encoder().charset(), "utf-8");
        assert_eq!(factory.max_line_length(), 78);
    }

    #[test]
    fn test_from_config() {
        let config = Config::builder()
            .charset("iso-8859-1")
            .header_encoding(HeaderEncoding::Base64)
            .max_line_length(60)
            .build();
        let factory = HeaderFactory::from_config(&config);
        assert_eq!(factory.charset(), Some("iso-8859-1"));
        assert_eq!(factory.header_encoder().name(), "B");
        assert_eq!(factory.header_encoder().charset(), "iso-8859-1");

        let header = factory.create_text_header("Subject", Some("hi")).unwrap();
        assert_eq!(header.max_line_length(), 60);
        assert_eq!(header.charset(), Some("iso-8859-1"));
    }

    #[test]
    fn test_headers_share_encoder() {
        let factory = HeaderFactory::default();
        let subject = factory.create_text_header("Subject", None).unwrap();
        let from = factory.create_mailbox_header("From", None).unwrap();
        assert!(Arc::ptr_eq(subject.header_encoder().unwrap(), factory.header_encoder()));
        assert!(Arc::ptr_eq(from.header_encoder().unwrap(), factory.header_encoder()));
        assert!(factory.create_date_header("Date", None).unwrap().header_encoder().is_none());
    }

    #[test]
    fn test_unset_values() {
        let factory = HeaderFactory::default();
        for kind in HeaderKind::ALL {
            let header = factory.create(kind, "X-Test", None).unwrap();
            assert!(header.field_body_model().is_unset(), "{kind:?}");
            assert_eq!(header.kind(), kind);
        }
    }

    #[test]
    fn test_charset_applied_after_value() {
        let mut factory = HeaderFactory::default();
        factory.charset_changed("iso-8859-1");
        let header = factory.create_text_header("Subject", Some("café")).unwrap();
        assert_eq!(header.charset(), Some("iso-8859-1"));
        assert_eq!(header.to_wire().unwrap(), "Subject: =?iso-8859-1?Q?caf=E9?=\r\n");
    }

    #[test]
    fn test_generic_create_mismatch() {
        let factory = HeaderFactory::default();
        let result = factory.create(
            HeaderKind::Date,
            "Date",
            Some(FieldBodyModel::Text("yesterday".into())),
        );
        assert!(matches!(result, Err(Error::ModelMismatch { .. })));
    }

    #[test]
    fn test_invalid_value_propagates() {
        let factory = HeaderFactory::default();
        assert!(matches!(
            factory.create_mailbox_header("To", Some(vec![Mailbox::new("nope")])),
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            factory.create_parameterized_header("Content-Type", Some("text/plain"), &[("a b", "c")]),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            factory.create_text_header("Bad:Name", None),
            Err(Error::InvalidHeaderName(_))
        ));
    }

    #[test]
    fn test_clone_duplicates_encoders() {
        let factory = HeaderFactory::default();
        let copy = factory.clone();
        assert!(!Arc::ptr_eq(factory.header_encoder(), copy.header_encoder()));
        assert!(!Arc::ptr_eq(factory.parameter_encoder(), copy.parameter_encoder()));
        assert!(Arc::ptr_eq(factory.grammar(), copy.grammar()));
    }
}
