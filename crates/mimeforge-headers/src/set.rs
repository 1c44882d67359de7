//! Ordered header collection.

use crate::error::Result;
use crate::factory::HeaderFactory;
use crate::header::{FieldBodyModel, Header, HeaderKind, Mailbox};

/// Collection of headers built by an owned factory.
///
/// Headers keep insertion order. Lookups by name ignore ASCII case.
#[derive(Debug, Default)]
pub struct HeaderSet {
    factory: HeaderFactory,
    headers: Vec<Box<dyn Header>>,
}

impl HeaderSet {
    /// Creates an empty set that builds headers with `factory`.
    #[must_use]
    pub const fn new(factory: HeaderFactory) -> Self {
        Self {
            factory,
            headers: Vec::new(),
        }
    }

    /// Returns the factory.
    #[must_use]
    pub const fn factory(&self) -> &HeaderFactory {
        &self.factory
    }

    /// Appends an already built header.
    pub fn add(&mut self, header: Box<dyn Header>) {
        self.headers.push(header);
    }

    /// Builds a header of `kind` and appends it.
    ///
    /// # Errors
    ///
    /// Returns an error if the factory rejects the name or value.
    pub fn add_kind(&mut self, kind: HeaderKind, name: &str, model: FieldBodyModel) -> Result<()> {
        let header = self.factory.create(kind, name, Some(model))?;
        self.add(header);
        Ok(())
    }

    /// Appends an address-list header.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or an address is invalid.
    pub fn add_mailbox(&mut self, name: &str, mailboxes: Vec<Mailbox>) -> Result<()> {
        let header = self.factory.create_mailbox_header(name, Some(mailboxes))?;
        self.add(Box::new(header));
        Ok(())
    }

    /// Appends a date header.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid or the timestamp out of range.
    pub fn add_date(&mut self, name: &str, timestamp: i64) -> Result<()> {
        let header = self.factory.create_date_header(name, Some(timestamp))?;
        self.add(Box::new(header));
        Ok(())
    }

    /// Appends an unstructured text header.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is invalid.
    pub fn add_text(&mut self, name: &str, value: &str) -> Result<()> {
        let header = self.factory.create_text_header(name, Some(value))?;
        self.add(Box::new(header));
        Ok(())
    }

    /// Appends a header with a value and parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or a parameter name is invalid.
    pub fn add_parameterized(
        &mut self,
        name: &str,
        value: &str,
        params: &[(&str, &str)],
    ) -> Result<()> {
        let header = self
            .factory
            .create_parameterized_header(name, Some(value), params)?;
        self.add(Box::new(header));
        Ok(())
    }

    /// Appends an identifier header.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or an id is invalid.
    pub fn add_id(&mut self, name: &str, ids: Vec<String>) -> Result<()> {
        let header = self.factory.create_id_header(name, Some(ids))?;
        self.add(Box::new(header));
        Ok(())
    }

    /// Appends a routing path header.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or the address is invalid.
    pub fn add_path(&mut self, name: &str, path: &str) -> Result<()> {
        let header = self.factory.create_path_header(name, Some(path))?;
        self.add(Box::new(header));
        Ok(())
    }

    /// Gets the first header with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Header> {
        self.headers
            .iter()
            .find(|h| h.name().eq_ignore_ascii_case(name))
            .map(|h| &**h)
    }

    /// Gets the first header with the given name mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut dyn Header> {
        let header = self
            .headers
            .iter_mut()
            .find(|h| h.name().eq_ignore_ascii_case(name))?;
        Some(header.as_mut())
    }

    /// Gets all headers with the given name.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&dyn Header> {
        self.headers
            .iter()
            .filter(|h| h.name().eq_ignore_ascii_case(name))
            .map(|h| &**h)
            .collect()
    }

    /// Returns true if a header with the given name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Removes all headers with the given name.
    pub fn remove(&mut self, name: &str) {
        self.headers.retain(|h| !h.name().eq_ignore_ascii_case(name));
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Header> {
        self.headers.iter().map(|h| &**h)
    }

    /// Returns the number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true if the set holds no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Changes the charset of the factory and of every header in the set.
    pub fn charset_changed(&mut self, charset: &str) {
        self.factory.charset_changed(charset);
        for header in &mut self.headers {
            header.set_charset(charset);
        }
    }

    /// Serializes every header in order.
    ///
    /// # Errors
    ///
    /// Returns an error if a header cannot be encoded.
    pub fn to_wire(&self) -> Result<String> {
        self.headers.iter().try_fold(String::new(), |mut wire, header| {
            wire.push_str(&header.to_wire()?);
            Ok(wire)
        })
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

    fn sample() -> HeaderSet {
        let mut headers = HeaderSet::default();
        headers
            .add_mailbox("From", vec![Mailbox::with_name("Alice", "alice@example.com")])
            .unwrap();
        headers.add_mailbox("To", vec!["bob@example.com".into()]).unwrap();
        headers.add_text("Subject", "Test Message").unwrap();
        headers.add_date("Date", 1700000000).unwrap();
        headers
    }

    #[test]
    fn test_headers_new() {
        let headers = HeaderSet::default();
        assert!(headers.is_empty());
        assert_eq!(headers.len(), 0);
    }

    #[test]
    fn test_headers_add_get() {
        let headers = sample();
        assert_eq!(headers.len(), 4);
        assert_eq!(headers.get("subject").unwrap().name(), "Subject");
        assert_eq!(
            headers.get("SUBJECT").unwrap().field_body_model(),
            FieldBodyModel::Text("Test Message".into())
        );
        assert!(headers.get("Cc").is_none());
    }

    #[test]
    fn test_headers_get_all_and_remove() {
        let mut headers = HeaderSet::default();
        headers.add_id("References", vec!["a@example.com".into()]).unwrap();
        headers.add_id("References", vec!["b@example.com".into()]).unwrap();
        assert_eq!(headers.get_all("references").len(), 2);
        assert!(headers.contains("References"));

        headers.remove("REFERENCES");
        assert!(!headers.contains("References"));
    }

    #[test]
    fn test_headers_to_wire_keeps_order() {
        let headers = sample();
        assert_eq!(
            headers.to_wire().unwrap(),
            concat!(
                "From: Alice <alice@example.com>\r\n",
                "To: bob@example.com\r\n",
                "Subject: Test Message\r\n",
                "Date: Tue, 14 Nov 2023 22:13:20 +0000\r\n",
            )
        );
    }

    #[test]
    fn test_headers_charset_changed_reaches_existing_headers() {
        let mut headers = HeaderSet::default();
        headers.add_text("Subject", "café").unwrap();
        headers.charset_changed("iso-8859-1");
        headers.add_text("Comments", "thé").unwrap();

        assert_eq!(headers.factory().charset(), Some("iso-8859-1"));
        for header in headers.iter() {
            assert_eq!(header.charset(), Some("iso-8859-1"));
        }
        assert_eq!(
            headers.to_wire().unwrap(),
            "Subject: =?iso-8859-1?Q?caf=E9?=\r\nComments: =?iso-8859-1?Q?th=E9?=\r\n"
        );
    }

    #[test]
    fn test_headers_get_mut() {
        let mut headers = sample();
        headers
            .get_mut("subject")
            .unwrap()
            .set_field_body_model(FieldBodyModel::Text("Changed".into()))
            .unwrap();
        assert_eq!(headers.get("Subject").unwrap().field_body().unwrap(), "Changed");
    }

    #[test]
    fn test_headers_add_kind_and_parameterized() {
        let mut headers = HeaderSet::default();
        headers
            .add_parameterized("Content-Type", "text/plain", &[("charset", "utf-8")])
            .unwrap();
        headers
            .add_kind(HeaderKind::Path, "Return-Path", FieldBodyModel::Path(Some(String::new())))
            .unwrap();
        assert_eq!(
            headers.to_wire().unwrap(),
            "Content-Type: text/plain; charset=utf-8\r\nReturn-Path: <>\r\n"
        );
    }
}
