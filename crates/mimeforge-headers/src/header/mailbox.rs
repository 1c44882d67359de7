//! Address-list headers (From, To, Cc, Bcc, Reply-To, Sender).

use std::sync::Arc;

use crate::encoder::HeaderEncoder;
use crate::error::{Error, Result};
use crate::grammar::Grammar;

use super::{FieldBodyModel, Header, HeaderCore, HeaderKind};

/// Mailbox (optional display name + address).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    /// Email address (`addr-spec`).
    pub address: String,
}

impl Mailbox {
    /// Creates a mailbox with just an address.
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
        }
    }

    /// Creates a mailbox with a display name and address.
    #[must_use]
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            address: address.into(),
        }
    }
}

impl From<&str> for Mailbox {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for Mailbox {
    fn from(address: String) -> Self {
        Self::new(address)
    }
}

/// A header holding a list of mailboxes.
#[derive(Debug, Clone)]
pub struct MailboxHeader {
    core: HeaderCore,
    mailboxes: Vec<Mailbox>,
}

impl MailboxHeader {
    /// Creates an empty mailbox header.
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
            mailboxes: Vec::new(),
        }
    }

    /// Returns the mailboxes in order.
    #[must_use]
    pub fn mailboxes(&self) -> &[Mailbox] {
        &self.mailboxes
    }

    /// Returns the bare addresses in order.
    #[must_use]
    pub fn addresses(&self) -> Vec<&str> {
        self.mailboxes.iter().map(|m| m.address.as_str()).collect()
    }

    /// Replaces the mailbox list.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if any address is not a valid
    /// `addr-spec`; the header is left unchanged in that case.
    pub fn set_mailboxes(&mut self, mailboxes: Vec<Mailbox>) -> Result<()> {
        if let Some(bad) = mailboxes
            .iter()
            .find(|m| !self.core.grammar().is_addr_spec(&m.address))
        {
            return Err(Error::InvalidAddress(bad.address.clone()));
        }

        self.mailboxes = mailboxes;
        Ok(())
    }

    /// Removes every mailbox whose address is in `addresses`.
    pub fn remove_addresses(&mut self, addresses: &[&str]) {
        self.mailboxes
            .retain(|m| !addresses.contains(&m.address.as_str()));
    }
}

impl Header for MailboxHeader {
    fn core(&self) -> &HeaderCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut HeaderCore {
        &mut self.core
    }

    fn kind(&self) -> HeaderKind {
        HeaderKind::Mailbox
    }

    fn field_body_model(&self) -> FieldBodyModel {
        FieldBodyModel::Mailboxes(self.mailboxes.clone())
    }

    fn set_field_body_model(&mut self, model: FieldBodyModel) -> Result<()> {
        match model {
            FieldBodyModel::Mailboxes(mailboxes) => self.set_mailboxes(mailboxes),
            _ => Err(self.core.mismatch(HeaderKind::Mailbox)),
        }
    }

    fn field_body(&self) -> Result<String> {
        let mut rendered = Vec::with_capacity(self.mailboxes.len());
        for mailbox in &self.mailboxes {
            match mailbox.name.as_deref().filter(|n| !n.is_empty()) {
                Some(name) => {
                    // Only the first display name shares a line with the field name.
                    let phrase = self.core.phrase(name, rendered.is_empty())?;
                    rendered.push(format!("{phrase} <{}>", mailbox.address));
                }
                None => rendered.push(mailbox.address.clone()),
            }
        }
        Ok(rendered.join(", "))
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
    use crate::encoder::QpHeaderEncoder;

    fn header() -> MailboxHeader {
        MailboxHeader::new(
            "From",
            Arc::new(QpHeaderEncoder::default()),
            Arc::new(Grammar::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_mailbox_new() {
        let mailbox = Mailbox::new("user@example.com");
        assert_eq!(mailbox.address, "user@example.com");
        assert!(mailbox.name.is_none());
    }

    #[test]
    fn test_mailbox_with_name() {
        let mailbox = Mailbox::with_name("John Doe", "john@example.com");
        assert_eq!(mailbox.name.as_deref(), Some("John Doe"));
        assert_eq!(mailbox.address, "john@example.com");
    }

    #[test]
    fn test_single_address() {
        let mut header = header();
        header.set_mailboxes(vec!["user@example.com".into()]).unwrap();
        assert_eq!(header.field_body().unwrap(), "user@example.com");
        assert_eq!(header.to_wire().unwrap(), "From: user@example.com\r\n");
    }

    #[test]
    fn test_names_and_addresses() {
        let mut header = header();
        header
            .set_mailboxes(vec![
                Mailbox::with_name("John Doe", "john@example.com"),
                Mailbox::with_name("Doe, Jane", "jane@example.com"),
                Mailbox::new("bob@example.com"),
            ])
            .unwrap();
        assert_eq!(
            header.field_body().unwrap(),
            "John Doe <john@example.com>, \"Doe, Jane\" <jane@example.com>, bob@example.com"
        );
        assert_eq!(
            header.addresses(),
            vec!["john@example.com", "jane@example.com", "bob@example.com"]
        );
    }

    #[test]
    fn test_encoded_display_name() {
        let mut header = header();
        header
            .set_mailboxes(vec![Mailbox::with_name("Jöhn Doe", "john@example.com")])
            .unwrap();
        assert_eq!(
            header.field_body().unwrap(),
            "=?utf-8?Q?J=C3=B6hn?= Doe <john@example.com>"
        );
    }

    #[test]
    fn test_invalid_address_rejected() {
        let mut header = header();
        header.set_mailboxes(vec!["ok@example.com".into()]).unwrap();
        let result = header.set_mailboxes(vec!["ok@example.com".into(), "not an address".into()]);
        assert!(matches!(result, Err(Error::InvalidAddress(a)) if a == "not an address"));
        assert_eq!(header.addresses(), vec!["ok@example.com"]);
    }

    #[test]
    fn test_remove_addresses() {
        let mut header = header();
        header
            .set_mailboxes(vec!["a@example.com".into(), "b@example.com".into()])
            .unwrap();
        header.remove_addresses(&["a@example.com"]);
        assert_eq!(header.addresses(), vec!["b@example.com"]);
    }

    #[test]
    fn test_model_mismatch() {
        let mut header = header();
        let result = header.set_field_body_model(FieldBodyModel::Timestamp(Some(0)));
        assert!(matches!(
            result,
            Err(Error::ModelMismatch { expected: HeaderKind::Mailbox, .. })
        ));
    }
}
