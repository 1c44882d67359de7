//! Identifier headers (Message-ID, Content-ID, In-Reply-To, References).

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::grammar::Grammar;

use super::{FieldBodyModel, Header, HeaderCore, HeaderKind};

/// A header holding one or more `msg-id` values.
///
/// Ids are stored without angle brackets and rendered as `<id>` separated
/// by single spaces.
#[derive(Debug, Clone)]
pub struct IdentificationHeader {
    core: HeaderCore,
    ids: Vec<String>,
}

impl IdentificationHeader {
    /// Creates an empty identification header.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid field name.
    pub fn new(name: &str, grammar: Arc<Grammar>) -> Result<Self> {
        Ok(Self::from_core(HeaderCore::new(name, None, grammar)?))
    }

    pub(crate) const fn from_core(core: HeaderCore) -> Self {
        Self {
            core,
            ids: Vec::new(),
        }
    }

    /// Returns the first id.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.ids.first().map(String::as_str)
    }

    /// Returns all ids in order.
    #[must_use]
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Replaces the ids with a single id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] if the id is not a valid `msg-id`.
    pub fn set_id(&mut self, id: impl Into<String>) -> Result<()> {
        self.set_ids(vec![id.into()])
    }

    /// Replaces the ids. A surrounding `<...>` is accepted and stripped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidId`] if any id is not a valid `msg-id`; the
    /// header is left unchanged in that case.
    pub fn set_ids(&mut self, ids: Vec<String>) -> Result<()> {
        let ids = ids
            .into_iter()
            .map(|id| {
                let bare = id
                    .strip_prefix('<')
                    .and_then(|rest| rest.strip_suffix('>'))
                    .unwrap_or(&id);
                if self.core.grammar().is_msg_id(bare) {
                    Ok(bare.to_string())
                } else {
                    Err(Error::InvalidId(id.clone()))
                }
            })
            .collect::<Result<Vec<_>>>()?;

        self.ids = ids;
        Ok(())
    }
}

impl Header for IdentificationHeader {
    fn core(&self) -> &HeaderCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut HeaderCore {
        &mut self.core
    }

    fn kind(&self) -> HeaderKind {
        HeaderKind::Identification
    }

    fn field_body_model(&self) -> FieldBodyModel {
        FieldBodyModel::Ids(self.ids.clone())
    }

    fn set_field_body_model(&mut self, model: FieldBodyModel) -> Result<()> {
        match model {
            FieldBodyModel::Ids(ids) => self.set_ids(ids),
            _ => Err(self.core.mismatch(HeaderKind::Identification)),
        }
    }

    fn field_body(&self) -> Result<String> {
        Ok(self
            .ids
            .iter()
            .map(|id| format!("<{id}>"))
            .collect::<Vec<_>>()
            .join(" "))
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

    fn header(name: &str) -> IdentificationHeader {
        IdentificationHeader::new(name, Arc::new(Grammar::new())).unwrap()
    }

    #[test]
    fn test_single_id() {
        let mut header = header("Message-ID");
        header.set_id("abc.123@example.com").unwrap();
        assert_eq!(header.id(), Some("abc.123@example.com"));
        assert_eq!(
            header.to_wire().unwrap(),
            "Message-ID: <abc.123@example.com>\r\n"
        );
        assert!(header.header_encoder().is_none());
    }

    #[test]
    fn test_multiple_ids() {
        let mut header = header("References");
        header
            .set_ids(vec!["a@example.com".into(), "<b@example.com>".into()])
            .unwrap();
        assert_eq!(header.ids(), ["a@example.com", "b@example.com"]);
        assert_eq!(header.field_body().unwrap(), "<a@example.com> <b@example.com>");
    }

    #[test]
    fn test_invalid_id() {
        let mut header = header("Message-ID");
        header.set_id("good@example.com").unwrap();
        assert!(matches!(header.set_id("no-at-sign"), Err(Error::InvalidId(_))));
        assert!(matches!(header.set_id("ü@example.com"), Err(Error::InvalidId(_))));
        assert_eq!(header.id(), Some("good@example.com"));
    }

    #[test]
    fn test_long_reference_list_folds() {
        let mut header = header("References");
        let ids: Vec<String> = (0..6).map(|i| format!("message-{i}.abcdef@mail.example.com")).collect();
        header.set_ids(ids).unwrap();
        let wire = header.to_wire().unwrap();
        assert!(wire.contains("\r\n <message-"));
        for line in wire.trim_end_matches("\r\n").split("\r\n") {
            assert!(line.len() <= 78);
        }
    }
}
