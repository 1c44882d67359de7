//! Routing path headers (Return-Path).

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::grammar::Grammar;

use super::{FieldBodyModel, Header, HeaderCore, HeaderKind};

/// A header holding a single address in angle brackets.
#[derive(Debug, Clone)]
pub struct PathHeader {
    core: HeaderCore,
    address: Option<String>,
}

impl PathHeader {
    /// Creates an empty path header.
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
            address: None,
        }
    }

    /// Returns the address; `Some("")` is the null path.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Sets the address. An empty string sets the null path `<>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address is not a valid
    /// `addr-spec`.
    pub fn set_address(&mut self, address: Option<&str>) -> Result<()> {
        if let Some(addr) = address.filter(|a| !a.is_empty()) {
            if !self.core.grammar().is_addr_spec(addr) {
                return Err(Error::InvalidAddress(addr.to_string()));
            }
        }
        self.address = address.map(str::to_string);
        Ok(())
    }
}

impl Header for PathHeader {
    fn core(&self) -> &HeaderCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut HeaderCore {
        &mut self.core
    }

    fn kind(&self) -> HeaderKind {
        HeaderKind::Path
    }

    fn field_body_model(&self) -> FieldBodyModel {
        FieldBodyModel::Path(self.address.clone())
    }

    fn set_field_body_model(&mut self, model: FieldBodyModel) -> Result<()> {
        match model {
            FieldBodyModel::Path(address) => self.set_address(address.as_deref()),
            _ => Err(self.core.mismatch(HeaderKind::Path)),
        }
    }

    fn field_body(&self) -> Result<String> {
        Ok(self
            .address
            .as_ref()
            .map(|addr| format!("<{addr}>"))
            .unwrap_or_default())
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

    fn header() -> PathHeader {
        PathHeader::new("Return-Path", Arc::new(Grammar::new())).unwrap()
    }

    #[test]
    fn test_path() {
        let mut header = header();
        header.set_address(Some("bounce@example.com")).unwrap();
        assert_eq!(header.to_wire().unwrap(), "Return-Path: <bounce@example.com>\r\n");
        assert!(header.header_encoder().is_none());
    }

    #[test]
    fn test_null_path() {
        let mut header = header();
        header.set_address(Some("")).unwrap();
        assert_eq!(header.field_body().unwrap(), "<>");
    }

    #[test]
    fn test_unset_path() {
        let header = header();
        assert_eq!(header.address(), None);
        assert_eq!(header.field_body().unwrap(), "");
    }

    #[test]
    fn test_invalid_path() {
        let mut header = header();
        assert!(matches!(
            header.set_address(Some("not-an-address")),
            Err(Error::InvalidAddress(_))
        ));
        assert_eq!(header.address(), None);
    }
}
