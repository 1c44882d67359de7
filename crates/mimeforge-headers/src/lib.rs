//! # mimeforge-headers
//!
//! Structured MIME header construction with charset-aware encoding.
//!
//! ## Features
//!
//! - **Header factory**: One entry point per header kind (mailbox, date,
//!   text, parameterized, identification, path)
//! - **Encoder wiring**: Only kinds that carry human text get the RFC 2047
//!   encoder; only `Content-Disposition` gets the RFC 2231 parameter encoder
//! - **Charset propagation**: Charset changes reach the shared encoders and
//!   every header built afterwards
//! - **Isolation**: Cloning a factory deep-copies its encoders
//! - **Wire output**: Grammar-valid, folded `Name: body` lines
//!
//! ## Quick Start
//!
//! ### Building Headers
//!
//! ```ignore
//! use mimeforge_headers::{Header, HeaderFactory, Mailbox};
//!
//! let factory = HeaderFactory::default();
//!
//! let from = factory.create_mailbox_header(
//!     "From",
//!     Some(vec![Mailbox::with_name("Jöhn Doe", "john@example.com")]),
//! )?;
//! print!("{}", from.to_wire()?);
//! // From: =?utf-8?Q?J=C3=B6hn?= Doe <john@example.com>
//!
//! let disposition = factory.create_parameterized_header(
//!     "Content-Disposition",
//!     Some("attachment"),
//!     &[("filename", "résumé.pdf")],
//! )?;
//! print!("{}", disposition.to_wire()?);
//! // Content-Disposition: attachment; filename*=utf-8''r%C3%A9sum%C3%A9.pdf
//! ```
//!
//! ### Changing the Charset
//!
//! ```ignore
//! use mimeforge_headers::{Header, HeaderFactory};
//!
//! let mut factory = HeaderFactory::default();
//! let before = factory.create_text_header("Subject", Some("café"))?;
//!
//! factory.charset_changed("iso-8859-1");
//! let after = factory.create_text_header("Subject", Some("café"))?;
//!
//! assert_eq!(before.charset(), None);
//! assert_eq!(after.charset(), Some("iso-8859-1"));
//! ```
//!
//! ### Collecting Headers
//!
//! ```ignore
//! use mimeforge_headers::{Config, HeaderEncoding, HeaderFactory, HeaderSet};
//!
//! let config = Config::builder()
//!     .header_encoding(HeaderEncoding::Base64)
//!     .build();
//! let mut headers = HeaderSet::new(HeaderFactory::from_config(&config));
//! headers.add_mailbox("To", vec!["bob@example.com".into()])?;
//! headers.add_text("Subject", "Grüße")?;
//! headers.add_date("Date", 1_700_000_000)?;
//! print!("{}", headers.to_wire()?);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod factory;
mod grammar;
mod header;
mod set;

pub mod encoder;
pub mod encoding;

pub use config::{Config, ConfigBuilder, HeaderEncoding};
pub use encoder::{Encoder, HeaderEncoder, ParameterEncoder};
pub use error::{Error, Result};
pub use factory::HeaderFactory;
pub use grammar::Grammar;
pub use header::{
    DEFAULT_MAX_LINE_LENGTH, DateHeader, FieldBodyModel, Header, HeaderCore, HeaderKind,
    IdentificationHeader, Mailbox, MailboxHeader, ParameterizedHeader, PathHeader,
    UnstructuredHeader, Wiring,
};
pub use set::HeaderSet;
