//! Header variants and the machinery they share.

mod date;
mod identification;
mod mailbox;
mod parameterized;
mod path;
mod unstructured;

pub use date::DateHeader;
pub use identification::IdentificationHeader;
pub use mailbox::{Mailbox, MailboxHeader};
pub use parameterized::ParameterizedHeader;
pub use path::PathHeader;
pub use unstructured::UnstructuredHeader;

use std::sync::Arc;

use crate::encoder::{HeaderEncoder, ParameterEncoder};
use crate::error::{Error, Result};
use crate::grammar::Grammar;

/// Default header line length (RFC 5322 §2.1.1).
pub const DEFAULT_MAX_LINE_LENGTH: usize = 78;

/// Maximum length of an encoded-word line (RFC 2047 §2).
const ENCODED_WORD_MAX_LENGTH: usize = 75;

/// The structurally distinct header categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderKind {
    /// Address lists: From, To, Cc, Reply-To...
    Mailbox,
    /// Date-time fields.
    Date,
    /// Unstructured free text: Subject, Comments...
    Text,
    /// Value with parameters: Content-Type, Content-Disposition...
    Parameterized,
    /// Message identifiers: Message-ID, Content-ID, References...
    Identification,
    /// A single routing address: Return-Path.
    Path,
}

/// Which encoders a header is built with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Wiring {
    /// Attach the RFC 2047 header encoder.
    pub header_encoder: bool,
    /// Attach the RFC 2231 parameter encoder.
    pub parameter_encoder: bool,
}

impl HeaderKind {
    /// Every header kind.
    pub const ALL: [Self; 6] = [
        Self::Mailbox,
        Self::Date,
        Self::Text,
        Self::Parameterized,
        Self::Identification,
        Self::Path,
    ];

    /// Returns the encoder wiring for a header of this kind named `name`.
    ///
    /// Only kinds that can carry human text get the header encoder. Date,
    /// identification and path tokens are restricted by grammar and must
    /// never be charset-encoded.
    #[must_use]
    pub fn wiring(self, name: &str) -> Wiring {
        match self {
            Self::Mailbox | Self::Text => Wiring {
                header_encoder: true,
                parameter_encoder: false,
            },
            // RFC 2231 extended parameters are only emitted for Content-Disposition.
            Self::Parameterized => Wiring {
                header_encoder: true,
                parameter_encoder: name.eq_ignore_ascii_case("content-disposition"),
            },
            Self::Date | Self::Identification | Self::Path => Wiring::default(),
        }
    }
}

/// The structured value a header holds before serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldBodyModel {
    /// Mailbox list.
    Mailboxes(Vec<Mailbox>),
    /// Unix timestamp in seconds.
    Timestamp(Option<i64>),
    /// Free text, or the primary value of a parameterized header.
    Text(String),
    /// Message identifiers without angle brackets.
    Ids(Vec<String>),
    /// Routing address; `Some("")` is the null path.
    Path(Option<String>),
}

impl FieldBodyModel {
    /// Returns true if the model holds no value.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        match self {
            Self::Mailboxes(mailboxes) => mailboxes.is_empty(),
            Self::Timestamp(timestamp) => timestamp.is_none(),
            Self::Text(text) => text.is_empty(),
            Self::Ids(ids) => ids.is_empty(),
            Self::Path(path) => path.is_none(),
        }
    }
}

/// State shared by every header variant: name, charset, language, line
/// length, and the collaborators the header was built with.
#[derive(Debug, Clone)]
pub struct HeaderCore {
    name: String,
    charset: Option<String>,
    encoder_charset: Option<String>,
    language: Option<String>,
    max_line_length: usize,
    encoder: Option<Arc<dyn HeaderEncoder>>,
    grammar: Arc<Grammar>,
}

impl HeaderCore {
    /// Creates the shared state for a header named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeaderName`] if `name` is not a valid field name.
    pub fn new(
        name: &str,
        encoder: Option<Arc<dyn HeaderEncoder>>,
        grammar: Arc<Grammar>,
    ) -> Result<Self> {
        if !grammar.is_field_name(name) {
            return Err(Error::InvalidHeaderName(name.to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            charset: None,
            encoder_charset: encoder.as_ref().map(|e| e.charset()),
            language: None,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            encoder,
            grammar,
        })
    }

    /// Returns the field name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the charset override, if one was set.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Returns the language tag, if one was set.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Returns the maximum line length used when folding.
    #[must_use]
    pub const fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// Returns the header encoder, if the header has one.
    #[must_use]
    pub const fn header_encoder(&self) -> Option<&Arc<dyn HeaderEncoder>> {
        self.encoder.as_ref()
    }

    /// Returns the grammar.
    #[must_use]
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub(crate) fn set_charset(&mut self, charset: &str) {
        self.charset = Some(charset.to_string());
    }

    pub(crate) fn set_language(&mut self, language: Option<&str>) {
        self.language = language.map(str::to_string);
    }

    pub(crate) const fn set_max_line_length(&mut self, max_line_length: usize) {
        self.max_line_length = max_line_length;
    }

    pub(crate) fn mismatch(&self, expected: HeaderKind) -> Error {
        Error::ModelMismatch {
            header: self.name.clone(),
            expected,
        }
    }

    /// Charset to declare for encoded output: the override, else the
    /// encoder charset captured when the header was built.
    pub(crate) fn charset_label(&self) -> String {
        self.charset
            .as_ref()
            .or(self.encoder_charset.as_ref())
            .map_or_else(|| crate::encoder::DEFAULT_CHARSET.to_string(), Clone::clone)
    }

    /// Encodes `token` as one or more RFC 2047 encoded-words joined by
    /// folding whitespace.
    pub(crate) fn encoded_word(&self, token: &str, first_line_offset: usize) -> Result<String> {
        let encoder = self
            .encoder
            .as_ref()
            .ok_or_else(|| Error::MissingEncoder(self.name.clone()))?;

        let charset = self.charset_label();
        let declaration = match &self.language {
            Some(language) => format!("{charset}*{language}"),
            None => charset.clone(),
        };
        let scheme = encoder.name();
        let wrapper_length = "=?".len() + declaration.len() + "?".len() + scheme.len() + "??=".len();

        let first_line_offset = if first_line_offset >= ENCODED_WORD_MAX_LENGTH {
            0
        } else {
            first_line_offset
        };

        let text = encoder.encode(
            token,
            first_line_offset,
            ENCODED_WORD_MAX_LENGTH.saturating_sub(wrapper_length),
            Some(&charset),
        )?;

        Ok(text
            .split("\r\n")
            .map(|line| format!("=?{declaration}?{scheme}?{line}?="))
            .collect::<Vec<_>>()
            .join("\r\n "))
    }

    /// Encodes the words of `input` that cannot appear in a header as-is.
    ///
    /// `used_length` is the space already taken on the first line; `None`
    /// means "the field name plus what has been emitted so far".
    pub(crate) fn encode_words(&self, input: &str, used_length: Option<usize>) -> Result<String> {
        let mut value = String::with_capacity(input.len());
        let mut used_length = used_length;

        for token in encodable_word_tokens(input) {
            if needs_encoding(&token) {
                let mut token = token.as_str();
                if let Some(ws) = token.chars().next().filter(|c| *c == ' ' || *c == '\t') {
                    // Leading whitespace stays outside the encoded-word.
                    value.push(ws);
                    token = &token[1..];
                }
                let used = *used_length.get_or_insert(self.name.len() + 2 + value.len());
                value.push_str(&self.encoded_word(token, used)?);
            } else {
                value.push_str(&token);
            }
        }

        Ok(value)
    }

    /// Renders a display name: an atom phrase verbatim, printable ASCII as
    /// a quoted-string, anything else as encoded-words.
    pub(crate) fn phrase(&self, text: &str, shorten: bool) -> Result<String> {
        if self.grammar.is_phrase(text) {
            return Ok(text.to_string());
        }
        if self.grammar.is_text(text) {
            return Ok(self.grammar.quote(text));
        }

        let used = if shorten { self.name.len() + 2 } else { 0 };
        self.encode_words(text, Some(used))
    }

    /// Folds a field body into `Name: body\r\n` wire form.
    pub(crate) fn fold(&self, body: &str) -> String {
        self.fold_tokens(&body_tokens(body))
    }

    /// Builds folded header lines from pre-split tokens. A `"\r\n"` token
    /// forces a line break; otherwise lines break before a token that
    /// would overflow the maximum line length.
    pub(crate) fn fold_tokens<S: AsRef<str>>(&self, tokens: &[S]) -> String {
        let mut lines = Vec::new();
        let mut current = format!("{}: ", self.name);

        for (i, token) in tokens.iter().enumerate() {
            let token = token.as_ref();
            let forced = token == "\r\n";
            let overflow = i > 0
                && current.len() + token.len() > self.max_line_length
                && !current.is_empty();
            if forced || overflow {
                lines.push(std::mem::take(&mut current));
            }
            if !forced {
                current.push_str(token);
            }
        }
        lines.push(current);

        let mut wire = lines.join("\r\n");
        wire.push_str("\r\n");
        wire
    }
}

/// Returns true if a word must be encoded: it holds control or non-ASCII
/// characters, or text a reader would mistake for an encoded-word.
fn needs_encoding(token: &str) -> bool {
    token.contains("=?")
        || token
            .chars()
            .any(|c| !c.is_ascii() || (c.is_ascii_control() && c != '\t'))
}

/// Splits before every SP or HTAB, so each piece carries its leading
/// whitespace.
pub(crate) fn split_before_whitespace(s: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    for (i, c) in s.char_indices() {
        if (c == ' ' || c == '\t') && i > start {
            tokens.push(&s[start..i]);
            start = i;
        }
    }
    tokens.push(&s[start..]);
    tokens
}

/// Splits a token on CRLF, keeping each CRLF as its own token.
pub(crate) fn split_crlf(token: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = token;
    while let Some(pos) = rest.find("\r\n") {
        if pos > 0 {
            pieces.push(&rest[..pos]);
        }
        pieces.push("\r\n");
        rest = &rest[pos + 2..];
    }
    if !rest.is_empty() || pieces.is_empty() {
        pieces.push(rest);
    }
    pieces
}

/// Tokens used for folding a field body.
pub(crate) fn body_tokens(body: &str) -> Vec<&str> {
    split_before_whitespace(body)
        .into_iter()
        .flat_map(split_crlf)
        .collect()
}

/// Splits `input` into words, merging adjacent words that need encoding so
/// they become a single encoded-word run.
///
/// Whitespace-only tokens after an encodable word join the run: a reader
/// drops whitespace between two encoded-words.
fn encodable_word_tokens(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut pending = String::new();

    for token in split_before_whitespace(input) {
        let blank = token.chars().all(|c| c == ' ' || c == '\t');
        if needs_encoding(token) || (blank && !pending.is_empty()) {
            pending.push_str(token);
        } else {
            if !pending.is_empty() {
                tokens.push(std::mem::take(&mut pending));
            }
            tokens.push(token.to_string());
        }
    }
    if !pending.is_empty() {
        tokens.push(pending);
    }

    tokens
}

/// A MIME header that can render itself to wire form.
///
/// Implementors provide access to their [`HeaderCore`] and their own field
/// body; the rest has default implementations.
pub trait Header: std::fmt::Debug + Send + Sync {
    /// Returns the shared header state.
    fn core(&self) -> &HeaderCore;

    /// Returns the shared header state mutably.
    fn core_mut(&mut self) -> &mut HeaderCore;

    /// Returns the header kind.
    fn kind(&self) -> HeaderKind;

    /// Returns the current field-body model.
    fn field_body_model(&self) -> FieldBodyModel;

    /// Replaces the field-body model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelMismatch`] for a model of the wrong shape, or a
    /// validation error if the value breaks the header's grammar.
    fn set_field_body_model(&mut self, model: FieldBodyModel) -> Result<()>;

    /// Renders the unfolded field body.
    ///
    /// # Errors
    ///
    /// Returns an error if part of the value cannot be encoded.
    fn field_body(&self) -> Result<String>;

    /// Returns the field name.
    fn name(&self) -> &str {
        self.core().name()
    }

    /// Returns the charset override, if one was set.
    fn charset(&self) -> Option<&str> {
        self.core().charset()
    }

    /// Sets the charset used when encoding this header.
    fn set_charset(&mut self, charset: &str) {
        self.core_mut().set_charset(charset);
    }

    /// Returns the language tag, if one was set.
    fn language(&self) -> Option<&str> {
        self.core().language()
    }

    /// Sets the language tag declared in encoded output.
    fn set_language(&mut self, language: Option<&str>) {
        self.core_mut().set_language(language);
    }

    /// Returns the maximum line length used when folding.
    fn max_line_length(&self) -> usize {
        self.core().max_line_length()
    }

    /// Sets the maximum line length used when folding.
    fn set_max_line_length(&mut self, max_line_length: usize) {
        self.core_mut().set_max_line_length(max_line_length);
    }

    /// Returns the header encoder this header was built with.
    fn header_encoder(&self) -> Option<&Arc<dyn HeaderEncoder>> {
        self.core().header_encoder()
    }

    /// Returns the parameter encoder this header was built with.
    fn parameter_encoder(&self) -> Option<&Arc<dyn ParameterEncoder>> {
        None
    }

    /// Serializes the header as folded `Name: body` lines ending in CRLF.
    ///
    /// # Errors
    ///
    /// Returns an error if part of the value cannot be encoded.
    fn to_wire(&self) -> Result<String> {
        Ok(self.core().fold(&self.field_body()?))
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
    use crate::encoder::{Encoder, QpHeaderEncoder};

    fn core(name: &str) -> HeaderCore {
        HeaderCore::new(
            name,
            Some(Arc::new(QpHeaderEncoder::default())),
            Arc::new(Grammar::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_wiring_table() {
        let encoder_only = Wiring {
            header_encoder: true,
            parameter_encoder: false,
        };
        assert_eq!(HeaderKind::Mailbox.wiring("From"), encoder_only);
        assert_eq!(HeaderKind::Text.wiring("Subject"), encoder_only);
        assert_eq!(HeaderKind::Parameterized.wiring("Content-Type"), encoder_only);
        assert!(HeaderKind::Parameterized.wiring("content-DISPOSITION").parameter_encoder);
        for kind in [HeaderKind::Date, HeaderKind::Identification, HeaderKind::Path] {
            assert_eq!(kind.wiring("Content-Disposition"), Wiring::default());
        }
    }

    #[test]
    fn test_invalid_header_name() {
        let result = HeaderCore::new("Bad Name", None, Arc::new(Grammar::new()));
        assert!(matches!(result, Err(Error::InvalidHeaderName(_))));
    }

    #[test]
    fn test_split_before_whitespace() {
        assert_eq!(split_before_whitespace("a b\tc"), vec!["a", " b", "\tc"]);
        assert_eq!(split_before_whitespace(""), vec![""]);
        assert_eq!(split_before_whitespace("a  b"), vec!["a", " ", " b"]);
    }

    #[test]
    fn test_split_crlf() {
        assert_eq!(split_crlf("a\r\n b"), vec!["a", "\r\n", " b"]);
        assert_eq!(split_crlf("plain"), vec!["plain"]);
    }

    #[test]
    fn test_encode_words_only_encodes_what_is_needed() {
        let core = core("Subject");
        assert_eq!(core.encode_words("Hello World", None).unwrap(), "Hello World");
        assert_eq!(
            core.encode_words("Héllo wörld again", None).unwrap(),
            "=?utf-8?Q?H=C3=A9llo_w=C3=B6rld?= again"
        );
        assert_eq!(
            core.encode_words("Say héllo", None).unwrap(),
            "Say =?utf-8?Q?h=C3=A9llo?="
        );
    }

    #[test]
    fn test_encode_words_hides_encoded_word_lookalikes() {
        let core = core("Subject");
        let encoded = core.encode_words("=?x?Q?y?=", None).unwrap();
        assert!(encoded.starts_with("=?utf-8?Q?"));
    }

    #[test]
    fn test_encoded_word_uses_charset_and_language() {
        let mut core = core("Subject");
        core.set_charset("iso-8859-1");
        core.set_language(Some("fr"));
        assert_eq!(core.encoded_word("é", 0).unwrap(), "=?iso-8859-1*fr?Q?=E9?=");
    }

    #[test]
    fn test_encoder_charset_captured_at_construction() {
        let encoder: Arc<dyn HeaderEncoder> = Arc::new(QpHeaderEncoder::default());
        let core = HeaderCore::new("Subject", Some(Arc::clone(&encoder)), Arc::new(Grammar::new())).unwrap();
        encoder.charset_changed("iso-8859-1");

        assert_eq!(core.charset(), None);
        assert_eq!(core.charset_label(), "utf-8");
        assert_eq!(core.encoded_word("é", 0).unwrap(), "=?utf-8?Q?=C3=A9?=");
    }

    #[test]
    fn test_encoded_word_without_encoder() {
        let core = HeaderCore::new("Date", None, Arc::new(Grammar::new())).unwrap();
        assert!(matches!(
            core.encoded_word("é", 0),
            Err(Error::MissingEncoder(_))
        ));
    }

    #[test]
    fn test_phrase() {
        let core = core("From");
        assert_eq!(core.phrase("John Doe", true).unwrap(), "John Doe");
        assert_eq!(core.phrase("Doe, John", true).unwrap(), "\"Doe, John\"");
        assert_eq!(core.phrase("Jöhn", true).unwrap(), "=?utf-8?Q?J=C3=B6hn?=");
    }

    #[test]
    fn test_fold() {
        let mut core = core("Subject");
        core.set_max_line_length(20);
        assert_eq!(core.fold("short"), "Subject: short\r\n");
        assert_eq!(
            core.fold("one two three four"),
            "Subject: one two\r\n three four\r\n"
        );
        assert_eq!(core.fold("a\r\n b"), "Subject: a\r\n b\r\n");
    }

    #[test]
    fn test_field_body_model_is_unset() {
        assert!(FieldBodyModel::Mailboxes(Vec::new()).is_unset());
        assert!(FieldBodyModel::Timestamp(None).is_unset());
        assert!(!FieldBodyModel::Timestamp(Some(0)).is_unset());
        assert!(FieldBodyModel::Text(String::new()).is_unset());
        assert!(!FieldBodyModel::Path(Some(String::new())).is_unset());
    }
}
