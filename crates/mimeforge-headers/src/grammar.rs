//! RFC 5322 and RFC 2045 grammar rules.
//!
//! Header variants consult these rules when a value is set (to reject
//! malformed addresses and ids) and when rendering (to decide whether a
//! phrase or parameter value can be emitted verbatim, must be quoted, or
//! must be encoded).

/// Characters that are never allowed in an RFC 2045 `token`.
const TSPECIALS: &str = "()<>@,;:\\\"/[]?=";

/// Stateless RFC 5322 / RFC 2045 syntax rules.
///
/// A single instance is shared by every header a factory builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Grammar;

impl Grammar {
    /// Creates the grammar.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Returns true for RFC 5322 `atext`.
    #[must_use]
    pub const fn is_atext(c: char) -> bool {
        c.is_ascii_alphanumeric()
            || matches!(
                c,
                '!' | '#'
                    | '$'
                    | '%'
                    | '&'
                    | '\''
                    | '*'
                    | '+'
                    | '-'
                    | '/'
                    | '='
                    | '?'
                    | '^'
                    | '_'
                    | '`'
                    | '{'
                    | '|'
                    | '}'
                    | '~'
            )
    }

    /// Returns true for RFC 5322 `dtext`.
    const fn is_dtext(c: char) -> bool {
        matches!(c, '!'..='Z' | '^'..='~')
    }

    /// Checks RFC 5322 `dot-atom-text`: atoms separated by single dots.
    #[must_use]
    pub fn is_dot_atom_text(&self, s: &str) -> bool {
        !s.is_empty()
            && s
                .split('.')
                .all(|atom| !atom.is_empty() && atom.chars().all(Self::is_atext))
    }

    /// Checks an RFC 5322 `quoted-string`, including the surrounding quotes.
    #[must_use]
    pub fn is_quoted_string(&self, s: &str) -> bool {
        let Some(inner) = s
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
        else {
            return false;
        };

        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some(escaped) if escaped.is_ascii_graphic() || escaped == ' ' || escaped == '\t' => {}
                    _ => return false,
                },
                '"' => return false,
                ' ' | '\t' => {}
                c if c.is_ascii_graphic() => {}
                _ => return false,
            }
        }
        true
    }

    /// Checks an RFC 5322 `domain-literal` (also `no-fold-literal`).
    #[must_use]
    pub fn is_domain_literal(&self, s: &str) -> bool {
        s.strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .is_some_and(|inner| inner.chars().all(Self::is_dtext))
    }

    /// Checks an RFC 5322 `addr-spec` (`local-part "@" domain`).
    #[must_use]
    pub fn is_addr_spec(&self, s: &str) -> bool {
        let Some((local, domain)) = s.rsplit_once('@') else {
            return false;
        };

        let local_ok = self.is_dot_atom_text(local) || self.is_quoted_string(local);
        let domain_ok = self.is_dot_atom_text(domain) || self.is_domain_literal(domain);
        local_ok && domain_ok
    }

    /// Checks an RFC 5322 `msg-id` without its angle brackets.
    #[must_use]
    pub fn is_msg_id(&self, s: &str) -> bool {
        let Some((left, right)) = s.split_once('@') else {
            return false;
        };

        self.is_dot_atom_text(left)
            && (self.is_dot_atom_text(right) || self.is_domain_literal(right))
    }

    /// Checks an RFC 2045 `token`.
    #[must_use]
    pub fn is_token(&self, s: &str) -> bool {
        !s.is_empty()
            && s
                .chars()
                .all(|c| c.is_ascii_graphic() && !TSPECIALS.contains(c))
    }

    /// Checks an RFC 5322 `phrase` made only of atoms.
    #[must_use]
    pub fn is_phrase(&self, s: &str) -> bool {
        let mut words = s.split([' ', '\t']).filter(|w| !w.is_empty()).peekable();
        words.peek().is_some() && words.all(|w| w.chars().all(Self::is_atext))
    }

    /// Returns true if `s` is printable US-ASCII (WSP allowed).
    #[must_use]
    pub fn is_text(&self, s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_graphic() || c == ' ' || c == '\t')
    }

    /// Checks a header field name (RFC 5322 `ftext`).
    #[must_use]
    pub fn is_field_name(&self, s: &str) -> bool {
        !s.is_empty() && s.chars().all(|c| c.is_ascii_graphic() && c != ':')
    }

    /// Wraps `s` in a quoted-string, escaping backslashes and quotes.
    #[must_use]
    pub fn quote(&self, s: &str) -> String {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('"');
        for c in s.chars() {
            if c == '\\' || c == '"' {
                out.push('\\');
            }
            out.push(c);
        }
        out.push('"');
        out
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
    fn test_dot_atom_text() {
        let g = Grammar::new();
        assert!(g.is_dot_atom_text("john.doe"));
        assert!(g.is_dot_atom_text("a+b=c"));
        assert!(!g.is_dot_atom_text(""));
        assert!(!g.is_dot_atom_text(".john"));
        assert!(!g.is_dot_atom_text("john..doe"));
        assert!(!g.is_dot_atom_text("john doe"));
    }

    #[test]
    fn test_addr_spec() {
        let g = Grammar::new();
        assert!(g.is_addr_spec("user@example.com"));
        assert!(g.is_addr_spec("\"john doe\"@example.com"));
        assert!(g.is_addr_spec("user@[192.168.0.1]"));
        assert!(!g.is_addr_spec("userexample.com"));
        assert!(!g.is_addr_spec("@example.com"));
        assert!(!g.is_addr_spec("user@"));
        assert!(!g.is_addr_spec("us er@example.com"));
        assert!(!g.is_addr_spec("usér@example.com"));
    }

    #[test]
    fn test_msg_id() {
        let g = Grammar::new();
        assert!(g.is_msg_id("abc.123@example.com"));
        assert!(g.is_msg_id("abc@[host]"));
        assert!(!g.is_msg_id("no-at-sign"));
        assert!(!g.is_msg_id("<abc@example.com>"));
        assert!(!g.is_msg_id("a b@example.com"));
    }

    #[test]
    fn test_token() {
        let g = Grammar::new();
        assert!(g.is_token("attachment"));
        assert!(g.is_token("f.txt"));
        assert!(!g.is_token("a b"));
        assert!(!g.is_token("a/b"));
        assert!(!g.is_token("x=y"));
        assert!(!g.is_token(""));
        assert!(!g.is_token("é"));
    }

    #[test]
    fn test_phrase_and_text() {
        let g = Grammar::new();
        assert!(g.is_phrase("John Doe"));
        assert!(!g.is_phrase("Doe, John"));
        assert!(!g.is_phrase(""));
        assert!(g.is_text("Doe, John"));
        assert!(!g.is_text("Jöhn"));
        assert!(!g.is_text("line\r\nbreak"));
    }

    #[test]
    fn test_quote() {
        let g = Grammar::new();
        assert_eq!(g.quote("Doe, John"), "\"Doe, John\"");
        assert_eq!(g.quote("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert!(g.is_quoted_string(&g.quote("a \\ b")));
    }

    #[test]
    fn test_field_name() {
        let g = Grammar::new();
        assert!(g.is_field_name("X-Custom-Header"));
        assert!(!g.is_field_name("Bad Name"));
        assert!(!g.is_field_name("Bad:Name"));
        assert!(!g.is_field_name(""));
    }
}
