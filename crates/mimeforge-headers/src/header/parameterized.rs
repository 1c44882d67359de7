//! Headers with a primary value and `; name=value` parameters
//! (Content-Type, Content-Disposition).

use std::sync::Arc;

use crate::encoder::{HeaderEncoder, ParameterEncoder};
use crate::error::{Error, Result};
use crate::grammar::Grammar;

use super::{FieldBodyModel, Header, HeaderCore, HeaderKind, body_tokens, split_crlf};

/// A header with a primary value and ordered parameters.
///
/// Parameters keep insertion order. Setting a parameter whose name matches
/// an existing one (ignoring ASCII case) replaces it in place.
#[derive(Debug, Clone)]
pub struct ParameterizedHeader {
    core: HeaderCore,
    param_encoder: Option<Arc<dyn ParameterEncoder>>,
    param_charset: Option<String>,
    value: String,
    params: Vec<(String, String)>,
}

impl ParameterizedHeader {
    /// Creates an empty parameterized header.
    ///
    /// Without a parameter encoder, values that need encoding are emitted
    /// as quoted RFC 2047 encoded-words instead of RFC 2231 extended values.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid field name.
    pub fn new(
        name: &str,
        encoder: Arc<dyn HeaderEncoder>,
        param_encoder: Option<Arc<dyn ParameterEncoder>>,
        grammar: Arc<Grammar>,
    ) -> Result<Self> {
        Ok(Self::from_core(
            HeaderCore::new(name, Some(encoder), grammar)?,
            param_encoder,
        ))
    }

    pub(crate) fn from_core(
        core: HeaderCore,
        param_encoder: Option<Arc<dyn ParameterEncoder>>,
    ) -> Self {
        Self {
            core,
            param_charset: param_encoder.as_ref().map(|e| e.charset()),
            param_encoder,
            value: String::new(),
            params: Vec::new(),
        }
    }

    /// Returns the primary value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Sets the primary value.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// Sets a parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if `name` is not an RFC 2045 token.
    pub fn set_parameter(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        if !self.core.grammar().is_token(name) {
            return Err(Error::InvalidParameter(name.to_string()));
        }

        let value = value.into();
        match self
            .params
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
        {
            Some((_, slot)) => *slot = value,
            None => self.params.push((name.to_string(), value)),
        }
        Ok(())
    }

    /// Returns a parameter value by name (ASCII case-insensitive).
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the parameters in insertion order.
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Removes a parameter by name (ASCII case-insensitive).
    pub fn remove_parameter(&mut self, name: &str) {
        self.params
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
    }

    /// Charset declared in extended parameter values.
    fn parameter_charset(&self) -> String {
        match (self.core.charset(), &self.param_charset) {
            (None, Some(captured)) => captured.clone(),
            _ => self.core.charset_label(),
        }
    }

    /// Renders one `name=value` parameter, possibly as RFC 2231
    /// continuations joined with `;` and folding whitespace.
    fn render_parameter(&self, name: &str, value: &str) -> Result<String> {
        let grammar = self.core.grammar();
        let max_line_length = self.core.max_line_length();
        let charset = self.parameter_charset();
        let language = self.core.language().unwrap_or("");

        // Room for the name, section index, "=" and quotes.
        let mut max_value_length = max_line_length.saturating_sub(name.len() + "=*N\"\";".len() + 1);
        let mut first_line_offset = 0;
        let mut extended = false;

        let needs_extended = value
            .chars()
            .any(|c| !c.is_ascii() || (c.is_ascii_control() && c != '\t'));
        if !grammar.is_token(value) && needs_extended {
            extended = true;
            max_value_length = max_line_length.saturating_sub(name.len() + "*N*=\"\";".len() + 1);
            first_line_offset = charset.len() + language.len() + 2;
        }

        let lines: Vec<String> = if extended || value.len() > max_value_length {
            if let Some(encoder) = &self.param_encoder {
                extended = true;
                encoder
                    .encode(value, first_line_offset, max_value_length, Some(&charset))?
                    .split("\r\n")
                    .map(str::to_string)
                    .collect()
            } else {
                // Interoperability fallback: a quoted encoded-word.
                extended = false;
                vec![self.core.encoded_word(value, 0)?]
            }
        } else {
            vec![value.to_string()]
        };

        let end_of_value = |line: &str, first: bool| -> String {
            let line = if grammar.is_token(line) {
                line.to_string()
            } else {
                grammar.quote(line)
            };
            match (extended, first) {
                (true, true) => format!("*={charset}'{language}'{line}"),
                (true, false) => format!("*={line}"),
                (false, _) => format!("={line}"),
            }
        };

        if lines.len() > 1 {
            Ok(lines
                .iter()
                .enumerate()
                .map(|(i, line)| format!("{name}*{i}{}", end_of_value(line, i == 0)))
                .collect::<Vec<_>>()
                .join(";\r\n "))
        } else {
            let line = lines.first().map_or("", String::as_str);
            Ok(format!("{name}{}", end_of_value(line, true)))
        }
    }
}

impl Header for ParameterizedHeader {
    fn core(&self) -> &HeaderCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut HeaderCore {
        &mut self.core
    }

    fn kind(&self) -> HeaderKind {
        HeaderKind::Parameterized
    }

    fn parameter_encoder(&self) -> Option<&Arc<dyn ParameterEncoder>> {
        self.param_encoder.as_ref()
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
            _ => Err(self.core.mismatch(HeaderKind::Parameterized)),
        }
    }

    fn field_body(&self) -> Result<String> {
        let mut body = self.core.encode_words(&self.value, None)?;
        for (name, value) in &self.params {
            body.push_str("; ");
            body.push_str(&self.render_parameter(name, value)?);
        }
        Ok(body)
    }

    /// Folds between parameters, never inside one.
    fn to_wire(&self) -> Result<String> {
        let value = self.core.encode_words(&self.value, None)?;
        let mut tokens: Vec<String> = body_tokens(&value).into_iter().map(str::to_string).collect();

        for (name, value) in &self.params {
            if let Some(last) = tokens.last_mut() {
                last.push(';');
            }
            let rendered = format!(" {}", self.render_parameter(name, value)?);
            tokens.extend(split_crlf(&rendered).into_iter().map(str::to_string));
        }

        Ok(self.core.fold_tokens(&tokens))
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
    use crate::encoder::{Encoder, QpHeaderEncoder, Rfc2231Encoder};

    fn header(name: &str, with_param_encoder: bool) -> ParameterizedHeader {
        let param_encoder: Option<Arc<dyn ParameterEncoder>> = if with_param_encoder {
            Some(Arc::new(Rfc2231Encoder::default()))
        } else {
            None
        };
        ParameterizedHeader::new(
            name,
            Arc::new(QpHeaderEncoder::default()),
            param_encoder,
            Arc::new(Grammar::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_value_and_parameters() {
        let mut header = header("Content-Type", false);
        header.set_value("text/plain");
        header.set_parameter("charset", "utf-8").unwrap();
        header.set_parameter("format", "flowed").unwrap();
        assert_eq!(
            header.to_wire().unwrap(),
            "Content-Type: text/plain; charset=utf-8; format=flowed\r\n"
        );
    }

    #[test]
    fn test_parameter_order_and_replacement() {
        let mut header = header("Content-Type", false);
        header.set_value("multipart/mixed");
        header.set_parameter("b", "1").unwrap();
        header.set_parameter("a", "2").unwrap();
        header.set_parameter("B", "3").unwrap();
        assert_eq!(
            header.parameters().collect::<Vec<_>>(),
            vec![("b", "3"), ("a", "2")]
        );
        assert_eq!(header.parameter("A"), Some("2"));

        header.remove_parameter("b");
        assert_eq!(header.parameters().count(), 1);
    }

    #[test]
    fn test_invalid_parameter_name() {
        let mut header = header("Content-Type", false);
        assert!(matches!(
            header.set_parameter("bad name", "x"),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_quoted_ascii_value() {
        let mut header = header("Content-Disposition", true);
        header.set_value("attachment");
        header.set_parameter("filename", "my file.txt").unwrap();
        assert_eq!(
            header.field_body().unwrap(),
            "attachment; filename=\"my file.txt\""
        );
    }

    #[test]
    fn test_rfc2231_extended_value() {
        let mut header = header("Content-Disposition", true);
        header.set_value("attachment");
        header.set_parameter("filename", "résumé.pdf").unwrap();
        assert_eq!(
            header.field_body().unwrap(),
            "attachment; filename*=utf-8''r%C3%A9sum%C3%A9.pdf"
        );
    }

    #[test]
    fn test_rfc2231_language_and_charset() {
        let mut header = header("Content-Disposition", true);
        header.set_value("attachment");
        header.set_parameter("filename", "é.txt").unwrap();
        header.set_charset("iso-8859-1");
        header.set_language(Some("fr"));
        assert_eq!(
            header.field_body().unwrap(),
            "attachment; filename*=iso-8859-1'fr'%E9.txt"
        );
    }

    #[test]
    fn test_rfc2231_continuations() {
        let mut header = header("Content-Disposition", true);
        header.set_value("attachment");
        let name = format!("{}.txt", "é".repeat(30));
        header.set_parameter("filename", name).unwrap();

        let body = header.field_body().unwrap();
        assert!(body.starts_with("attachment; filename*0*=utf-8''%C3%A9"));
        assert!(body.contains(";\r\n filename*1*=%C3%A9"));

        let wire = header.to_wire().unwrap();
        for line in wire.trim_end_matches("\r\n").split("\r\n") {
            assert!(line.len() <= 78, "line too long: {line}");
        }
    }

    #[test]
    fn test_without_parameter_encoder_uses_encoded_word() {
        let mut header = header("Content-Type", false);
        header.set_value("text/plain");
        header.set_parameter("name", "résumé.pdf").unwrap();
        assert_eq!(
            header.field_body().unwrap(),
            "text/plain; name=\"=?utf-8?Q?r=C3=A9sum=C3=A9=2Epdf?=\""
        );
        assert!(header.parameter_encoder().is_none());
    }

    #[test]
    fn test_control_characters_use_extended_value() {
        let mut header = header("Content-Disposition", true);
        header.set_value("attachment");
        header.set_parameter("filename", "a\x07b.txt").unwrap();
        assert_eq!(
            header.field_body().unwrap(),
            "attachment; filename*=utf-8''a%07b.txt"
        );
    }

    #[test]
    fn test_parameter_charset_captured_at_construction() {
        let encoder: Arc<dyn ParameterEncoder> = Arc::new(Rfc2231Encoder::default());
        let mut header = ParameterizedHeader::new(
            "Content-Disposition",
            Arc::new(QpHeaderEncoder::default()),
            Some(Arc::clone(&encoder)),
            Arc::new(Grammar::new()),
        )
        .unwrap();
        header.set_value("attachment");
        header.set_parameter("filename", "é.txt").unwrap();

        encoder.charset_changed("iso-8859-1");
        assert_eq!(
            header.field_body().unwrap(),
            "attachment; filename*=utf-8''%C3%A9.txt"
        );
    }

    #[test]
    fn test_folds_between_parameters() {
        let mut header = header("Content-Type", false);
        header.set_value("multipart/alternative");
        header
            .set_parameter("boundary", "----=_Part_0123456789_abcdefghijklmnop")
            .unwrap();
        header.set_parameter("charset", "utf-8").unwrap();
        assert_eq!(
            header.to_wire().unwrap(),
            "Content-Type: multipart/alternative;\r\n boundary=\"----=_Part_0123456789_abcdefghijklmnop\"; charset=utf-8\r\n"
        );
    }
}
