//! Date-time headers (Date, Resent-Date).

use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, Offset, Utc};

use crate::error::{Error, Result};
use crate::grammar::Grammar;

use super::{FieldBodyModel, Header, HeaderCore, HeaderKind};

/// Years an RFC 5322 `date-time` can hold (four-digit `year`).
const YEARS: std::ops::RangeInclusive<i32> = 0..=9999;

/// A header holding a Unix timestamp, rendered as an RFC 5322 date-time.
///
/// Date headers are never built with a header encoder: the date-time
/// grammar is pure ASCII.
#[derive(Debug, Clone)]
pub struct DateHeader {
    core: HeaderCore,
    timestamp: Option<i64>,
    offset: FixedOffset,
}

impl DateHeader {
    /// Creates an empty date header.
    ///
    /// # Errors
    ///
    /// Returns an error if `name` is not a valid field name.
    pub fn new(name: &str, grammar: Arc<Grammar>) -> Result<Self> {
        Ok(Self::from_core(HeaderCore::new(name, None, grammar)?))
    }

    pub(crate) fn from_core(core: HeaderCore) -> Self {
        Self {
            core,
            timestamp: None,
            offset: Utc.fix(),
        }
    }

    /// Returns the timestamp in seconds since the Unix epoch.
    #[must_use]
    pub const fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    /// Sets the timestamp in seconds since the Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDate`] if the timestamp falls outside the
    /// four-digit years an RFC 5322 date can hold.
    pub fn set_timestamp(&mut self, timestamp: Option<i64>) -> Result<()> {
        if let Some(ts) = timestamp {
            Self::date_time(ts)?;
        }
        self.timestamp = timestamp;
        Ok(())
    }

    /// Returns the UTC offset the date is rendered in.
    #[must_use]
    pub const fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Sets the UTC offset the date is rendered in.
    pub const fn set_offset(&mut self, offset: FixedOffset) {
        self.offset = offset;
    }

    fn date_time(timestamp: i64) -> Result<DateTime<Utc>> {
        DateTime::from_timestamp(timestamp, 0)
            .filter(|dt| YEARS.contains(&dt.year()))
            .ok_or(Error::InvalidDate(timestamp))
    }
}

impl Header for DateHeader {
    fn core(&self) -> &HeaderCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut HeaderCore {
        &mut self.core
    }

    fn kind(&self) -> HeaderKind {
        HeaderKind::Date
    }

    fn field_body_model(&self) -> FieldBodyModel {
        FieldBodyModel::Timestamp(self.timestamp)
    }

    fn set_field_body_model(&mut self, model: FieldBodyModel) -> Result<()> {
        match model {
            FieldBodyModel::Timestamp(timestamp) => self.set_timestamp(timestamp),
            _ => Err(self.core.mismatch(HeaderKind::Date)),
        }
    }

    fn field_body(&self) -> Result<String> {
        let Some(ts) = self.timestamp else {
            return Ok(String::new());
        };

        // The offset can still push a boundary date into year -1 or 10000.
        let local = Self::date_time(ts)?.with_timezone(&self.offset);
        if !YEARS.contains(&local.year()) {
            return Err(Error::InvalidDate(ts));
        }
        Ok(local.to_rfc2822())
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

    fn header() -> DateHeader {
        DateHeader::new("Date", Arc::new(Grammar::new())).unwrap()
    }

    #[test]
    fn test_unset_date() {
        let header = header();
        assert_eq!(header.timestamp(), None);
        assert_eq!(header.field_body().unwrap(), "");
        assert!(header.header_encoder().is_none());
    }

    #[test]
    fn test_rfc2822_format() {
        let mut header = header();
        header.set_timestamp(Some(1700000000)).unwrap();
        assert_eq!(header.field_body().unwrap(), "Tue, 14 Nov 2023 22:13:20 +0000");
        assert_eq!(
            header.to_wire().unwrap(),
            "Date: Tue, 14 Nov 2023 22:13:20 +0000\r\n"
        );
    }

    #[test]
    fn test_offset() {
        let mut header = header();
        header.set_timestamp(Some(1700000000)).unwrap();
        header.set_offset(FixedOffset::east_opt(3600).unwrap());
        assert_eq!(header.field_body().unwrap(), "Tue, 14 Nov 2023 23:13:20 +0100");
    }

    #[test]
    fn test_out_of_range() {
        let mut header = header();
        header.set_timestamp(Some(1)).unwrap();
        assert!(matches!(
            header.set_timestamp(Some(i64::MAX)),
            Err(Error::InvalidDate(i64::MAX))
        ));
        assert_eq!(header.timestamp(), Some(1));
    }

    #[test]
    fn test_years_outside_four_digits() {
        let mut header = header();
        header.set_timestamp(Some(1700000000)).unwrap();
        for ts in [300_000_000_000, -100_000_000_000] {
            assert!(matches!(
                header.set_timestamp(Some(ts)),
                Err(Error::InvalidDate(t)) if t == ts
            ));
        }
        assert_eq!(header.timestamp(), Some(1700000000));
    }

    #[test]
    fn test_offset_past_year_9999() {
        let mut header = header();
        // 9999-12-31T23:59:59Z
        header.set_timestamp(Some(253_402_300_799)).unwrap();
        assert_eq!(header.field_body().unwrap(), "Fri, 31 Dec 9999 23:59:59 +0000");

        header.set_offset(FixedOffset::east_opt(3600).unwrap());
        assert!(matches!(header.field_body(), Err(Error::InvalidDate(_))));
    }

    #[test]
    fn test_model_round_trip() {
        let mut header = header();
        header
            .set_field_body_model(FieldBodyModel::Timestamp(Some(1700000000)))
            .unwrap();
        assert_eq!(header.field_body_model(), FieldBodyModel::Timestamp(Some(1700000000)));
        assert!(header
            .set_field_body_model(FieldBodyModel::Text("now".into()))
            .is_err());
    }
}
