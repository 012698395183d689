//! Time bucket granularity.
//!
//! A granularity fixes two coupled constants: the textual pattern a bucket
//! is rendered with and the exact length of that rendering. Every pattern
//! is a prefix of the second-level one (`YYYY-MM-DD-HH-MM-SS`), which keeps
//! lexical and chronological order identical within one granularity.

use std::fmt;
use std::str::FromStr;

use time::macros::format_description;
use time::{Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::naming::DecodeError;
use crate::{Error, Result};

/// Zero fill appended to a coarse bucket so it parses with the full pattern.
const BUCKET_PAD: &str = "-00-00-00";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Granularity {
    Second,
    Minute,
    Hour,
    #[default]
    Day,
}

impl Granularity {
    /// Length in characters of a rendered bucket.
    pub const fn rendered_len(self) -> usize {
        match self {
            Granularity::Day => 10,
            Granularity::Hour => 13,
            Granularity::Minute => 16,
            Granularity::Second => 19,
        }
    }

    /// Span of time a single bucket covers.
    pub fn interval(self) -> Duration {
        match self {
            Granularity::Day => Duration::DAY,
            Granularity::Hour => Duration::HOUR,
            Granularity::Minute => Duration::MINUTE,
            Granularity::Second => Duration::SECOND,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Hour => "hour",
            Granularity::Minute => "minute",
            Granularity::Second => "second",
        }
    }

    /// Render the bucket containing `at`, as seen from `offset`.
    pub fn render(self, at: OffsetDateTime, offset: UtcOffset) -> Result<String> {
        let local = at.to_offset(offset);
        let rendered = match self {
            Granularity::Day => local.format(format_description!("[year]-[month]-[day]")),
            Granularity::Hour => {
                local.format(format_description!("[year]-[month]-[day]-[hour]"))
            }
            Granularity::Minute => {
                local.format(format_description!("[year]-[month]-[day]-[hour]-[minute]"))
            }
            Granularity::Second => local.format(format_description!(
                "[year]-[month]-[day]-[hour]-[minute]-[second]"
            )),
        };
        Ok(rendered?)
    }

    /// Parse a rendered bucket back into the instant the bucket starts at.
    pub fn parse(self, bucket: &str, offset: UtcOffset) -> std::result::Result<OffsetDateTime, DecodeError> {
        let expected = self.rendered_len();
        if bucket.len() != expected {
            return Err(DecodeError::LengthMismatch {
                expected,
                actual: bucket.len(),
            });
        }
        let pad_from = expected - Granularity::Day.rendered_len();
        let padded = format!("{bucket}{}", &BUCKET_PAD[pad_from..]);
        let parsed = PrimitiveDateTime::parse(
            &padded,
            format_description!("[year]-[month]-[day]-[hour]-[minute]-[second]"),
        )?;
        Ok(parsed.assume_offset(offset))
    }

    /// Start of the bucket containing `at`, expressed in `offset`.
    pub fn truncate(self, at: OffsetDateTime, offset: UtcOffset) -> Result<OffsetDateTime> {
        let local = at.to_offset(offset);
        let time = match self {
            Granularity::Day => Time::MIDNIGHT,
            Granularity::Hour => Time::from_hms(local.hour(), 0, 0)?,
            Granularity::Minute => Time::from_hms(local.hour(), local.minute(), 0)?,
            Granularity::Second => {
                Time::from_hms(local.hour(), local.minute(), local.second())?
            }
        };
        Ok(local.replace_time(time))
    }

    /// Check that rendering `now` yields exactly `rendered_len` characters.
    ///
    /// Run once when a rotator is built; a mismatch means filenames could not
    /// be decoded again, so it is reported as a configuration error.
    pub fn verify(self, now: OffsetDateTime, offset: UtcOffset) -> Result<()> {
        let rendered = self.render(now, offset)?;
        if rendered.len() != self.rendered_len() {
            return Err(Error::Config(format!(
                "{} bucket renders as {rendered:?} ({} chars), expected {}",
                self,
                rendered.len(),
                self.rendered_len()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "day" | "d" => Ok(Granularity::Day),
            "hour" | "h" => Ok(Granularity::Hour),
            "minute" | "m" => Ok(Granularity::Minute),
            "second" | "s" => Ok(Granularity::Second),
            _ => Err(Error::Config(format!("unknown granularity: {s}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    const ALL: [Granularity; 4] = [
        Granularity::Second,
        Granularity::Minute,
        Granularity::Hour,
        Granularity::Day,
    ];

    #[test]
    fn render_matches_declared_length() {
        let at = datetime!(2024-01-29 07:08:09.123 UTC);
        assert_eq!(Granularity::Day.render(at, UtcOffset::UTC).unwrap(), "2024-01-29");
        assert_eq!(Granularity::Hour.render(at, UtcOffset::UTC).unwrap(), "2024-01-29-07");
        assert_eq!(
            Granularity::Minute.render(at, UtcOffset::UTC).unwrap(),
            "2024-01-29-07-08"
        );
        assert_eq!(
            Granularity::Second.render(at, UtcOffset::UTC).unwrap(),
            "2024-01-29-07-08-09"
        );
        for granularity in ALL {
            granularity.verify(at, UtcOffset::UTC).unwrap();
        }
    }

    #[test]
    fn render_uses_offset() {
        let at = datetime!(2024-01-29 20:30:00 UTC);
        let rendered = Granularity::Day.render(at, offset!(+8)).unwrap();
        assert_eq!(rendered, "2024-01-30");
    }

    #[test]
    fn parse_returns_bucket_start() {
        let parsed = Granularity::Hour.parse("2024-01-29-07", UtcOffset::UTC).unwrap();
        assert_eq!(parsed, datetime!(2024-01-29 07:00:00 UTC));

        let parsed = Granularity::Day.parse("2024-01-29", offset!(+8)).unwrap();
        assert_eq!(parsed, datetime!(2024-01-29 00:00:00 +8));
    }

    #[test]
    fn parse_rejects_wrong_length() {
        let err = Granularity::Day.parse("2024-01-29-07", UtcOffset::UTC).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::LengthMismatch {
                expected: 10,
                actual: 13
            }
        ));
    }

    #[test]
    fn parse_rejects_malformed_date() {
        let err = Granularity::Day.parse("2024-13-45", UtcOffset::UTC).unwrap_err();
        assert!(matches!(err, DecodeError::Parse(_)));
    }

    #[test]
    fn truncate_agrees_with_render_and_parse() {
        let at = datetime!(2024-02-29 23:59:58.999 UTC);
        for granularity in ALL {
            let truncated = granularity.truncate(at, offset!(-5)).unwrap();
            let rendered = granularity.render(at, offset!(-5)).unwrap();
            assert_eq!(granularity.parse(&rendered, offset!(-5)).unwrap(), truncated);
        }
    }

    #[test]
    fn granularity_from_str() {
        assert_eq!("d".parse::<Granularity>().unwrap(), Granularity::Day);
        assert_eq!("hour".parse::<Granularity>().unwrap(), Granularity::Hour);
        assert_eq!("m".parse::<Granularity>().unwrap(), Granularity::Minute);
        assert_eq!("second".parse::<Granularity>().unwrap(), Granularity::Second);
        assert!(matches!("week".parse::<Granularity>(), Err(Error::Config(_))));
    }
}
