//! Rendering of log records into lines.

use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

use crate::dispatch::Level;

/// Turns a record into the line handed to the dispatcher.
pub trait Formatter: Send + Sync {
    fn format(
        &self,
        now: OffsetDateTime,
        level: Level,
        correlation_id: &str,
        event: &str,
        message: &str,
    ) -> String;
}

/// `time>level>id>event>message\n`, with millisecond timestamps.
#[derive(Debug, Clone)]
pub struct SimpleFormatter {
    separator: String,
    offset: UtcOffset,
}

impl Default for SimpleFormatter {
    fn default() -> Self {
        Self {
            separator: ">".to_string(),
            offset: UtcOffset::UTC,
        }
    }
}

impl SimpleFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn utc_offset(mut self, offset: UtcOffset) -> Self {
        self.offset = offset;
        self
    }
}

impl Formatter for SimpleFormatter {
    fn format(
        &self,
        now: OffsetDateTime,
        level: Level,
        correlation_id: &str,
        event: &str,
        message: &str,
    ) -> String {
        let now = now.to_offset(self.offset);
        let time = now
            .format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
            ))
            .unwrap_or_else(|_| now.to_string());
        let sep = &self.separator;
        format!("{time}{sep}{level}{sep}{correlation_id}{sep}{event}{sep}{message}\n")
    }
}
