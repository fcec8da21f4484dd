//! Conversion of human supplied dates to unix timestamps.

use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    Format(String),

    #[error("Midnight of {0} does not exist in the local time zone")]
    Nonexistent(NaiveDate),
}

/// Time zone in which a bare calendar date is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DateZone {
    #[default]
    Utc,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateInput<'a> {
    Calendar(NaiveDate),
    Text(&'a str),
}

impl From<NaiveDate> for DateInput<'_> {
    fn from(date: NaiveDate) -> Self {
        DateInput::Calendar(date)
    }
}

impl<'a> From<&'a str> for DateInput<'a> {
    fn from(text: &'a str) -> Self {
        DateInput::Text(text)
    }
}

/// Parses a strict `YYYY-MM-DD` date. Unpadded months or days are rejected.
pub fn parse_date(text: &str) -> Result<NaiveDate, TimestampError> {
    let bytes = text.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(TimestampError::Format(text.to_string()));
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|_| TimestampError::Format(text.to_string()))
}

/// Converts `date` to the epoch seconds of its midnight in `zone`.
/// An absent date is not an error and yields `None`.
pub fn convert_to_timestamp(
    date: Option<DateInput<'_>>,
    zone: DateZone,
) -> Result<Option<i64>, TimestampError> {
    let date = match date {
        None => return Ok(None),
        Some(DateInput::Calendar(date)) => date,
        Some(DateInput::Text(text)) => parse_date(text)?,
    };
    let midnight: NaiveDateTime = date.and_time(chrono::NaiveTime::MIN);
    let timestamp = match zone {
        DateZone::Utc => Utc.from_utc_datetime(&midnight).timestamp(),
        DateZone::Local => Local
            .from_local_datetime(&midnight)
            .earliest()
            .ok_or(TimestampError::Nonexistent(date))?
            .timestamp(),
    };
    Ok(Some(timestamp))
}
