//! Parsing and formatting of DICOM date (DA) and time (TM) values.
//!
//! Date arithmetic elsewhere in the suite (query ranges, date shifting)
//! goes through these helpers so the `YYYYMMDD` and `HHMMSS[.FFFFFF]`
//! forms are handled in exactly one place.

use chrono::{NaiveDate, NaiveTime, Timelike};
use snafu::{Backtrace, OptionExt, Snafu};

/// An error raised when a DA or TM value does not parse.
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum DateParseError {
    #[snafu(display("invalid DICOM date `{}`", value))]
    InvalidDate { value: String, backtrace: Backtrace },
    #[snafu(display("invalid DICOM time `{}`", value))]
    InvalidTime { value: String, backtrace: Backtrace },
}

type Result<T> = std::result::Result<T, DateParseError>;

/// Parse a DICOM DA value (`YYYYMMDD`).
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    let v = value.trim();
    snafu::ensure!(
        v.len() == 8 && v.bytes().all(|b| b.is_ascii_digit()),
        InvalidDateSnafu { value }
    );
    let year: i32 = v[0..4].parse().ok().context(InvalidDateSnafu { value })?;
    let month: u32 = v[4..6].parse().ok().context(InvalidDateSnafu { value })?;
    let day: u32 = v[6..8].parse().ok().context(InvalidDateSnafu { value })?;
    NaiveDate::from_ymd_opt(year, month, day).context(InvalidDateSnafu { value })
}

/// Format a date as a DICOM DA value.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Parse a DICOM TM value (`HH`, `HHMM`, `HHMMSS` or `HHMMSS.FFFFFF`).
pub fn parse_time(value: &str) -> Result<NaiveTime> {
    let v = value.trim();
    let (whole, frac) = match v.find('.') {
        Some(i) => (&v[..i], &v[i + 1..]),
        None => (v, ""),
    };
    snafu::ensure!(
        matches!(whole.len(), 2 | 4 | 6) && whole.bytes().all(|b| b.is_ascii_digit()),
        InvalidTimeSnafu { value }
    );
    let hour: u32 = whole[0..2].parse().ok().context(InvalidTimeSnafu { value })?;
    let minute: u32 = if whole.len() >= 4 {
        whole[2..4].parse().ok().context(InvalidTimeSnafu { value })?
    } else {
        0
    };
    let second: u32 = if whole.len() >= 6 {
        whole[4..6].parse().ok().context(InvalidTimeSnafu { value })?
    } else {
        0
    };
    let micros: u32 = if frac.is_empty() {
        0
    } else {
        snafu::ensure!(
            frac.len() <= 6 && frac.bytes().all(|b| b.is_ascii_digit()),
            InvalidTimeSnafu { value }
        );
        let padded = format!("{:0<6}", frac);
        padded.parse().ok().context(InvalidTimeSnafu { value })?
    };
    NaiveTime::from_hms_micro_opt(hour, minute, second, micros).context(InvalidTimeSnafu { value })
}

/// Format a time as a DICOM TM value with seconds precision.
pub fn format_time(time: NaiveTime) -> String {
    format!("{:02}{:02}{:02}", time.hour(), time.minute(), time.second())
}
