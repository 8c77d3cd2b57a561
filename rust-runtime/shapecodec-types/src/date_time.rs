/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Timestamp type and the three wire formats a timestamp may take.

use std::cmp::Ordering;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

mod format;

pub use self::format::{DateTimeFormatError, DateTimeParseError};

pub(crate) const NANOS_PER_SECOND: u32 = 1_000_000_000;
const NANOS_PER_MICRO: u32 = 1_000;

/// A point in time, stored as whole seconds since the Unix epoch plus subsecond nanoseconds.
///
/// `seconds` is floored, so `-1.5` is stored as `seconds = -2, subsecond_nanos = 500_000_000`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct DateTime {
    seconds: i64,
    subsecond_nanos: u32,
}

/// Wire representation of a timestamp.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Format {
    /// RFC 3339 date-time, e.g. `2019-12-16T23:48:18.52Z`
    DateTime,
    /// IMF-fixdate, e.g. `Mon, 16 Dec 2019 23:48:18 GMT`
    HttpDate,
    /// Seconds since the epoch with an optional fraction, e.g. `1576540098.52`
    EpochSeconds,
}

impl Format {
    /// The Smithy `timestampFormat` trait value for this format.
    pub fn trait_value(self) -> &'static str {
        match self {
            Format::DateTime => "date-time",
            Format::HttpDate => "http-date",
            Format::EpochSeconds => "epoch-seconds",
        }
    }

    /// Parses a Smithy `timestampFormat` trait value.
    pub fn from_trait_value(value: &str) -> Option<Self> {
        match value {
            "date-time" => Some(Format::DateTime),
            "http-date" => Some(Format::HttpDate),
            "epoch-seconds" => Some(Format::EpochSeconds),
            _ => None,
        }
    }
}

impl DateTime {
    /// Creates a `DateTime` from whole seconds since the epoch.
    pub fn from_secs(epoch_seconds: i64) -> Self {
        DateTime {
            seconds: epoch_seconds,
            subsecond_nanos: 0,
        }
    }

    /// Creates a `DateTime` from milliseconds since the epoch.
    pub fn from_millis(epoch_millis: i64) -> Self {
        let seconds = epoch_millis.div_euclid(1000);
        let millis = epoch_millis.rem_euclid(1000) as u32;
        DateTime {
            seconds,
            subsecond_nanos: millis * 1_000_000,
        }
    }

    /// Creates a `DateTime` from seconds and subsecond nanos. Nanos at or above one second carry
    /// into `seconds`.
    pub fn from_secs_and_nanos(seconds: i64, subsecond_nanos: u32) -> Self {
        DateTime {
            seconds: seconds + i64::from(subsecond_nanos / NANOS_PER_SECOND),
            subsecond_nanos: subsecond_nanos % NANOS_PER_SECOND,
        }
    }

    /// Creates a `DateTime` from fractional epoch seconds.
    ///
    /// An `f64` only resolves a few hundred nanoseconds at present-day epochs, so the fraction is
    /// rounded to the nearest microsecond.
    pub fn from_secs_f64(epoch_seconds: f64) -> Self {
        let whole = epoch_seconds.floor();
        let micros = ((epoch_seconds - whole) * 1_000_000_f64).round() as u32;
        DateTime::from_secs_and_nanos(whole as i64, micros * NANOS_PER_MICRO)
    }

    /// Creates a `DateTime` from whole seconds and a fraction in `[0, 1)`.
    pub fn from_fractional_secs(epoch_seconds: i64, fraction: f64) -> Self {
        let micros = (fraction * 1_000_000_f64).round() as u32;
        DateTime::from_secs_and_nanos(epoch_seconds, micros * NANOS_PER_MICRO)
    }

    /// Parses a `DateTime` in the given format.
    pub fn from_str(s: &str, format: Format) -> Result<Self, DateTimeParseError> {
        match format {
            Format::DateTime => format::rfc3339::parse(s),
            Format::HttpDate => format::http_date::parse(s),
            Format::EpochSeconds => format::epoch_seconds::parse(s),
        }
    }

    /// Reads one `DateTime` from the front of `s`, followed by an optional `delim`.
    ///
    /// Returns the parsed value and the remainder after the delimiter. HTTP dates contain a comma
    /// themselves, so they are delimited by their ` GMT` suffix instead of the first `delim`.
    pub fn read(s: &str, format: Format, delim: char) -> Result<(Self, &str), DateTimeParseError> {
        let (head, rest) = match format {
            Format::HttpDate => format::http_date::split(s)?,
            _ => match s.find(delim) {
                Some(idx) => (&s[..idx], &s[idx..]),
                None => (s, ""),
            },
        };
        let value = DateTime::from_str(head.trim(), format)?;
        let rest = rest.trim_start();
        let rest = rest.strip_prefix(delim).unwrap_or(rest).trim_start();
        Ok((value, rest))
    }

    /// Formats the `DateTime` in the given format.
    pub fn fmt(&self, format: Format) -> Result<String, DateTimeFormatError> {
        match format {
            Format::DateTime => format::rfc3339::format(self),
            Format::HttpDate => format::http_date::format(self),
            Format::EpochSeconds => Ok(format::epoch_seconds::format(self)),
        }
    }

    /// Whole seconds since the epoch (floored).
    pub fn secs(&self) -> i64 {
        self.seconds
    }

    /// Subsecond nanoseconds, always less than one second.
    pub fn subsec_nanos(&self) -> u32 {
        self.subsecond_nanos
    }

    /// True if there is a subsecond component.
    pub fn has_subsec_nanos(&self) -> bool {
        self.subsecond_nanos != 0
    }

    /// Fractional seconds since the epoch.
    pub fn as_secs_f64(&self) -> f64 {
        self.seconds as f64 + f64::from(self.subsecond_nanos) / f64::from(NANOS_PER_SECOND)
    }
}

impl From<SystemTime> for DateTime {
    fn from(time: SystemTime) -> Self {
        match time.duration_since(UNIX_EPOCH) {
            Ok(since) => DateTime::from_secs_and_nanos(since.as_secs() as i64, since.subsec_nanos()),
            Err(before) => {
                let before = before.duration();
                let mut seconds = -(before.as_secs() as i64);
                let mut nanos = before.subsec_nanos();
                if nanos > 0 {
                    seconds -= 1;
                    nanos = NANOS_PER_SECOND - nanos;
                }
                DateTime::from_secs_and_nanos(seconds, nanos)
            }
        }
    }
}

impl PartialOrd for DateTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DateTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.seconds
            .cmp(&other.seconds)
            .then(self.subsecond_nanos.cmp(&other.subsecond_nanos))
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DateTime::fmt(self, Format::DateTime) {
            Ok(date) => f.write_str(&date),
            Err(_) => write!(f, "{}", format::epoch_seconds::format(self)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{DateTime, Format};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_date_time_fmt() {
        let date_time = DateTime::from_secs(1576540098);
        assert_eq!("2019-12-16T23:48:18Z", date_time.fmt(Format::DateTime).unwrap());
        assert_eq!("1576540098", date_time.fmt(Format::EpochSeconds).unwrap());
        assert_eq!(
            "Mon, 16 Dec 2019 23:48:18 GMT",
            date_time.fmt(Format::HttpDate).unwrap()
        );

        let date_time = DateTime::from_fractional_secs(1576540098, 0.52);
        assert_eq!("2019-12-16T23:48:18.52Z", date_time.fmt(Format::DateTime).unwrap());
        assert_eq!("1576540098.52", date_time.fmt(Format::EpochSeconds).unwrap());
        assert_eq!(
            "Mon, 16 Dec 2019 23:48:18.520 GMT",
            date_time.fmt(Format::HttpDate).unwrap()
        );
    }

    #[test]
    fn from_secs_f64_rounds_to_micros() {
        let date_time = DateTime::from_secs_f64(1576540098.52);
        assert_eq!(1576540098, date_time.secs());
        assert_eq!(520_000_000, date_time.subsec_nanos());

        let date_time = DateTime::from_secs_f64(-1.5);
        assert_eq!(-2, date_time.secs());
        assert_eq!(500_000_000, date_time.subsec_nanos());
    }

    #[test]
    fn from_millis_handles_negative() {
        let date_time = DateTime::from_millis(-1);
        assert_eq!(-1, date_time.secs());
        assert_eq!(999_000_000, date_time.subsec_nanos());
    }

    #[test]
    fn system_time_conversion() {
        let after = UNIX_EPOCH + Duration::new(10, 250);
        assert_eq!(DateTime::from_secs_and_nanos(10, 250), DateTime::from(after));
        let before = UNIX_EPOCH - Duration::new(1, 500_000_000);
        assert_eq!(
            DateTime::from_secs_and_nanos(-2, 500_000_000),
            DateTime::from(before)
        );
    }

    #[test]
    fn read_many_http_dates() {
        let header = "Mon, 16 Dec 2019 23:48:18 GMT, Tue, 17 Dec 2019 23:48:18 GMT";
        let (first, rest) = DateTime::read(header, Format::HttpDate, ',').unwrap();
        assert_eq!(DateTime::from_secs(1576540098), first);
        let (second, rest) = DateTime::read(rest, Format::HttpDate, ',').unwrap();
        assert_eq!(DateTime::from_secs(1576540098 + 86400), second);
        assert_eq!("", rest);
    }

    #[test]
    fn read_many_date_times() {
        let header = "2019-12-16T23:48:18Z,2019-12-16T23:48:19Z";
        let (first, rest) = DateTime::read(header, Format::DateTime, ',').unwrap();
        assert_eq!(DateTime::from_secs(1576540098), first);
        assert_eq!("2019-12-16T23:48:19Z", rest);
    }

    #[test]
    fn ordering() {
        assert!(DateTime::from_secs_and_nanos(1, 5) < DateTime::from_secs_and_nanos(1, 6));
        assert!(DateTime::from_secs(-1) < DateTime::from_secs(0));
    }

    proptest! {
        #[test]
        fn formats_round_trip(secs in 0i64..253402300799, millis in 0u32..1000) {
            let date_time = DateTime::from_secs_and_nanos(secs, millis * 1_000_000);
            for format in [Format::DateTime, Format::HttpDate, Format::EpochSeconds] {
                let formatted = date_time.fmt(format).unwrap();
                prop_assert_eq!(DateTime::from_str(&formatted, format).unwrap(), date_time);
            }
        }
    }
}
