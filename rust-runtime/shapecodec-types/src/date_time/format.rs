/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use super::{DateTime, NANOS_PER_SECOND};
use std::borrow::Cow;
use std::error::Error;
use std::fmt;
use time::{Month, OffsetDateTime, Weekday};

#[derive(Debug, Eq, PartialEq)]
enum ParseErrorKind {
    Invalid {
        format: &'static str,
        message: Cow<'static, str>,
    },
    IntParseError,
}

/// Failure to parse a timestamp in the requested format.
#[derive(Debug, Eq, PartialEq)]
pub struct DateTimeParseError {
    kind: ParseErrorKind,
}

impl DateTimeParseError {
    fn invalid(format: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        DateTimeParseError {
            kind: ParseErrorKind::Invalid {
                format,
                message: message.into(),
            },
        }
    }

    fn int_parse() -> Self {
        DateTimeParseError {
            kind: ParseErrorKind::IntParseError,
        }
    }
}

impl fmt::Display for DateTimeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ParseErrorKind::Invalid { format, message } => {
                write!(f, "invalid {} timestamp: {}", format, message)
            }
            ParseErrorKind::IntParseError => write!(f, "failed to parse integer in timestamp"),
        }
    }
}

impl Error for DateTimeParseError {}

/// Failure to render a timestamp, raised when the year falls outside `0..=9999`.
#[derive(Debug, Eq, PartialEq)]
pub struct DateTimeFormatError {
    seconds: i64,
}

impl fmt::Display for DateTimeFormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "timestamp at {} epoch seconds is outside the formattable range of years 0 to 9999",
            self.seconds
        )
    }
}

impl Error for DateTimeFormatError {}

fn civil(date_time: &DateTime) -> Result<OffsetDateTime, DateTimeFormatError> {
    let out_of_range = || DateTimeFormatError {
        seconds: date_time.secs(),
    };
    let civil = OffsetDateTime::from_unix_timestamp(date_time.secs()).map_err(|_| out_of_range())?;
    if !(0..=9999).contains(&civil.year()) {
        return Err(out_of_range());
    }
    Ok(civil)
}

fn parse_digits<T: std::str::FromStr>(digits: &[u8]) -> Result<T, DateTimeParseError> {
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(DateTimeParseError::int_parse());
    }
    // ascii digits are always valid utf-8
    let digits = std::str::from_utf8(digits).map_err(|_| DateTimeParseError::int_parse())?;
    digits.parse::<T>().map_err(|_| DateTimeParseError::int_parse())
}

/// Scales up to nine fraction digits into nanoseconds; extra digits are truncated.
fn parse_fraction(digits: &[u8]) -> Result<u32, DateTimeParseError> {
    let digits = &digits[..digits.len().min(9)];
    let value: u32 = parse_digits(digits)?;
    Ok(value * 10u32.pow(9 - digits.len() as u32))
}

pub(super) mod rfc3339 {
    use super::{civil, DateTimeFormatError, DateTimeParseError};
    use crate::DateTime;
    use std::fmt::Write;
    use time::format_description::well_known::Rfc3339;
    use time::OffsetDateTime;

    pub(crate) fn parse(s: &str) -> Result<DateTime, DateTimeParseError> {
        let parsed = OffsetDateTime::parse(s, &Rfc3339)
            .map_err(|err| DateTimeParseError::invalid("date-time", err.to_string()))?;
        Ok(DateTime::from_secs_and_nanos(
            parsed.unix_timestamp(),
            parsed.nanosecond(),
        ))
    }

    /// Ok: "2019-12-16T23:48:18Z"
    /// Ok: "2019-12-16T23:48:18.52Z"
    pub(crate) fn format(date_time: &DateTime) -> Result<String, DateTimeFormatError> {
        let civil = civil(date_time)?;
        let mut out = String::with_capacity(30);
        // writing into a String cannot fail
        let _ = write!(
            out,
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
            civil.year(),
            u8::from(civil.month()),
            civil.day(),
            civil.hour(),
            civil.minute(),
            civil.second()
        );
        if date_time.has_subsec_nanos() {
            let fraction = format!("{:09}", date_time.subsec_nanos());
            out.push('.');
            out.push_str(fraction.trim_end_matches('0'));
        }
        out.push('Z');
        Ok(out)
    }
}

pub(super) mod http_date {
    use super::{
        civil, parse_digits, parse_fraction, DateTimeFormatError, DateTimeParseError, Month,
        Weekday,
    };
    use crate::DateTime;
    use time::{Date, PrimitiveDateTime, Time};

    const FORMAT: &str = "http-date";

    /// Ok: "Mon, 16 Dec 2019 23:48:18 GMT"
    /// Ok: "Mon, 16 Dec 2019 23:48:18.123 GMT"
    pub(crate) fn format(date_time: &DateTime) -> Result<String, DateTimeFormatError> {
        let civil = civil(date_time)?;
        let weekday = match civil.weekday() {
            Weekday::Monday => "Mon",
            Weekday::Tuesday => "Tue",
            Weekday::Wednesday => "Wed",
            Weekday::Thursday => "Thu",
            Weekday::Friday => "Fri",
            Weekday::Saturday => "Sat",
            Weekday::Sunday => "Sun",
        };
        let month = match civil.month() {
            Month::January => "Jan",
            Month::February => "Feb",
            Month::March => "Mar",
            Month::April => "Apr",
            Month::May => "May",
            Month::June => "Jun",
            Month::July => "Jul",
            Month::August => "Aug",
            Month::September => "Sep",
            Month::October => "Oct",
            Month::November => "Nov",
            Month::December => "Dec",
        };
        let mut out = format!(
            "{}, {:02} {} {:04} {:02}:{:02}:{:02}",
            weekday,
            civil.day(),
            month,
            civil.year(),
            civil.hour(),
            civil.minute(),
            civil.second()
        );
        let millis = date_time.subsec_nanos() / 1_000_000;
        if millis != 0 {
            out.push_str(&format!(".{:03}", millis));
        }
        out.push_str(" GMT");
        Ok(out)
    }

    pub(crate) fn parse(s: &str) -> Result<DateTime, DateTimeParseError> {
        if !s.is_ascii() {
            return Err(DateTimeParseError::invalid(FORMAT, "not ascii"));
        }
        let s = s.trim().as_bytes();
        // `Sun, 06 Nov 1994 08:49:37 GMT`, optionally with up to three fraction digits
        if s.len() < 29
            || s.len() > 33
            || !s.ends_with(b" GMT")
            || &s[3..5] != b", "
            || s[7] != b' '
            || s[11] != b' '
            || s[16] != b' '
            || s[19] != b':'
            || s[22] != b':'
        {
            return Err(DateTimeParseError::invalid(FORMAT, "incorrectly shaped string"));
        }
        let nanos = match s[25] {
            b' ' if s.len() == 29 => 0,
            b'.' => parse_fraction(&s[26..s.len() - 4])?,
            _ => {
                return Err(DateTimeParseError::invalid(
                    FORMAT,
                    "incorrectly shaped string",
                ))
            }
        };
        if !matches!(
            &s[..3],
            b"Mon" | b"Tue" | b"Wed" | b"Thu" | b"Fri" | b"Sat" | b"Sun"
        ) {
            return Err(DateTimeParseError::invalid(FORMAT, "invalid day"));
        }
        let month = match &s[8..11] {
            b"Jan" => Month::January,
            b"Feb" => Month::February,
            b"Mar" => Month::March,
            b"Apr" => Month::April,
            b"May" => Month::May,
            b"Jun" => Month::June,
            b"Jul" => Month::July,
            b"Aug" => Month::August,
            b"Sep" => Month::September,
            b"Oct" => Month::October,
            b"Nov" => Month::November,
            b"Dec" => Month::December,
            _ => return Err(DateTimeParseError::invalid(FORMAT, "invalid month")),
        };
        let date = Date::from_calendar_date(parse_digits(&s[12..16])?, month, parse_digits(&s[5..7])?)
            .map_err(|err| DateTimeParseError::invalid(FORMAT, err.to_string()))?;
        let time = Time::from_hms(
            parse_digits(&s[17..19])?,
            parse_digits(&s[20..22])?,
            parse_digits(&s[23..25])?,
        )
        .map_err(|err| DateTimeParseError::invalid(FORMAT, err.to_string()))?;
        let seconds = PrimitiveDateTime::new(date, time).assume_utc().unix_timestamp();
        Ok(DateTime::from_secs_and_nanos(seconds, nanos))
    }

    /// Splits one HTTP date off the front of `s`, returning the date and the remainder.
    pub(crate) fn split(s: &str) -> Result<(&str, &str), DateTimeParseError> {
        match s.find(" GMT") {
            Some(idx) => Ok(s.split_at(idx + 4)),
            None => Err(DateTimeParseError::invalid(FORMAT, "missing GMT suffix")),
        }
    }
}

pub(super) mod epoch_seconds {
    use super::{parse_digits, parse_fraction, DateTimeParseError, NANOS_PER_SECOND};
    use crate::DateTime;

    const FORMAT: &str = "epoch-seconds";

    pub(crate) fn format(date_time: &DateTime) -> String {
        let (seconds, nanos) = (date_time.secs(), date_time.subsec_nanos());
        if nanos == 0 {
            return itoa::Buffer::new().format(seconds).to_owned();
        }
        // `seconds` is floored, so negative values borrow one second from the fraction
        let (sign, whole, fraction) = if seconds < 0 {
            ("-", (-(seconds + 1)) as u64, NANOS_PER_SECOND - nanos)
        } else {
            ("", seconds as u64, nanos)
        };
        let fraction = format!("{:09}", fraction);
        format!("{}{}.{}", sign, whole, fraction.trim_end_matches('0'))
    }

    pub(crate) fn parse(s: &str) -> Result<DateTime, DateTimeParseError> {
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        if body.contains(['e', 'E']) {
            let value: f64 = s
                .parse()
                .map_err(|_| DateTimeParseError::invalid(FORMAT, "not a number"))?;
            if !value.is_finite() {
                return Err(DateTimeParseError::invalid(FORMAT, "not finite"));
            }
            return Ok(DateTime::from_secs_f64(value));
        }
        let (whole, fraction) = body.split_once('.').unwrap_or((body, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(DateTimeParseError::invalid(FORMAT, "empty"));
        }
        let whole: i64 = if whole.is_empty() {
            0
        } else {
            parse_digits(whole.as_bytes())?
        };
        let nanos = if fraction.is_empty() {
            0
        } else {
            parse_fraction(fraction.as_bytes())?
        };
        Ok(match (negative, nanos) {
            (false, _) => DateTime::from_secs_and_nanos(whole, nanos),
            (true, 0) => DateTime::from_secs(-whole),
            (true, _) => DateTime::from_secs_and_nanos(-whole - 1, NANOS_PER_SECOND - nanos),
        })
    }
}

#[cfg(test)]
mod test {
    use super::{epoch_seconds, http_date, rfc3339, DateTimeParseError};
    use crate::DateTime;
    use pretty_assertions::assert_eq;

    #[test]
    fn http_date_format() {
        let basic_http_date = "Mon, 16 Dec 2019 23:48:18 GMT";
        let date_time = DateTime::from_secs(1576540098);
        assert_eq!(basic_http_date, http_date::format(&date_time).unwrap());
        assert_eq!(Ok(date_time), http_date::parse(basic_http_date));
    }

    #[test]
    fn http_date_fractional_zeroed() {
        let fractional = "Mon, 16 Dec 2019 23:48:18.000 GMT";
        let date_time = DateTime::from_secs(1576540098);
        assert_eq!(
            "Mon, 16 Dec 2019 23:48:18 GMT",
            http_date::format(&date_time).unwrap()
        );
        assert_eq!(Ok(date_time), http_date::parse(fractional));
    }

    #[test]
    fn http_date_fractional_nonzero() {
        let date_time = DateTime::from_secs_and_nanos(1576540098, 120_000_000);
        assert_eq!(Ok(date_time), http_date::parse("Mon, 16 Dec 2019 23:48:18.12 GMT"));
        assert_eq!(
            "Mon, 16 Dec 2019 23:48:18.120 GMT",
            http_date::format(&date_time).unwrap()
        );
    }

    #[test]
    fn http_date_too_much_fraction() {
        assert_eq!(
            Err(DateTimeParseError::invalid("http-date", "incorrectly shaped string")),
            http_date::parse("Mon, 16 Dec 2019 23:48:18.1212 GMT")
        );
    }

    #[test]
    fn http_date_empty_fraction() {
        assert_eq!(
            Err(DateTimeParseError::int_parse()),
            http_date::parse("Mon, 16 Dec 2019 23:48:18. GMT")
        );
    }

    #[test]
    fn http_date_rejects_date_time() {
        assert!(http_date::parse("2019-12-16T23:48:18Z").is_err());
    }

    #[test]
    fn rfc3339_parses_offsets_and_fractions() {
        assert_eq!(
            DateTime::from_secs_and_nanos(1576540098, 520_000_000),
            rfc3339::parse("2019-12-16T23:48:18.52Z").unwrap()
        );
        assert_eq!(
            DateTime::from_secs(1576540098),
            rfc3339::parse("2019-12-17T00:48:18+01:00").unwrap()
        );
        assert!(rfc3339::parse("Mon, 16 Dec 2019 23:48:18 GMT").is_err());
    }

    #[test]
    fn rfc3339_out_of_range_year() {
        assert!(rfc3339::format(&DateTime::from_secs(253402300800)).is_err());
    }

    #[test]
    fn epoch_seconds_text() {
        assert_eq!("-1.5", epoch_seconds::format(&DateTime::from_secs_and_nanos(-2, 500_000_000)));
        assert_eq!(
            DateTime::from_secs_and_nanos(-2, 500_000_000),
            epoch_seconds::parse("-1.5").unwrap()
        );
        assert_eq!(
            DateTime::from_secs_and_nanos(1576540098, 520_000_000),
            epoch_seconds::parse("1576540098.52").unwrap()
        );
        assert_eq!(DateTime::from_secs(1), epoch_seconds::parse("1e0").unwrap());
        assert!(epoch_seconds::parse("2019-12-16T23:48:18Z").is_err());
        assert!(epoch_seconds::parse("").is_err());
        assert!(epoch_seconds::parse("NaN").is_err());
    }
}
