//! Calendar encodings used by the supported statistical packages.
//!
//! Two families exist: an integer count of days from an epoch (Stata `%td`)
//! and a floating-point elapsed time from an epoch (SPSS stores seconds since
//! 14 Oct 1582). Epochs and units are values of the calendar types, not
//! constants of the algorithms, so other packages can reuse them.

use time::{Date, Month};
use time::util::is_leap_year;

use crate::dataset::{Code, StorageKind};

const SECONDS_PER_DAY: f64 = 86_400.0;
const MIN_YEAR: i32 = 0;
const MAX_YEAR: i32 = 9999;

const DAYS_PER_MONTH: [u8; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Failure to interpret or produce calendar text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    #[error("{text:?} is not a YYYY-MM-DD calendar date")]
    BadFormat { text: String },

    #[error("{value} is outside the supported calendar range")]
    OutOfRange { value: String },

    #[error("elapsed-time unit must be a positive, finite number of seconds")]
    InvalidUnit,
}

const fn ymd(year: i32, month: Month, day: u8) -> Date {
    match Date::from_calendar_date(year, month, day) {
        Ok(date) => date,
        Err(_) => panic!("invalid calendar epoch"),
    }
}

/// Parses a strict `YYYY-MM-DD` date. Surrounding whitespace is ignored.
///
/// # Errors
///
/// Returns [`CalendarError::BadFormat`] when the text is not a valid
/// Gregorian date in that layout.
pub fn parse_iso_date(text: &str) -> Result<Date, CalendarError> {
    let bad = || CalendarError::BadFormat {
        text: text.to_owned(),
    };
    let trimmed = text.trim();
    let bytes = trimmed.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return Err(bad());
    }
    let year: i32 = parse_digits(&trimmed[0..4]).ok_or_else(bad)?;
    let month: u8 = parse_digits(&trimmed[5..7]).ok_or_else(bad)?;
    let day: u8 = parse_digits(&trimmed[8..10]).ok_or_else(bad)?;
    let month = Month::try_from(month).map_err(|_| bad())?;
    Date::from_calendar_date(year, month, day).map_err(|_| bad())
}

fn parse_digits<T: std::str::FromStr>(digits: &str) -> Option<T> {
    if digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

/// Renders a date as `YYYY-MM-DD`.
#[must_use]
pub fn format_iso_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

fn days_in_year(year: i32) -> i64 {
    if is_leap_year(year) { 366 } else { 365 }
}

fn days_in_month(year: i32, month: Month) -> i64 {
    if month == Month::February && is_leap_year(year) {
        29
    } else {
        i64::from(DAYS_PER_MONTH[usize::from(u8::from(month)) - 1])
    }
}

/// Zero-based position of `date` within its year, summed month by month.
fn day_within_year(date: Date) -> i64 {
    let mut days = 0;
    let mut month = Month::January;
    while month != date.month() {
        days += days_in_month(date.year(), month);
        month = month.next();
    }
    days + i64::from(date.day()) - 1
}

/// Integer day offsets from an epoch (day 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayOffsetCalendar {
    epoch: Date,
}

impl DayOffsetCalendar {
    /// Stata's `%td` encoding: days since 1960-01-01.
    pub const STATA: Self = Self::new(ymd(1960, Month::January, 1));

    #[must_use]
    pub const fn new(epoch: Date) -> Self {
        Self { epoch }
    }

    #[must_use]
    pub const fn epoch(&self) -> Date {
        self.epoch
    }

    /// Parses `YYYY-MM-DD` text into a day offset.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::BadFormat`] for unparseable text and
    /// [`CalendarError::OutOfRange`] if the offset does not fit in 32 bits.
    pub fn days_since_epoch(&self, text: &str) -> Result<i32, CalendarError> {
        let date = parse_iso_date(text)?;
        self.days_from_date(date)
    }

    /// Counts days from the epoch to `date`, whole years first.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::OutOfRange`] if the offset does not fit in 32 bits.
    pub fn days_from_date(&self, date: Date) -> Result<i32, CalendarError> {
        let mut days: i64 = 0;
        for year in date.year()..self.epoch.year() {
            days -= days_in_year(year);
        }
        for year in self.epoch.year()..date.year() {
            days += days_in_year(year);
        }
        days += day_within_year(date) - day_within_year(self.epoch);
        i32::try_from(days).map_err(|_| CalendarError::OutOfRange {
            value: format_iso_date(date),
        })
    }

    /// Inverse of [`Self::days_from_date`]. Negative offsets walk backward
    /// year by year from the epoch before settling on a month.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::OutOfRange`] when the offset lands outside
    /// years 0 through 9999.
    pub fn date_from_days(&self, days: i32) -> Result<Date, CalendarError> {
        let out_of_range = || CalendarError::OutOfRange {
            value: days.to_string(),
        };
        let mut year = self.epoch.year();
        let mut remaining = i64::from(days) + day_within_year(self.epoch);
        while remaining < 0 {
            year -= 1;
            if year < MIN_YEAR {
                return Err(out_of_range());
            }
            remaining += days_in_year(year);
        }
        while remaining >= days_in_year(year) {
            remaining -= days_in_year(year);
            year += 1;
            if year > MAX_YEAR {
                return Err(out_of_range());
            }
        }
        let mut month = Month::January;
        loop {
            let length = days_in_month(year, month);
            if remaining < length {
                break;
            }
            remaining -= length;
            month = month.next();
        }
        let day = u8::try_from(remaining + 1).map_err(|_| out_of_range())?;
        Date::from_calendar_date(year, month, day).map_err(|_| out_of_range())
    }

    /// Renders a day offset as `YYYY-MM-DD`.
    ///
    /// # Errors
    ///
    /// See [`Self::date_from_days`].
    pub fn date_string(&self, days: i32) -> Result<String, CalendarError> {
        self.date_from_days(days).map(format_iso_date)
    }
}

/// Floating-point elapsed time from an epoch, in a configurable unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElapsedCalendar {
    epoch: Date,
    seconds_per_unit: f64,
}

impl ElapsedCalendar {
    /// SPSS: seconds since 1582-10-14.
    pub const SPSS: Self = Self {
        epoch: ymd(1582, Month::October, 14),
        seconds_per_unit: 1.0,
    };

    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidUnit`] unless `seconds_per_unit` is
    /// positive and finite.
    pub fn new(epoch: Date, seconds_per_unit: f64) -> Result<Self, CalendarError> {
        if seconds_per_unit.is_finite() && seconds_per_unit > 0.0 {
            Ok(Self {
                epoch,
                seconds_per_unit,
            })
        } else {
            Err(CalendarError::InvalidUnit)
        }
    }

    #[must_use]
    pub const fn epoch(&self) -> Date {
        self.epoch
    }

    #[must_use]
    pub const fn seconds_per_unit(&self) -> f64 {
        self.seconds_per_unit
    }

    /// Parses `YYYY-MM-DD` text into the package's elapsed value.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::BadFormat`] for unparseable text.
    pub fn elapsed_value(&self, text: &str) -> Result<f64, CalendarError> {
        parse_iso_date(text).map(|date| self.value_from_date(date))
    }

    #[must_use]
    pub fn value_from_date(&self, date: Date) -> f64 {
        let days = date.to_julian_day() - self.epoch.to_julian_day();
        f64::from(days) * SECONDS_PER_DAY / self.seconds_per_unit
    }

    /// Date containing the instant `value`; time of day is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::OutOfRange`] for non-finite values or dates
    /// the calendar cannot represent.
    #[allow(clippy::cast_possible_truncation)]
    pub fn date_from_value(&self, value: f64) -> Result<Date, CalendarError> {
        let out_of_range = || CalendarError::OutOfRange {
            value: value.to_string(),
        };
        let days = (value * self.seconds_per_unit / SECONDS_PER_DAY).floor();
        if !days.is_finite() || days.abs() > f64::from(i32::MAX) {
            return Err(out_of_range());
        }
        let julian = i64::from(self.epoch.to_julian_day()) + days as i64;
        let julian = i32::try_from(julian).map_err(|_| out_of_range())?;
        Date::from_julian_day(julian).map_err(|_| out_of_range())
    }

    /// Renders an elapsed value as `YYYY-MM-DD`.
    ///
    /// # Errors
    ///
    /// See [`Self::date_from_value`].
    pub fn date_string(&self, value: f64) -> Result<String, CalendarError> {
        self.date_from_value(value).map(format_iso_date)
    }
}

/// How a calendar column is represented on a particular target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DateEncoding {
    DayOffset(DayOffsetCalendar),
    Elapsed(ElapsedCalendar),
    /// Normalized `YYYY-MM-DD` text.
    Iso,
}

impl DateEncoding {
    #[must_use]
    pub const fn storage(&self) -> StorageKind {
        match self {
            Self::DayOffset(_) => StorageKind::Int32,
            Self::Elapsed(_) => StorageKind::Double,
            Self::Iso => StorageKind::String,
        }
    }

    /// Encodes calendar text into the target's native code.
    ///
    /// # Errors
    ///
    /// Propagates [`CalendarError`] from the underlying calendar.
    pub fn encode(&self, text: &str) -> Result<Code, CalendarError> {
        match self {
            Self::DayOffset(calendar) => calendar.days_since_epoch(text).map(Code::Int32),
            Self::Elapsed(calendar) => calendar.elapsed_value(text).map(Code::Double),
            Self::Iso => parse_iso_date(text).map(|date| Code::Str(format_iso_date(date))),
        }
    }

    /// Renders a native code back to calendar text.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::OutOfRange`] when the code is not representable,
    /// or [`CalendarError::BadFormat`] when its type does not fit the encoding.
    pub fn render(&self, code: &Code) -> Result<String, CalendarError> {
        match (self, code) {
            (Self::DayOffset(calendar), Code::Int32(days)) => calendar.date_string(*days),
            (Self::Elapsed(calendar), Code::Double(value)) => calendar.date_string(*value),
            (Self::Iso, Code::Str(text)) => parse_iso_date(text).map(format_iso_date),
            (_, other) => Err(CalendarError::BadFormat {
                text: other.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stata_epoch_is_day_zero() {
        let cal = DayOffsetCalendar::STATA;
        assert_eq!(cal.days_since_epoch("1960-01-01"), Ok(0));
        assert_eq!(cal.date_string(0).unwrap(), "1960-01-01");
    }

    #[test]
    fn stata_offsets_cross_leap_days() {
        let cal = DayOffsetCalendar::STATA;
        assert_eq!(cal.days_since_epoch("1960-02-29"), Ok(59));
        assert_eq!(cal.days_since_epoch("2000-01-01"), Ok(14_610));
        assert_eq!(cal.days_since_epoch("2000-03-01"), Ok(14_670));
        assert_eq!(cal.date_string(14_669).unwrap(), "2000-02-29");
    }

    #[test]
    fn negative_offsets_walk_backward() {
        let cal = DayOffsetCalendar::STATA;
        assert_eq!(cal.days_since_epoch("1959-12-31"), Ok(-1));
        assert_eq!(cal.days_since_epoch("1959-01-01"), Ok(-365));
        assert_eq!(cal.date_string(-366).unwrap(), "1958-12-31");
        assert_eq!(cal.date_string(-1461).unwrap(), "1956-01-01");
        assert_eq!(cal.days_since_epoch("1900-03-01"), Ok(-21_855));
    }

    #[test]
    fn inverse_law_holds_across_two_centuries() {
        let cal = DayOffsetCalendar::STATA;
        for days in -40_000..=40_000 {
            let text = cal.date_string(days).unwrap();
            assert_eq!(cal.days_since_epoch(&text), Ok(days), "{text}");
        }
    }

    #[test]
    fn custom_epoch_is_honoured() {
        let cal = DayOffsetCalendar::new(ymd(1970, Month::January, 1));
        assert_eq!(cal.days_since_epoch("1970-01-02"), Ok(1));
        assert_eq!(cal.days_since_epoch("1960-01-01"), Ok(-3653));
    }

    #[test]
    fn rejects_malformed_dates() {
        let cal = DayOffsetCalendar::STATA;
        for text in ["", "1960/01/01", "1960-1-1", "1960-02-30", "60-01-01", "1960-01-01T00:00"] {
            assert_eq!(
                cal.days_since_epoch(text),
                Err(CalendarError::BadFormat {
                    text: text.to_owned()
                }),
                "{text}"
            );
        }
    }

    #[test]
    fn spss_counts_seconds_from_gregorian_adoption() {
        let cal = ElapsedCalendar::SPSS;
        assert_eq!(cal.elapsed_value("1582-10-14"), Ok(0.0));
        assert_eq!(cal.elapsed_value("1582-10-15"), Ok(86_400.0));
        let value = cal.elapsed_value("1960-01-01").unwrap();
        assert_eq!(cal.date_string(value).unwrap(), "1960-01-01");
        assert_eq!(cal.date_string(value + 3_600.0).unwrap(), "1960-01-01");
    }

    #[test]
    fn elapsed_unit_must_be_positive() {
        let epoch = ymd(1970, Month::January, 1);
        assert_eq!(ElapsedCalendar::new(epoch, 0.0), Err(CalendarError::InvalidUnit));
        let days = ElapsedCalendar::new(epoch, SECONDS_PER_DAY).unwrap();
        assert_eq!(days.elapsed_value("1970-01-11"), Ok(10.0));
    }

    #[test]
    fn iso_encoding_normalizes_text() {
        assert_eq!(
            DateEncoding::Iso.encode(" 2021-07-04 "),
            Ok(Code::Str("2021-07-04".to_owned()))
        );
    }
}
