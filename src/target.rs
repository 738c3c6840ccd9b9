use std::borrow::Cow;
use std::fmt;

use crate::calendar::{DateEncoding, DayOffsetCalendar, ElapsedCalendar};
use crate::dataset::{MAX_TAGS, Missingness};
use crate::error::SchemaError;

const SPSS_MAX_DISCRETE: usize = 3;
const SPSS_DATE_FORMATS: [&str; 5] = ["DATE", "ADATE", "EDATE", "SDATE", "JDATE"];

/// Statistical package the converted dataset is bound for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetFormat {
    /// Stata `.dta`: day-offset dates, letter-tagged user missing values.
    Stata,
    /// SPSS `.sav`: elapsed-seconds dates, untagged discrete/range missing values.
    Spss,
    /// Plain delimited text: ISO dates, missingness kept only as a flag.
    Csv,
}

impl TargetFormat {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Stata => "Stata",
            Self::Spss => "SPSS",
            Self::Csv => "CSV",
        }
    }

    /// Tag used in the schema document's top-level `type` property.
    #[must_use]
    pub const fn package_tag(self) -> &'static str {
        match self {
            Self::Stata => "STATA",
            Self::Spss => "SPSS",
            Self::Csv => "CSV",
        }
    }

    #[must_use]
    pub fn from_package_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "STATA" | "DTA" => Some(Self::Stata),
            "SPSS" | "SAV" => Some(Self::Spss),
            "CSV" => Some(Self::Csv),
            _ => None,
        }
    }

    /// Display format written for calendar columns.
    #[must_use]
    pub const fn date_format(self) -> Option<&'static str> {
        match self {
            Self::Stata => Some("%td"),
            Self::Spss => Some("EDATE40"),
            Self::Csv => None,
        }
    }

    /// Whether this package's own date formats include `format`.
    #[must_use]
    pub fn is_native_calendar_format(self, format: &str) -> bool {
        let format = format.trim();
        match self {
            Self::Stata => format.starts_with("%td"),
            Self::Spss => {
                let family = format
                    .trim_end_matches(|c: char| c.is_ascii_digit() || c == '.')
                    .to_ascii_uppercase();
                SPSS_DATE_FORMATS.contains(&family.as_str())
            }
            Self::Csv => false,
        }
    }

    #[must_use]
    pub const fn supports_tagged_missing(self) -> bool {
        matches!(self, Self::Stata)
    }

    #[must_use]
    pub const fn supports_string_missing(self) -> bool {
        !matches!(self, Self::Stata)
    }

    /// Whether string widths must be known before the sink is opened.
    #[must_use]
    pub const fn requires_storage_width(self) -> bool {
        matches!(self, Self::Stata | Self::Spss)
    }

    /// Rejects missingness the package cannot store.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::TooManyMissing`] when the declaration exceeds
    /// the package's capacity.
    pub fn check_missing_capacity(
        self,
        column: &str,
        missing: &Missingness,
    ) -> Result<(), SchemaError> {
        let too_many = |limit: &'static str| SchemaError::TooManyMissing {
            column: column.to_owned(),
            count: missing.len(),
            limit: Cow::Borrowed(limit),
            target: self.name(),
        };
        match self {
            Self::Stata if missing.len() > MAX_TAGS => Err(too_many("26 tagged values")),
            Self::Spss => {
                let ranges = missing.range_count();
                let discrete = missing.discrete_count();
                if ranges > 1 || (ranges == 1 && discrete > 1) {
                    Err(too_many("one range plus one discrete value"))
                } else if discrete > SPSS_MAX_DISCRETE {
                    Err(too_many("3 discrete values"))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for TargetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Whether a column's `format` property marks it as a calendar column.
///
/// Any package's date format counts, so one document resolves the same
/// columns as dates for every target; only the encoding differs.
#[must_use]
pub fn is_calendar_marker(format: &str) -> bool {
    [TargetFormat::Stata, TargetFormat::Spss]
        .into_iter()
        .any(|package| package.is_native_calendar_format(format))
}

/// A target package plus the calendar constants used for its dates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Target {
    format: TargetFormat,
    day_calendar: DayOffsetCalendar,
    elapsed_calendar: ElapsedCalendar,
}

impl Target {
    #[must_use]
    pub const fn new(format: TargetFormat) -> Self {
        Self {
            format,
            day_calendar: DayOffsetCalendar::STATA,
            elapsed_calendar: ElapsedCalendar::SPSS,
        }
    }

    #[must_use]
    pub const fn with_day_calendar(mut self, calendar: DayOffsetCalendar) -> Self {
        self.day_calendar = calendar;
        self
    }

    #[must_use]
    pub const fn with_elapsed_calendar(mut self, calendar: ElapsedCalendar) -> Self {
        self.elapsed_calendar = calendar;
        self
    }

    #[must_use]
    pub const fn format(&self) -> TargetFormat {
        self.format
    }

    #[must_use]
    pub const fn date_encoding(&self) -> DateEncoding {
        match self.format {
            TargetFormat::Stata => DateEncoding::DayOffset(self.day_calendar),
            TargetFormat::Spss => DateEncoding::Elapsed(self.elapsed_calendar),
            TargetFormat::Csv => DateEncoding::Iso,
        }
    }
}

impl From<TargetFormat> for Target {
    fn from(format: TargetFormat) -> Self {
        Self::new(format)
    }
}
