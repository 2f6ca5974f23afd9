use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Indian financial year: 1 April of `self.0` through 31 March of the next year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FiscalYear(pub u16);

impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FY{}-{:02}", self.0, (self.0 % 100 + 1) % 100)
    }
}

impl FiscalYear {
    pub fn new(year: u16) -> Self {
        FiscalYear(year)
    }

    pub fn year(self) -> u16 {
        self.0
    }

    /// The financial year a calendar date falls in.
    pub fn containing(date: NaiveDate) -> Self {
        let year = if date.month() >= 4 {
            date.year()
        } else {
            date.year() - 1
        };
        FiscalYear(year.clamp(0, u16::MAX as i32) as u16)
    }

    pub fn start_date(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0 as i32, 4, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Returns 31 March of the following calendar year (inclusive end).
    pub fn end_date(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.0 as i32 + 1, 3, 31).unwrap_or(NaiveDate::MAX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    /// Open-ended on either side; a missing bound does not restrict.
    pub fn between(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        DateRange {
            start: start.unwrap_or(NaiveDate::MIN),
            end: end.unwrap_or(NaiveDate::MAX),
        }
    }

    pub fn contains(self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl From<FiscalYear> for DateRange {
    fn from(fy: FiscalYear) -> Self {
        DateRange::new(fy.start_date(), fy.end_date())
    }
}
