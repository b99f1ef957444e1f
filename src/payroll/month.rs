use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonthParseError {
    #[error("month must be formatted as YYYY-MM, got `{0}`")]
    Format(String),

    #[error("month `{0}` is out of range")]
    OutOfRange(String),
}

/// A calendar month, e.g. `2024-05`.
///
/// Stored as the first day of the month so every `Month` is a valid date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Month(NaiveDate);

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Month)
    }

    /// The month a date falls in.
    pub fn of(date: NaiveDate) -> Self {
        Month(date - chrono::Days::new(u64::from(date.day0())))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    pub fn last_day(&self) -> NaiveDate {
        self.0 + chrono::Days::new(u64::from(self.days_in_month() - 1))
    }

    pub fn days_in_month(&self) -> u32 {
        match self.month() {
            2 if NaiveDate::from_ymd_opt(self.year(), 2, 29).is_some() => 29,
            2 => 28,
            4 | 6 | 9 | 11 => 30,
            _ => 31,
        }
    }

    /// Every day of the month, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.0.iter_days().take(self.days_in_month() as usize)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month() == self.month()
    }

    pub fn succ(&self) -> Option<Month> {
        self.0.checked_add_months(Months::new(1)).map(Month)
    }

    /// Human readable label, e.g. `March 2024`.
    pub fn label(&self) -> String {
        self.0.format("%B %Y").to_string()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for Month {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let (year, month) = raw
            .split_once('-')
            .ok_or_else(|| MonthParseError::Format(raw.to_string()))?;

        let well_formed = year.len() == 4
            && month.len() == 2
            && year.bytes().all(|b| b.is_ascii_digit())
            && month.bytes().all(|b| b.is_ascii_digit());
        if !well_formed {
            return Err(MonthParseError::Format(raw.to_string()));
        }

        let year: i32 = year
            .parse()
            .map_err(|_| MonthParseError::Format(raw.to_string()))?;
        let month: u32 = month
            .parse()
            .map_err(|_| MonthParseError::Format(raw.to_string()))?;

        Month::new(year, month).ok_or_else(|| MonthParseError::OutOfRange(raw.to_string()))
    }
}
