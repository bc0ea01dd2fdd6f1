//! Calendar months and forecast horizons.

use std::{fmt, str::FromStr};

use chrono::{Datelike, Months, NaiveDate, Weekday};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

pub const DEFAULT_HORIZON_MONTHS: u32 = 12;
/// Longest horizon a single forecast request may span
pub const MAX_HORIZON_MONTHS: u32 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    #[error("invalid month: {0} (expected YYYY-MM)")]
    InvalidMonth(String),
    #[error("horizon start {start} is after end {end}")]
    StartAfterEnd { start: NaiveDate, end: NaiveDate },
    #[error("horizon must cover at least one month")]
    EmptyHorizon,
}

/// A calendar month, displayed and serialized as `YYYY-MM`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr,
)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.next()
            .first_day()
            .pred_opt()
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Months elapsed since January of year 0; differences give month distances
    pub fn ordinal(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let last = self.last_day();
        self.first_day().iter_days().take_while(move |day| *day <= last)
    }

    pub fn day_count(&self) -> u32 {
        self.last_day().day()
    }

    pub fn weekday_count(&self) -> u32 {
        self.days()
            .filter(|day| !matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
            .count() as u32
    }

    /// `day` clamped to the length of this month
    pub fn clamp_day(&self, day: u32) -> NaiveDate {
        let day = day.clamp(1, self.day_count());
        NaiveDate::from_ymd_opt(self.year, self.month, day).unwrap_or_else(|| self.last_day())
    }

    /// Short label for tables, e.g. `Jan 2024`
    pub fn label(&self) -> String {
        self.first_day().format("%b %Y").to_string()
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PeriodError::InvalidMonth(s.to_string());
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Month::new(year, month).ok_or_else(invalid)
    }
}

/// Every calendar month touched by `[start, end]`, ascending. Empty when start > end.
pub fn months_in_range(start: NaiveDate, end: NaiveDate) -> Vec<Month> {
    if start > end {
        return Vec::new();
    }

    let last = Month::from_date(end);
    let mut months = Vec::new();
    let mut current = Month::from_date(start);
    while current <= last {
        months.push(current);
        current = current.next();
    }
    months
}

/// Inclusive date range a forecast covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeHorizon {
    start: NaiveDate,
    end: NaiveDate,
}

impl TimeHorizon {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PeriodError> {
        if start > end {
            return Err(PeriodError::StartAfterEnd { start, end });
        }
        Ok(Self { start, end })
    }

    /// `months` whole calendar months starting with the month containing `from`
    pub fn rolling(from: NaiveDate, months: u32) -> Result<Self, PeriodError> {
        if months == 0 {
            return Err(PeriodError::EmptyHorizon);
        }
        let first = Month::from_date(from);
        let start = first.first_day();
        let end = start
            .checked_add_months(Months::new(months))
            .and_then(|d| d.pred_opt())
            .ok_or(PeriodError::EmptyHorizon)?;
        Self::new(start, end)
    }

    pub fn from_months(first: Month, last: Month) -> Result<Self, PeriodError> {
        Self::new(first.first_day(), last.last_day())
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn months(&self) -> Vec<Month> {
        months_in_range(self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_months_are_contiguous_and_inclusive() {
        let months = months_in_range(date(2024, 11, 15), date(2025, 2, 3));
        let labels: Vec<String> = months.iter().map(Month::to_string).collect();
        assert_eq!(labels, vec!["2024-11", "2024-12", "2025-01", "2025-02"]);

        for pair in months.windows(2) {
            assert_eq!(pair[0].next(), pair[1]);
        }
    }

    #[test]
    fn test_single_day_range_yields_one_month() {
        assert_eq!(
            months_in_range(date(2024, 2, 29), date(2024, 2, 29)),
            vec![Month::new(2024, 2).unwrap()]
        );
    }

    #[test]
    fn test_reversed_range_is_empty() {
        assert!(months_in_range(date(2024, 3, 1), date(2024, 1, 1)).is_empty());
        assert!(TimeHorizon::new(date(2024, 3, 1), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_rolling_horizon_covers_twelve_months() {
        let horizon = TimeHorizon::rolling(date(2024, 5, 20), DEFAULT_HORIZON_MONTHS).unwrap();
        assert_eq!(horizon.start(), date(2024, 5, 1));
        assert_eq!(horizon.end(), date(2025, 4, 30));
        assert_eq!(horizon.months().len(), 12);
        assert_eq!(TimeHorizon::rolling(date(2024, 5, 20), 0), Err(PeriodError::EmptyHorizon));
    }

    #[test]
    fn test_month_parsing_and_serde() {
        let month: Month = "2024-01".parse().unwrap();
        assert_eq!(month, Month::new(2024, 1).unwrap());
        assert!("2024-13".parse::<Month>().is_err());
        assert!("January".parse::<Month>().is_err());

        assert_eq!(serde_json::to_string(&month).unwrap(), "\"2024-01\"");
        let back: Month = serde_json::from_str("\"2024-01\"").unwrap();
        assert_eq!(back, month);
    }

    #[test]
    fn test_month_calendar_helpers() {
        let feb = Month::new(2024, 2).unwrap();
        assert_eq!(feb.day_count(), 29);
        assert_eq!(feb.weekday_count(), 21);
        assert_eq!(feb.clamp_day(31), date(2024, 2, 29));
        assert_eq!(feb.label(), "Feb 2024");
        assert_eq!(Month::new(2024, 12).unwrap().next(), Month::new(2025, 1).unwrap());
    }
}
