//! Calendar month keys.
//!
//! Every time segment, actual and frame in a forecast sheet is keyed by a
//! month written as `YYYY-MM`. `Month` wraps the first day of that month so
//! ordering and arithmetic come from chrono.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Local, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A calendar month (`YYYY-MM`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month(NaiveDate);

/// Error for month strings that are not `YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthParseError(pub String);

impl fmt::Display for MonthParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid month '{}': expected YYYY-MM", self.0)
    }
}

impl std::error::Error for MonthParseError {}

impl Month {
    /// Build a month from year and 1-based month number.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Month)
    }

    /// The month containing the local wall-clock date.
    pub fn current() -> Self {
        Self::of(Local::now().date_naive())
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        // Day 1 always exists
        Month(date.with_day(1).unwrap_or(date))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// The following month.
    pub fn succ(&self) -> Month {
        self.add_months(1)
    }

    /// The preceding month.
    pub fn pred(&self) -> Month {
        self.add_months(-1)
    }

    /// Shift by a signed number of months (saturates at chrono's date range).
    pub fn add_months(&self, delta: i32) -> Month {
        let shifted = if delta >= 0 {
            self.0.checked_add_months(Months::new(delta as u32))
        } else {
            self.0.checked_sub_months(Months::new(delta.unsigned_abs()))
        };
        Month(shifted.unwrap_or(self.0))
    }

    /// Signed number of months from `self` to `other` (`other - self`).
    pub fn months_until(&self, other: Month) -> i32 {
        (other.year() - self.year()) * 12 + other.month() as i32 - self.month() as i32
    }

    /// True if this month lies strictly before `today`'s month.
    pub fn is_past(&self, today: Month) -> bool {
        *self < today
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
        let trimmed = s.trim();
        let err = || MonthParseError(s.to_string());
        let (year, month) = trimmed.split_once('-').ok_or_else(err)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(err());
        }
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        Month::new(year, month).ok_or_else(err)
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Inclusive month range shown by a sheet (start..=end).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRange {
    pub start: Month,
    pub end: Month,
}

impl MonthRange {
    /// Build a range; an end before the start yields an empty range.
    pub fn new(start: Month, end: Month) -> Self {
        Self { start, end }
    }

    /// Default range around `today`: `back` months before to `ahead` months after.
    pub fn around(today: Month, back: u32, ahead: u32) -> Self {
        Self {
            start: today.add_months(-(back as i32)),
            end: today.add_months(ahead as i32),
        }
    }

    /// Number of months (columns) in the range.
    pub fn len(&self) -> usize {
        (self.start.months_until(self.end) + 1).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Month at column `index`, if inside the range.
    pub fn month_at(&self, index: usize) -> Option<Month> {
        if index < self.len() {
            Some(self.start.add_months(index as i32))
        } else {
            None
        }
    }

    /// Column index of `month`, if inside the range.
    pub fn index_of(&self, month: Month) -> Option<usize> {
        let offset = self.start.months_until(month);
        if offset >= 0 && (offset as usize) < self.len() {
            Some(offset as usize)
        } else {
            None
        }
    }

    /// Months remaining from `month` to the end of the range, inclusive.
    pub fn remaining_from(&self, month: Month) -> usize {
        self.index_of(month).map(|i| self.len() - i).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Month> + '_ {
        (0..self.len()).map(move |i| self.start.add_months(i as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(s: &str) -> Month {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!(m("2024-01").to_string(), "2024-01");
        assert_eq!(m(" 1999-12 ").to_string(), "1999-12");
        assert!("2024-13".parse::<Month>().is_err());
        assert!("2024-1".parse::<Month>().is_err());
        assert!("24-01".parse::<Month>().is_err());
        assert!("2024/01".parse::<Month>().is_err());
    }

    #[test]
    fn test_succ_crosses_year() {
        assert_eq!(m("2023-12").succ(), m("2024-01"));
        assert_eq!(m("2024-01").pred(), m("2023-12"));
        assert_eq!(m("2024-01").add_months(14), m("2025-03"));
    }

    #[test]
    fn test_months_until() {
        assert_eq!(m("2024-01").months_until(m("2024-01")), 0);
        assert_eq!(m("2023-11").months_until(m("2024-02")), 3);
        assert_eq!(m("2024-02").months_until(m("2023-11")), -3);
    }

    #[test]
    fn test_is_past() {
        let today = m("2024-03");
        assert!(m("2024-02").is_past(today));
        assert!(!m("2024-03").is_past(today));
        assert!(!m("2024-04").is_past(today));
    }

    #[test]
    fn test_range_indexing() {
        let range = MonthRange::new(m("2024-01"), m("2024-06"));
        assert_eq!(range.len(), 6);
        assert_eq!(range.month_at(5), Some(m("2024-06")));
        assert_eq!(range.month_at(6), None);
        assert_eq!(range.index_of(m("2024-03")), Some(2));
        assert_eq!(range.index_of(m("2023-12")), None);
        assert_eq!(range.remaining_from(m("2024-05")), 2);
        assert_eq!(range.remaining_from(m("2025-01")), 0);

        let inverted = MonthRange::new(m("2024-06"), m("2024-01"));
        assert!(inverted.is_empty());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&m("2024-07")).unwrap();
        assert_eq!(json, "\"2024-07\"");
        let back: Month = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m("2024-07"));
        assert!(serde_json::from_str::<Month>("\"July\"").is_err());
    }
}
