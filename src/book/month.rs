use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ExpenseError;

/// A calendar year-month, ordered lexicographically by (year, month).
///
/// Serialises as the wire token `"YYYY-MM"` used by stored expenses
/// (`monthKey`) and recurring rules (`start`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
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

    /// One-based month, 1..=12.
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Number of days in this month.
    pub fn days(&self) -> u32 {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        let first_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .unwrap_or_else(|| NaiveDate::from_ymd_opt(self.year, self.month, 28).unwrap());
        (first_next - Duration::days(1)).day()
    }

    /// The given day-of-month as a concrete date, when it exists.
    pub fn date(&self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }

    pub fn first_day(&self) -> NaiveDate {
        self.date(1).expect("month keys always contain day 1")
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        *self == Self::from_date(date)
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

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = ExpenseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid =
            || ExpenseError::Validation(format!("invalid month `{}` (use YYYY-MM)", value));
        let (year_part, month_part) = value.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year_part.parse().map_err(|_| invalid())?;
        let month: u32 = month_part.parse().map_err(|_| invalid())?;
        MonthKey::new(year, month).ok_or_else(invalid)
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}
