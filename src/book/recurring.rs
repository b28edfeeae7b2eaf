use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Category, MonthKey};
use crate::errors::{ExpenseError, Result};

const MIN_DAY: u32 = 1;
const MAX_DAY: u32 = 31;

/// A monthly recurring expense rule: fires on a fixed day-of-month from a
/// start month onward, with no end date.
///
/// The canonical start representation is the `start` month token. Older
/// stored rules carry `startYear`/`startMonth` (month zero-based) instead,
/// which [`RecurringRule::resolved_start`] reads as a fallback. A rule whose
/// start cannot be resolved never fires.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecurringRule {
    pub id: Uuid,
    pub name: String,
    pub amount: i64,
    pub category: Category,
    pub day: u32,
    #[serde(
        rename = "startYear",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub start_year: Option<i32>,
    /// Zero-based month on the wire, matching historical records.
    #[serde(
        rename = "startMonth",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub start_month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<MonthKey>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl RecurringRule {
    pub fn new(
        name: impl Into<String>,
        amount: i64,
        category: Category,
        day: u32,
        start: MonthKey,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ExpenseError::Validation("rule name is empty".into()));
        }
        if amount <= 0 {
            return Err(ExpenseError::Validation(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        if !(MIN_DAY..=MAX_DAY).contains(&day) {
            return Err(ExpenseError::Validation(format!(
                "day must be within 1..=31, got {}",
                day
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            amount,
            category,
            day,
            start_year: Some(start.year()),
            start_month: Some(start.month() - 1),
            start: Some(start),
            active: true,
        })
    }

    /// The first month this rule may fire in, if it can be resolved.
    ///
    /// The explicit `start` token wins; otherwise the pair
    /// (`startYear`, zero-based `startMonth`) is used when both are present.
    /// `None` means the rule never fires, by design: an unresolvable start
    /// must fail closed rather than fire in every month.
    pub fn resolved_start(&self) -> Option<MonthKey> {
        if let Some(start) = self.start {
            return Some(start);
        }
        match (self.start_year, self.start_month) {
            (Some(year), Some(month0)) => month0
                .checked_add(1)
                .and_then(|month| MonthKey::new(year, month)),
            _ => None,
        }
    }

    /// Whether this rule can produce firings at all. Historical records may
    /// carry out-of-range days or non-positive amounts; such rules degrade
    /// to "never fires" instead of aborting aggregation.
    fn projectable(&self) -> bool {
        self.active && self.amount > 0 && (MIN_DAY..=MAX_DAY).contains(&self.day)
    }

    /// Whether the rule fires at all in the given month.
    pub fn eligible_in(&self, month: MonthKey) -> bool {
        if !self.projectable() {
            return false;
        }
        match self.resolved_start() {
            Some(start) => start <= month,
            None => false,
        }
    }

    /// The day-of-month the rule fires on in the given month: the nominal
    /// day clamped to the month length, so a day-31 rule fires on Feb 28/29.
    /// Recomputed per month, never cached.
    pub fn effective_day(&self, month: MonthKey) -> Option<u32> {
        if !(MIN_DAY..=MAX_DAY).contains(&self.day) {
            return None;
        }
        Some(self.day.min(month.days()))
    }

    /// Whether this rule fires on the exact date.
    pub fn fires_on(&self, date: NaiveDate) -> bool {
        let month = MonthKey::from_date(date);
        if !self.eligible_in(month) {
            return false;
        }
        self.effective_day(month) == Some(date.day())
    }

    /// Amount contributed by a firing; exactly the rule amount, no proration.
    pub fn firing_amount(&self) -> i64 {
        self.amount
    }

    /// The concrete firing date within a month the rule is eligible for.
    pub fn firing_date(&self, month: MonthKey) -> Option<NaiveDate> {
        if !self.eligible_in(month) {
            return None;
        }
        self.effective_day(month).and_then(|day| month.date(day))
    }
}
