use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Category, MonthKey};
use crate::errors::{ExpenseError, Result};

/// A one-off recorded expense.
///
/// `month_key` is the denormalised year-month of `date`, kept for
/// month-scoped queries. The invariant `month_key == MonthKey::from_date(date)`
/// is enforced here in [`Expense::new`], the single write boundary; records
/// arriving from old backups are normalised on import instead of trusted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Expense {
    pub id: Uuid,
    pub name: String,
    pub amount: i64,
    pub category: Category,
    pub date: NaiveDate,
    #[serde(rename = "monthKey")]
    pub month_key: MonthKey,
    #[serde(default)]
    pub memo: String,
}

impl Expense {
    pub fn new(
        name: impl Into<String>,
        amount: i64,
        category: Category,
        date: NaiveDate,
        memo: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ExpenseError::Validation("expense name is empty".into()));
        }
        if amount <= 0 {
            return Err(ExpenseError::Validation(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name,
            amount,
            category,
            date,
            month_key: MonthKey::from_date(date),
            memo: memo.into(),
        })
    }

    /// Re-derives `month_key` from `date`, repairing stale denormalisation.
    pub fn normalize(&mut self) {
        self.month_key = MonthKey::from_date(self.date);
    }

    pub fn month_key_consistent(&self) -> bool {
        self.month_key == MonthKey::from_date(self.date)
    }
}
