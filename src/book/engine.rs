//! Calendar aggregation over expense snapshots and recurring rules.
//!
//! All three operations are pure functions of the snapshot they are given:
//! the engine never reads the clock, so every view rendered from one
//! snapshot is mutually consistent.

use std::cmp::Reverse;
use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use super::{Category, CategoryFilter, Expense, MonthKey, RecurringRule};

/// One row of a day-detail view: either a real expense record or a virtual
/// instance synthesised from a recurring rule for that date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    /// Stable display id; virtual instances use `rec-<rule-id>-<date>`.
    pub id: String,
    /// Id of the backing record: the expense itself, or the rule the
    /// instance was projected from (deleting a virtual instance means
    /// deleting that rule).
    pub source_id: Uuid,
    pub name: String,
    pub amount: i64,
    pub category: Category,
    pub memo: String,
    /// Virtual instances are not independently deletable.
    pub recurring: bool,
}

impl LineItem {
    fn from_expense(expense: &Expense) -> Self {
        Self {
            id: expense.id.to_string(),
            source_id: expense.id,
            name: expense.name.clone(),
            amount: expense.amount,
            category: expense.category,
            memo: expense.memo.clone(),
            recurring: false,
        }
    }

    fn from_rule(rule: &RecurringRule, date: NaiveDate) -> Self {
        Self {
            id: format!("rec-{}-{}", rule.id, date),
            source_id: rule.id,
            name: rule.name.clone(),
            amount: rule.firing_amount(),
            category: rule.category,
            memo: String::new(),
            recurring: true,
        }
    }
}

/// Per-category sums for one month, always covering all three buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategorySums {
    pub essential: i64,
    pub invest: i64,
    pub spend: i64,
}

impl CategorySums {
    pub fn get(&self, category: Category) -> i64 {
        match category {
            Category::Essential => self.essential,
            Category::Invest => self.invest,
            Category::Spend => self.spend,
        }
    }

    fn add(&mut self, category: Category, amount: i64) {
        match category {
            Category::Essential => self.essential += amount,
            Category::Invest => self.invest += amount,
            Category::Spend => self.spend += amount,
        }
    }

    pub fn total(&self) -> i64 {
        self.essential + self.invest + self.spend
    }
}

/// Summed amounts per day of the target month, one entry for every day
/// 1..=`month.days()`. Drives the calendar cells.
pub fn daily_totals(
    month: MonthKey,
    expenses: &[Expense],
    rules: &[RecurringRule],
    filter: CategoryFilter,
) -> BTreeMap<u32, i64> {
    let mut totals: BTreeMap<u32, i64> = (1..=month.days()).map(|day| (day, 0)).collect();

    for expense in expenses {
        if !month.contains(expense.date) || !filter.matches(expense.category) {
            continue;
        }
        if let Some(total) = totals.get_mut(&expense.date.day()) {
            *total += expense.amount;
        }
    }

    for rule in rules {
        if !filter.matches(rule.category) {
            continue;
        }
        if let Some(date) = rule.firing_date(month) {
            if let Some(total) = totals.get_mut(&date.day()) {
                *total += rule.firing_amount();
            }
        }
    }

    totals
}

/// Itemised list for one date: real records on that date unioned with the
/// virtual instances of every rule firing that day, filtered, then
/// stable-sorted by amount descending (ties keep input order, records
/// before virtual instances).
pub fn day_detail(
    date: NaiveDate,
    expenses: &[Expense],
    rules: &[RecurringRule],
    filter: CategoryFilter,
) -> Vec<LineItem> {
    let mut items: Vec<LineItem> = expenses
        .iter()
        .filter(|expense| expense.date == date && filter.matches(expense.category))
        .map(LineItem::from_expense)
        .collect();

    items.extend(
        rules
            .iter()
            .filter(|rule| rule.fires_on(date) && filter.matches(rule.category))
            .map(|rule| LineItem::from_rule(rule, date)),
    );

    items.sort_by_key(|item| Reverse(item.amount));
    items
}

/// Per-category totals for the month, never filtered: this view drives the
/// filter selection itself, so all three buckets stay visible side by side.
///
/// Expenses are matched on their stored `month_key`; each active, eligible
/// rule contributes its amount exactly once per month it is eligible for,
/// regardless of how many days that month has.
pub fn monthly_category_sums(
    month: MonthKey,
    expenses: &[Expense],
    rules: &[RecurringRule],
) -> CategorySums {
    let mut sums = CategorySums::default();

    for expense in expenses {
        if expense.month_key == month {
            sums.add(expense.category, expense.amount);
        }
    }

    for rule in rules {
        if rule.eligible_in(month) {
            sums.add(rule.category, rule.firing_amount());
        }
    }

    sums
}
