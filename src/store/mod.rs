//! Persistent store collaborators for the expense book.
//!
//! The shipped backend is [`JsonStore`], a single JSON document written
//! atomically. Change notifications are modelled as `mpsc` channels that
//! deliver full replacement snapshots, including one initial snapshot on
//! subscribe, mirroring a remote document store's live queries.

pub mod json_store;

use std::sync::mpsc::Receiver;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::book::{Expense, MonthKey, RecurringRule};
use crate::errors::{ExpenseError, Result};

pub use json_store::JsonStore;

/// External JSON backup shape: exactly two sequences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Backup {
    pub expenses: Vec<Expense>,
    pub recurring: Vec<RecurringRule>,
}

impl Backup {
    /// Parses a backup document, rejecting the whole document on any
    /// missing or malformed field.
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| ExpenseError::Import(format!("malformed backup document: {}", err)))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Store surface the presentation layer talks to.
pub trait ExpenseStore {
    /// Current expense records whose `month_key` matches, amount descending.
    fn expenses_for_month(&self, month: MonthKey) -> Vec<Expense>;

    /// Current recurring rules, inactive ones included (they stay listed so
    /// they can be deleted, they just never fire).
    fn rules(&self) -> Vec<RecurringRule>;

    /// Subscribes to the month-scoped expense snapshot. The initial
    /// snapshot is delivered immediately; every subsequent change delivers
    /// a full replacement.
    fn subscribe_expenses(&mut self, month: MonthKey) -> Receiver<Vec<Expense>>;

    /// Subscribes to the unscoped recurring-rule snapshot.
    fn subscribe_rules(&mut self) -> Receiver<Vec<RecurringRule>>;

    fn add_expense(&mut self, expense: Expense) -> Result<Uuid>;

    /// Deleting an id that is already absent is a no-op, not an error.
    fn delete_expense(&mut self, id: Uuid) -> Result<()>;

    fn add_rule(&mut self, rule: RecurringRule) -> Result<Uuid>;

    fn delete_rule(&mut self, id: Uuid) -> Result<()>;

    /// Applies a backup all-or-nothing: either every record lands or the
    /// store is left untouched.
    fn import(&mut self, backup: Backup) -> Result<()>;

    fn export(&self) -> Backup;
}
