use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::book::{Expense, MonthKey, RecurringRule};
use crate::errors::Result;
use crate::utils::ensure_dir;

use super::{Backup, ExpenseStore};

const TMP_SUFFIX: &str = "tmp";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct BookData {
    #[serde(default)]
    expenses: Vec<Expense>,
    #[serde(default)]
    recurring: Vec<RecurringRule>,
}

/// File-backed expense store.
///
/// Every mutation is applied to a working copy, persisted atomically
/// (temp file + rename), and only then committed to the in-memory book and
/// broadcast to subscribers. A failed write therefore leaves both the file
/// and every observable snapshot unchanged, which is what lets the shell
/// treat displayed state as confirmed store state.
pub struct JsonStore {
    path: PathBuf,
    book: BookData,
    expense_subs: Vec<(MonthKey, Sender<Vec<Expense>>)>,
    rule_subs: Vec<Sender<Vec<RecurringRule>>>,
}

impl JsonStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let book = if path.exists() {
            let data = fs::read_to_string(&path)?;
            serde_json::from_str(&data)?
        } else {
            BookData::default()
        };
        tracing::debug!(
            path = %path.display(),
            expenses = book.expenses.len(),
            rules = book.recurring.len(),
            "expense book opened"
        );
        Ok(Self {
            path,
            book,
            expense_subs: Vec::new(),
            rule_subs: Vec::new(),
        })
    }

    pub fn open_default() -> Result<Self> {
        let path = crate::utils::default_book_path();
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, book: &BookData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(book)?;
        let tmp = tmp_path(&self.path);
        write_file(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Persists the working copy, then commits and notifies. The commit
    /// only happens after the write succeeded.
    fn commit(&mut self, next: BookData, expenses_changed: bool, rules_changed: bool) -> Result<()> {
        self.persist(&next)?;
        self.book = next;
        if expenses_changed {
            self.notify_expense_subs();
        }
        if rules_changed {
            self.notify_rule_subs();
        }
        Ok(())
    }

    fn notify_expense_subs(&mut self) {
        let book = &self.book;
        self.expense_subs.retain(|(month, sender)| {
            sender.send(month_snapshot(book, *month)).is_ok()
        });
    }

    fn notify_rule_subs(&mut self) {
        let snapshot = self.book.recurring.clone();
        self.rule_subs
            .retain(|sender| sender.send(snapshot.clone()).is_ok());
    }
}

fn month_snapshot(book: &BookData, month: MonthKey) -> Vec<Expense> {
    let mut snapshot: Vec<Expense> = book
        .expenses
        .iter()
        .filter(|expense| expense.month_key == month)
        .cloned()
        .collect();
    // Same ordering the original store query used.
    snapshot.sort_by_key(|expense| std::cmp::Reverse(expense.amount));
    snapshot
}

impl ExpenseStore for JsonStore {
    fn expenses_for_month(&self, month: MonthKey) -> Vec<Expense> {
        month_snapshot(&self.book, month)
    }

    fn rules(&self) -> Vec<RecurringRule> {
        self.book.recurring.clone()
    }

    fn subscribe_expenses(&mut self, month: MonthKey) -> Receiver<Vec<Expense>> {
        let (sender, receiver) = channel();
        // Initial snapshot; a dead receiver is pruned on the next change.
        let _ = sender.send(month_snapshot(&self.book, month));
        self.expense_subs.push((month, sender));
        receiver
    }

    fn subscribe_rules(&mut self) -> Receiver<Vec<RecurringRule>> {
        let (sender, receiver) = channel();
        let _ = sender.send(self.book.recurring.clone());
        self.rule_subs.push(sender);
        receiver
    }

    fn add_expense(&mut self, expense: Expense) -> Result<Uuid> {
        let id = expense.id;
        let mut next = self.book.clone();
        next.expenses.push(expense);
        self.commit(next, true, false)?;
        tracing::debug!(%id, "expense added");
        Ok(id)
    }

    fn delete_expense(&mut self, id: Uuid) -> Result<()> {
        if !self.book.expenses.iter().any(|expense| expense.id == id) {
            tracing::debug!(%id, "delete of absent expense ignored");
            return Ok(());
        }
        let mut next = self.book.clone();
        next.expenses.retain(|expense| expense.id != id);
        self.commit(next, true, false)?;
        tracing::debug!(%id, "expense deleted");
        Ok(())
    }

    fn add_rule(&mut self, rule: RecurringRule) -> Result<Uuid> {
        let id = rule.id;
        let mut next = self.book.clone();
        next.recurring.push(rule);
        self.commit(next, false, true)?;
        tracing::debug!(%id, "recurring rule added");
        Ok(id)
    }

    fn delete_rule(&mut self, id: Uuid) -> Result<()> {
        if !self.book.recurring.iter().any(|rule| rule.id == id) {
            tracing::debug!(%id, "delete of absent rule ignored");
            return Ok(());
        }
        let mut next = self.book.clone();
        next.recurring.retain(|rule| rule.id != id);
        self.commit(next, false, true)?;
        tracing::debug!(%id, "recurring rule deleted");
        Ok(())
    }

    fn import(&mut self, backup: Backup) -> Result<()> {
        let mut next = self.book.clone();
        for mut expense in backup.expenses {
            // Imported records get fresh ids; the month key is re-derived
            // rather than trusted.
            expense.id = Uuid::new_v4();
            expense.normalize();
            next.expenses.push(expense);
        }
        for mut rule in backup.recurring {
            rule.id = Uuid::new_v4();
            next.recurring.push(rule);
        }
        let imported_expenses = next.expenses.len() - self.book.expenses.len();
        let imported_rules = next.recurring.len() - self.book.recurring.len();
        self.commit(next, true, true)?;
        tracing::info!(imported_expenses, imported_rules, "backup imported");
        Ok(())
    }

    fn export(&self) -> Backup {
        Backup {
            expenses: self.book.expenses.clone(),
            recurring: self.book.recurring.clone(),
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_file(path: &Path, data: &str) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
