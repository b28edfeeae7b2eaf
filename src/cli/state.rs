use std::collections::BTreeMap;
use std::sync::mpsc::Receiver;

use chrono::{Datelike, NaiveDate};

use crate::book::{
    daily_totals, day_detail, monthly_category_sums, CategoryFilter, CategorySums, Expense,
    LineItem, MonthKey, RecurringRule,
};
use crate::store::ExpenseStore;

/// The three aggregation views, always derived from one snapshot so they
/// can never disagree about a mutation.
pub struct MonthViews {
    pub daily: BTreeMap<u32, i64>,
    pub detail: Vec<LineItem>,
    pub sums: CategorySums,
}

/// Presentation-side state: the displayed month, the selected date, the
/// active category filter, and the latest store snapshots.
///
/// The engine itself is pure; this is the single mutable current-state
/// value the shell owns and re-derives views from.
pub struct ViewState {
    month: MonthKey,
    selected: NaiveDate,
    pub filter: CategoryFilter,
    expenses: Vec<Expense>,
    rules: Vec<RecurringRule>,
    expense_rx: Receiver<Vec<Expense>>,
    rule_rx: Receiver<Vec<RecurringRule>>,
}

impl ViewState {
    pub fn bind(store: &mut dyn ExpenseStore, today: NaiveDate) -> Self {
        let month = MonthKey::from_date(today);
        let expense_rx = store.subscribe_expenses(month);
        let rule_rx = store.subscribe_rules();
        let mut state = Self {
            month,
            selected: today,
            filter: CategoryFilter::All,
            expenses: Vec::new(),
            rules: Vec::new(),
            expense_rx,
            rule_rx,
        };
        state.sync();
        state
    }

    pub fn month(&self) -> MonthKey {
        self.month
    }

    pub fn selected(&self) -> NaiveDate {
        self.selected
    }

    pub fn expenses(&self) -> &[Expense] {
        &self.expenses
    }

    pub fn rules(&self) -> &[RecurringRule] {
        &self.rules
    }

    /// Drains pending notifications, keeping only the newest snapshot of
    /// each kind. Everything rendered afterwards comes from that state.
    pub fn sync(&mut self) {
        if let Some(snapshot) = self.expense_rx.try_iter().last() {
            self.expenses = snapshot;
        }
        if let Some(snapshot) = self.rule_rx.try_iter().last() {
            self.rules = snapshot;
        }
    }

    /// Switches the displayed month, rebinding the month-scoped expense
    /// subscription. Dropping the old receiver discards anything still tied
    /// to the previous scope; the store prunes the dead sender on its next
    /// change.
    pub fn show_month(&mut self, store: &mut dyn ExpenseStore, month: MonthKey) {
        if month == self.month {
            return;
        }
        self.expense_rx = store.subscribe_expenses(month);
        self.expenses = Vec::new();
        self.month = month;
        let day = self.selected.day().min(month.days());
        self.selected = month
            .date(day)
            .unwrap_or_else(|| month.first_day());
        self.sync();
    }

    /// Selects a date, following it to another month when needed.
    pub fn select(&mut self, store: &mut dyn ExpenseStore, date: NaiveDate) {
        let month = MonthKey::from_date(date);
        if month != self.month {
            self.show_month(store, month);
        }
        self.selected = date;
    }

    pub fn views(&self) -> MonthViews {
        MonthViews {
            daily: daily_totals(self.month, &self.expenses, &self.rules, self.filter),
            detail: day_detail(self.selected, &self.expenses, &self.rules, self.filter),
            sums: monthly_category_sums(self.month, &self.expenses, &self.rules),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::Category;
    use crate::store::JsonStore;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (JsonStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = JsonStore::open(temp.path().join("book.json")).unwrap();
        (store, temp)
    }

    #[test]
    fn views_reflect_mutations_consistently() {
        let (mut store, _guard) = setup();
        let today = date(2025, 3, 10);
        let mut state = ViewState::bind(&mut store, today);

        let expense =
            Expense::new("lunch", 5000, Category::Spend, today, "").unwrap();
        let id = store.add_expense(expense).unwrap();
        state.sync();

        let views = state.views();
        assert_eq!(views.daily[&10], 5000);
        assert_eq!(views.detail.len(), 1);
        assert_eq!(views.sums.spend, 5000);

        store.delete_expense(id).unwrap();
        state.sync();
        let views = state.views();
        // All three views agree after the deletion; no torn read.
        assert_eq!(views.daily[&10], 0);
        assert!(views.detail.is_empty());
        assert_eq!(views.sums.spend, 0);
    }

    #[test]
    fn month_switch_rebinds_scope_and_clamps_selection() {
        let (mut store, _guard) = setup();
        let mut state = ViewState::bind(&mut store, date(2025, 3, 31));

        state.show_month(&mut store, MonthKey::new(2025, 4).unwrap());
        assert_eq!(state.selected(), date(2025, 4, 30));

        let expense =
            Expense::new("april", 7000, Category::Invest, date(2025, 4, 5), "").unwrap();
        store.add_expense(expense).unwrap();
        state.sync();
        assert_eq!(state.expenses().len(), 1);

        // Back to March: the April record is out of scope again.
        state.show_month(&mut store, MonthKey::new(2025, 3).unwrap());
        assert!(state.expenses().is_empty());
    }

    #[test]
    fn select_follows_dates_into_other_months() {
        let (mut store, _guard) = setup();
        let mut state = ViewState::bind(&mut store, date(2025, 3, 10));
        state.select(&mut store, date(2025, 5, 2));
        assert_eq!(state.month(), MonthKey::new(2025, 5).unwrap());
        assert_eq!(state.selected(), date(2025, 5, 2));
    }
}
