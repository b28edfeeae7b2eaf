use chrono::NaiveDate;
use expense_core::book::{Category, Expense, MonthKey, RecurringRule};
use expense_core::store::{Backup, ExpenseStore, JsonStore};
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn open_store(dir: &TempDir, name: &str) -> JsonStore {
    JsonStore::open(dir.path().join(name)).expect("json store")
}

fn populate(store: &mut JsonStore) {
    store
        .add_expense(
            Expense::new("lunch", 9000, Category::Essential, date(2025, 3, 10), "team").unwrap(),
        )
        .unwrap();
    store
        .add_expense(Expense::new("etf", 100_000, Category::Invest, date(2025, 3, 1), "").unwrap())
        .unwrap();
    store
        .add_rule(
            RecurringRule::new("rent", 400_000, Category::Essential, 31, "2024-01".parse().unwrap())
                .unwrap(),
        )
        .unwrap();
}

#[test]
fn export_then_import_reproduces_the_record_multiset() {
    let dir = TempDir::new().unwrap();
    let mut source = open_store(&dir, "source.json");
    populate(&mut source);

    let json = source.export().to_json().unwrap();

    let mut target = open_store(&dir, "target.json");
    target.import(Backup::from_json(&json).unwrap()).unwrap();

    let month = MonthKey::new(2025, 3).unwrap();
    let exported = source.expenses_for_month(month);
    let imported = target.expenses_for_month(month);
    assert_eq!(exported.len(), imported.len());
    for (a, b) in exported.iter().zip(&imported) {
        // Ids may differ; every other field must survive the round trip.
        assert_eq!(a.name, b.name);
        assert_eq!(a.amount, b.amount);
        assert_eq!(a.category, b.category);
        assert_eq!(a.date, b.date);
        assert_eq!(a.month_key, b.month_key);
        assert_eq!(a.memo, b.memo);
    }

    let rules = target.rules();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].name, "rent");
    assert_eq!(rules[0].resolved_start(), MonthKey::new(2024, 1));
    assert!(rules[0].active);
}

#[test]
fn import_is_all_or_nothing() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir, "book.json");
    populate(&mut store);

    // Structurally broken documents never reach the store.
    for raw in [
        "{}",
        r#"{"expenses": []}"#,
        r#"{"recurring": []}"#,
        r#"{"expenses": [{"name": "half a record"}], "recurring": []}"#,
    ] {
        assert!(Backup::from_json(raw).is_err(), "accepted: {raw}");
    }
    assert_eq!(store.export().expenses.len(), 2);
    assert_eq!(store.export().recurring.len(), 1);
}

#[test]
fn import_normalises_stale_month_keys() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir, "book.json");

    // A backup whose monthKey drifted from its date.
    let raw = r#"{
        "expenses": [{
            "id": "a2b44ad8-6bd6-4f8e-9fb1-6f6f0b4c7a9e",
            "name": "drifted",
            "amount": 4000,
            "category": "spend",
            "date": "2025-03-10",
            "monthKey": "2024-01"
        }],
        "recurring": []
    }"#;
    store.import(Backup::from_json(raw).unwrap()).unwrap();

    let snapshot = store.expenses_for_month(MonthKey::new(2025, 3).unwrap());
    assert_eq!(snapshot.len(), 1);
    assert!(snapshot[0].month_key_consistent());
}

#[test]
fn deleting_absent_ids_after_import_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir, "book.json");
    populate(&mut store);

    let ghost = uuid::Uuid::new_v4();
    store.delete_expense(ghost).expect("idempotent");
    store.delete_rule(ghost).expect("idempotent");
    assert_eq!(store.export().expenses.len(), 2);
    assert_eq!(store.export().recurring.len(), 1);
}

#[test]
fn legacy_rules_survive_import_with_fallback_start_fields() {
    let dir = TempDir::new().unwrap();
    let mut store = open_store(&dir, "book.json");

    let raw = r#"{
        "expenses": [],
        "recurring": [{
            "id": "a2b44ad8-6bd6-4f8e-9fb1-6f6f0b4c7a9f",
            "name": "gym",
            "amount": 60000,
            "category": "essential",
            "day": 1,
            "startYear": 2025,
            "startMonth": 0
        }]
    }"#;
    store.import(Backup::from_json(raw).unwrap()).unwrap();

    let rules = store.rules();
    assert_eq!(rules.len(), 1);
    // Zero-based wire month: 0 means January. Missing `active` means true.
    assert_eq!(rules[0].resolved_start(), MonthKey::new(2025, 1));
    assert!(rules[0].active);
}
