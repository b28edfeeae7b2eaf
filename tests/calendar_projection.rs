use chrono::NaiveDate;
use expense_core::book::{
    daily_totals, day_detail, monthly_category_sums, Category, CategoryFilter, Expense, MonthKey,
    RecurringRule,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn month(y: i32, m: u32) -> MonthKey {
    MonthKey::new(y, m).unwrap()
}

fn rule(name: &str, amount: i64, category: Category, day: u32, start: &str) -> RecurringRule {
    RecurringRule::new(name, amount, category, day, start.parse().unwrap()).unwrap()
}

#[test]
fn day_31_rule_fires_on_last_day_of_short_months() {
    let rent = rule("rent", 1000, Category::Essential, 31, "2023-01");

    // Leap-year February 2024 has 29 days.
    assert!(rent.fires_on(date(2024, 2, 29)));
    assert_eq!(rent.firing_amount(), 1000);
    let feb24 = daily_totals(month(2024, 2), &[], &[rent.clone()], CategoryFilter::All);
    assert_eq!(feb24[&29], 1000);
    assert!(feb24.iter().filter(|(_, &total)| total > 0).count() == 1);

    // February 2023 has 28 days.
    assert!(rent.fires_on(date(2023, 2, 28)));
    // The start gate still applies to clamped firings.
    assert!(!rent.fires_on(date(2022, 2, 28)));
    let feb23 = daily_totals(month(2023, 2), &[], &[rent], CategoryFilter::All);
    assert_eq!(feb23[&28], 1000);
}

#[test]
fn mixed_day_total_honours_the_active_filter() {
    let expenses = vec![Expense::new(
        "keyboard",
        5000,
        Category::Spend,
        date(2025, 3, 10),
        "",
    )
    .unwrap()];
    let rules = vec![rule("gym", 2000, Category::Essential, 10, "2024-01")];

    let all = daily_totals(month(2025, 3), &expenses, &rules, CategoryFilter::All);
    assert_eq!(all[&10], 7000);

    let essential = daily_totals(
        month(2025, 3),
        &expenses,
        &rules,
        CategoryFilter::Only(Category::Essential),
    );
    assert_eq!(essential[&10], 2000);

    let detail = day_detail(
        date(2025, 3, 10),
        &expenses,
        &rules,
        CategoryFilter::Only(Category::Essential),
    );
    assert_eq!(detail.len(), 1);
    assert!(detail[0].recurring);
}

#[test]
fn monthly_sums_are_independent_of_month_length() {
    let rules = vec![
        rule("rent", 400_000, Category::Essential, 31, "2023-01"),
        rule("fund", 100_000, Category::Invest, 15, "2023-01"),
        rule("music", 11_000, Category::Spend, 1, "2023-01"),
    ];

    for key in [month(2023, 2), month(2024, 2), month(2024, 6), month(2024, 7)] {
        let sums = monthly_category_sums(key, &[], &rules);
        assert_eq!(sums.essential, 400_000, "essential in {}", key);
        assert_eq!(sums.invest, 100_000, "invest in {}", key);
        assert_eq!(sums.spend, 11_000, "spend in {}", key);
    }
}

#[test]
fn rules_do_not_fire_before_their_start_month() {
    let netflix = rule("netflix", 17_000, Category::Spend, 15, "2025-03");

    assert!(!netflix.fires_on(date(2025, 2, 15)));
    let before = monthly_category_sums(month(2025, 2), &[], &[netflix.clone()]);
    assert_eq!(before.spend, 0);

    let from_start = monthly_category_sums(month(2025, 3), &[], &[netflix.clone()]);
    assert_eq!(from_start.spend, 17_000);
    let later = monthly_category_sums(month(2027, 11), &[], &[netflix]);
    assert_eq!(later.spend, 17_000);
}

#[test]
fn inactive_rules_stay_listable_but_never_fire() {
    let mut gym = rule("gym", 60_000, Category::Essential, 5, "2024-01");
    gym.active = false;
    let rules = vec![gym];

    // Still present in the rule list the caller holds…
    assert_eq!(rules.len(), 1);
    // …but invisible to every aggregation.
    for day in 1..=31 {
        assert!(!rules[0].fires_on(date(2024, 7, day)));
    }
    let sums = monthly_category_sums(month(2024, 7), &[], &rules);
    assert_eq!(sums.total(), 0);
}

#[test]
fn aggregation_is_deterministic_for_equal_snapshots() {
    let expenses = vec![
        Expense::new("a", 3000, Category::Spend, date(2025, 3, 10), "").unwrap(),
        Expense::new("b", 3000, Category::Invest, date(2025, 3, 10), "").unwrap(),
    ];
    let rules = vec![rule("c", 3000, Category::Essential, 10, "2024-01")];

    let first = day_detail(date(2025, 3, 10), &expenses, &rules, CategoryFilter::All);
    let second = day_detail(date(2025, 3, 10), &expenses, &rules, CategoryFilter::All);
    assert_eq!(first, second);
    // Equal amounts keep input order: records first, virtual instance last.
    let names: Vec<&str> = first.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
}
