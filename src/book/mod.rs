//! Expense-book domain models, the recurring-rule evaluator, and the
//! calendar aggregation engine.

pub mod category;
pub mod engine;
pub mod expense;
pub mod month;
pub mod recurring;

pub use category::{Category, CategoryFilter};
pub use engine::{daily_totals, day_detail, monthly_category_sums, CategorySums, LineItem};
pub use expense::Expense;
pub use month::MonthKey;
pub use recurring::RecurringRule;
