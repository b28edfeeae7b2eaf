use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ExpenseError;

/// The three fixed spending buckets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Essential,
    Invest,
    Spend,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Essential, Category::Invest, Category::Spend];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Essential => "essential",
            Category::Invest => "invest",
            Category::Spend => "spend",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = ExpenseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "essential" => Ok(Category::Essential),
            "invest" => Ok(Category::Invest),
            "spend" => Ok(Category::Spend),
            other => Err(ExpenseError::Validation(format!(
                "unknown category `{}` (expected essential, invest, or spend)",
                other
            ))),
        }
    }
}

/// The single active category restricting displayed totals.
///
/// Process-local view state, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(active) => *active == category,
        }
    }

    /// Selecting the active category again clears the filter back to `All`.
    pub fn toggle(&mut self, category: Category) {
        *self = if *self == CategoryFilter::Only(category) {
            CategoryFilter::All
        } else {
            CategoryFilter::Only(category)
        };
    }

    pub fn is_all(&self) -> bool {
        matches!(self, CategoryFilter::All)
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryFilter::All => f.write_str("all"),
            CategoryFilter::Only(category) => write!(f, "{}", category),
        }
    }
}
