#![doc(test(attr(deny(warnings))))]

//! Expense Core offers the calendar aggregation, recurring-rule projection,
//! and storage primitives behind a small expense-tracking shell.

pub mod book;
pub mod cli;
pub mod errors;
pub mod store;
pub mod utils;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Expense Core tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
    }
}
