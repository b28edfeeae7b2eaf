use expense_core::cli::{output, run_cli};

fn main() {
    expense_core::init();
    if let Err(err) = run_cli() {
        output::error(err.to_string());
        std::process::exit(1);
    }
}
