pub mod core;
pub mod output;
mod shell;
pub mod state;

pub use self::core::CliError;
pub use shell::run_cli;
