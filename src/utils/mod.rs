use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;

use crate::errors::Result;

const DATA_DIR_ENV: &str = "EXPENSE_CORE_DATA_DIR";
const BOOK_FILE: &str = "book.json";

static TRACING_INIT: Once = Once::new();

/// Initializes the global tracing subscriber with sensible defaults.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::from_default_env().add_directive("expense_core=info".parse().unwrap());

        fmt().with_env_filter(filter).init();
    });
}

/// Resolves the application data directory.
///
/// `EXPENSE_CORE_DATA_DIR` wins when set (scripted runs and tests point it
/// at a scratch directory); otherwise the platform data directory is used,
/// falling back to the current directory.
pub fn data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("expense_core")
}

/// Default path of the persisted expense book.
pub fn default_book_path() -> PathBuf {
    data_dir().join(BOOK_FILE)
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
