use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

#[test]
fn script_mode_runs_basic_flow() {
    let data_dir = TempDir::new().unwrap();
    let input = "\
month 2025-03
add lunch 5000 spend 2025-03-10 sandwich
radd gym 2000 essential 10 2024-01
day 2025-03-10
sums
exit
";

    let mut cmd = Command::cargo_bin("expense_core_cli").unwrap();
    cmd.env("EXPENSE_CORE_CLI_SCRIPT", "1")
        .env("EXPENSE_CORE_DATA_DIR", data_dir.path())
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Recorded `lunch`"))
        .stdout(contains("recurring"))
        .stdout(contains("5,000"))
        .stdout(contains("2,000"));

    let json = std::fs::read_to_string(data_dir.path().join("book.json")).unwrap();
    assert!(json.contains("\"lunch\""));
    assert!(json.contains("\"monthKey\": \"2025-03\""));
    assert!(json.contains("\"gym\""));
}

#[test]
fn script_mode_rejects_bad_input_without_writing() {
    let data_dir = TempDir::new().unwrap();
    let input = "\
add lunch abc spend
add lunch 500 snacks
exit
";

    let mut cmd = Command::cargo_bin("expense_core_cli").unwrap();
    cmd.env("EXPENSE_CORE_CLI_SCRIPT", "1")
        .env("EXPENSE_CORE_DATA_DIR", data_dir.path())
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("invalid amount"))
        .stdout(contains("unknown category"));

    // Nothing valid was submitted, so the book was never created.
    assert!(!data_dir.path().join("book.json").exists());
}

#[test]
fn filter_toggle_round_trips_in_the_prompt_flow() {
    let data_dir = TempDir::new().unwrap();
    let input = "\
filter invest
filter invest
exit
";

    let mut cmd = Command::cargo_bin("expense_core_cli").unwrap();
    cmd.env("EXPENSE_CORE_CLI_SCRIPT", "1")
        .env("EXPENSE_CORE_DATA_DIR", data_dir.path())
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Filter: invest."))
        .stdout(contains("Filter: all."));
}
