//! Smoke tests for the fintrax binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn fintrax(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("fintrax").unwrap();
    cmd.env("FINTRAX_DATA_DIR", dir.path()).env_remove("RUST_LOG");
    cmd
}

#[test]
fn records_transactions_and_reports_balance() {
    let dir = TempDir::new().unwrap();

    fintrax(&dir)
        .args(["txn", "add", "income", "1000.00", "Salary", "--date", "2024-01-05"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded transaction"));
    fintrax(&dir)
        .args([
            "txn", "add", "expense", "400", "Rent", "-c", "Housing", "--date", "2024-01-06",
        ])
        .assert()
        .success();

    fintrax(&dir)
        .arg("balance")
        .assert()
        .success()
        .stdout(predicate::str::contains("$600.00"))
        .stdout(predicate::str::contains("$1000.00"));

    fintrax(&dir)
        .args(["summary", "--period", "2024-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Summary for 2024-01"))
        .stdout(predicate::str::contains("Rent"));

    fintrax(&dir)
        .args(["categories", "--period", "2024-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Housing"))
        .stdout(predicate::str::contains("100.00%"));

    fintrax(&dir)
        .args(["txn", "list", "--period", "2024-01"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Salary"))
        .stdout(predicate::str::contains("-$400.00"));
}

#[test]
fn rejects_invalid_input() {
    let dir = TempDir::new().unwrap();

    fintrax(&dir)
        .args(["txn", "add", "expense", "-5", "Refund"])
        .assert()
        .failure();
    fintrax(&dir)
        .args(["txn", "add", "expense", "5", "Salary", "-c", "Income"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Validation"));
    fintrax(&dir)
        .args(["summary", "--period", "2024-13"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid period"));
}

#[test]
fn top_with_non_positive_limit_is_empty() {
    let dir = TempDir::new().unwrap();
    fintrax(&dir)
        .args(["top", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No spending"));
    fintrax(&dir)
        .args(["top", "-5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No spending"));
}

#[test]
fn trend_and_yoy_render() {
    let dir = TempDir::new().unwrap();
    fintrax(&dir)
        .args(["trend", "--months", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Period"));
    fintrax(&dir)
        .arg("yoy")
        .assert()
        .success()
        .stdout(predicate::str::contains("undefined"));

    fintrax(&dir)
        .args(["trend", "--months", "4000000"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid period"));
}

#[test]
fn recurring_obligations() {
    let dir = TempDir::new().unwrap();
    fintrax(&dir)
        .args(["recurring", "add", "60.00", "Internet", "--due-day", "15", "-c", "Utilities"])
        .assert()
        .success()
        .stdout(predicate::str::contains("due on day 15"));
    fintrax(&dir)
        .args(["recurring", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Internet"))
        .stdout(predicate::str::contains("$60.00"));
}

#[test]
fn exports_csv_to_stdout() {
    let dir = TempDir::new().unwrap();
    fintrax(&dir)
        .args(["txn", "add", "expense", "12.05", "Lunch", "-c", "Food", "--date", "2024-02-02"])
        .assert()
        .success();
    fintrax(&dir)
        .args(["export", "--format", "csv", "--output", "-"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "ID,Occurred At,Type,Category,Description,Amount,Signed Amount",
        ))
        .stdout(predicate::str::contains("Lunch,12.05,-12.05"));
}

#[test]
fn config_shows_paths() {
    let dir = TempDir::new().unwrap();
    fintrax(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Data directory"));
}
