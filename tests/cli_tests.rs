use assert_cmd::{cargo, prelude::*};
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;

fn setup_temp_home() -> TempDir {
    TempDir::new().expect("failed to create temp home")
}

fn clubbook(home: &TempDir) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("clubbook"));
    cmd.env("HOME", home.path());
    cmd.env_remove("CLUBBOOK_DB");
    cmd.env_remove("GOOGLE_SHEETS_CSV_URL");
    cmd.env_remove("GOOGLE_SHEETS_SHEET_ID");
    cmd
}

#[test]
fn init_creates_db_under_home() {
    let home = setup_temp_home();

    clubbook(&home)
        .arg("--no-color")
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Database initialized"))
        .stdout(predicate::str::contains("\u{001b}[").not());

    let db_path = home.path().join(".clubbook").join("data.db");
    assert!(db_path.exists(), "init should create the default db");
}

#[test]
fn members_list_empty_db() {
    let home = setup_temp_home();

    clubbook(&home).arg("init").assert().success();

    clubbook(&home)
        .arg("--no-color")
        .arg("members")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No members yet"));
}

#[test]
fn import_trades_then_list() {
    let home = setup_temp_home();

    let csv_path = home.path().join("trades.csv");
    std::fs::write(
        &csv_path,
        "Date,Ticker,Action,Shares,Price,Fees\n\
         2024-01-10,AAPL,Buy,10,185.50,0.25\n\
         2024-01-11,MSFT,Sell,5,402.10,1.00\n\
         2024-01-12,VTI,Hold,3,262.10,0.00\n",
    )
    .expect("failed to write fixture");

    clubbook(&home).arg("init").assert().success();

    clubbook(&home)
        .arg("--no-color")
        .arg("import")
        .arg("trades")
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 trades (1 rows skipped)"))
        .stdout(predicate::str::contains("\u{001b}[").not());

    clubbook(&home)
        .arg("--no-color")
        .arg("trades")
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("AAPL"))
        .stdout(predicate::str::contains("$185.50"))
        .stdout(predicate::str::contains("SELL"));
}

#[test]
fn import_positions_resolves_date_from_filename() {
    let home = setup_temp_home();

    let csv_path = home.path().join("Portfolio_Positions_Mar-29-2024.csv");
    std::fs::write(
        &csv_path,
        "Account Number,Account Name,Symbol,Description,Quantity,Last Price,Current Value\n\
         X12345678,Club,AAPL,APPLE INC,10,185.50,1855.00\n",
    )
    .expect("failed to write fixture");

    clubbook(&home).arg("init").assert().success();

    clubbook(&home)
        .arg("--no-color")
        .arg("import")
        .arg("fidelity-positions")
        .arg(&csv_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("2024-03-29"))
        .stdout(predicate::str::contains("1 rows"));
}

#[test]
fn live_prices_fetch_without_configuration_fails_cleanly() {
    let home = setup_temp_home();

    clubbook(&home).arg("init").assert().success();

    // no file, no --url, no sheet env vars
    clubbook(&home)
        .args(["import", "live-prices"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GOOGLE_SHEETS_CSV_URL"));
}

#[test]
fn members_add_reuses_existing_names() {
    let home = setup_temp_home();

    clubbook(&home).arg("init").assert().success();

    clubbook(&home)
        .arg("--no-color")
        .args(["members", "add", "--name", "Jane Doe", "--email", "jane@club.org"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Member 'Jane Doe' saved (id 1)"));

    // case-insensitive name match resolves to the same member
    clubbook(&home)
        .arg("--no-color")
        .args(["members", "add", "--name", "jane doe"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(id 1)"));

    clubbook(&home)
        .arg("--no-color")
        .args(["members", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Jane Doe"))
        .stdout(predicate::str::contains("jane@club.org"));
}

#[test]
fn snapshot_set_is_idempotent_per_date() {
    let home = setup_temp_home();

    clubbook(&home).arg("init").assert().success();

    for total in ["100000", "110000"] {
        clubbook(&home)
            .arg("--no-color")
            .args(["snapshot", "set"])
            .args(["--date", "2024-01-31"])
            .args(["--total-value", total])
            .args(["--cash-value", "5000"])
            .args(["--btc-price", "42000"])
            .args(["--sp500", "4800"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Saved snapshot for 2024-01-31"));
    }
}

#[test]
fn btc_add_requires_all_fields() {
    let home = setup_temp_home();

    clubbook(&home).arg("init").assert().success();

    // clap enforces the required flags before our own validation runs
    clubbook(&home)
        .args(["btc", "add", "--date", "2024-01-05", "--btc-amount", "0.5"])
        .assert()
        .failure();

    clubbook(&home)
        .arg("--no-color")
        .args(["btc", "add"])
        .args(["--date", "2024-01-05"])
        .args(["--btc-amount", "0.5"])
        .args(["--usd-amount", "21000"])
        .args(["--btc-price", "42000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Recorded BTC purchase"));
}

#[test]
fn clubbook_db_env_overrides_default_path() {
    let home = setup_temp_home();
    let db_path = home.path().join("elsewhere.db");

    clubbook(&home)
        .env("CLUBBOOK_DB", &db_path)
        .arg("init")
        .assert()
        .success();

    assert!(db_path.exists());
    assert!(!home.path().join(".clubbook").exists());
}

#[test]
fn trades_list_json_on_empty_db() {
    let home = setup_temp_home();

    clubbook(&home).arg("init").assert().success();

    clubbook(&home)
        .args(["trades", "list", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[]"));
}

#[test]
fn quotes_refresh_without_api_key_fails_cleanly() {
    let home = setup_temp_home();

    clubbook(&home).arg("init").assert().success();

    clubbook(&home)
        .env_remove("TWELVEDATA_API_KEY")
        .args(["quotes", "refresh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TWELVEDATA_API_KEY"));
}
