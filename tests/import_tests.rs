use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal_macros::dec;
use tempfile::TempDir;

use clubbook::db;
use clubbook::ingest;

fn setup_db() -> (TempDir, Connection) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let path = dir.path().join("data.db");
    db::init_database(Some(path.clone())).expect("init failed");
    let conn = db::open_db(Some(path)).expect("open failed");
    (dir, conn)
}

fn utf16le(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFE];
    bytes.extend(text.encode_utf16().flat_map(|u| u.to_le_bytes()));
    bytes
}

#[test]
fn contributions_import_creates_and_reuses_members() {
    let (_dir, conn) = setup_db();

    let csv = "Date,Member_Name,Amount,Shares,Type,Memo\n\
               2024-01-15,Jane Doe,\"$1,000.00\",100,BUY,January dues\n\
               2024-02-15,jane doe,$500.00,48,,February dues\n\
               2024-03-15,Jane Doe,$200.00,19,WITHDRAW,Partial withdrawal\n";

    let summary = ingest::import_contributions(&conn, csv.as_bytes()).unwrap();
    assert_eq!(summary.imported, 3);
    assert_eq!(summary.skipped, 0);

    // "jane doe" matched case-insensitively, so only one member exists
    let members = db::list_members(&conn).unwrap();
    assert_eq!(members.len(), 1);

    let (member, total_amount, total_shares) = &members[0];
    assert_eq!(member.name, "Jane Doe");
    // 1000 + 500 - 200, 100 + 48 - 19
    assert_eq!(*total_amount, dec!(1300));
    assert_eq!(*total_shares, dec!(129));
}

#[test]
fn contributions_row_without_member_keys_fails_the_file() {
    let (_dir, conn) = setup_db();

    let csv = "Date,Member_Name,Amount,Shares\n\
               2024-01-15,Jane Doe,1000,100\n\
               2024-02-15,,500,48\n";

    let err = ingest::import_contributions(&conn, csv.as_bytes()).unwrap_err();
    assert!(err
        .to_string()
        .contains("member_id, member_name, or member_email"));
}

#[test]
fn trades_import_skips_unparseable_rows() {
    let (_dir, conn) = setup_db();

    let csv = "Trade Date,Ticker,Action,Shares,Price,Fees\n\
               2024-01-10,AAPL,Bought,10,185.50,0.25\n\
               2024-01-11,MSFT,Sold,5,(402.10),1.00\n\
               2024-01-12,VTI,Bought,3,n/a,0.00\n\
               2024-01-13,NVDA,Transferred,2,600.00,0.00\n";

    let summary = ingest::import_trades(&conn, csv.as_bytes()).unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.skipped, 2);

    let trades = db::list_trades(&conn, 50).unwrap();
    assert_eq!(trades.len(), 2);

    // parenthesized price came through negated
    let msft = trades.iter().find(|t| t.ticker == "MSFT").unwrap();
    assert_eq!(msft.price, dec!(-402.10));
    assert_eq!(msft.action.as_str(), "SELL");
}

#[test]
fn trades_import_fails_when_required_columns_missing() {
    let (_dir, conn) = setup_db();

    let csv = "Trade Date,Ticker,Shares\n2024-01-10,AAPL,10\n";

    let err = ingest::import_trades(&conn, csv.as_bytes()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Could not map required columns"));
    assert!(message.contains("action"));
    assert!(message.contains("price"));
}

#[test]
fn fidelity_history_skips_banner_and_sums_fee_columns() {
    let (_dir, conn) = setup_db();

    let csv = "Brokerage services provided by Fidelity\n\
               \n\
               History for account X12345678 as of 03/29/2024\n\
               Run Date,Action,Symbol,Description,Type,Quantity,Price ($),Commission ($),Fees ($),Amount ($)\n\
               03/15/2024,YOU BOUGHT AAPL,AAPL,APPLE INC,Cash,10,185.50,4.95,0.05,-1855.05\n\
               03/18/2024,YOU SOLD MSFT,MSFT,MICROSOFT CORP,Cash,5,402.10,4.95,0.03,2010.47\n\
               03/20/2024,DIVIDEND RECEIVED,AAPL,APPLE INC,Cash,,,,,24.00\n";

    let summary = ingest::import_fidelity_history(&conn, csv.as_bytes()).unwrap();
    assert_eq!(summary.imported, 2);
    assert_eq!(summary.skipped, 1);

    let trades = db::list_trades(&conn, 50).unwrap();
    let aapl = trades.iter().find(|t| t.ticker == "AAPL").unwrap();
    assert_eq!(aapl.fees, dec!(5.00));
    // verbatim action text lands in notes
    assert_eq!(aapl.notes.as_deref(), Some("YOU BOUGHT AAPL"));
}

#[test]
fn positions_reimport_replaces_the_generation() {
    let (_dir, mut conn) = setup_db();

    let csv = "Brokerage account download\n\
               Account Number,Account Name,Symbol,Description,Quantity,Last Price,Current Value\n\
               X12345678,Club,AAPL,APPLE INC,10,185.50,1855.00\n\
               X12345678,Club,MSFT,MICROSOFT CORP,5,402.10,2010.50\n\
               X12345678,Club,SPAXX**,FIDELITY GOVT MMKT,,1.00,312.44\n";

    let file_name = "Portfolio_Positions_Mar-29-2024.csv";
    let (date, summary) =
        ingest::import_fidelity_positions(&mut conn, csv.as_bytes(), file_name, None).unwrap();

    assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 29).unwrap());
    assert_eq!(summary.imported, 3);

    // same file again replaces, not appends
    ingest::import_fidelity_positions(&mut conn, csv.as_bytes(), file_name, None).unwrap();
    assert_eq!(db::count_position_snapshots(&conn, date).unwrap(), 3);
}

#[test]
fn positions_import_handles_utf16le_export() {
    let (_dir, mut conn) = setup_db();

    let csv = "Symbol,Description,Quantity,Last Price,Current Value\n\
               AAPL,APPLE INC,10,185.50,1855.00\n";
    let bytes = utf16le(csv);

    let (date, summary) =
        ingest::import_fidelity_positions(&mut conn, &bytes, "positions_2024-03-29.csv", None)
            .unwrap();

    assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 29).unwrap());
    assert_eq!(summary.imported, 1);
}

#[test]
fn positions_as_of_override_beats_filename() {
    let (_dir, mut conn) = setup_db();

    let csv = "Symbol,Description,Quantity,Last Price,Current Value\n\
               AAPL,APPLE INC,10,185.50,1855.00\n";
    let override_date = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();

    let (date, _) = ingest::import_fidelity_positions(
        &mut conn,
        csv.as_bytes(),
        "Portfolio_Positions_Mar-29-2024.csv",
        Some(override_date),
    )
    .unwrap();

    assert_eq!(date, override_date);
    assert_eq!(db::count_position_snapshots(&conn, override_date).unwrap(), 1);
}

#[test]
fn live_prices_import_replaces_by_date() {
    let (_dir, mut conn) = setup_db();

    let csv = "Club watch list\n\
               Symbol,Qty,Asset,Price,Cost,Mkt Value,Gain ($),Gain (%)\n\
               AAPL,10,Stock,185.50,150.00,1855.00,355.00,23.7%\n\
               VTI,3,ETF,262.10,240.00,786.30,66.30,9.2%\n";

    let (date, summary) =
        ingest::import_live_prices(&mut conn, csv.as_bytes(), "prices 03-29-2024.csv", None)
            .unwrap();

    assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 29).unwrap());
    assert_eq!(summary.imported, 2);

    ingest::import_live_prices(&mut conn, csv.as_bytes(), "prices 03-29-2024.csv", None).unwrap();
    assert_eq!(db::count_live_positions(&conn, date).unwrap(), 2);
}

#[test]
fn sheet_rows_share_the_live_price_pipeline() {
    let (_dir, mut conn) = setup_db();

    // rows as a sheet fetch delivers them: pre-decoded, banner included
    let rows: Vec<Vec<String>> = [
        vec!["Club Watchlist", "", "", "", "", ""],
        vec!["Symbol", "Qty", "Asset", "Price", "Cost", "Mkt Value"],
        vec!["AAPL", "10", "Stock", "$190.00", "$180.00", "$1,900.00"],
        vec!["VOO", "5", "ETF", "$440.00", "$400.00", "$2,200.00"],
    ]
    .iter()
    .map(|row| row.iter().map(|cell| cell.to_string()).collect())
    .collect();

    let as_of = NaiveDate::from_ymd_opt(2024, 3, 29).unwrap();
    let (date, summary) =
        ingest::import_live_price_rows(&mut conn, &rows, "live-price sheet", Some(as_of)).unwrap();

    assert_eq!(date, as_of);
    assert_eq!(summary.imported, 2);

    // a second fetch replaces the generation, same as a file re-import
    ingest::import_live_price_rows(&mut conn, &rows, "live-price sheet", Some(as_of)).unwrap();
    assert_eq!(db::count_live_positions(&conn, date).unwrap(), 2);
}

#[test]
fn btc_import_and_tracked_symbols_precedence() {
    let (_dir, mut conn) = setup_db();

    let csv = "Purchase Date,Amount Purchased (BTC),Amount Purchased (USD),Purchased At (BTC/USD)\n\
               2024-01-05,0.5,\"$21,000\",\"$42,000\"\n";
    let summary = ingest::import_btc_purchases(&conn, csv.as_bytes()).unwrap();
    assert_eq!(summary.imported, 1);

    // with no snapshots, tracked symbols fall back to trade tickers
    let trades_csv = "Date,Ticker,Action,Shares,Price\n\
                      2024-01-10,AAPL,Buy,10,185.50\n\
                      2024-01-11,aapl,Buy,2,186.00\n";
    ingest::import_trades(&conn, trades_csv.as_bytes()).unwrap();
    assert_eq!(db::tracked_symbols(&conn).unwrap(), vec!["AAPL".to_string()]);

    // once a positions snapshot exists it wins, minus pseudo-symbols
    let positions_csv = "Symbol,Description,Quantity,Last Price,Current Value\n\
                         MSFT,MICROSOFT CORP,5,402.10,2010.50\n\
                         BTC**,BITCOIN,0.5,64000,32000\n\
                         SPAXX,FIDELITY GOVT MMKT,,1.00,312.44\n";
    ingest::import_fidelity_positions(
        &mut conn,
        positions_csv.as_bytes(),
        "positions_2024-03-29.csv",
        None,
    )
    .unwrap();
    assert_eq!(db::tracked_symbols(&conn).unwrap(), vec!["MSFT".to_string()]);
}

#[test]
fn empty_upload_is_rejected_before_any_write() {
    let (_dir, conn) = setup_db();

    let err = ingest::import_contributions(&conn, b"").unwrap_err();
    assert_eq!(err.to_string(), "Upload a CSV file.");
    assert!(db::list_members(&conn).unwrap().is_empty());
}
