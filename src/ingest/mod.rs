//! Import module - brokerage CSV ingestion flows
//!
//! Each flow runs the same pipeline: decode the upload bytes, locate and
//! resolve the header, interpret rows into domain records, then hand the
//! records to the store. Header problems fail the whole file before any
//! write; bad individual rows are skipped and counted.

pub mod btc;
pub mod cell;
pub mod contributions;
pub mod decode;
pub mod live_prices;
pub mod positions;
pub mod resolver;
pub mod trades;

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::Connection;
use tracing::info;

use crate::db;

/// Outcome of one import flow: how many rows became records and how many
/// were skipped as unparseable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

impl ImportSummary {
    pub fn new(imported: usize, skipped: usize) -> Self {
        ImportSummary { imported, skipped }
    }
}

fn require_content(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        return Err(anyhow!("Upload a CSV file."));
    }
    Ok(())
}

/// As-of date for snapshot imports: explicit override, then a date embedded
/// in the filename, then today.
pub fn resolve_as_of(override_date: Option<NaiveDate>, file_name: &str) -> NaiveDate {
    override_date
        .or_else(|| cell::parse_date_from_filename(file_name))
        .unwrap_or_else(|| Utc::now().date_naive())
}

/// Import member contributions. Members are resolved per row by
/// id > email > case-insensitive name, creating new members as needed.
pub fn import_contributions(conn: &Connection, bytes: &[u8]) -> Result<ImportSummary> {
    require_content(bytes)?;
    let text = decode::decode_text(bytes);
    let (_, rows) = decode::columnar_rows(&text)?;

    let (contribution_rows, skipped) = contributions::interpret_contributions(&rows);

    let mut imported = 0;
    for row in contribution_rows {
        let member = db::find_or_create_member(
            conn,
            row.member.id,
            row.member.name.as_deref(),
            row.member.email.as_deref(),
        )?;
        db::insert_contribution(conn, &row.into_contribution(member.id))?;
        imported += 1;
    }

    info!("Imported {} contributions ({} skipped)", imported, skipped);
    Ok(ImportSummary::new(imported, skipped))
}

/// Import a generic trades CSV (header on the first row)
pub fn import_trades(conn: &Connection, bytes: &[u8]) -> Result<ImportSummary> {
    require_content(bytes)?;
    let text = decode::decode_text(bytes);
    let rows = decode::raw_rows(&text)?;

    let (trades, skipped) = trades::interpret_trades(&rows)?;

    for trade in &trades {
        db::insert_trade(conn, trade)?;
    }

    info!("Imported {} trades ({} skipped)", trades.len(), skipped);
    Ok(ImportSummary::new(trades.len(), skipped))
}

/// Import a Fidelity "Accounts History" export as trades
pub fn import_fidelity_history(conn: &Connection, bytes: &[u8]) -> Result<ImportSummary> {
    require_content(bytes)?;
    let text = decode::decode_text(bytes);
    let rows = decode::raw_rows(&text)?;

    let (trades, skipped) = trades::interpret_fidelity_history(&rows)?;

    for trade in &trades {
        db::insert_trade(conn, trade)?;
    }

    info!(
        "Imported {} history trades ({} skipped)",
        trades.len(),
        skipped
    );
    Ok(ImportSummary::new(trades.len(), skipped))
}

/// Import a Fidelity positions export, replacing the snapshot generation
/// for the resolved as-of date.
pub fn import_fidelity_positions(
    conn: &mut Connection,
    bytes: &[u8],
    file_name: &str,
    override_date: Option<NaiveDate>,
) -> Result<(NaiveDate, ImportSummary)> {
    require_content(bytes)?;
    let text = decode::decode_text(bytes);
    let rows = decode::raw_rows(&text)?;

    let as_of = resolve_as_of(override_date, file_name);
    let (snapshots, skipped) = positions::interpret_positions(&rows, as_of)?;

    db::replace_position_snapshots(conn, as_of, &snapshots)?;

    info!(
        "Replaced positions for {}: {} rows ({} skipped)",
        as_of,
        snapshots.len(),
        skipped
    );
    Ok((as_of, ImportSummary::new(snapshots.len(), skipped)))
}

/// Import the live-price sheet from an uploaded file, replacing the
/// generation for the resolved as-of date.
pub fn import_live_prices(
    conn: &mut Connection,
    bytes: &[u8],
    file_name: &str,
    override_date: Option<NaiveDate>,
) -> Result<(NaiveDate, ImportSummary)> {
    require_content(bytes)?;
    let text = decode::decode_text(bytes);
    let rows = decode::raw_rows(&text)?;

    import_live_price_rows(conn, &rows, file_name, override_date)
}

/// Import live-price rows that are already decoded (file upload or sheet
/// fetch), replacing the generation for the resolved as-of date.
pub fn import_live_price_rows(
    conn: &mut Connection,
    rows: &[Vec<String>],
    source_name: &str,
    override_date: Option<NaiveDate>,
) -> Result<(NaiveDate, ImportSummary)> {
    let as_of = resolve_as_of(override_date, source_name);
    let (positions, skipped) = live_prices::interpret_live_prices(rows, as_of)?;

    db::replace_live_positions(conn, as_of, &positions)?;

    info!(
        "Replaced live positions for {}: {} rows ({} skipped)",
        as_of,
        positions.len(),
        skipped
    );
    Ok((as_of, ImportSummary::new(positions.len(), skipped)))
}

/// Import BTC purchases from CSV
pub fn import_btc_purchases(conn: &Connection, bytes: &[u8]) -> Result<ImportSummary> {
    require_content(bytes)?;
    let text = decode::decode_text(bytes);
    let (_, rows) = decode::columnar_rows(&text)?;

    let (purchases, skipped) = btc::interpret_btc_rows(&rows);

    for purchase in &purchases {
        db::insert_btc_purchase(conn, purchase)?;
    }

    info!(
        "Imported {} BTC purchases ({} skipped)",
        purchases.len(),
        skipped
    );
    Ok(ImportSummary::new(purchases.len(), skipped))
}
