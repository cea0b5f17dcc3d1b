//! Trade row interpreters: the generic trades CSV and the Fidelity
//! "Accounts History" export.
//!
//! Both flows share action classification and asset-type inference; they
//! differ in where the header lives (row 0 vs buried under banner rows) and
//! in how fees arrive (one column vs commission + fees).

use anyhow::Result;
use tracing::warn;

use super::cell::{parse_date, parse_number};
use super::resolver::{find_header_row, resolve_columns, FieldSpec};
use crate::db::models::{AssetType, Trade, TradeAction};

/// Synonym table for the generic trades flow
const TRADE_FIELDS: &[FieldSpec] = &[
    FieldSpec::exact(
        "date",
        &["date", "trade date", "transaction date", "activity date", "run date"],
    ),
    FieldSpec::exact("ticker", &["symbol", "ticker"]),
    FieldSpec::exact("action", &["action", "type", "transaction type"]),
    FieldSpec::exact("shares", &["quantity", "shares", "qty"]),
    FieldSpec::exact("price", &["price", "price per share", "price ($)"]),
    FieldSpec::exact(
        "fees",
        &["fees", "commission", "commissions", "fees and commissions", "fees ($)"],
    ),
    FieldSpec::exact(
        "asset_type",
        &["asset type", "asset class", "security type", "type"],
    ),
];

const TRADE_REQUIRED: &[&str] = &["date", "ticker", "action", "shares", "price"];

/// Fidelity history columns, matched exactly against the export's header
const HISTORY_FIELDS: &[FieldSpec] = &[
    FieldSpec::exact("date", &["run date"]),
    FieldSpec::exact("action", &["action"]),
    FieldSpec::exact("ticker", &["symbol"]),
    FieldSpec::exact("shares", &["quantity"]),
    FieldSpec::exact("price", &["price ($)"]),
    FieldSpec::exact("commission", &["commission ($)"]),
    FieldSpec::exact("fees", &["fees ($)"]),
    FieldSpec::exact("asset_type", &["type"]),
];

/// Classify an action cell by substring. No default: rows whose action text
/// matches neither direction are skipped by the caller.
pub fn parse_action(text: &str) -> Option<TradeAction> {
    let normalized = text.to_lowercase();
    if normalized.contains("bought") || normalized.contains("buy") {
        return Some(TradeAction::Buy);
    }
    if normalized.contains("sold") || normalized.contains("sell") {
        return Some(TradeAction::Sell);
    }
    None
}

/// Infer the asset class from a type/class hint cell plus the symbol.
/// SPAXX is the Fidelity cash sweep, hence the extra symbol check.
pub fn infer_asset_type(hint: Option<&str>, symbol: &str) -> AssetType {
    let normalized = hint.map(|h| h.to_lowercase()).unwrap_or_default();
    if normalized.contains("etf") {
        return AssetType::Etf;
    }
    if normalized.contains("crypto") || normalized.contains("btc") {
        return AssetType::Crypto;
    }
    if normalized.contains("cash") && symbol.contains("SPAXX") {
        return AssetType::Cash;
    }
    AssetType::Stock
}

/// Interpret a generic trades CSV (header on row 0, synonym-resolved).
///
/// Fails the whole file when required columns cannot be mapped; otherwise
/// rows with unparseable required fields are skipped and counted.
pub fn interpret_trades(rows: &[Vec<String>]) -> Result<(Vec<Trade>, usize)> {
    let Some((header, data_rows)) = rows.split_first() else {
        return Ok((Vec::new(), 0));
    };

    let columns = resolve_columns(header, TRADE_FIELDS);
    columns.require(TRADE_REQUIRED)?;

    let mut trades = Vec::new();
    let mut skipped = 0;

    for row in data_rows {
        let date = columns.cell(row, "date").and_then(parse_date);
        let ticker = columns
            .cell(row, "ticker")
            .map(str::trim)
            .filter(|t| !t.is_empty());
        let action = columns.cell(row, "action").and_then(parse_action);
        let shares = columns.cell(row, "shares").and_then(parse_number);
        let price = columns.cell(row, "price").and_then(parse_number);

        let (Some(date), Some(ticker), Some(action), Some(shares), Some(price)) =
            (date, ticker, action, shares, price)
        else {
            warn!("Skipping trade row with unparseable required field: {:?}", row);
            skipped += 1;
            continue;
        };

        let fees = columns
            .cell(row, "fees")
            .and_then(parse_number)
            .unwrap_or_default();

        trades.push(Trade {
            id: None,
            date,
            ticker: ticker.to_string(),
            action,
            shares,
            price,
            fees,
            asset_type: infer_asset_type(columns.cell(row, "asset_type"), ticker),
            notes: None,
            created_at: None,
        });
    }

    Ok((trades, skipped))
}

/// Interpret a Fidelity "Accounts History" export.
///
/// The real header sits below banner rows and is anchored on "Run Date".
/// Fees are commission + fees, each independently parsed and defaulting to
/// zero; the verbatim action text is preserved as the trade note.
pub fn interpret_fidelity_history(rows: &[Vec<String>]) -> Result<(Vec<Trade>, usize)> {
    let header_idx = find_header_row(rows, &["run date"], false, &["action", "symbol"])?;
    let columns = resolve_columns(&rows[header_idx], HISTORY_FIELDS);
    columns.require(&["date", "action", "ticker", "shares", "price"])?;

    let mut trades = Vec::new();
    let mut skipped = 0;

    for row in &rows[header_idx + 1..] {
        let date = columns.cell(row, "date").and_then(parse_date);
        let action_text = columns.cell(row, "action").unwrap_or("");
        let action = parse_action(action_text);
        let ticker = columns
            .cell(row, "ticker")
            .map(str::trim)
            .filter(|t| !t.is_empty());
        let shares = columns.cell(row, "shares").and_then(parse_number);
        let price = columns.cell(row, "price").and_then(parse_number);

        let (Some(date), Some(action), Some(ticker), Some(shares), Some(price)) =
            (date, action, ticker, shares, price)
        else {
            skipped += 1;
            continue;
        };

        let commission = columns
            .cell(row, "commission")
            .and_then(parse_number)
            .unwrap_or_default();
        let fees = columns
            .cell(row, "fees")
            .and_then(parse_number)
            .unwrap_or_default();

        trades.push(Trade {
            id: None,
            date,
            ticker: ticker.to_string(),
            action,
            shares,
            price,
            fees: commission + fees,
            asset_type: infer_asset_type(columns.cell(row, "asset_type"), ticker),
            notes: Some(action_text.to_string()),
            created_at: None,
        });
    }

    Ok((trades, skipped))
}
