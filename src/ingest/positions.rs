//! Fidelity positions snapshot interpreter.
//!
//! Positions exports prepend account banners above the real header, so the
//! header is located by its Symbol anchor plus a hint column. Every numeric
//! column is optional; only the symbol is required per row.

use anyhow::Result;

use super::cell::parse_number;
use super::resolver::{find_header_row, resolve_columns, ColumnMap, FieldSpec};
use crate::db::models::PositionSnapshot;
use chrono::NaiveDate;

/// Hints that distinguish the header row from banner text mentioning "symbol"
const HEADER_HINTS: &[&str] = &[
    "quantity",
    "last price",
    "current value",
    "market value",
    "description",
];

/// Position columns, substring-matched the way Fidelity varies them
/// ("Total Gain/Loss Dollar" vs "Total Gain/Loss ($)", etc.)
const POSITION_FIELDS: &[FieldSpec] = &[
    FieldSpec::substring("account_number", &["account number"]),
    FieldSpec::substring("account_name", &["account name"]),
    FieldSpec::substring("symbol", &["symbol"]),
    FieldSpec::substring("description", &["description"]),
    FieldSpec::substring("quantity", &["quantity", "qty", "shares"]),
    FieldSpec::substring("last_price", &["last price", "price"]),
    FieldSpec::substring("current_value", &["current value", "market value", "mkt value"]),
    FieldSpec::substring(
        "total_gain_loss",
        &["total gain/loss dollar", "total gain/loss ($)"],
    ),
    FieldSpec::substring(
        "total_gain_loss_percent",
        &["total gain/loss percent", "total gain/loss (%)"],
    ),
    FieldSpec::substring(
        "percent_of_account",
        &["percent of account", "% of account", "% of portfolio"],
    ),
    FieldSpec::substring("cost_basis_total", &["cost basis total", "cost basis"]),
    FieldSpec::substring(
        "average_cost_basis",
        &["average cost basis", "avg cost basis", "average cost"],
    ),
    FieldSpec::substring("asset_type", &["type", "asset type"]),
];

fn text_cell(columns: &ColumnMap, row: &[String], field: &str) -> Option<String> {
    columns
        .cell(row, field)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

/// Interpret a positions export against an already-resolved as-of date.
/// Rows without a symbol (disclaimer footers, subtotals) are skipped.
pub fn interpret_positions(
    rows: &[Vec<String>],
    as_of: NaiveDate,
) -> Result<(Vec<PositionSnapshot>, usize)> {
    let header_idx = find_header_row(rows, &["symbol"], true, HEADER_HINTS)?;
    let columns = resolve_columns(&rows[header_idx], POSITION_FIELDS);
    columns.require(&["symbol"])?;

    let mut snapshots = Vec::new();
    let mut skipped = 0;

    for row in &rows[header_idx + 1..] {
        let Some(symbol) = text_cell(&columns, row, "symbol") else {
            skipped += 1;
            continue;
        };

        snapshots.push(PositionSnapshot {
            id: None,
            date: as_of,
            account_number: text_cell(&columns, row, "account_number"),
            account_name: text_cell(&columns, row, "account_name"),
            symbol,
            description: text_cell(&columns, row, "description"),
            quantity: columns.cell(row, "quantity").and_then(parse_number),
            last_price: columns.cell(row, "last_price").and_then(parse_number),
            current_value: columns.cell(row, "current_value").and_then(parse_number),
            total_gain_loss: columns.cell(row, "total_gain_loss").and_then(parse_number),
            total_gain_loss_percent: columns
                .cell(row, "total_gain_loss_percent")
                .and_then(parse_number),
            percent_of_account: columns
                .cell(row, "percent_of_account")
                .and_then(parse_number),
            cost_basis_total: columns.cell(row, "cost_basis_total").and_then(parse_number),
            average_cost_basis: columns
                .cell(row, "average_cost_basis")
                .and_then(parse_number),
            asset_type: text_cell(&columns, row, "asset_type"),
        });
    }

    Ok((snapshots, skipped))
}
