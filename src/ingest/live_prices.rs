//! Live-price sheet interpreter.
//!
//! The club's shared sheet publishes a grid with a metadata banner above the
//! header and a long tail of optional metric columns. Header names are
//! matched exactly; all metrics are optional per row.

use anyhow::Result;

use super::cell::parse_number;
use super::resolver::{find_header_row, resolve_columns, ColumnMap, FieldSpec};
use crate::db::models::LivePosition;
use chrono::NaiveDate;

const HEADER_HINTS: &[&str] = &["qty", "price", "asset", "mkt value", "cost"];

const LIVE_FIELDS: &[FieldSpec] = &[
    FieldSpec::exact("symbol", &["symbol"]),
    FieldSpec::exact("quantity", &["qty"]),
    FieldSpec::exact("asset", &["asset"]),
    FieldSpec::exact("price", &["price"]),
    FieldSpec::exact("cost", &["cost"]),
    FieldSpec::exact("market_value", &["mkt value"]),
    FieldSpec::exact("gain_dollar", &["gain ($)"]),
    FieldSpec::exact("gain_percent", &["gain (%)"]),
    FieldSpec::exact("percent_of_portfolio", &["% of portfolio"]),
    FieldSpec::exact("term", &["term"]),
    FieldSpec::exact("beta", &["beta"]),
    FieldSpec::exact("pe", &["p/e"]),
    FieldSpec::exact("week_high", &["52 wk high"]),
    FieldSpec::exact("week_low", &["52 wk low"]),
    FieldSpec::exact("gain_30", &["30 day gain"]),
    FieldSpec::exact("gain_60", &["60 day gain"]),
    FieldSpec::exact("gain_90", &["90 day gain"]),
    FieldSpec::exact("weight", &["weight"]),
    FieldSpec::exact("est_purchase", &["est. purchase"]),
    FieldSpec::exact("shares_target", &["# shares"]),
    FieldSpec::exact("rounded", &["rounded"]),
    FieldSpec::exact("total_purchase", &["total purchase"]),
];

fn text_cell(columns: &ColumnMap, row: &[String], field: &str) -> Option<String> {
    columns
        .cell(row, field)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

fn number_cell(
    columns: &ColumnMap,
    row: &[String],
    field: &str,
) -> Option<rust_decimal::Decimal> {
    columns.cell(row, field).and_then(parse_number)
}

/// Interpret a live-price sheet against an already-resolved as-of date.
pub fn interpret_live_prices(
    rows: &[Vec<String>],
    as_of: NaiveDate,
) -> Result<(Vec<LivePosition>, usize)> {
    let header_idx = find_header_row(rows, &["symbol"], false, HEADER_HINTS)?;
    let columns = resolve_columns(&rows[header_idx], LIVE_FIELDS);
    columns.require(&["symbol"])?;

    let mut positions = Vec::new();
    let mut skipped = 0;

    for row in &rows[header_idx + 1..] {
        let Some(symbol) = text_cell(&columns, row, "symbol") else {
            skipped += 1;
            continue;
        };

        positions.push(LivePosition {
            id: None,
            date: as_of,
            symbol,
            quantity: number_cell(&columns, row, "quantity"),
            asset: text_cell(&columns, row, "asset"),
            price: number_cell(&columns, row, "price"),
            cost: number_cell(&columns, row, "cost"),
            market_value: number_cell(&columns, row, "market_value"),
            gain_dollar: number_cell(&columns, row, "gain_dollar"),
            gain_percent: number_cell(&columns, row, "gain_percent"),
            percent_of_portfolio: number_cell(&columns, row, "percent_of_portfolio"),
            term: text_cell(&columns, row, "term"),
            beta: number_cell(&columns, row, "beta"),
            pe: number_cell(&columns, row, "pe"),
            week_high: number_cell(&columns, row, "week_high"),
            week_low: number_cell(&columns, row, "week_low"),
            gain_30: number_cell(&columns, row, "gain_30"),
            gain_60: number_cell(&columns, row, "gain_60"),
            gain_90: number_cell(&columns, row, "gain_90"),
            weight: number_cell(&columns, row, "weight"),
            est_purchase: number_cell(&columns, row, "est_purchase"),
            shares_target: number_cell(&columns, row, "shares_target"),
            rounded: number_cell(&columns, row, "rounded"),
            total_purchase: number_cell(&columns, row, "total_purchase"),
        });
    }

    Ok((positions, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::decode::raw_rows;
    use rust_decimal_macros::dec;

    const SHEET: &str = "\
Club Watchlist - updated hourly,,,,,,\n\
Symbol,Qty,Asset,Price,Cost,Mkt Value,Gain (%),Est. Purchase\n\
AAPL,10,Stock,$190.00,$180.00,\"$1,900.00\",5.5%,No Purchase\n\
VOO,5,ETF,$440.00,$400.00,\"$2,200.00\",10.0%,$500\n\
,,,,,,,\n";

    #[test]
    fn test_interpret_live_prices() {
        let rows = raw_rows(SHEET).unwrap();
        let as_of = NaiveDate::from_ymd_opt(2024, 3, 29).unwrap();

        let (positions, skipped) = interpret_live_prices(&rows, as_of).unwrap();
        assert_eq!(positions.len(), 2);
        assert_eq!(skipped, 0);

        assert_eq!(positions[0].symbol, "AAPL");
        assert_eq!(positions[0].price, Some(dec!(190.00)));
        assert_eq!(positions[0].gain_percent, Some(dec!(5.5)));
        // "No Purchase" is a sentinel, not a number
        assert_eq!(positions[0].est_purchase, None);
        assert_eq!(positions[1].est_purchase, Some(dec!(500)));
    }

    #[test]
    fn test_interpret_live_prices_missing_header() {
        let rows = raw_rows("a,b\n1,2\n").unwrap();
        assert!(
            interpret_live_prices(&rows, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).is_err()
        );
    }
}
