//! BTC purchase interpreters: the manual single-entry form and the CSV
//! variant with loosely named columns.

use anyhow::{anyhow, Result};
use std::collections::HashMap;
use tracing::warn;

use super::cell::{parse_date, parse_number};
use crate::db::models::BtcPurchase;
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Column synonyms for the BTC purchase sheet, keyed by normalized header
const BTC_SYNONYMS: &[(&str, &[&str])] = &[
    ("date", &["date", "purchase date"]),
    ("btc_amount", &["btc_amount", "amount purchased (btc)"]),
    ("usd_amount", &["usd_amount", "amount purchased (usd)"]),
    ("btc_price", &["btc_price", "purchased at (btc/usd)"]),
];

/// Build a single manual BTC entry. Unlike CSV imports, a manual submission
/// with any missing field is rejected outright rather than skipped.
pub fn new_btc_purchase(
    date: Option<NaiveDate>,
    btc_amount: Option<Decimal>,
    usd_amount: Option<Decimal>,
    btc_price: Option<Decimal>,
) -> Result<BtcPurchase> {
    let (Some(date), Some(btc_amount), Some(usd_amount), Some(btc_price)) =
        (date, btc_amount, usd_amount, btc_price)
    else {
        return Err(anyhow!("All BTC fields are required."));
    };

    Ok(BtcPurchase {
        id: None,
        date,
        btc_amount,
        usd_amount,
        btc_price,
    })
}

fn pick<'a>(row: &'a HashMap<String, String>, synonyms: &[&str]) -> Option<&'a str> {
    synonyms
        .iter()
        .find_map(|key| row.get(*key))
        .map(String::as_str)
        .filter(|v| !v.trim().is_empty())
}

/// Interpret BTC purchase rows from a columnar CSV. Rows with any missing
/// or unparseable field are skipped (the file may carry running-total and
/// commentary rows).
pub fn interpret_btc_rows(rows: &[HashMap<String, String>]) -> (Vec<BtcPurchase>, usize) {
    let mut purchases = Vec::new();
    let mut skipped = 0;

    for row in rows {
        let field = |name: &str| {
            BTC_SYNONYMS
                .iter()
                .find(|(target, _)| *target == name)
                .and_then(|(_, synonyms)| pick(row, synonyms))
        };

        let date = field("date").and_then(parse_date);
        let btc_amount = field("btc_amount").and_then(parse_number);
        let usd_amount = field("usd_amount").and_then(parse_number);
        let btc_price = field("btc_price").and_then(parse_number);

        match new_btc_purchase(date, btc_amount, usd_amount, btc_price) {
            Ok(purchase) => purchases.push(purchase),
            Err(_) => {
                warn!("Skipping BTC row with missing field: {:?}", row);
                skipped += 1;
            }
        }
    }

    (purchases, skipped)
}
