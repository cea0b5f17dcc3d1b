//! Market quote refresh against the Twelve Data price API.
//!
//! One batched GET per refresh, a persisted-timestamp rate limit (best
//! effort, not a lock), and a retention purge after every non-skipped
//! refresh. The API returns different payload shapes for one symbol vs
//! many; both are handled.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use tracing::{info, warn};

use crate::db;
use crate::error::ClubError;

pub const QUOTE_SOURCE: &str = "TWELVEDATA";

const TWELVEDATA_ENDPOINT: &str = "https://api.twelvedata.com/price";
const DEFAULT_MIN_REFRESH_MINUTES: i64 = 10;
const DEFAULT_RETENTION_DAYS: i64 = 90;

/// Quote refresh configuration, resolved from the environment
#[derive(Debug, Clone)]
pub struct QuoteConfig {
    pub api_key: String,
    pub min_refresh_minutes: i64,
    pub retention_days: i64,
}

impl QuoteConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("TWELVEDATA_API_KEY")
            .context("TWELVEDATA_API_KEY is not set.")?;

        Ok(QuoteConfig {
            api_key,
            min_refresh_minutes: env_i64("MARKET_QUOTES_MINUTES", DEFAULT_MIN_REFRESH_MINUTES),
            retention_days: env_i64("MARKET_QUOTES_RETENTION_DAYS", DEFAULT_RETENTION_DAYS),
        })
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Result of one refresh invocation
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub count: usize,
    pub symbols: Vec<String>,
    pub skipped: bool,
}

/// Rate-limit check: skip when the newest quote for this source is younger
/// than the minimum interval. Best effort only; two near-simultaneous
/// refreshes can still both pass.
pub fn should_skip_refresh(
    latest: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    min_minutes: i64,
) -> bool {
    match latest {
        Some(as_of) => now - as_of < Duration::minutes(min_minutes),
        None => false,
    }
}

/// Extract (symbol, price) pairs from either response shape.
///
/// A single-symbol request returns one `{"price": "..."}` object; a batch
/// request returns a map of symbol to that object. Symbols with malformed
/// price payloads are dropped individually without failing the batch.
pub fn parse_price_response(symbols: &[String], data: &Value) -> Vec<(String, Decimal)> {
    let mut quotes = Vec::new();

    let Some(object) = data.as_object() else {
        return quotes;
    };

    if let Some(price) = object.get("price").and_then(Value::as_str) {
        if let (Some(symbol), Ok(price)) = (symbols.first(), Decimal::from_str(price)) {
            quotes.push((symbol.clone(), price));
        }
        return quotes;
    }

    for (symbol, payload) in object {
        let Some(price) = payload.get("price").and_then(Value::as_str) else {
            warn!("No price in quote payload for {}", symbol);
            continue;
        };
        match Decimal::from_str(price) {
            Ok(price) => quotes.push((symbol.clone(), price)),
            Err(_) => warn!("Unparseable price '{}' for {}", price, symbol),
        }
    }

    quotes
}

/// Refresh quotes for the tracked symbols (or an explicit list), then purge
/// rows older than the retention window.
pub async fn refresh_market_quotes(
    conn: &Connection,
    config: &QuoteConfig,
    symbols: Option<Vec<String>>,
) -> Result<RefreshOutcome> {
    let tracked = match symbols {
        Some(list) => list,
        None => db::tracked_symbols(conn)?,
    };

    if tracked.is_empty() {
        return Ok(RefreshOutcome {
            count: 0,
            symbols: tracked,
            skipped: false,
        });
    }

    let latest = db::latest_quote_as_of(conn, QUOTE_SOURCE)?;
    if should_skip_refresh(latest, Utc::now(), config.min_refresh_minutes) {
        info!(
            "Skipping quote refresh; last refresh within {} minutes",
            config.min_refresh_minutes
        );
        return Ok(RefreshOutcome {
            count: 0,
            symbols: tracked,
            skipped: true,
        });
    }

    info!("Fetching quotes for {} symbols", tracked.len());

    let client = Client::builder()
        .user_agent("Mozilla/5.0 (compatible; ClubbookBot/1.0)")
        .build()?;

    let response = client
        .get(TWELVEDATA_ENDPOINT)
        .query(&[("symbol", tracked.join(",")), ("apikey", config.api_key.clone())])
        .send()
        .await
        .context("Failed to send request to Twelve Data")?;

    if !response.status().is_success() {
        return Err(
            ClubError::QuoteError(format!("Twelve Data request failed: {}", response.status()))
                .into(),
        );
    }

    let data: Value = response
        .json()
        .await
        .context("Failed to parse Twelve Data response")?;

    if data.get("status").and_then(Value::as_str) == Some("error") {
        let message = data
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Twelve Data error");
        return Err(ClubError::QuoteError(message.to_string()).into());
    }

    let quotes = parse_price_response(&tracked, &data);
    let as_of = Utc::now();

    if !quotes.is_empty() {
        db::insert_market_quotes(conn, &quotes, as_of, QUOTE_SOURCE)?;
    }

    let cutoff = as_of - Duration::days(config.retention_days);
    let purged = db::purge_quotes_before(conn, cutoff)?;
    if purged > 0 {
        info!("Purged {} quote rows older than {} days", purged, config.retention_days);
    }

    Ok(RefreshOutcome {
        count: quotes.len(),
        symbols: tracked,
        skipped: false,
    })
}
