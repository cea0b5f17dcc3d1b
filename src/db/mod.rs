// Database module - SQLite connection and models

pub mod models;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

pub use models::{
    AssetType, BtcPurchase, Contribution, ContributionType, LivePosition, MarketQuote, Member,
    PortfolioSnapshot, PositionSnapshot, Trade, TradeAction,
};

/// Get the default database path: CLUBBOOK_DB override, else ~/.clubbook/data.db
pub fn get_default_db_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("CLUBBOOK_DB") {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let clubbook_dir = PathBuf::from(home).join(".clubbook");

    std::fs::create_dir_all(&clubbook_dir).context("Failed to create .clubbook directory")?;

    Ok(clubbook_dir.join("data.db"))
}

/// Open database connection
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = db_path.unwrap_or(get_default_db_path()?);
    let conn = Connection::open(&path).context(format!("Failed to open database at {:?}", path))?;

    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("Failed to enable foreign keys")?;

    Ok(conn)
}

/// Initialize the database with schema
///
/// Creates the database file and runs the schema SQL to set up all
/// tables and indexes. Safe to run repeatedly.
pub fn init_database(db_path: Option<PathBuf>) -> Result<()> {
    let path = db_path.unwrap_or(get_default_db_path()?);

    info!("Initializing database at: {:?}", path);

    let conn = open_db(Some(path))?;

    let schema_sql = include_str!("schema.sql");

    conn.execute_batch(schema_sql)
        .context("Failed to execute schema")?;

    info!("Database initialized successfully");
    Ok(())
}

/// Resolve a member by id, then email, then case-insensitive name, creating
/// a new member when only a name is available.
///
/// Precedence matters: a row carrying both an id and a name belonging to a
/// different member resolves to the id match.
pub fn find_or_create_member(
    conn: &Connection,
    id: Option<i64>,
    name: Option<&str>,
    email: Option<&str>,
) -> Result<Member> {
    if let Some(member_id) = id {
        let found = conn
            .query_row(
                "SELECT id, name, email FROM members WHERE id = ?1",
                [member_id],
                |row| {
                    Ok(Member {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        if let Some(member) = found {
            return Ok(member);
        }
    }

    if let Some(member_email) = email.filter(|e| !e.trim().is_empty()) {
        let found = conn
            .query_row(
                "SELECT id, name, email FROM members WHERE email = ?1",
                [member_email],
                |row| {
                    Ok(Member {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        if let Some(member) = found {
            return Ok(member);
        }
    }

    if let Some(member_name) = name.filter(|n| !n.trim().is_empty()) {
        let found = conn
            .query_row(
                "SELECT id, name, email FROM members WHERE name = ?1 COLLATE NOCASE",
                [member_name],
                |row| {
                    Ok(Member {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        email: row.get(2)?,
                    })
                },
            )
            .optional()?;
        if let Some(member) = found {
            return Ok(member);
        }

        conn.execute(
            "INSERT INTO members (name, email) VALUES (?1, ?2)",
            params![member_name, email],
        )?;
        return Ok(Member {
            id: conn.last_insert_rowid(),
            name: member_name.to_string(),
            email: email.map(|e| e.to_string()),
        });
    }

    Err(anyhow!(
        "Each contribution must include member_id, member_name, or member_email."
    ))
}

/// Insert contribution (append-only, no dedup)
pub fn insert_contribution(conn: &Connection, contribution: &Contribution) -> Result<i64> {
    conn.execute(
        "INSERT INTO contributions (member_id, date, amount, shares, contribution_type, memo)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            contribution.member_id,
            contribution.date,
            contribution.amount.to_string(),
            contribution.shares.to_string(),
            contribution.contribution_type.as_str(),
            contribution.memo,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Insert trade (append-only, no dedup)
pub fn insert_trade(conn: &Connection, trade: &Trade) -> Result<i64> {
    conn.execute(
        "INSERT INTO trades (date, ticker, action, shares, price, fees, asset_type, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            trade.date,
            trade.ticker,
            trade.action.as_str(),
            trade.shares.to_string(),
            trade.price.to_string(),
            trade.fees.to_string(),
            trade.asset_type.as_str(),
            trade.notes,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Insert BTC purchase (append-only)
pub fn insert_btc_purchase(conn: &Connection, purchase: &BtcPurchase) -> Result<i64> {
    conn.execute(
        "INSERT INTO btc_purchases (date, btc_amount, usd_amount, btc_price)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            purchase.date,
            purchase.btc_amount.to_string(),
            purchase.usd_amount.to_string(),
            purchase.btc_price.to_string(),
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Replace the position snapshot generation for an as-of date.
///
/// Delete-then-insert inside one transaction, so a failed import leaves the
/// prior generation intact and re-imports stay idempotent.
pub fn replace_position_snapshots(
    conn: &mut Connection,
    date: NaiveDate,
    snapshots: &[PositionSnapshot],
) -> Result<usize> {
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM position_snapshots WHERE date = ?1", [date])?;

    for snapshot in snapshots {
        tx.execute(
            "INSERT INTO position_snapshots (
                date, account_number, account_name, symbol, description,
                quantity, last_price, current_value, total_gain_loss,
                total_gain_loss_percent, percent_of_account, cost_basis_total,
                average_cost_basis, asset_type
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                date,
                snapshot.account_number,
                snapshot.account_name,
                snapshot.symbol,
                snapshot.description,
                snapshot.quantity.map(|d| d.to_string()),
                snapshot.last_price.map(|d| d.to_string()),
                snapshot.current_value.map(|d| d.to_string()),
                snapshot.total_gain_loss.map(|d| d.to_string()),
                snapshot.total_gain_loss_percent.map(|d| d.to_string()),
                snapshot.percent_of_account.map(|d| d.to_string()),
                snapshot.cost_basis_total.map(|d| d.to_string()),
                snapshot.average_cost_basis.map(|d| d.to_string()),
                snapshot.asset_type,
            ],
        )?;
    }

    tx.commit()?;
    Ok(snapshots.len())
}

/// Replace the live position generation for an as-of date (same replace
/// semantics as position snapshots).
pub fn replace_live_positions(
    conn: &mut Connection,
    date: NaiveDate,
    positions: &[LivePosition],
) -> Result<usize> {
    let tx = conn.transaction()?;

    tx.execute("DELETE FROM live_positions WHERE date = ?1", [date])?;

    for position in positions {
        tx.execute(
            "INSERT INTO live_positions (
                date, symbol, quantity, asset, price, cost, market_value,
                gain_dollar, gain_percent, percent_of_portfolio, term, beta, pe,
                week_high, week_low, gain_30, gain_60, gain_90, weight,
                est_purchase, shares_target, rounded, total_purchase
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                      ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
            params![
                date,
                position.symbol,
                position.quantity.map(|d| d.to_string()),
                position.asset,
                position.price.map(|d| d.to_string()),
                position.cost.map(|d| d.to_string()),
                position.market_value.map(|d| d.to_string()),
                position.gain_dollar.map(|d| d.to_string()),
                position.gain_percent.map(|d| d.to_string()),
                position.percent_of_portfolio.map(|d| d.to_string()),
                position.term,
                position.beta.map(|d| d.to_string()),
                position.pe.map(|d| d.to_string()),
                position.week_high.map(|d| d.to_string()),
                position.week_low.map(|d| d.to_string()),
                position.gain_30.map(|d| d.to_string()),
                position.gain_60.map(|d| d.to_string()),
                position.gain_90.map(|d| d.to_string()),
                position.weight.map(|d| d.to_string()),
                position.est_purchase.map(|d| d.to_string()),
                position.shares_target.map(|d| d.to_string()),
                position.rounded.map(|d| d.to_string()),
                position.total_purchase.map(|d| d.to_string()),
            ],
        )?;
    }

    tx.commit()?;
    Ok(positions.len())
}

/// Upsert the monthly portfolio snapshot. One row per date; re-saving the
/// same month overwrites in place, never duplicates.
pub fn upsert_portfolio_snapshot(conn: &Connection, snapshot: &PortfolioSnapshot) -> Result<()> {
    conn.execute(
        "INSERT INTO portfolio_snapshots (date, total_value, cash_value, btc_price, sp500_value, notes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(date) DO UPDATE SET
            total_value = excluded.total_value,
            cash_value = excluded.cash_value,
            btc_price = excluded.btc_price,
            sp500_value = excluded.sp500_value,
            notes = excluded.notes",
        params![
            snapshot.date,
            snapshot.total_value.to_string(),
            snapshot.cash_value.to_string(),
            snapshot.btc_price.to_string(),
            snapshot.sp500_value.to_string(),
            snapshot.notes,
        ],
    )?;

    Ok(())
}

/// Insert a batch of market quotes at one as-of timestamp
pub fn insert_market_quotes(
    conn: &Connection,
    quotes: &[(String, Decimal)],
    as_of: DateTime<Utc>,
    source: &str,
) -> Result<usize> {
    for (symbol, price) in quotes {
        conn.execute(
            "INSERT INTO market_quotes (symbol, price, as_of, source)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                symbol.trim().to_uppercase(),
                price.to_string(),
                as_of,
                source
            ],
        )?;
    }

    Ok(quotes.len())
}

/// Timestamp of the most recent quote row for a source (rate-limit check)
pub fn latest_quote_as_of(conn: &Connection, source: &str) -> Result<Option<DateTime<Utc>>> {
    let as_of = conn
        .query_row(
            "SELECT as_of FROM market_quotes WHERE source = ?1 ORDER BY as_of DESC LIMIT 1",
            [source],
            |row| row.get(0),
        )
        .optional()?;

    Ok(as_of)
}

/// Purge quote rows older than the retention cutoff
pub fn purge_quotes_before(conn: &Connection, cutoff: DateTime<Utc>) -> Result<usize> {
    let removed = conn.execute("DELETE FROM market_quotes WHERE as_of < ?1", [cutoff])?;
    Ok(removed)
}

/// Latest quote per symbol, for display
pub fn list_latest_quotes(conn: &Connection) -> Result<Vec<MarketQuote>> {
    let mut stmt = conn.prepare(
        "SELECT id, symbol, price, as_of, source
         FROM market_quotes q
         WHERE as_of = (SELECT MAX(as_of) FROM market_quotes WHERE symbol = q.symbol)
         ORDER BY symbol",
    )?;

    let quotes = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, Option<i64>>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, DateTime<Utc>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    quotes
        .into_iter()
        .map(|(id, symbol, price, as_of, source)| {
            Ok(MarketQuote {
                id,
                symbol,
                price: Decimal::from_str(&price).context("Failed to parse quote price")?,
                as_of,
                source,
            })
        })
        .collect()
}

/// Symbols the quote refresh should track: the latest position snapshot
/// generation, else the latest live position generation, else recent trades.
pub fn tracked_symbols(conn: &Connection) -> Result<Vec<String>> {
    let latest_snapshot_date: Option<NaiveDate> = conn
        .query_row(
            "SELECT date FROM position_snapshots ORDER BY date DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(date) = latest_snapshot_date {
        let mut stmt = conn.prepare(
            "SELECT symbol FROM position_snapshots WHERE date = ?1 ORDER BY symbol",
        )?;
        let symbols = stmt
            .query_map([date], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        // Pseudo-symbols like BTC** and the cash sweep are not quotable.
        return Ok(dedup_symbols(
            symbols
                .into_iter()
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty() && !s.contains("**") && s != "SPAXX"),
        ));
    }

    let latest_live_date: Option<NaiveDate> = conn
        .query_row(
            "SELECT date FROM live_positions ORDER BY date DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(date) = latest_live_date {
        let mut stmt =
            conn.prepare("SELECT symbol FROM live_positions WHERE date = ?1 ORDER BY symbol")?;
        let symbols = stmt
            .query_map([date], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        return Ok(dedup_symbols(
            symbols
                .into_iter()
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty()),
        ));
    }

    let mut stmt = conn.prepare("SELECT ticker FROM trades ORDER BY date DESC LIMIT 200")?;
    let tickers = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(dedup_symbols(
        tickers
            .into_iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty()),
    ))
}

fn dedup_symbols(symbols: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    symbols.filter(|s| seen.insert(s.clone())).collect()
}

/// List members with their contribution totals, ordered by name
pub fn list_members(conn: &Connection) -> Result<Vec<(Member, Decimal, Decimal)>> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.name, m.email FROM members m ORDER BY m.name COLLATE NOCASE",
    )?;

    let members = stmt
        .query_map([], |row| {
            Ok(Member {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut results = Vec::with_capacity(members.len());
    for member in members {
        let mut stmt = conn.prepare(
            "SELECT amount, shares, contribution_type FROM contributions WHERE member_id = ?1",
        )?;
        let rows = stmt
            .query_map([member.id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut total_amount = Decimal::ZERO;
        let mut total_shares = Decimal::ZERO;
        for (amount, shares, contribution_type) in rows {
            let amount = Decimal::from_str(&amount).context("Failed to parse amount")?;
            let shares = Decimal::from_str(&shares).context("Failed to parse shares")?;
            match contribution_type.parse::<ContributionType>() {
                Ok(ContributionType::Withdraw) => {
                    total_amount -= amount;
                    total_shares -= shares;
                }
                _ => {
                    total_amount += amount;
                    total_shares += shares;
                }
            }
        }

        results.push((member, total_amount, total_shares));
    }

    Ok(results)
}

/// List trades, most recent first
pub fn list_trades(conn: &Connection, limit: usize) -> Result<Vec<Trade>> {
    let mut stmt = conn.prepare(
        "SELECT id, date, ticker, action, shares, price, fees, asset_type, notes
         FROM trades ORDER BY date DESC, id DESC LIMIT ?1",
    )?;

    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok((
                row.get::<_, Option<i64>>(0)?,
                row.get::<_, NaiveDate>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, Option<String>>(8)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter()
        .map(
            |(id, date, ticker, action, shares, price, fees, asset_type, notes)| {
                Ok(Trade {
                    id,
                    date,
                    ticker,
                    action: action
                        .parse::<TradeAction>()
                        .map_err(|_| anyhow!("Unknown trade action '{}'", action))?,
                    shares: Decimal::from_str(&shares).context("Failed to parse shares")?,
                    price: Decimal::from_str(&price).context("Failed to parse price")?,
                    fees: Decimal::from_str(&fees).context("Failed to parse fees")?,
                    asset_type: asset_type.parse::<AssetType>().unwrap_or(AssetType::Stock),
                    notes,
                    created_at: None,
                })
            },
        )
        .collect()
}

/// Count rows in a snapshot generation (used by import summaries and tests)
pub fn count_position_snapshots(conn: &Connection, date: NaiveDate) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM position_snapshots WHERE date = ?1",
        [date],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Count live position rows for an as-of date
pub fn count_live_positions(conn: &Connection, date: NaiveDate) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM live_positions WHERE date = ?1",
        [date],
        |row| row.get(0),
    )?;
    Ok(count)
}
