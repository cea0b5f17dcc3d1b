mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{
    BtcCommands, Cli, Commands, ImportCommands, MemberCommands, QuoteCommands, SnapshotCommands,
    TradeCommands,
};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::info;

use clubbook::db::{self, PortfolioSnapshot};
use clubbook::ingest::{self, ImportSummary};
use clubbook::quotes::{self, QuoteConfig};
use clubbook::sheets::{self, SheetConfig};
use clubbook::utils::{format_shares, format_usd};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let db_path = cli.db.clone();

    match cli.command {
        Commands::Init => {
            db::init_database(db_path)?;
            println!("{} Database initialized", "✓".green().bold());
            Ok(())
        }

        Commands::Import { flow } => handle_import(db_path, flow).await,

        Commands::Btc { action } => match action {
            BtcCommands::Add {
                date,
                btc_amount,
                usd_amount,
                btc_price,
            } => {
                let purchase = ingest::btc::new_btc_purchase(
                    Some(date),
                    Some(btc_amount),
                    Some(usd_amount),
                    Some(btc_price),
                )?;
                let conn = db::open_db(db_path)?;
                db::insert_btc_purchase(&conn, &purchase)?;
                println!(
                    "{} Recorded BTC purchase: {} BTC for {} on {}",
                    "✓".green().bold(),
                    format_shares(btc_amount),
                    format_usd(usd_amount),
                    date
                );
                Ok(())
            }
        },

        Commands::Snapshot { action } => match action {
            SnapshotCommands::Set {
                date,
                total_value,
                cash_value,
                btc_price,
                sp500_value,
                notes,
            } => {
                let conn = db::open_db(db_path)?;
                db::upsert_portfolio_snapshot(
                    &conn,
                    &PortfolioSnapshot {
                        id: None,
                        date,
                        total_value,
                        cash_value,
                        btc_price,
                        sp500_value,
                        notes,
                    },
                )?;
                println!(
                    "{} Saved snapshot for {}: total {}",
                    "✓".green().bold(),
                    date,
                    format_usd(total_value)
                );
                Ok(())
            }
        },

        Commands::Quotes { action } => match action {
            QuoteCommands::Refresh { symbols } => {
                let config = QuoteConfig::from_env()?;
                let conn = db::open_db(db_path)?;
                let outcome = quotes::refresh_market_quotes(&conn, &config, symbols).await?;

                if outcome.skipped {
                    println!(
                        "{} Quotes are fresh; skipped refresh ({} symbols tracked)",
                        "·".yellow().bold(),
                        outcome.symbols.len()
                    );
                } else {
                    println!(
                        "{} Refreshed {} of {} quotes",
                        "✓".green().bold(),
                        outcome.count,
                        outcome.symbols.len()
                    );
                }
                Ok(())
            }
            QuoteCommands::List { json } => {
                let conn = db::open_db(db_path)?;
                show_quotes(&conn, json)
            }
        },

        Commands::Members { action } => match action {
            MemberCommands::Add { name, email } => {
                let conn = db::open_db(db_path)?;
                let member = db::find_or_create_member(&conn, None, Some(&name), email.as_deref())?;
                println!(
                    "{} Member '{}' saved (id {})",
                    "✓".green().bold(),
                    member.name,
                    member.id
                );
                Ok(())
            }
            MemberCommands::List { json } => {
                let conn = db::open_db(db_path)?;
                show_members(&conn, json)
            }
        },

        Commands::Trades { action } => match action {
            TradeCommands::List { limit, json } => {
                let conn = db::open_db(db_path)?;
                show_trades(&conn, limit, json)
            }
        },
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_upload(path: &Path) -> Result<Vec<u8>> {
    info!("Importing from: {}", path.display());
    std::fs::read(path).context(format!("Failed to read {}", path.display()))
}

/// Handle the import subcommands
async fn handle_import(db_path: Option<PathBuf>, flow: ImportCommands) -> Result<()> {
    let mut conn = db::open_db(db_path)?;

    match flow {
        ImportCommands::Contributions { file } => {
            let bytes = read_upload(&file)?;
            let summary = ingest::import_contributions(&conn, &bytes)?;
            print_summary("contributions", summary);
        }
        ImportCommands::Trades { file } => {
            let bytes = read_upload(&file)?;
            let summary = ingest::import_trades(&conn, &bytes)?;
            print_summary("trades", summary);
        }
        ImportCommands::FidelityHistory { file } => {
            let bytes = read_upload(&file)?;
            let summary = ingest::import_fidelity_history(&conn, &bytes)?;
            print_summary("trades", summary);
        }
        ImportCommands::FidelityPositions { file, as_of } => {
            let bytes = read_upload(&file)?;
            let (date, summary) =
                ingest::import_fidelity_positions(&mut conn, &bytes, &file_name_of(&file), as_of)?;
            print_replaced("positions", date, summary);
        }
        ImportCommands::LivePrices { file, url, as_of } => {
            let (date, summary) = match file {
                Some(path) => {
                    let bytes = read_upload(&path)?;
                    ingest::import_live_prices(&mut conn, &bytes, &file_name_of(&path), as_of)?
                }
                None => {
                    let config = match url {
                        Some(url) => SheetConfig::for_url(url),
                        None => SheetConfig::from_env(),
                    };
                    let rows = sheets::fetch_live_sheet_rows(&config).await?;
                    ingest::import_live_price_rows(&mut conn, &rows, "live-price sheet", as_of)?
                }
            };
            print_replaced("live positions", date, summary);
        }
        ImportCommands::Btc { file } => {
            let bytes = read_upload(&file)?;
            let summary = ingest::import_btc_purchases(&conn, &bytes)?;
            print_summary("BTC purchases", summary);
        }
    }

    Ok(())
}

fn print_replaced(what: &str, date: chrono::NaiveDate, summary: ImportSummary) {
    println!(
        "{} Replaced {} for {}: {} rows ({} skipped)",
        "✓".green().bold(),
        what,
        date,
        summary.imported,
        summary.skipped
    );
}

fn print_summary(what: &str, summary: ImportSummary) {
    println!(
        "{} Imported {} {} ({} rows skipped)",
        "✓".green().bold(),
        summary.imported,
        what,
        summary.skipped
    );
}

fn show_members(conn: &rusqlite::Connection, json: bool) -> Result<()> {
    use tabled::{settings::Style, Table, Tabled};

    #[derive(Tabled)]
    struct MemberRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Email")]
        email: String,
        #[tabled(rename = "Contributed")]
        amount: String,
        #[tabled(rename = "Shares")]
        shares: String,
    }

    let members = db::list_members(conn)?;

    if json {
        let payload: Vec<serde_json::Value> = members
            .iter()
            .map(|(member, amount, shares)| {
                serde_json::json!({
                    "id": member.id,
                    "name": member.name,
                    "email": member.email,
                    "total_amount": amount.to_string(),
                    "total_shares": shares.to_string(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if members.is_empty() {
        println!("No members yet");
        return Ok(());
    }

    let rows: Vec<MemberRow> = members
        .into_iter()
        .map(|(member, amount, shares)| MemberRow {
            id: member.id,
            name: member.name,
            email: member.email.unwrap_or_default(),
            amount: format_usd(amount),
            shares: format_shares(shares),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
    Ok(())
}

fn show_trades(conn: &rusqlite::Connection, limit: usize, json: bool) -> Result<()> {
    use tabled::{settings::Style, Table, Tabled};

    #[derive(Tabled)]
    struct TradeRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Ticker")]
        ticker: String,
        #[tabled(rename = "Action")]
        action: String,
        #[tabled(rename = "Shares")]
        shares: String,
        #[tabled(rename = "Price")]
        price: String,
        #[tabled(rename = "Fees")]
        fees: String,
        #[tabled(rename = "Type")]
        asset_type: String,
    }

    let trades = db::list_trades(conn, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&trades)?);
        return Ok(());
    }

    if trades.is_empty() {
        println!("No trades yet");
        return Ok(());
    }

    let rows: Vec<TradeRow> = trades
        .into_iter()
        .map(|trade| TradeRow {
            date: trade.date.to_string(),
            ticker: trade.ticker,
            action: trade.action.as_str().to_string(),
            shares: format_shares(trade.shares),
            price: format_usd(trade.price),
            fees: format_usd(trade.fees),
            asset_type: trade.asset_type.as_str().to_string(),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
    Ok(())
}

fn show_quotes(conn: &rusqlite::Connection, json: bool) -> Result<()> {
    use tabled::{settings::Style, Table, Tabled};

    #[derive(Tabled)]
    struct QuoteRow {
        #[tabled(rename = "Symbol")]
        symbol: String,
        #[tabled(rename = "Price")]
        price: String,
        #[tabled(rename = "As Of")]
        as_of: String,
        #[tabled(rename = "Source")]
        source: String,
    }

    let quotes = db::list_latest_quotes(conn)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&quotes)?);
        return Ok(());
    }

    if quotes.is_empty() {
        println!("No cached quotes; run `clubbook quotes refresh`");
        return Ok(());
    }

    let rows: Vec<QuoteRow> = quotes
        .into_iter()
        .map(|quote| QuoteRow {
            symbol: quote.symbol,
            price: format_usd(quote.price),
            as_of: quote.as_of.format("%Y-%m-%d %H:%M UTC").to_string(),
            source: quote.source,
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
    Ok(())
}
