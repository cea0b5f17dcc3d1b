use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clubbook")]
#[command(version, about = "Investment club bookkeeping and brokerage CSV ingestion")]
#[command(
    long_about = "Track an investment club's ledger: import brokerage CSV exports (trades, \
positions, live prices), record member contributions and BTC purchases, and keep a \
short-lived cache of live market quotes."
)]
pub struct Cli {
    /// Database path (defaults to $CLUBBOOK_DB, then ~/.clubbook/data.db)
    #[arg(long = "db", global = true)]
    pub db: Option<PathBuf>,

    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Import a CSV export
    Import {
        #[command(subcommand)]
        flow: ImportCommands,
    },

    /// BTC purchase entries
    Btc {
        #[command(subcommand)]
        action: BtcCommands,
    },

    /// Monthly portfolio snapshot
    Snapshot {
        #[command(subcommand)]
        action: SnapshotCommands,
    },

    /// Live market quotes
    Quotes {
        #[command(subcommand)]
        action: QuoteCommands,
    },

    /// Club members
    Members {
        #[command(subcommand)]
        action: MemberCommands,
    },

    /// Club trades
    Trades {
        #[command(subcommand)]
        action: TradeCommands,
    },
}

#[derive(Subcommand)]
pub enum ImportCommands {
    /// Member contributions CSV (date, member, amount, shares, type)
    Contributions {
        /// Path to the CSV file
        file: PathBuf,
    },

    /// Generic trades CSV (header on the first row)
    Trades {
        /// Path to the CSV file
        file: PathBuf,
    },

    /// Fidelity "Accounts History" export
    FidelityHistory {
        /// Path to the CSV file
        file: PathBuf,
    },

    /// Fidelity positions export (replaces the snapshot for its as-of date)
    FidelityPositions {
        /// Path to the CSV file
        file: PathBuf,

        /// As-of date override (otherwise taken from the filename, then today)
        #[arg(long = "as-of")]
        as_of: Option<NaiveDate>,
    },

    /// Live-price sheet (replaces the generation for its as-of date).
    /// Omit the file to fetch from the configured Google sheet.
    LivePrices {
        /// Path to the CSV file
        file: Option<PathBuf>,

        /// Published CSV export URL (instead of a file or env configuration)
        #[arg(long, conflicts_with = "file")]
        url: Option<String>,

        /// As-of date override (otherwise taken from the filename, then today)
        #[arg(long = "as-of")]
        as_of: Option<NaiveDate>,
    },

    /// BTC purchases CSV
    Btc {
        /// Path to the CSV file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum BtcCommands {
    /// Record a single BTC purchase (all fields required)
    Add {
        #[arg(long)]
        date: NaiveDate,

        #[arg(long = "btc-amount")]
        btc_amount: Decimal,

        #[arg(long = "usd-amount")]
        usd_amount: Decimal,

        #[arg(long = "btc-price")]
        btc_price: Decimal,
    },
}

#[derive(Subcommand)]
pub enum SnapshotCommands {
    /// Save the monthly valuation (overwrites the same date in place)
    Set {
        #[arg(long)]
        date: NaiveDate,

        #[arg(long = "total-value")]
        total_value: Decimal,

        #[arg(long = "cash-value")]
        cash_value: Decimal,

        #[arg(long = "btc-price")]
        btc_price: Decimal,

        #[arg(long = "sp500")]
        sp500_value: Decimal,

        #[arg(long)]
        notes: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum QuoteCommands {
    /// Fetch fresh quotes for tracked symbols (rate-limited)
    Refresh {
        /// Comma-separated symbol list override
        #[arg(long, value_delimiter = ',')]
        symbols: Option<Vec<String>>,
    },

    /// Show the latest cached quote per symbol
    List {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum MemberCommands {
    /// Add a member (reuses the existing record on a name or email match)
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: Option<String>,
    },

    /// List members with contribution totals
    List {
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum TradeCommands {
    /// List recent trades
    List {
        /// Maximum rows to show
        #[arg(long, default_value_t = 50)]
        limit: usize,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}
