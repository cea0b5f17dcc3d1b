use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Trade action (buy or sell)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
        }
    }
}

impl FromStr for TradeAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(TradeAction::Buy),
            "SELL" => Ok(TradeAction::Sell),
            _ => Err(()),
        }
    }
}

/// Asset classes the club trades
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AssetType {
    Stock,
    Etf,
    Crypto,
    Cash,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Stock => "STOCK",
            AssetType::Etf => "ETF",
            AssetType::Crypto => "CRYPTO",
            AssetType::Cash => "CASH",
        }
    }
}

impl FromStr for AssetType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STOCK" => Ok(AssetType::Stock),
            "ETF" => Ok(AssetType::Etf),
            "CRYPTO" => Ok(AssetType::Crypto),
            "CASH" => Ok(AssetType::Cash),
            _ => Err(()),
        }
    }
}

/// A single club trade. Append-only; re-importing the same file creates
/// duplicate rows (dedup is a manual affair, by policy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub ticker: String,
    pub action: TradeAction,
    pub shares: Decimal,
    pub price: Decimal,
    pub fees: Decimal,
    pub asset_type: AssetType,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Contribution type (member money in or out)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContributionType {
    Buy,
    Withdraw,
}

impl ContributionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionType::Buy => "BUY",
            ContributionType::Withdraw => "WITHDRAW",
        }
    }
}

impl FromStr for ContributionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(ContributionType::Buy),
            "WITHDRAW" => Ok(ContributionType::Withdraw),
            _ => Err(()),
        }
    }
}

/// Club member. Created lazily during ingestion, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
}

/// Member contribution (shares bought into or withdrawn from the club)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    pub id: Option<i64>,
    pub member_id: i64,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub shares: Decimal,
    pub contribution_type: ContributionType,
    pub memo: Option<String>,
}

/// Manual or CSV-imported BTC purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BtcPurchase {
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub btc_amount: Decimal,
    pub usd_amount: Decimal,
    pub btc_price: Decimal,
}

/// One row of a Fidelity positions export, tied to an as-of date.
/// At most one snapshot generation exists per date; re-imports replace it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub account_number: Option<String>,
    pub account_name: Option<String>,
    pub symbol: String,
    pub description: Option<String>,
    pub quantity: Option<Decimal>,
    pub last_price: Option<Decimal>,
    pub current_value: Option<Decimal>,
    pub total_gain_loss: Option<Decimal>,
    pub total_gain_loss_percent: Option<Decimal>,
    pub percent_of_account: Option<Decimal>,
    pub cost_basis_total: Option<Decimal>,
    pub average_cost_basis: Option<Decimal>,
    pub asset_type: Option<String>,
}

/// One row of the live-price sheet, same replace-by-date semantics
/// as position snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LivePosition {
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub symbol: String,
    pub quantity: Option<Decimal>,
    pub asset: Option<String>,
    pub price: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub market_value: Option<Decimal>,
    pub gain_dollar: Option<Decimal>,
    pub gain_percent: Option<Decimal>,
    pub percent_of_portfolio: Option<Decimal>,
    pub term: Option<String>,
    pub beta: Option<Decimal>,
    pub pe: Option<Decimal>,
    pub week_high: Option<Decimal>,
    pub week_low: Option<Decimal>,
    pub gain_30: Option<Decimal>,
    pub gain_60: Option<Decimal>,
    pub gain_90: Option<Decimal>,
    pub weight: Option<Decimal>,
    pub est_purchase: Option<Decimal>,
    pub shares_target: Option<Decimal>,
    pub rounded: Option<Decimal>,
    pub total_purchase: Option<Decimal>,
}

/// Monthly club valuation. One row per date, upserted in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub id: Option<i64>,
    pub date: NaiveDate,
    pub total_value: Decimal,
    pub cash_value: Decimal,
    pub btc_price: Decimal,
    pub sp500_value: Decimal,
    pub notes: Option<String>,
}

/// Cached live quote from the upstream price API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketQuote {
    pub id: Option<i64>,
    pub symbol: String,
    pub price: Decimal,
    pub as_of: DateTime<Utc>,
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_action_conversions() {
        assert_eq!(TradeAction::Buy.as_str(), "BUY");
        assert_eq!(TradeAction::Sell.as_str(), "SELL");

        assert_eq!("BUY".parse::<TradeAction>().ok(), Some(TradeAction::Buy));
        assert_eq!("buy".parse::<TradeAction>().ok(), Some(TradeAction::Buy));
        assert_eq!("SELL".parse::<TradeAction>().ok(), Some(TradeAction::Sell));
        assert_eq!("sell".parse::<TradeAction>().ok(), Some(TradeAction::Sell));
        assert_eq!("HOLD".parse::<TradeAction>().ok(), None);
    }

    #[test]
    fn test_asset_type_conversions() {
        assert_eq!(AssetType::Stock.as_str(), "STOCK");
        assert_eq!(AssetType::Etf.as_str(), "ETF");
        assert_eq!(AssetType::Crypto.as_str(), "CRYPTO");
        assert_eq!(AssetType::Cash.as_str(), "CASH");

        assert_eq!("STOCK".parse::<AssetType>().ok(), Some(AssetType::Stock));
        assert_eq!("etf".parse::<AssetType>().ok(), Some(AssetType::Etf));
        assert_eq!("CRYPTO".parse::<AssetType>().ok(), Some(AssetType::Crypto));
        assert_eq!("CASH".parse::<AssetType>().ok(), Some(AssetType::Cash));
        assert_eq!("BOND".parse::<AssetType>().ok(), None);
    }

    #[test]
    fn test_contribution_type_conversions() {
        assert_eq!(ContributionType::Buy.as_str(), "BUY");
        assert_eq!(ContributionType::Withdraw.as_str(), "WITHDRAW");

        assert_eq!(
            "WITHDRAW".parse::<ContributionType>().ok(),
            Some(ContributionType::Withdraw)
        );
        assert_eq!(
            "buy".parse::<ContributionType>().ok(),
            Some(ContributionType::Buy)
        );
        assert_eq!("DEPOSIT".parse::<ContributionType>().ok(), None);
    }
}
