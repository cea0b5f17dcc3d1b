//! Contribution row interpreter.
//!
//! Contribution CSVs are club-managed, so the header is reliable row 0 and
//! columns are addressed by name. Member identity travels with each row and
//! is resolved against the member table later (id, then email, then
//! case-insensitive name).

use std::collections::HashMap;
use tracing::warn;

use super::cell::{parse_date, parse_number};
use crate::db::models::{Contribution, ContributionType};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Member identity as it appears on a contribution row. Any of the three
/// keys may be present; precedence is id > email > name.
#[derive(Debug, Clone, Default)]
pub struct MemberRef {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl MemberRef {
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none() && self.email.is_none()
    }
}

/// A validated contribution row awaiting member resolution
#[derive(Debug, Clone)]
pub struct ContributionRow {
    pub member: MemberRef,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub shares: Decimal,
    pub contribution_type: ContributionType,
    pub memo: Option<String>,
}

impl ContributionRow {
    pub fn into_contribution(self, member_id: i64) -> Contribution {
        Contribution {
            id: None,
            member_id,
            date: self.date,
            amount: self.amount,
            shares: self.shares,
            contribution_type: self.contribution_type,
            memo: self.memo,
        }
    }
}

fn get<'a>(row: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    row.get(key).map(String::as_str).filter(|v| !v.trim().is_empty())
}

/// Interpret contribution rows. Rows missing a parseable date, amount, or
/// shares are skipped silently; everything else carries through.
pub fn interpret_contributions(rows: &[HashMap<String, String>]) -> (Vec<ContributionRow>, usize) {
    let mut contributions = Vec::new();
    let mut skipped = 0;

    for row in rows {
        let date = get(row, "date").and_then(parse_date);
        let amount = get(row, "amount").and_then(parse_number);
        let shares = get(row, "shares").and_then(parse_number);

        let (Some(date), Some(amount), Some(shares)) = (date, amount, shares) else {
            warn!("Skipping contribution row with unparseable required field: {:?}", row);
            skipped += 1;
            continue;
        };

        // Anything that is not explicitly a withdrawal is a buy-in.
        let contribution_type = match get(row, "type").map(|t| t.trim().to_uppercase()) {
            Some(t) if t == "WITHDRAW" => ContributionType::Withdraw,
            _ => ContributionType::Buy,
        };

        let member = MemberRef {
            id: get(row, "member_id").and_then(|id| id.trim().parse().ok()),
            name: get(row, "member_name").map(|n| n.trim().to_string()),
            email: get(row, "member_email").map(|e| e.trim().to_string()),
        };

        contributions.push(ContributionRow {
            member,
            date,
            amount,
            shares,
            contribution_type,
            memo: get(row, "memo").map(|m| m.to_string()),
        });
    }

    (contributions, skipped)
}
