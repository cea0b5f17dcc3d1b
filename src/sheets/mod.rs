//! Live-price sheet fetch.
//!
//! The club publishes its watch list as a Google sheet. Three ways in, tried
//! in order: an explicit published-CSV export URL, the values API (sheet id +
//! API key + range), and the public CSV export built from a bare sheet id.
//! Whatever the source, the result is the same raw-matrix rows the file
//! upload path feeds to the header resolver.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::error::ClubError;
use crate::ingest::decode;

/// Sheet fetch configuration, resolved from the environment
#[derive(Debug, Clone, Default)]
pub struct SheetConfig {
    pub csv_url: Option<String>,
    pub sheet_id: Option<String>,
    pub api_key: Option<String>,
    pub range: Option<String>,
    pub gid: Option<String>,
}

impl SheetConfig {
    pub fn from_env() -> Self {
        SheetConfig {
            csv_url: env_opt("GOOGLE_SHEETS_CSV_URL"),
            sheet_id: env_opt("GOOGLE_SHEETS_SHEET_ID"),
            api_key: env_opt("GOOGLE_SHEETS_API_KEY"),
            range: env_opt("GOOGLE_SHEETS_RANGE"),
            gid: env_opt("GOOGLE_SHEETS_GID"),
        }
    }

    /// Config for a one-off URL passed on the command line
    pub fn for_url(url: String) -> Self {
        SheetConfig {
            csv_url: Some(url),
            ..Default::default()
        }
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// A published-CSV endpoint that is not actually published serves a login
/// page instead of CSV.
pub fn looks_like_html(payload: &str) -> bool {
    let head = payload.trim_start().to_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// Public CSV export URL for a sheet id (optionally a specific tab by gid)
pub fn public_csv_url(sheet_id: &str, gid: Option<&str>) -> String {
    match gid {
        Some(gid) => format!(
            "https://docs.google.com/spreadsheets/d/{}/export?format=csv&gid={}",
            sheet_id, gid
        ),
        None => format!(
            "https://docs.google.com/spreadsheets/d/{}/export?format=csv",
            sheet_id
        ),
    }
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

/// Bring values-API rows to the raw-matrix shape: blank rows dropped, short
/// rows padded to the widest, same as the CSV decode path.
fn pad_values(values: Vec<Vec<String>>) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = values
        .into_iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .collect();

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(width, String::new());
    }

    rows
}

async fn fetch_csv_rows(client: &Client, url: &str) -> Result<Vec<Vec<String>>> {
    let response = client
        .get(url)
        .send()
        .await
        .context("Failed to fetch the sheet CSV export")?;

    if !response.status().is_success() {
        return Err(ClubError::SheetError(format!(
            "Sheet CSV fetch failed: {}",
            response.status()
        ))
        .into());
    }

    let text = response
        .text()
        .await
        .context("Failed to read the sheet CSV response")?;

    if looks_like_html(&text) {
        return Err(ClubError::SheetError(
            "Sheet endpoint returned HTML. Verify GOOGLE_SHEETS_CSV_URL is a published export URL."
                .to_string(),
        )
        .into());
    }

    decode::raw_rows(&text)
}

async fn fetch_values_rows(
    client: &Client,
    sheet_id: &str,
    api_key: &str,
    range: &str,
) -> Result<Vec<Vec<String>>> {
    let url = format!(
        "https://sheets.googleapis.com/v4/spreadsheets/{}/values/{}",
        sheet_id,
        range.replace(' ', "%20")
    );

    let response = client
        .get(&url)
        .query(&[("key", api_key), ("majorDimension", "ROWS")])
        .send()
        .await
        .context("Failed to fetch sheet values")?;

    if !response.status().is_success() {
        return Err(ClubError::SheetError(format!(
            "Sheet values fetch failed: {}",
            response.status()
        ))
        .into());
    }

    let data: ValuesResponse = response
        .json()
        .await
        .context("Failed to parse sheet values response")?;

    Ok(pad_values(data.values))
}

/// Fetch the live-price sheet as raw-matrix rows.
///
/// Source precedence: explicit CSV URL, then the values API when id + key +
/// range are all configured, then the public CSV export for a bare sheet id.
pub async fn fetch_live_sheet_rows(config: &SheetConfig) -> Result<Vec<Vec<String>>> {
    let client = Client::builder()
        .user_agent("Mozilla/5.0 (compatible; ClubbookBot/1.0)")
        .build()?;

    if let Some(url) = &config.csv_url {
        info!("Fetching live-price sheet from the published CSV URL");
        return fetch_csv_rows(&client, url.trim()).await;
    }

    if let (Some(sheet_id), Some(api_key), Some(range)) =
        (&config.sheet_id, &config.api_key, &config.range)
    {
        info!("Fetching live-price sheet via the values API");
        return fetch_values_rows(&client, sheet_id, api_key, range).await;
    }

    if let Some(sheet_id) = &config.sheet_id {
        info!("Fetching live-price sheet via the public CSV export");
        return fetch_csv_rows(&client, &public_csv_url(sheet_id, config.gid.as_deref())).await;
    }

    Err(ClubError::SheetError(
        "Missing sheet configuration. Set GOOGLE_SHEETS_CSV_URL or GOOGLE_SHEETS_SHEET_ID \
         (and optionally GOOGLE_SHEETS_API_KEY + GOOGLE_SHEETS_RANGE)."
            .to_string(),
    )
    .into())
}
