use log::warn;
use reqwest::Client;

use crate::error::{AppError, Context, Result};

/// One line of the plain-text quote listing: `<code> <name> <last close>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRow {
    pub code: String,
    pub name: String,
    pub last_close: String,
}

/// Download and parse a quote listing. Transport failures and non-success
/// statuses are logged and surface as an empty listing.
pub async fn fetch_quote_listing(client: &Client, url: &str) -> Vec<QuoteRow> {
    match try_fetch_quote_listing(client, url).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!("quote listing {url} unavailable: {err}");
            Vec::new()
        }
    }
}

async fn try_fetch_quote_listing(client: &Client, url: &str) -> Result<Vec<QuoteRow>> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Quote listing request failed for {url}"))?;

    if !response.status().is_success() {
        return Err(AppError::message(format!(
            "Quote listing request returned status {}",
            response.status()
        )));
    }

    let body = response
        .text()
        .await
        .context("Failed to read quote listing body")?;
    Ok(parse_quote_listing(&body))
}

/// Whitespace-separated rows; lines with fewer than three columns are skipped.
pub fn parse_quote_listing(body: &str) -> Vec<QuoteRow> {
    body.trim()
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let code = parts.next()?;
            let name = parts.next()?;
            let last_close = parts.next()?;
            Some(QuoteRow {
                code: code.to_string(),
                name: name.to_string(),
                last_close: last_close.to_string(),
            })
        })
        .collect()
}
