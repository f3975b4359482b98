//! Sequential feed fetching with per-call caps.
//!
//! Feeds are read one after another in list order; the list order is the
//! priority order when a cap is applied. A feed that cannot be downloaded
//! or parsed contributes nothing and is only logged.

use super::parser::parse_feed;
use crate::config::{SectionConfig, SiteConfig};
use crate::error::{NewsError, Result};
use crate::models::{FeedItem, SectionItems};
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::collections::HashSet;
use tracing::{debug, info, instrument, warn};

/// Download and parse one feed.
#[instrument(level = "debug", skip(client))]
pub async fn fetch_feed(client: &Client, url: &str) -> Result<Vec<FeedItem>> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(NewsError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let body = resp.text().await?;
    let items = parse_feed(&body)?;
    debug!(count = items.len(), "Parsed feed");
    Ok(items)
}

/// Read every URL once, in order. Failed feeds yield an empty list.
async fn fetch_all(client: &Client, urls: &[String]) -> Vec<Vec<FeedItem>> {
    stream::iter(urls)
        .then(|url| async move {
            match fetch_feed(client, url).await {
                Ok(items) => {
                    if items.is_empty() {
                        warn!(%url, "Feed returned no entries");
                    }
                    items
                }
                Err(e) => {
                    warn!(%url, error = %e, "Feed skipped");
                    Vec::new()
                }
            }
        })
        .collect()
        .await
}

/// Entries from `urls` in concatenation order, at most `limit` of them.
///
/// Every URL is requested once even after the cap is reached; only the
/// appending stops.
#[instrument(level = "info", skip(client, urls), fields(feeds = urls.len()))]
pub async fn fetch_entries(client: &Client, urls: &[String], limit: usize) -> Vec<FeedItem> {
    let items: Vec<FeedItem> = fetch_all(client, urls)
        .await
        .into_iter()
        .flatten()
        .take(limit)
        .collect();
    info!(count = items.len(), "Fetched feed entries");
    items
}

/// Collect one digest section.
///
/// Looks at the first `2 * limit` entries of each feed, skips entries
/// published before `cutoff` (undated entries are kept) and titles already
/// seen in this section (case-insensitive), and stops at `limit` items.
#[instrument(level = "info", skip_all, fields(section = %section.label))]
pub async fn collect_section(
    client: &Client,
    section: &SectionConfig,
    limit: usize,
    cutoff: DateTime<Utc>,
) -> SectionItems {
    let feeds = fetch_all(client, &section.urls).await;
    let mut seen: HashSet<String> = HashSet::new();
    let mut items = Vec::with_capacity(limit);

    'feeds: for feed in feeds {
        for item in feed.into_iter().take(limit.saturating_mul(2)) {
            if items.len() >= limit {
                break 'feeds;
            }
            if item.published.is_some_and(|p| p < cutoff) {
                continue;
            }
            if !seen.insert(item.title.to_lowercase()) {
                continue;
            }
            items.push(item);
        }
    }

    info!(count = items.len(), "Collected section");
    SectionItems {
        label: section.label.clone(),
        items,
    }
}

/// Oldest publish time still inside a horizon of `hours` before `now`.
/// A horizon too large to represent keeps everything.
pub fn horizon_cutoff(now: DateTime<Utc>, hours: i64) -> DateTime<Utc> {
    Duration::try_hours(hours)
        .and_then(|h| now.checked_sub_signed(h))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Collect every section of the site's digest, in configured order.
pub async fn collect_sections(client: &Client, site: &SiteConfig, now: DateTime<Utc>) -> Vec<SectionItems> {
    let cutoff = horizon_cutoff(now, site.digest.horizon_hours);
    let mut sections = Vec::with_capacity(site.digest.sections.len());
    for section in &site.digest.sections {
        sections.push(collect_section(client, section, site.digest.max_per_section, cutoff).await);
    }
    sections
}
