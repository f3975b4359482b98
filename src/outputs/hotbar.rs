//! Hotbar cache files for the ticker.
//!
//! Two files are written per language into the cache directory:
//!
//! ```text
//! cache_dir/
//! ├── news_summaries_pl.json   # {"v2|<title>|<date>": true, ...}
//! └── news_hotbar_pl.json      # {"updated_at": ..., "items": [...]}
//! ```
//!
//! Both are overwritten on every run.

use crate::cache::{HotbarDocument, HotbarItem};
use crate::categorize::normalize_title;
use crate::config::SiteConfig;
use crate::error::Result;
use crate::feeds::fetcher::fetch_feed;
use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use itertools::Itertools;
use reqwest::Client;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument, warn};

const KEY_VERSION: &str = "v2";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotbarEntry {
    pub title: String,
    pub url: String,
    pub date: NaiveDate,
}

pub fn cache_key(title: &str, date: NaiveDate) -> String {
    format!("{KEY_VERSION}|{title}|{}", date.format("%Y-%m-%d"))
}

/// Read the site's hotbar feeds in order, at most `per_feed_limit` entries
/// per feed and `total_limit` overall. Feeds after the total is reached are
/// not requested.
///
/// Publication times are dated in `tz`; entries without one get `today`.
#[instrument(level = "info", skip_all, fields(lang = %site.lang))]
pub async fn collect_hotbar<Tz: TimeZone>(
    client: &Client,
    site: &SiteConfig,
    tz: &Tz,
    today: NaiveDate,
) -> Vec<HotbarEntry> {
    let limits = &site.hotbar;
    let mut seen: HashSet<String> = HashSet::new();
    let mut entries = Vec::new();

    for url in &limits.feeds {
        if entries.len() >= limits.total_limit {
            break;
        }
        let items = match fetch_feed(client, url).await {
            Ok(items) => items,
            Err(e) => {
                warn!(%url, error = %e, "RSS error in hotbar feed");
                continue;
            }
        };

        for item in items
            .into_iter()
            .take(limits.per_feed_limit)
            .unique_by(|i| normalize_title(&i.title))
        {
            if entries.len() >= limits.total_limit {
                break;
            }
            if !seen.insert(normalize_title(&item.title)) {
                continue;
            }
            let date = item
                .published
                .map(|p| p.with_timezone(tz).date_naive())
                .unwrap_or(today);
            entries.push(HotbarEntry {
                title: item.title,
                url: item.link,
                date,
            });
        }
    }

    info!(count = entries.len(), "Collected hotbar entries");
    entries
}

/// The keyed cache shape, in collection order.
pub fn keyed_payload(entries: &[HotbarEntry]) -> Map<String, Value> {
    entries
        .iter()
        .map(|e| (cache_key(&e.title, e.date), Value::Bool(true)))
        .collect()
}

/// The structured cache shape.
pub fn structured_payload(entries: &[HotbarEntry], updated_at: DateTime<Utc>) -> HotbarDocument {
    HotbarDocument {
        updated_at: Some(updated_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
        items: entries
            .iter()
            .map(|e| HotbarItem {
                title: e.title.clone(),
                url: Some(e.url.clone()),
                date: Some(e.date.format("%Y-%m-%d").to_string()),
                is_hot: false,
            })
            .collect(),
    }
}

/// Write both cache files for `site` into `cache_dir`.
#[instrument(level = "info", skip_all, fields(lang = %site.lang, cache_dir = %cache_dir.display()))]
pub async fn write_hotbar(
    cache_dir: &Path,
    site: &SiteConfig,
    entries: &[HotbarEntry],
    now: DateTime<Utc>,
) -> Result<(PathBuf, PathBuf)> {
    if let Err(e) = fs::create_dir_all(cache_dir).await {
        error!(error = %e, "Failed to create cache dir");
        return Err(e.into());
    }
    let dir = cache_dir.to_string_lossy();

    let summaries_path = PathBuf::from(site.summaries_cache_path(&dir));
    let keyed = serde_json::to_string_pretty(&keyed_payload(entries))?;
    fs::write(&summaries_path, keyed).await?;
    info!(path = %summaries_path.display(), count = entries.len(), "Wrote summaries cache");

    let hotbar_path = PathBuf::from(site.hotbar_cache_path(&dir));
    let structured = serde_json::to_string_pretty(&structured_payload(entries, now))?;
    fs::write(&hotbar_path, structured).await?;
    info!(path = %hotbar_path.display(), "Wrote hotbar cache");

    Ok((summaries_path, hotbar_path))
}
