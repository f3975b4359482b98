//! Ticker selection and the periodic ticker refresher.
//!
//! Selection takes a few headlines from each bucket in the fixed order
//! local, world, sports. How many, and which ones, is a [`SelectionPolicy`].
//! Titles are deduplicated on their normalized form before any cap is
//! applied, so a repeated headline never shows up twice on the strip.

use crate::cache;
use crate::categorize::{categorize, normalize_title, Buckets};
use crate::config::SiteConfig;
use crate::error::Result;
use crate::models::{collapse_whitespace, Bucket, SummaryEntry};
use crate::outputs::ticker::{render, TickerOptions};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

/// How many headlines to take from each bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// The `n` most recent headlines of every bucket.
    TailPerBucket(usize),
    /// The first `n` headlines of every bucket, in cache order.
    HeadPerBucket(usize),
    /// Up to `n` headlines overall, taken round-robin across buckets.
    Proportional(usize),
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        SelectionPolicy::TailPerBucket(2)
    }
}

/// One link on the ticker strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickerItem {
    pub title: String,
    pub url: String,
    /// Marked by the summary job; highlighted on the strip.
    pub hot: bool,
}

impl TickerItem {
    fn from_entry(entry: &SummaryEntry, fallback_url: &str) -> Self {
        Self {
            title: entry.title.clone(),
            url: entry
                .url
                .clone()
                .unwrap_or_else(|| fallback_url.to_string()),
            hot: entry.hot,
        }
    }
}

fn dedupe_key(title: &str) -> String {
    collapse_whitespace(&normalize_title(title))
}

/// Entries sorted oldest first. Undated entries count as oldest; ties keep cache order.
fn chronological(entries: &[SummaryEntry]) -> Vec<&SummaryEntry> {
    let mut sorted: Vec<&SummaryEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.date);
    sorted
}

/// Pick the headlines for the strip, grouped in bucket order.
pub fn select(buckets: &Buckets, policy: SelectionPolicy) -> Vec<SummaryEntry> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut picked: Vec<Vec<&SummaryEntry>> = vec![Vec::new(); Bucket::ALL.len()];

    match policy {
        SelectionPolicy::TailPerBucket(n) => {
            for (slot, bucket) in Bucket::ALL.iter().enumerate() {
                for entry in chronological(buckets.get(*bucket)).into_iter().rev() {
                    if picked[slot].len() == n {
                        break;
                    }
                    if seen.insert(dedupe_key(&entry.title)) {
                        picked[slot].push(entry);
                    }
                }
                picked[slot].reverse();
            }
        }
        SelectionPolicy::HeadPerBucket(n) => {
            for (slot, bucket) in Bucket::ALL.iter().enumerate() {
                for entry in buckets.get(*bucket) {
                    if picked[slot].len() == n {
                        break;
                    }
                    if seen.insert(dedupe_key(&entry.title)) {
                        picked[slot].push(entry);
                    }
                }
            }
        }
        SelectionPolicy::Proportional(total) => {
            let mut queues: Vec<Vec<&SummaryEntry>> = Bucket::ALL
                .iter()
                .map(|b| chronological(buckets.get(*b)))
                .collect();
            let mut taken = 0;
            while taken < total && queues.iter().any(|q| !q.is_empty()) {
                for (slot, queue) in queues.iter_mut().enumerate() {
                    if taken == total {
                        break;
                    }
                    while let Some(entry) = queue.pop() {
                        if seen.insert(dedupe_key(&entry.title)) {
                            picked[slot].push(entry);
                            taken += 1;
                            break;
                        }
                    }
                }
            }
            for slot in picked.iter_mut() {
                slot.reverse();
            }
        }
    }

    picked.into_iter().flatten().cloned().collect()
}

/// Select and convert to links; entries without a URL point at `fallback_url`.
pub fn select_items(buckets: &Buckets, policy: SelectionPolicy, fallback_url: &str) -> Vec<TickerItem> {
    select(buckets, policy)
        .iter()
        .map(|e| TickerItem::from_entry(e, fallback_url))
        .collect()
}

/// Load the cache, categorize, select and render the ticker fragment.
///
/// Returns the HTML and the number of headlines on the strip. When the
/// cache has no data the hidden placeholder is returned with a count of 0.
#[instrument(level = "info", skip(client, site), fields(lang = %site.lang))]
pub async fn build_ticker(client: &Client, site: &SiteConfig, source: &str) -> (String, usize) {
    let options = TickerOptions::for_site(site);
    let items = match cache::load(client, source).await {
        Some(entries) => {
            let buckets = categorize(&entries, site);
            if buckets.is_empty() {
                debug!("No headlines to categorize");
            }
            select_items(&buckets, site.ticker.policy, &site.ticker.fallback_url)
        }
        None => Vec::new(),
    };
    if items.is_empty() {
        info!("Ticker selection is empty; rendering hidden strip");
    } else {
        info!(count = items.len(), "Ticker selection ready");
    }
    (render(&items, &options), items.len())
}

/// Build the ticker once and write it to `out_path`.
pub async fn refresh_once(
    client: &Client,
    site: &SiteConfig,
    source: &str,
    out_path: &Path,
) -> Result<usize> {
    let (html, count) = build_ticker(client, site, source).await;
    if let Some(parent) = out_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(out_path, html).await?;
    info!(path = %out_path.display(), count, "Wrote ticker fragment");
    Ok(count)
}

/// Rebuilds the ticker fragment on an interval until stopped.
///
/// Dropping the refresher stops it as well.
#[derive(Debug)]
pub struct TickerRefresher {
    handle: Option<JoinHandle<()>>,
}

impl TickerRefresher {
    pub fn start(
        client: Client,
        site: SiteConfig,
        source: String,
        out_path: PathBuf,
        every: Duration,
    ) -> Self {
        info!(lang = %site.lang, ?every, "Starting ticker refresher");
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if let Err(e) = refresh_once(&client, &site, &source, &out_path).await {
                    error!(path = %out_path.display(), error = %e, "Ticker refresh failed");
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Ticker refresher stopped");
        }
    }
}

impl Drop for TickerRefresher {
    fn drop(&mut self) {
        self.stop();
    }
}
