//! Summary cache reader.
//!
//! The ticker reads headlines from small JSON caches written by the hotbar
//! job. Three payload shapes are accepted:
//!
//! 1. keyed object: `{"v2|<title>|<date>": true, ...}` (the version prefix
//!    and the date are both optional for older files)
//! 2. structured object: `{"updated_at": "...", "items": [{"title", "url", "is_hot"}]}`
//! 3. plain array of title strings (older English cache files)
//!
//! Any failure (network, status, JSON) or an empty result is reported as
//! "no data" so callers can hide the ticker instead of failing.

use crate::error::{NewsError, Result};
use crate::models::SummaryEntry;
use crate::utils::{looks_truncated, truncate_for_log};
use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use url::Url;

static VERSION_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^v\d+$").expect("valid regex"));
static DATE_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d[\d./ -]*$").expect("valid regex"));

const QUOTE_CHARS: &[char] = &['"', '\'', '“', '”', '„', '«', '»', '‚', '‘', '’'];

/// Structured cache document (`news_hotbar_<lang>.json`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotbarDocument {
    pub updated_at: Option<String>,
    pub items: Vec<HotbarItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotbarItem {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default)]
    pub is_hot: bool,
}

/// Strip whitespace and surrounding quote characters from a cached title.
pub fn clean_title(raw: &str) -> Option<String> {
    let title = raw.trim().trim_matches(QUOTE_CHARS).trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}

/// Parse a `YYYY-MM-DD` date field. Blank means "no date"; anything else
/// that does not parse is an error and the entry should be dropped.
fn parse_date(raw: Option<&str>) -> std::result::Result<Option<NaiveDate>, ()> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d").map(Some).map_err(|_| ()),
    }
}

/// Parse one cache key of the form `v2|<title>|<date>`.
///
/// In a versioned key the last segment is always the date. Legacy keys
/// (`<title>|<date>` or a bare title) only end in a date when the last
/// segment looks like one, so `"A|B"` is the title `A|B`. Pipes inside the
/// title are kept. A lone version token is not a headline.
pub fn parse_key(key: &str) -> Option<SummaryEntry> {
    let mut parts: Vec<&str> = key.split('|').collect();
    let versioned = VERSION_PREFIX.is_match(parts[0].trim());
    if versioned {
        if parts.len() == 1 {
            return None;
        }
        parts.remove(0);
    }
    let date = match parts.last() {
        Some(last) if parts.len() >= 2 && (versioned || DATE_LIKE.is_match(last.trim())) => parts.pop(),
        _ => None,
    };
    let title = clean_title(&parts.join("|"))?;
    let date = parse_date(date).ok()?;
    Some(SummaryEntry {
        title,
        date,
        url: None,
        hot: false,
    })
}

fn entry_from_item(item: &HotbarItem) -> Option<SummaryEntry> {
    let title = clean_title(&item.title)?;
    let date = parse_date(item.date.as_deref()).ok()?;
    let url = item
        .url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string);
    Some(SummaryEntry {
        title,
        date,
        url,
        hot: item.is_hot,
    })
}

/// Turn any accepted payload shape into summary entries, dropping
/// malformed ones individually.
pub fn parse_payload(payload: &Value) -> Vec<SummaryEntry> {
    match payload {
        Value::Object(map) if map.get("items").is_some_and(Value::is_array) => {
            let items = map.get("items").and_then(Value::as_array).map(Vec::as_slice).unwrap_or_default();
            items
                .iter()
                .filter_map(|item| match HotbarItem::deserialize(item) {
                    Ok(item) => entry_from_item(&item),
                    Err(e) => {
                        debug!(error = %e, "Skipping malformed cache item");
                        None
                    }
                })
                .collect()
        }
        Value::Object(map) => map
            .iter()
            .filter_map(|(key, value)| {
                let mut entry = parse_key(key)?;
                if let Some(url) = value.get("url").and_then(Value::as_str) {
                    entry.url = Some(url.to_string()).filter(|u| !u.trim().is_empty());
                }
                Some(entry)
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .filter_map(clean_title)
            .map(|title| SummaryEntry {
                title,
                date: None,
                url: None,
                hot: false,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Append a changing `_` query parameter so intermediaries cannot serve a stale copy.
pub fn cache_busted(mut url: Url, stamp: i64) -> Url {
    url.query_pairs_mut().append_pair("_", &stamp.to_string());
    url
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

async fn read_payload(client: &Client, source: &str) -> Result<Value> {
    let body = if is_remote(source) {
        let url = cache_busted(Url::parse(source)?, Utc::now().timestamp_millis());
        let resp = client
            .get(url)
            .header(CACHE_CONTROL, "no-store")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NewsError::Status {
                status: status.as_u16(),
                url: source.to_string(),
            });
        }
        resp.text().await?
    } else {
        tokio::fs::read_to_string(source).await?
    };

    serde_json::from_str(&body).map_err(|e| {
        if looks_truncated(&e) {
            warn!(body = %truncate_for_log(&body, 200), "Summary cache looks truncated");
        }
        NewsError::Json(e)
    })
}

/// Load a summary cache from an http(s) URL or a local path.
///
/// Returns `None` when there is nothing to show.
#[instrument(level = "info", skip(client))]
pub async fn load(client: &Client, source: &str) -> Option<Vec<SummaryEntry>> {
    let payload = match read_payload(client, source).await {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Summary cache unavailable");
            return None;
        }
    };

    let entries = parse_payload(&payload);
    if entries.is_empty() {
        info!("Summary cache has no usable entries");
        return None;
    }
    info!(count = entries.len(), "Loaded summary cache");
    debug!(titles = ?entries.iter().map(|e| &e.title).collect::<Vec<_>>(), "Cached titles");
    Some(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[test]
    fn test_parse_key_strips_quotes() {
        let entry = parse_key("v2|\"Example Title\"|2025-11-07").unwrap();
        assert_eq!(entry.title, "Example Title");
        assert_eq!(entry.date, NaiveDate::from_ymd_opt(2025, 11, 7));
    }

    #[test]
    fn test_parse_key_legacy_and_dateless() {
        let legacy = parse_key("Sejm uchwalił budżet|2025-11-17").unwrap();
        assert_eq!(legacy.title, "Sejm uchwalił budżet");
        assert!(legacy.date.is_some());

        let bare = parse_key("„Tytuł w cudzysłowie”").unwrap();
        assert_eq!(bare.title, "Tytuł w cudzysłowie");
        assert_eq!(bare.date, None);

        let with_pipe = parse_key("v2|A | B|2025-01-02").unwrap();
        assert_eq!(with_pipe.title, "A | B");

        let legacy_pipe = parse_key("A|B").unwrap();
        assert_eq!(legacy_pipe.title, "A|B");
        assert_eq!(legacy_pipe.date, None);
    }

    #[test]
    fn test_parse_key_rejects_malformed() {
        assert!(parse_key("v2||2025-11-07").is_none());
        assert!(parse_key("v2|\"  \"|2025-11-07").is_none());
        assert!(parse_key("v2|Title|07.11.2025").is_none());
        assert!(parse_key("Title|07.11.2025").is_none());
        assert!(parse_key("").is_none());
        assert!(parse_key("v2").is_none());
        assert!(parse_key("v2|").is_none());
    }

    #[test]
    fn test_parse_payload_keyed_object() {
        let payload = json!({
            "v2|First|2025-11-07": true,
            "v2||2025-11-07": true,
            "v2|Second|bad-date": true,
            "v2|Third|2025-11-08": {"url": "https://example.com/3"}
        });
        let entries = parse_payload(&payload);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "First");
        assert_eq!(entries[1].title, "Third");
        assert_eq!(entries[1].url.as_deref(), Some("https://example.com/3"));
    }

    #[test]
    fn test_parse_payload_structured() {
        let payload = json!({
            "updated_at": "2025-11-07T10:00:00Z",
            "items": [
                {"title": "Hot one", "url": "https://example.com/hot", "is_hot": true},
                {"title": "", "url": "https://example.com/empty"},
                {"title": "No url"}
            ]
        });
        let entries = parse_payload(&payload);
        assert_eq!(entries.len(), 2);
        assert!(entries[0].hot);
        assert_eq!(entries[0].url.as_deref(), Some("https://example.com/hot"));
        assert_eq!(entries[1].url, None);
    }

    #[test]
    fn test_parse_payload_structured_skips_bad_items() {
        let payload = json!({
            "updated_at": "2025-11-07T10:00:00Z",
            "items": [
                {"title": "Before", "url": "https://example.com/1"},
                {"title": null},
                {"title": "Numeric url", "url": 42},
                {"title": "Odd flag", "is_hot": "yes"},
                "not an object",
                {"title": "After", "is_hot": true}
            ]
        });
        let entries = parse_payload(&payload);
        let titles: Vec<&str> = entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["Before", "After"]);
        assert!(entries[1].hot);
    }

    #[test]
    fn test_parse_payload_legacy_array_and_scalars() {
        let entries = parse_payload(&json!(["One", "  ", 5, "Two"]));
        assert_eq!(entries.len(), 2);
        assert!(parse_payload(&json!("just a string")).is_empty());
        assert!(parse_payload(&json!({})).is_empty());
    }

    #[test]
    fn test_cache_busted_appends_param() {
        let url = Url::parse("https://briefrooms.com/.cache/news_summaries_pl.json?lang=pl").unwrap();
        let busted = cache_busted(url, 1_700_000_000_000);
        assert_eq!(
            busted.as_str(),
            "https://briefrooms.com/.cache/news_summaries_pl.json?lang=pl&_=1700000000000"
        );
    }

    #[tokio::test]
    async fn test_load_remote_with_cache_busting() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/.cache/news_summaries_pl.json")
                    .query_param_exists("_")
                    .header("cache-control", "no-store");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"v2|\"Example Title\"|2025-11-07": true}"#);
            })
            .await;

        let client = Client::new();
        let entries = load(&client, &server.url("/.cache/news_summaries_pl.json"))
            .await
            .unwrap();
        mock.assert_async().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Example Title");
    }

    #[tokio::test]
    async fn test_load_404_is_no_data() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.json");
                then.status(404);
            })
            .await;
        let client = Client::new();
        assert!(load(&client, &server.url("/missing.json")).await.is_none());
    }

    #[tokio::test]
    async fn test_load_invalid_json_and_empty_are_no_data() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/broken.json");
                then.status(200).body(r#"{"v2|Title|2025"#);
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/empty.json");
                then.status(200).body("{}");
            })
            .await;
        let client = Client::new();
        assert!(load(&client, &server.url("/broken.json")).await.is_none());
        assert!(load(&client, &server.url("/empty.json")).await.is_none());
    }

    #[tokio::test]
    async fn test_load_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news_hotbar_en.json");
        std::fs::write(
            &path,
            r#"{"updated_at": "2025-11-07T10:00:00Z", "items": [{"title": "Local file", "url": "https://x.y/z", "is_hot": false}]}"#,
        )
        .unwrap();
        let client = Client::new();
        let entries = load(&client, path.to_str().unwrap()).await.unwrap();
        assert_eq!(entries[0].title, "Local file");

        let missing = dir.path().join("nope.json");
        assert!(load(&client, missing.to_str().unwrap()).await.is_none());
    }
}
