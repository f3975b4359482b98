//! Data models shared across the pipeline.
//!
//! - [`FeedItem`]: one headline parsed from an RSS/Atom entry
//! - [`SectionItems`]: the capped headline list of one digest section
//! - [`SummaryEntry`]: one headline read back from a summary cache
//! - [`Bucket`]: the fixed topic categories used by the ticker

use chrono::{DateTime, NaiveDate, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A headline parsed from a feed entry.
///
/// Both `title` and `link` are non-empty; entries missing either are
/// dropped by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    /// `pubDate` / `published` / `updated`, when the feed provides a parseable one.
    pub published: Option<DateTime<Utc>>,
}

impl FeedItem {
    /// Build an item, returning `None` when the title or link is blank.
    ///
    /// Runs of whitespace in the title are collapsed to a single space.
    pub fn new(title: &str, link: &str, published: Option<DateTime<Utc>>) -> Option<Self> {
        let title = collapse_whitespace(title);
        let link = link.trim();
        if title.is_empty() || link.is_empty() {
            return None;
        }
        Some(Self {
            title,
            link: link.to_string(),
            published,
        })
    }
}

/// The collected headlines of one digest section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionItems {
    pub label: String,
    pub items: Vec<FeedItem>,
}

/// A headline read from a summary cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    pub title: String,
    pub date: Option<NaiveDate>,
    pub url: Option<String>,
    pub hot: bool,
}

/// Topic bucket for the ticker. Declaration order is the display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Local,
    World,
    Sports,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Local, Bucket::World, Bucket::Sports];

    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Local => "local",
            Bucket::World => "world",
            Bucket::Sports => "sports",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collapse internal whitespace runs and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().join(" ")
}
