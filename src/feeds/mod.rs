//! RSS/Atom ingestion.
//!
//! - [`parser`]: turns a feed body into [`crate::models::FeedItem`]s
//! - [`fetcher`]: downloads feeds in priority order and applies caps
//!
//! Each feed is read once per run. Failures are logged and the feed simply
//! contributes no items; nothing here retries.

pub mod fetcher;
pub mod parser;

pub use fetcher::{collect_sections, fetch_entries};
