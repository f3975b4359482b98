//! RSS 2.0, RSS 1.0 (RDF) and Atom parsing.
//!
//! Only what the pipeline needs is read from each entry: title, link and
//! the publication time. Entries without a title or a link are dropped.
//!
//! Elements are matched on their qualified name, so namespaced extensions
//! such as `<atom:link>` or `<media:title>` never shadow the plain ones.
//! When an element repeats inside an entry the first non-blank value wins.

use crate::error::{NewsError, Result};
use crate::models::FeedItem;
use chrono::{DateTime, NaiveDate, Utc};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Guid,
    PubDate,
    Published,
    Updated,
    DcDate,
}

impl Field {
    fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Field::Title),
            b"link" => Some(Field::Link),
            b"guid" => Some(Field::Guid),
            b"pubDate" => Some(Field::PubDate),
            b"published" => Some(Field::Published),
            b"updated" => Some(Field::Updated),
            b"dc:date" => Some(Field::DcDate),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct AtomLink {
    rel: Option<String>,
    href: String,
}

/// The raw values of one `<item>` or `<entry>`.
#[derive(Debug, Default)]
struct RawEntry {
    title: Option<String>,
    link: Option<String>,
    guid: Option<String>,
    pub_date: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    dc_date: Option<String>,
    links: Vec<AtomLink>,
}

impl RawEntry {
    fn set_first(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Guid => &mut self.guid,
            Field::PubDate => &mut self.pub_date,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
            Field::DcDate => &mut self.dc_date,
        };
        if slot.is_none() && !value.trim().is_empty() {
            *slot = Some(value);
        }
    }

    fn into_feed_item(self) -> Option<FeedItem> {
        let permalink = self
            .guid
            .as_deref()
            .map(str::trim)
            .filter(|g| g.starts_with("http://") || g.starts_with("https://"));
        let link = self
            .links
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.links.first())
            .map(|l| l.href.as_str())
            .or(self.link.as_deref())
            // Some feeds only carry a permalink guid.
            .or(permalink)
            .unwrap_or("");

        let published = [&self.pub_date, &self.published, &self.dc_date, &self.updated]
            .into_iter()
            .flatten()
            .find_map(|raw| parse_published(raw));

        FeedItem::new(self.title.as_deref().unwrap_or(""), link, published)
    }
}

fn is_entry(name: &[u8]) -> bool {
    matches!(name, b"item" | b"entry")
}

/// `<link href=".." rel="..">`, the Atom form. RSS links carry no `href`.
fn atom_link(e: &BytesStart) -> Option<AtomLink> {
    let mut href = None;
    let mut rel = None;
    for attr in e.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).trim().to_string();
        match attr.key.as_ref() {
            b"href" => href = Some(value),
            b"rel" => rel = Some(value),
            _ => {}
        }
    }
    href.filter(|h| !h.is_empty()).map(|href| AtomLink { rel, href })
}

/// Resolve `&amp;`, `&#38;` and friends; anything unknown is kept verbatim.
fn resolve_reference(name: &[u8]) -> String {
    let name = String::from_utf8_lossy(name);
    let resolved = match name.strip_prefix('#') {
        Some(num) => {
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => num.parse().ok(),
            };
            code.and_then(char::from_u32).map(String::from)
        }
        None => match name.as_ref() {
            "amp" => Some("&".to_string()),
            "lt" => Some("<".to_string()),
            "gt" => Some(">".to_string()),
            "quot" => Some("\"".to_string()),
            "apos" => Some("'".to_string()),
            _ => None,
        },
    };
    resolved.unwrap_or_else(|| format!("&{name};"))
}

/// Parse an RFC 2822 (RSS) or RFC 3339 (Atom) timestamp, falling back to a
/// leading `YYYY-MM-DD`.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d")
                .ok()?
                .and_hms_opt(0, 0, 0)
                .map(|n| n.and_utc())
        })
}


/// Parse a feed body into items, in document order.
///
/// # Errors
///
/// Returns [`NewsError::Xml`] when the body is not well-formed XML and
/// [`NewsError::NotAFeed`] when it has no root element or ends early.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedItem>> {
    let mut reader = Reader::from_str(xml);

    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    // Depth of the open <item>/<entry> and what it has collected so far.
    let mut entry: Option<(usize, RawEntry)> = None;
    // Direct child of the entry whose text is being read.
    let mut capture: Option<(Field, String)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                seen_root = true;
                let entry_depth = entry.as_ref().map(|(d, _)| *d);
                match entry_depth {
                    None if is_entry(e.name().as_ref()) => entry = Some((depth, RawEntry::default())),
                    Some(d) if depth == d + 1 => {
                        if let Some((_, raw)) = entry.as_mut()
                            && e.name().as_ref() == b"link"
                            && let Some(link) = atom_link(&e)
                        {
                            raw.links.push(link);
                        }
                        capture = Field::from_tag(e.name().as_ref()).map(|f| (f, String::new()));
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                seen_root = true;
                if let Some((d, raw)) = entry.as_mut()
                    && depth == *d
                    && e.name().as_ref() == b"link"
                    && let Some(link) = atom_link(&e)
                {
                    raw.links.push(link);
                }
            }
            Event::Text(t) => {
                if let Some((_, buf)) = capture.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::CData(t) => {
                if let Some((_, buf)) = capture.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::GeneralRef(r) => {
                if let Some((_, buf)) = capture.as_mut() {
                    buf.push_str(&resolve_reference(&r));
                }
            }
            Event::End(_) => {
                let entry_depth = entry.as_ref().map(|(d, _)| *d);
                match entry_depth {
                    Some(d) if depth == d + 1 => {
                        if let (Some((_, raw)), Some((field, value))) = (entry.as_mut(), capture.take()) {
                            raw.set_first(field, value);
                        }
                    }
                    Some(d) if depth == d => {
                        if let Some((_, raw)) = entry.take() {
                            items.extend(raw.into_feed_item());
                        }
                    }
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(NewsError::NotAFeed("no root element"));
    }
    if depth != 0 {
        return Err(NewsError::NotAFeed("document ends inside an element"));
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>TVN24</title>
    <link>https://tvn24.pl</link>
    <description>Najnowsze</description>
    <item>
      <title><![CDATA[Sejm uchwalił   budżet]]></title>
      <link>https://tvn24.pl/polska/1</link>
      <pubDate>Fri, 07 Nov 2025 10:15:00 +0100</pubDate>
    </item>
    <item>
      <title>Tom &amp; Jerry</title>
      <guid isPermaLink="true">https://tvn24.pl/polska/2</guid>
    </item>
    <item>
      <title>No link at all</title>
    </item>
    <item>
      <title></title>
      <link>https://tvn24.pl/polska/4</link>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Example</title>
  <entry>
    <title type="html">Ceasefire talks resume</title>
    <link rel="self" href="https://example.com/self/1"/>
    <link rel="alternate" href="https://example.com/world/1"/>
    <updated>2025-11-07T08:00:00Z</updated>
  </entry>
  <entry>
    <title>Second entry</title>
    <link href="https://example.com/world/2"/>
    <published>2025-11-06T22:00:00+01:00</published>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_rss() {
        let items = parse_feed(RSS).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Sejm uchwalił budżet");
        assert_eq!(items[0].link, "https://tvn24.pl/polska/1");
        assert_eq!(
            items[0].published,
            Some(Utc.with_ymd_and_hms(2025, 11, 7, 9, 15, 0).unwrap())
        );
        assert_eq!(items[1].title, "Tom & Jerry");
        assert_eq!(items[1].link, "https://tvn24.pl/polska/2");
        assert_eq!(items[1].published, None);
    }

    #[test]
    fn test_parse_atom() {
        let items = parse_feed(ATOM).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].link, "https://example.com/world/1");
        assert_eq!(
            items[0].published,
            Some(Utc.with_ymd_and_hms(2025, 11, 7, 8, 0, 0).unwrap())
        );
        assert_eq!(items[1].link, "https://example.com/world/2");
        assert_eq!(
            items[1].published,
            Some(Utc.with_ymd_and_hms(2025, 11, 6, 21, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_empty_channel() {
        let xml = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>x</title></channel></rss>"#;
        assert!(parse_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_garbage_is_error() {
        assert!(parse_feed("<rss><channel><item></channel></rss>").is_err());
    }

    #[test]
    fn test_parse_rss_with_namespaced_extensions() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Wiadomości</title>
    <atom:link href="https://example.pl/rss" rel="self" type="application/rss+xml"/>
    <item>
      <title>Rząd przyjął projekt</title>
      <media:title>Zdjęcie z posiedzenia</media:title>
      <atom:link href="https://example.pl/amp/1" rel="amphtml"/>
      <link>https://example.pl/kraj/1</link>
      <guid isPermaLink="false">abc-1</guid>
      <guid>abc-1-duplicate</guid>
      <pubDate>Fri, 07 Nov 2025 10:15:00 +0100</pubDate>
    </item>
    <item>
      <title>Drugi tekst</title>
      <link>https://example.pl/kraj/2</link>
    </item>
  </channel>
</rss>"#;
        let items = parse_feed(xml).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Rząd przyjął projekt");
        assert_eq!(items[0].link, "https://example.pl/kraj/1");
        assert!(items[0].published.is_some());
        assert_eq!(items[1].link, "https://example.pl/kraj/2");
    }

    #[test]
    fn test_parse_repeated_elements_keep_first() {
        let xml = r#"<rss version="2.0"><channel>
  <item>
    <title>First title</title>
    <title>Second title</title>
    <guid>https://example.com/a</guid>
    <guid>https://example.com/b</guid>
  </item>
</channel></rss>"#;
        let items = parse_feed(xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "First title");
        assert_eq!(items[0].link, "https://example.com/a");
    }

    #[test]
    fn test_parse_rdf_items_next_to_channel() {
        let xml = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://purl.org/rss/1.0/" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel rdf:about="https://example.org/"><title>RDF</title><link>https://example.org/</link></channel>
  <item rdf:about="https://example.org/1">
    <title>Markets &#38; rates</title>
    <link>https://example.org/1</link>
    <dc:date>2025-11-07T06:30:00Z</dc:date>
  </item>
</rdf:RDF>"#;
        let items = parse_feed(xml).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Markets & rates");
        assert_eq!(
            items[0].published,
            Some(Utc.with_ymd_and_hms(2025, 11, 7, 6, 30, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_non_feed_bodies_are_errors() {
        assert!(parse_feed("Service Unavailable").is_err());
        assert!(parse_feed("<rss><channel><item><title>Cut off").is_err());
    }

    #[test]
    fn test_parse_published_formats() {
        assert!(parse_published("Mon, 17 Nov 2025 08:00:00 GMT").is_some());
        assert!(parse_published("2025-11-17T08:00:00+00:00").is_some());
        assert_eq!(
            parse_published("2025-11-17 08:00"),
            Some(Utc.with_ymd_and_hms(2025, 11, 17, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_published("yesterday"), None);
        assert_eq!(parse_published(""), None);
    }
}
