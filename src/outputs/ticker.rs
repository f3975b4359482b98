//! Ticker strip HTML fragment.
//!
//! The item list is emitted twice inside one track; the stylesheet moves the
//! track left by half its width and loops, so the seam is never visible.
//! The loop duration is the width of one copy divided by the scroll speed,
//! which keeps the speed constant no matter how many headlines there are.
//!
//! An empty selection renders a hidden container and nothing else.

use crate::config::SiteConfig;
use crate::ticker::TickerItem;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::time::Duration;

const HIDDEN_STRIP: &str = r#"<div class="hotbar" hidden style="display:none" aria-hidden="true"></div>"#;

const STRIP_STYLE: &str = "<style>\
@keyframes hotbar-scroll{from{transform:translateX(0)}to{transform:translateX(-50%)}}\
.hotbar{display:flex;align-items:center;gap:12px;overflow:hidden;white-space:nowrap}\
.hotbar-viewport{overflow:hidden;flex:1}\
.hotbar-track{display:flex;width:max-content;animation-name:hotbar-scroll;animation-timing-function:linear;animation-iteration-count:infinite}\
.hotbar-track:hover{animation-play-state:paused}\
.hotbar-items{display:flex;gap:48px;margin:0;padding:0 24px;list-style:none}\
.hotbar-items .hot a{font-weight:700}\
</style>";

#[derive(Debug, Clone)]
pub struct TickerOptions {
    pub label: String,
    pub speed_px_per_sec: f64,
    /// Average rendered width of one character, used to estimate strip width.
    pub char_width_px: f64,
    /// Gap between two headlines.
    pub gap_px: f64,
    /// Narrower strips are treated as this wide so short lists do not race by.
    pub min_width_px: f64,
}

impl Default for TickerOptions {
    fn default() -> Self {
        Self {
            label: "Live".to_string(),
            speed_px_per_sec: 60.0,
            char_width_px: 7.5,
            gap_px: 48.0,
            min_width_px: 600.0,
        }
    }
}

impl TickerOptions {
    pub fn for_site(site: &SiteConfig) -> Self {
        Self {
            label: site.ticker.label.clone(),
            speed_px_per_sec: site.ticker.speed_px_per_sec,
            ..Self::default()
        }
    }
}

/// Seconds needed to scroll `width_px` at `speed_px_per_sec`.
///
/// Non-positive or non-finite speeds fall back to 60 px/s. A speed so small
/// that the result overflows yields [`Duration::MAX`].
pub fn animation_duration(width_px: f64, speed_px_per_sec: f64) -> Duration {
    let speed = if speed_px_per_sec.is_finite() && speed_px_per_sec > 0.0 {
        speed_px_per_sec
    } else {
        60.0
    };
    let width = if width_px.is_finite() { width_px.max(0.0) } else { 0.0 };
    Duration::try_from_secs_f64(width / speed).unwrap_or(Duration::MAX)
}

/// Estimated pixel width of one copy of the item list.
pub fn estimate_width(items: &[TickerItem], options: &TickerOptions) -> f64 {
    let chars: usize = items.iter().map(|i| i.title.chars().count()).sum();
    let width = chars as f64 * options.char_width_px + items.len() as f64 * options.gap_px;
    width.max(options.min_width_px)
}

fn render_items(items: &[TickerItem], hidden_copy: bool) -> String {
    let mut buf = String::new();
    if hidden_copy {
        buf.push_str(r#"<ul class="hotbar-items" aria-hidden="true">"#);
    } else {
        buf.push_str(r#"<ul class="hotbar-items">"#);
    }
    for item in items {
        let open = if item.hot { r#"<li class="hot">"# } else { "<li>" };
        buf.push_str(&format!(
            r#"{open}<a href="{}" target="_blank" rel="noopener">{}</a></li>"#,
            encode_double_quoted_attribute(&item.url),
            encode_text(&item.title)
        ));
    }
    buf.push_str("</ul>");
    buf
}

/// Render the ticker fragment for `items`.
pub fn render(items: &[TickerItem], options: &TickerOptions) -> String {
    if items.is_empty() {
        return HIDDEN_STRIP.to_string();
    }

    let duration = animation_duration(estimate_width(items, options), options.speed_px_per_sec);
    let label = encode_text(&options.label);

    let mut buf = String::new();
    buf.push_str(STRIP_STYLE);
    buf.push('\n');
    buf.push_str(&format!(
        r#"<div class="hotbar" role="region" aria-label="{}">"#,
        encode_double_quoted_attribute(&options.label)
    ));
    buf.push_str(&format!(r#"<span class="hotbar-label">{label}</span>"#));
    buf.push_str(r#"<div class="hotbar-viewport">"#);
    buf.push_str(&format!(
        r#"<div class="hotbar-track" style="animation-duration:{:.2}s">"#,
        duration.as_secs_f64()
    ));
    buf.push_str(&render_items(items, false));
    buf.push_str(&render_items(items, true));
    buf.push_str("</div></div></div>\n");
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    fn item(title: &str, url: &str) -> TickerItem {
        TickerItem {
            title: title.to_string(),
            url: url.to_string(),
            hot: false,
        }
    }

    #[test]
    fn test_render_marks_hot_items() {
        let mut hot = item("Pilne: burza nad Gdańskiem", "https://e.example/hot");
        hot.hot = true;
        let html = render(&[hot, item("Zwykły news", "https://e.example/1")], &TickerOptions::default());
        let doc = Html::parse_fragment(&html);
        let selector = Selector::parse(".hotbar-items:not([aria-hidden]) li.hot a").unwrap();
        let hot_links: Vec<_> = doc.select(&selector).collect();
        assert_eq!(hot_links.len(), 1);
        assert_eq!(hot_links[0].value().attr("href"), Some("https://e.example/hot"));
    }

    #[test]
    fn test_animation_duration() {
        assert_eq!(animation_duration(600.0, 60.0), Duration::from_secs(10));
        assert_eq!(animation_duration(1200.0, 120.0), Duration::from_secs(10));
        assert_eq!(animation_duration(120.0, 0.0), Duration::from_secs(2));
        assert_eq!(animation_duration(-5.0, 60.0), Duration::ZERO);
        assert_eq!(animation_duration(600.0, 1e-300), Duration::MAX);
    }

    #[test]
    fn test_empty_selection_is_hidden() {
        let html = render(&[], &TickerOptions::default());
        assert!(html.contains("display:none"));
        assert!(html.contains("hidden"));
        assert!(!html.contains("<a "));
    }

    #[test]
    fn test_content_is_duplicated() {
        let items = vec![item("One", "https://a.example/1"), item("Two", "https://a.example/2")];
        let html = render(&items, &TickerOptions::default());
        let doc = Html::parse_fragment(&html);
        let lists = Selector::parse(".hotbar-track > ul").unwrap();
        let links = Selector::parse(".hotbar-track a").unwrap();
        assert_eq!(doc.select(&lists).count(), 2);
        let texts: Vec<String> = doc.select(&links).map(|a| a.text().collect()).collect();
        assert_eq!(texts, vec!["One", "Two", "One", "Two"]);
    }

    #[test]
    fn test_duration_scales_with_width() {
        let options = TickerOptions {
            min_width_px: 0.0,
            ..TickerOptions::default()
        };
        let short = vec![item(&"a".repeat(40), "/")];
        let long = vec![item(&"a".repeat(400), "/")];
        let short_secs = animation_duration(estimate_width(&short, &options), options.speed_px_per_sec);
        let long_secs = animation_duration(estimate_width(&long, &options), options.speed_px_per_sec);
        assert!(long_secs > short_secs);
        assert_eq!(estimate_width(&short, &options), 40.0 * 7.5 + 48.0);
    }

    #[test]
    fn test_output_is_escaped() {
        let items = vec![item("<script>alert(1)</script> & co", "https://x.example/?a=1&b=\"2\"")];
        let html = render(&items, &TickerOptions::default());
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("&amp;b=&quot;2&quot;"));
    }
}
