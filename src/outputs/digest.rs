//! Static digest page.
//!
//! One HTML document per site language with a fixed structure: head,
//! header with the horizon line, one card per section and a footer with
//! the generation date (UTC). Every piece of feed text is escaped.
//!
//! # Output
//!
//! ```text
//! out_dir/
//! ├── pl/aktualnosci.html
//! └── en/news.html
//! ```

use crate::config::SiteConfig;
use crate::error::Result;
use crate::models::SectionItems;
use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

const PAGE_STYLE: &str = r#"  <style>
    header{ text-align:center; padding:24px 12px 6px }
    .sub{ color:#b9c5d8 }
    main{ max-width:980px; margin:0 auto; padding:0 16px 48px }
    .card{ background:linear-gradient(180deg,rgba(255,255,255,.06),rgba(255,255,255,.02));
           border:1px solid rgba(255,255,255,.08); border-radius:16px; padding:18px 20px; margin:14px 0;
           box-shadow:inset 0 1px 0 rgba(255,255,255,.04), 0 10px 30px rgba(0,0,0,.25) }
    h2{ margin:8px 0 6px; color:#d7e6ff }
    ul.news{ margin:6px 0 0 18px }
    .empty{ color:#9fb3c8; font-style:italic }
    .note{ color:#9fb3c8; font-size:.92rem }
  </style>
"#;

/// Render the digest document for `site`.
pub fn render(site: &SiteConfig, sections: &[SectionItems], generated_at: DateTime<Utc>) -> String {
    let texts = &site.digest.texts;
    let date = generated_at.format("%Y-%m-%d").to_string();
    let mut buf = String::new();

    buf.push_str("<!doctype html>\n");
    buf.push_str(&format!(
        "<html lang=\"{}\">\n<head>\n",
        encode_double_quoted_attribute(&site.lang)
    ));
    buf.push_str("  <meta charset=\"utf-8\" />\n");
    buf.push_str("  <meta name=\"viewport\" content=\"width=device-width,initial-scale=1\" />\n");
    buf.push_str(&format!("  <title>{}</title>\n", encode_text(&texts.title)));
    buf.push_str(&format!(
        "  <meta name=\"description\" content=\"{}\" />\n",
        encode_double_quoted_attribute(&texts.description)
    ));
    buf.push_str("  <link rel=\"icon\" href=\"/assets/favicon.svg\" />\n");
    buf.push_str("  <link rel=\"stylesheet\" href=\"/assets/site.css\" />\n");
    buf.push_str(PAGE_STYLE);
    buf.push_str("</head>\n<body>\n<header>\n");
    buf.push_str(&format!("  <h1>{}</h1>\n", encode_text(&texts.heading)));
    buf.push_str(&format!(
        "  <p class=\"sub\">{} • {}</p>\n",
        encode_text(&texts.horizon_label),
        date
    ));
    buf.push_str("</header>\n<main>\n");

    for section in sections {
        buf.push_str(&format!(
            "<section class=\"card\"><h2>{}</h2>",
            encode_text(&section.label)
        ));
        if section.items.is_empty() {
            buf.push_str(&format!(
                "<p class=\"empty\">{}</p>",
                encode_text(&texts.empty_section)
            ));
        } else {
            buf.push_str("<ul class=\"news\">");
            for item in &section.items {
                buf.push_str(&format!(
                    "<li><a href=\"{}\" target=\"_blank\" rel=\"noopener\">{}</a></li>",
                    encode_double_quoted_attribute(&item.link),
                    encode_text(&item.title)
                ));
            }
            buf.push_str("</ul>");
        }
        buf.push_str("</section>\n");
    }

    buf.push_str(&format!("<p class=\"note\">{}</p>\n", encode_text(&texts.note)));
    buf.push_str("</main>\n");
    buf.push_str(&format!(
        "<footer style=\"text-align:center; opacity:.55; padding:18px\">© BriefRooms • {} {} UTC</footer>\n",
        encode_text(&texts.generated_label),
        date
    ));
    buf.push_str("</body></html>\n");
    buf
}

/// Write the rendered page to `out_dir/<site.digest.path>`, replacing any previous run.
#[instrument(level = "info", skip_all, fields(lang = %site.lang, out_dir = %out_dir.display()))]
pub async fn write_digest(out_dir: &Path, site: &SiteConfig, html: &str) -> Result<PathBuf> {
    let path = out_dir.join(&site.digest.path);
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent).await {
            error!(dir = %parent.display(), error = %e, "Failed to create digest dir");
            return Err(e.into());
        }
    }
    fs::write(&path, html).await?;
    info!(path = %path.display(), bytes = html.len(), "Wrote digest page");
    Ok(path)
}
