//! Comment widget: client for the spreadsheet-backed comment log, a
//! persisted device identity and the HTML form/list.
//!
//! The service is the only source of truth. Nothing is cached locally
//! except the [`CommentIdentity`] file.

use crate::error::{NewsError, Result};
use html_escape::{encode_double_quoted_attribute, encode_text};
use rand::Rng;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// A plain-text content type keeps the POST a "simple" request, so browsers
/// send it without a CORS pre-flight. The service expects the same here.
const SUBMIT_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentRecord {
    pub timestamp: String,
    pub page: String,
    pub nick: String,
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
struct RowsResponse {
    #[serde(default)]
    rows: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct Ack {
    #[serde(default)]
    ok: bool,
}

fn cell(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Turn `[[timestamp, page, nick, text], ...]` into records, in service
/// order. Rows that are not arrays, have fewer than four cells or carry
/// non-scalar cells are dropped.
pub fn parse_rows(rows: &[Value]) -> Vec<CommentRecord> {
    rows.iter()
        .filter_map(|row| {
            let cells = row.as_array()?;
            if cells.len() < 4 {
                return None;
            }
            Some(CommentRecord {
                timestamp: cell(&cells[0])?,
                page: cell(&cells[1])?,
                nick: cell(&cells[2])?,
                text: cell(&cells[3])?,
            })
        })
        .collect()
}

/// Trim and cap comment text to `max_chars` characters.
///
/// # Errors
///
/// [`NewsError::InvalidComment`] when nothing is left after trimming.
pub fn prepare_text(text: &str, max_chars: usize) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(NewsError::InvalidComment("comment text is empty".to_string()));
    }
    Ok(trimmed.chars().take(max_chars).collect())
}

/// Client for the comment endpoint.
#[derive(Debug, Clone)]
pub struct CommentClient {
    client: Client,
    endpoint: Url,
    max_text_chars: usize,
}

impl CommentClient {
    pub fn new(client: Client, endpoint: &str, max_text_chars: usize) -> Result<Self> {
        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
            max_text_chars,
        })
    }

    /// Comments for `page`, in the order the service returns them.
    #[instrument(level = "info", skip(self))]
    pub async fn list(&self, page: &str) -> Result<Vec<CommentRecord>> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("page", page);

        let resp = self.client.get(url.clone()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NewsError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body: RowsResponse = serde_json::from_str(&resp.text().await?)?;
        let records = parse_rows(&body.rows);
        if records.len() != body.rows.len() {
            debug!(dropped = body.rows.len() - records.len(), "Dropped malformed comment rows");
        }
        info!(count = records.len(), "Loaded comments");
        Ok(records)
    }

    /// Append one comment. Succeeds only when the service answers `{"ok": true}`.
    #[instrument(level = "info", skip(self, text, uid), fields(chars = text.chars().count()))]
    pub async fn submit(&self, page: &str, nick: &str, text: &str, uid: &str) -> Result<()> {
        let text = prepare_text(text, self.max_text_chars)?;
        let body = json!({
            "contents": {
                "page": page,
                "nick": nick.trim(),
                "text": text,
                "uid": uid,
            }
        });

        let resp = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, SUBMIT_CONTENT_TYPE)
            .body(body.to_string())
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NewsError::Status {
                status: status.as_u16(),
                url: self.endpoint.to_string(),
            });
        }

        let ack: Ack = serde_json::from_str(&resp.text().await?).unwrap_or_default();
        if !ack.ok {
            warn!("Comment service did not acknowledge the submission");
            return Err(NewsError::Rejected);
        }
        info!("Comment submitted");
        Ok(())
    }
}

/// Device-scoped identity: a random uid plus the last nick used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentIdentity {
    pub uid: String,
    #[serde(default)]
    pub nick: String,
    #[serde(skip)]
    path: PathBuf,
}

fn random_uid() -> String {
    let mut rng = rand::rng();
    (0..16).fold(String::with_capacity(32), |mut out, _| {
        let _ = write!(out, "{:02x}", rng.random::<u8>());
        out
    })
}

impl CommentIdentity {
    /// Load the identity stored at `path`, or create and persist a new one.
    /// An unreadable file is replaced.
    #[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn load_or_create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        match fs::read_to_string(&path).await {
            Ok(raw) => match serde_json::from_str::<CommentIdentity>(&raw) {
                Ok(mut identity) if !identity.uid.is_empty() => {
                    identity.path = path;
                    return Ok(identity);
                }
                Ok(_) => warn!("Stored identity has no uid; creating a new one"),
                Err(e) => warn!(error = %e, "Stored identity is unreadable; creating a new one"),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let identity = Self {
            uid: random_uid(),
            nick: String::new(),
            path,
        };
        identity.save().await?;
        info!("Created new comment identity");
        Ok(identity)
    }

    /// Remember `nick` for the next run. Blank nicks are ignored.
    pub async fn remember_nick(&mut self, nick: &str) -> Result<()> {
        let nick = nick.trim();
        if nick.is_empty() || nick == self.nick {
            return Ok(());
        }
        self.nick = nick.to_string();
        self.save().await
    }

    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(self)?).await?;
        Ok(())
    }
}

struct WidgetTexts {
    heading: &'static str,
    nick: &'static str,
    text: &'static str,
    submit: &'static str,
    empty: &'static str,
}

fn widget_texts(lang: &str) -> WidgetTexts {
    if lang.eq_ignore_ascii_case("pl") {
        WidgetTexts {
            heading: "Komentarze",
            nick: "Podpis",
            text: "Twój komentarz",
            submit: "Wyślij",
            empty: "Brak komentarzy.",
        }
    } else {
        WidgetTexts {
            heading: "Comments",
            nick: "Name",
            text: "Your comment",
            submit: "Send",
            empty: "No comments yet.",
        }
    }
}

/// Render the comment form and list for `page`.
///
/// `error` is shown inline above the form.
pub fn render_widget(
    lang: &str,
    page: &str,
    records: &[CommentRecord],
    nick: &str,
    max_text_chars: usize,
    error: Option<&str>,
) -> String {
    let t = widget_texts(lang);
    let mut html = String::new();

    let _ = writeln!(html, r#"<section class="comments" data-page="{}">"#, encode_double_quoted_attribute(page));
    let _ = writeln!(html, "  <h2>{}</h2>", t.heading);
    if let Some(message) = error {
        let _ = writeln!(html, r#"  <div class="comments-error" role="alert">{}</div>"#, encode_text(message));
    }
    let _ = writeln!(html, r#"  <form class="comments-form" method="post">"#);
    let _ = writeln!(html, r#"    <input type="hidden" name="page" value="{}">"#, encode_double_quoted_attribute(page));
    let _ = writeln!(
        html,
        r#"    <label>{} <input type="text" name="nick" value="{}"></label>"#,
        t.nick,
        encode_double_quoted_attribute(nick)
    );
    let _ = writeln!(
        html,
        r#"    <label>{} <textarea name="text" maxlength="{max_text_chars}" required></textarea></label>"#,
        t.text
    );
    let _ = writeln!(html, r#"    <button type="submit">{}</button>"#, t.submit);
    let _ = writeln!(html, "  </form>");

    if records.is_empty() {
        let _ = writeln!(html, r#"  <p class="comments-empty">{}</p>"#, t.empty);
    } else {
        let _ = writeln!(html, r#"  <ul class="comments-list">"#);
        for record in records {
            let _ = writeln!(
                html,
                r#"    <li><span class="nick">{}</span> <time>{}</time><p>{}</p></li>"#,
                encode_text(&record.nick),
                encode_text(&record.timestamp),
                encode_text(&record.text)
            );
        }
        let _ = writeln!(html, "  </ul>");
    }
    html.push_str("</section>\n");
    html
}
