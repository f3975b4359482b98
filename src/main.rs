//! # BriefRooms News
//!
//! The news pipeline behind the BriefRooms site: static digest pages built
//! from RSS feeds, the summary caches that feed the headline ticker, the
//! ticker strip itself and a small comment widget.
//!
//! ## Usage
//!
//! ```sh
//! briefrooms_news digest --out-dir ./site
//! briefrooms_news hotbar
//! briefrooms_news ticker --out-dir ./site --watch 300
//! briefrooms_news comments list --page /pl/aktualnosci.html
//! briefrooms_news feeds -n 10 https://tvn24.pl/najnowsze.xml
//! ```
//!
//! ## Architecture
//!
//! 1. **Digest**: fetch section feeds in priority order, render one HTML page per site
//! 2. **Hotbar**: fetch hotbar feeds, write the keyed and structured summary caches
//! 3. **Ticker**: read a summary cache, bucket headlines, select and render the strip
//! 4. **Comments**: list or post comments against the external comment service
//!
//! Failures of a single feed or cache degrade to "no items"; only output
//! directory problems and comment submissions surface as errors.

use chrono::{Local, Utc};
use clap::Parser;
use reqwest::Client;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cache;
mod categorize;
mod cli;
mod comments;
mod config;
mod error;
mod feeds;
mod models;
mod outputs;
mod ticker;
mod utils;

use cli::{Cli, Command, CommentsAction, TickerArgs};
use comments::{CommentClient, CommentIdentity, render_widget};
use config::{Config, SiteConfig};
use outputs::{digest, hotbar};
use ticker::{TickerRefresher, refresh_once};
use utils::{ensure_writable_dir, http_client};

const DEFAULT_NICK: &str = "anon";

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("briefrooms_news starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.lang, "Parsed CLI arguments");

    let config = Config::load(args.config.as_deref())?;
    let sites = config.selected_sites(args.lang.as_deref());
    if sites.is_empty() {
        error!(lang = ?args.lang, "No configured site matches");
        return Err(format!("unknown site language: {}", args.lang.unwrap_or_default()).into());
    }

    let client = http_client()?;

    match args.command {
        Command::Digest { ref out_dir } => run_digest(&client, &sites, Path::new(out_dir)).await?,
        Command::Hotbar { ref cache_dir } => {
            let cache_dir = cache_dir.as_deref().unwrap_or(&config.cache_dir);
            run_hotbar(&client, &sites, Path::new(cache_dir)).await?
        }
        Command::Ticker(ref ticker_args) => run_ticker(&client, &config, &sites, ticker_args).await?,
        Command::Feeds { limit, ref urls } => {
            for item in feeds::fetch_entries(&client, urls, limit).await {
                let published = item.published.map(|p| p.to_rfc3339()).unwrap_or_default();
                println!("{published}\t{}\t{}", item.title, item.link);
            }
        }
        Command::Comments {
            ref endpoint,
            ref action,
        } => {
            let lang = sites[0].lang.as_str();
            run_comments(client, &config, lang, endpoint.as_deref(), action).await?
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

async fn run_digest(client: &Client, sites: &[&SiteConfig], out_dir: &Path) -> Result<(), Box<dyn Error>> {
    // Early check: a page that cannot be written makes the whole run pointless
    if let Err(e) = ensure_writable_dir(out_dir).await {
        error!(
            path = %out_dir.display(),
            error = %e,
            "Digest output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    for site in sites {
        let now = Utc::now();
        let sections = feeds::collect_sections(client, site, now).await;
        let total: usize = sections.iter().map(|s| s.items.len()).sum();
        info!(lang = %site.lang, sections = sections.len(), items = total, "Collected digest");

        let html = digest::render(site, &sections, now);
        if let Err(e) = digest::write_digest(out_dir, site, &html).await {
            error!(lang = %site.lang, error = %e, "Failed to write digest");
        }
    }
    Ok(())
}

async fn run_hotbar(client: &Client, sites: &[&SiteConfig], cache_dir: &Path) -> Result<(), Box<dyn Error>> {
    if let Err(e) = ensure_writable_dir(cache_dir).await {
        error!(path = %cache_dir.display(), error = %e, "Cache directory is not writable");
        return Err(e.into());
    }

    for site in sites {
        let entries = hotbar::collect_hotbar(client, site, &Local, Local::now().date_naive()).await;
        if entries.is_empty() {
            warn!(lang = %site.lang, "No hotbar headlines collected; caches will be empty");
        }
        if let Err(e) = hotbar::write_hotbar(cache_dir, site, &entries, Utc::now()).await {
            error!(lang = %site.lang, error = %e, "Failed to write hotbar caches");
        }
    }
    Ok(())
}

fn ticker_source(args: &TickerArgs, config: &Config, site: &SiteConfig) -> String {
    match &args.source {
        Some(source) => source.replace("{lang}", &site.lang),
        None => site.summaries_cache_path(&config.cache_dir),
    }
}

fn ticker_path(out_dir: &str, site: &SiteConfig) -> PathBuf {
    Path::new(out_dir).join(&site.lang).join("ticker.html")
}

async fn run_ticker(
    client: &Client,
    config: &Config,
    sites: &[&SiteConfig],
    args: &TickerArgs,
) -> Result<(), Box<dyn Error>> {
    let Some(secs) = args.watch else {
        for site in sites {
            let source = ticker_source(args, config, site);
            refresh_once(client, site, &source, &ticker_path(&args.out_dir, site)).await?;
        }
        return Ok(());
    };

    let every = Duration::from_secs(secs.max(1));
    let mut refreshers: Vec<TickerRefresher> = sites
        .iter()
        .map(|site| {
            TickerRefresher::start(
                client.clone(),
                (*site).clone(),
                ticker_source(args, config, site),
                ticker_path(&args.out_dir, site),
                every,
            )
        })
        .collect();

    info!(sites = refreshers.len(), secs, "Watching; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    for refresher in &mut refreshers {
        if !refresher.is_running() {
            warn!("Ticker refresher had already exited");
        }
        refresher.stop();
    }
    Ok(())
}

async fn run_comments(
    client: Client,
    config: &Config,
    lang: &str,
    endpoint: Option<&str>,
    action: &CommentsAction,
) -> Result<(), Box<dyn Error>> {
    let Some(endpoint) = endpoint.or(config.comments.endpoint.as_deref()) else {
        error!("No comment endpoint configured");
        return Err("no comment endpoint configured (use --endpoint or COMMENTS_ENDPOINT)".into());
    };
    let max_chars = config.comments.max_text_chars;
    let comments = CommentClient::new(client, endpoint, max_chars)?;
    let mut identity = CommentIdentity::load_or_create(&config.comments.state_file).await?;

    match action {
        CommentsAction::List { page, html } => {
            let records = comments.list(page).await?;
            if *html {
                print!("{}", render_widget(lang, page, &records, &identity.nick, max_chars, None));
            } else {
                for record in &records {
                    println!("{}  {}: {}", record.timestamp, record.nick, record.text);
                }
            }
        }
        CommentsAction::Post { page, nick, text } => {
            let nick = nick
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .or(Some(identity.nick.as_str()).filter(|n| !n.is_empty()))
                .unwrap_or(DEFAULT_NICK)
                .to_string();

            match comments.submit(page, &nick, text, &identity.uid).await {
                Ok(()) => {
                    if nick != DEFAULT_NICK {
                        identity.remember_nick(&nick).await?;
                    }
                    println!("Comment posted to {page}");
                }
                Err(e) => {
                    error!(%page, error = %e, "Comment submission failed");
                    eprintln!("Could not post comment: {e}");
                    return Err(e.into());
                }
            }
        }
    }
    Ok(())
}
