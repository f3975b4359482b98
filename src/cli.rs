//! Command-line interface definitions for BriefRooms News.
//!
//! Every subcommand runs for all configured sites unless `--lang` picks one.
//! The config path and the comment endpoint can also come from the
//! environment.

use clap::{Args, Parser, Subcommand};

/// Command-line arguments for the BriefRooms news pipeline.
///
/// # Examples
///
/// ```sh
/// # Static digest pages for every site
/// briefrooms_news digest --out-dir ./site
///
/// # Refresh the hotbar caches for the Polish site only
/// briefrooms_news --lang pl hotbar
///
/// # Re-render the ticker every five minutes
/// briefrooms_news ticker --out-dir ./site --watch 300
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file (built-in sites otherwise)
    #[arg(short, long, global = true, env = "BRIEFROOMS_CONFIG")]
    pub config: Option<String>,

    /// Only run for this site language (e.g. `pl`, `en`)
    #[arg(short, long, global = true)]
    pub lang: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch section feeds and write the static digest page
    Digest {
        /// Site root the digest paths are relative to
        #[arg(short, long, default_value = ".")]
        out_dir: String,
    },

    /// Fetch hotbar feeds and write the summary caches
    Hotbar {
        /// Overrides `cache_dir` from the config
        #[arg(long)]
        cache_dir: Option<String>,
    },

    /// Render the scrolling ticker from a summary cache
    Ticker(TickerArgs),

    /// Print the entries a list of feeds yields, in priority order
    Feeds {
        /// Stop after this many entries
        #[arg(short = 'n', long, default_value_t = 20)]
        limit: usize,

        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Read or post comments
    Comments {
        /// Comment service endpoint
        #[arg(long, env = "COMMENTS_ENDPOINT")]
        endpoint: Option<String>,

        #[command(subcommand)]
        action: CommentsAction,
    },
}

#[derive(Args, Debug)]
pub struct TickerArgs {
    /// Cache URL or file; `{lang}` is replaced with the site language.
    /// Defaults to the site's summaries cache.
    #[arg(short, long)]
    pub source: Option<String>,

    /// The fragment is written to `<out-dir>/<lang>/ticker.html`
    #[arg(short, long, default_value = ".")]
    pub out_dir: String,

    /// Keep running and re-render every N seconds
    #[arg(short, long, value_name = "SECS")]
    pub watch: Option<u64>,
}

#[derive(Subcommand, Debug)]
pub enum CommentsAction {
    /// Print the comments for a page
    List {
        #[arg(short, long)]
        page: String,

        /// Print the rendered widget instead of plain lines
        #[arg(long)]
        html: bool,
    },

    /// Post a comment to a page
    Post {
        #[arg(short, long)]
        page: String,

        /// Defaults to the nick remembered from the last post
        #[arg(short, long)]
        nick: Option<String>,

        #[arg(short, long)]
        text: String,
    },
}
