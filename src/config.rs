//! Site configuration.
//!
//! Everything the pipeline needs per language lives in a [`SiteConfig`]:
//! digest sections, hotbar feeds, the categorizer rule table and the ticker
//! selection policy. A YAML file can override the built-in defaults, which
//! reproduce the Polish (native) and English sites.
//!
//! ```yaml
//! cache_dir: .cache
//! sites:
//!   - lang: pl
//!     native: true
//!     digest:
//!       path: pl/aktualnosci.html
//!       sections:
//!         - label: Sport
//!           urls: [https://www.polsatsport.pl/rss/wszystkie.xml]
//!     ticker:
//!       policy: { tail_per_bucket: 2 }
//! ```

use crate::categorize::{default_rules, CategoryRule};
use crate::error::Result;
use crate::models::Bucket;
use crate::ticker::SelectionPolicy;
use serde::Deserialize;
use std::path::Path;
use tracing::{info, instrument};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    #[serde(default)]
    pub comments: CommentsConfig,
    pub sites: Vec<SiteConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentsConfig {
    /// Spreadsheet-backed comment endpoint. `COMMENTS_ENDPOINT` overrides it.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Where the device identity (uid + remembered nick) is kept.
    #[serde(default = "default_state_file")]
    pub state_file: String,
    #[serde(default = "default_max_text_chars")]
    pub max_text_chars: usize,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            state_file: default_state_file(),
            max_text_chars: default_max_text_chars(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub lang: String,
    /// The native-language site falls back to `local` for unmatched headlines.
    #[serde(default)]
    pub native: bool,
    pub digest: DigestConfig,
    #[serde(default)]
    pub hotbar: HotbarConfig,
    #[serde(default)]
    pub ticker: TickerConfig,
    /// Ordered categorizer rules; empty means the built-in table for `lang`.
    #[serde(default)]
    pub rules: Vec<CategoryRule>,
}

impl SiteConfig {
    pub fn fallback_bucket(&self) -> Bucket {
        if self.native { Bucket::Local } else { Bucket::World }
    }

    pub fn rules(&self) -> Vec<CategoryRule> {
        if self.rules.is_empty() {
            default_rules(&self.lang)
        } else {
            self.rules.clone()
        }
    }

    pub fn summaries_cache_path(&self, cache_dir: &str) -> String {
        format!("{}/news_summaries_{}.json", cache_dir.trim_end_matches('/'), self.lang)
    }

    pub fn hotbar_cache_path(&self, cache_dir: &str) -> String {
        format!("{}/news_hotbar_{}.json", cache_dir.trim_end_matches('/'), self.lang)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionConfig {
    pub label: String,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DigestConfig {
    /// Output path relative to the output directory, e.g. `en/news.html`.
    pub path: String,
    #[serde(default = "default_max_per_section")]
    pub max_per_section: usize,
    #[serde(default = "default_horizon_hours")]
    pub horizon_hours: i64,
    pub sections: Vec<SectionConfig>,
    #[serde(default)]
    pub texts: DigestTexts,
}

/// Localized strings of the digest page template.
#[derive(Debug, Clone, Deserialize)]
pub struct DigestTexts {
    pub title: String,
    pub heading: String,
    pub description: String,
    pub horizon_label: String,
    pub empty_section: String,
    pub note: String,
    pub generated_label: String,
}

impl Default for DigestTexts {
    fn default() -> Self {
        Self {
            title: "News — BriefRooms".to_string(),
            heading: "News".to_string(),
            description: "Automatically refreshed headlines from last hours: world, business, sports."
                .to_string(),
            horizon_label: "Last ~36 hours".to_string(),
            empty_section: "No headlines right now.".to_string(),
            note: "Automatic digest (RSS). Links go to original publishers. Page is overwritten daily."
                .to_string(),
            generated_label: "Generated".to_string(),
        }
    }
}

impl DigestTexts {
    fn polish() -> Self {
        Self {
            title: "Aktualności — BriefRooms".to_string(),
            heading: "Aktualności".to_string(),
            description:
                "Automatycznie odświeżane aktualności z ostatnich godzin: polityka, ekonomia, sport."
                    .to_string(),
            horizon_label: "Ostatnie ~36 godzin".to_string(),
            empty_section: "Brak nagłówków.".to_string(),
            note: "Automatyczny skrót (RSS). Linki prowadzą do wydawców. Strona nadpisywana codziennie."
                .to_string(),
            generated_label: "Wygenerowano".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HotbarConfig {
    #[serde(default)]
    pub feeds: Vec<String>,
    #[serde(default = "default_per_feed_limit")]
    pub per_feed_limit: usize,
    #[serde(default = "default_total_limit")]
    pub total_limit: usize,
}

impl Default for HotbarConfig {
    fn default() -> Self {
        Self {
            feeds: Vec::new(),
            per_feed_limit: default_per_feed_limit(),
            total_limit: default_total_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TickerConfig {
    #[serde(default, with = "serde_yaml::with::singleton_map")]
    pub policy: SelectionPolicy,
    /// Scroll speed in pixels per second.
    #[serde(default = "default_speed")]
    pub speed_px_per_sec: f64,
    /// Link target for cache entries that carry no URL.
    #[serde(default = "default_fallback_url")]
    pub fallback_url: String,
    #[serde(default = "default_ticker_label")]
    pub label: String,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            policy: SelectionPolicy::default(),
            speed_px_per_sec: default_speed(),
            fallback_url: default_fallback_url(),
            label: default_ticker_label(),
        }
    }
}

fn default_cache_dir() -> String {
    ".cache".to_string()
}
fn default_state_file() -> String {
    ".cache/comment_identity.json".to_string()
}
fn default_max_text_chars() -> usize {
    2000
}
fn default_max_per_section() -> usize {
    6
}
fn default_horizon_hours() -> i64 {
    36
}
fn default_per_feed_limit() -> usize {
    15
}
fn default_total_limit() -> usize {
    40
}
fn default_speed() -> f64 {
    60.0
}
fn default_fallback_url() -> String {
    "/".to_string()
}
fn default_ticker_label() -> String {
    "Live".to_string()
}

fn section(label: &str, urls: &[&str]) -> SectionConfig {
    SectionConfig {
        label: label.to_string(),
        urls: urls.iter().map(|u| u.to_string()).collect(),
    }
}

impl Default for Config {
    fn default() -> Self {
        let pl = SiteConfig {
            lang: "pl".to_string(),
            native: true,
            digest: DigestConfig {
                path: "pl/aktualnosci.html".to_string(),
                max_per_section: default_max_per_section(),
                horizon_hours: default_horizon_hours(),
                sections: vec![
                    section(
                        "Polityka / Kraj",
                        &["https://tvn24.pl/najnowsze.xml", "https://www.rmf24.pl/kanaly/rss.html"],
                    ),
                    section(
                        "Ekonomia / Biznes",
                        &[
                            "https://www.bankier.pl/rss/wiadomosci.xml",
                            "https://www.bankier.pl/rss/gospodarka.xml",
                        ],
                    ),
                    section("Sport", &["https://www.polsatsport.pl/rss/wszystkie.xml"]),
                ],
                texts: DigestTexts::polish(),
            },
            hotbar: HotbarConfig {
                feeds: [
                    "https://tvn24.pl/najnowsze.xml",
                    "https://tvn24.pl/polska.xml",
                    "https://tvn24.pl/swiat.xml",
                    "https://www.polsatnews.pl/rss/wszystkie.xml",
                    "https://www.pap.pl/rss.xml",
                    "https://feeds.reuters.com/reuters/worldNews",
                    "https://feeds.reuters.com/reuters/businessNews",
                    "https://www.polsatsport.pl/rss/wszystkie.xml",
                    "https://feeds.bbci.co.uk/sport/rss.xml?edition=int",
                ]
                .iter()
                .map(|u| u.to_string())
                .collect(),
                ..HotbarConfig::default()
            },
            ticker: TickerConfig {
                fallback_url: "/pl/aktualnosci.html".to_string(),
                label: "Na żywo".to_string(),
                ..TickerConfig::default()
            },
            rules: Vec::new(),
        };

        let en = SiteConfig {
            lang: "en".to_string(),
            native: false,
            digest: DigestConfig {
                path: "en/news.html".to_string(),
                max_per_section: default_max_per_section(),
                horizon_hours: default_horizon_hours(),
                sections: vec![
                    section(
                        "World",
                        &[
                            "https://www.reuters.com/world/rss",
                            "https://apnews.com/hub/ap-top-news?utm_source=apnews.com&utm_medium=referral&utm_campaign=ap_rss_feed&output=rss",
                        ],
                    ),
                    section(
                        "Business / Markets",
                        &["https://www.reuters.com/finance/markets/rss", "https://www.reuters.com/business/rss"],
                    ),
                    section("Sports", &["https://www.espn.com/espn/rss/news"]),
                ],
                texts: DigestTexts::default(),
            },
            hotbar: HotbarConfig {
                feeds: [
                    "http://feeds.bbci.co.uk/news/rss.xml",
                    "https://www.theguardian.com/world/rss",
                    "https://www.aljazeera.com/xml/rss/all.xml",
                ]
                .iter()
                .map(|u| u.to_string())
                .collect(),
                per_feed_limit: 15,
                total_limit: 25,
            },
            ticker: TickerConfig {
                fallback_url: "/en/news.html".to_string(),
                ..TickerConfig::default()
            },
            rules: Vec::new(),
        };

        Self {
            cache_dir: default_cache_dir(),
            comments: CommentsConfig::default(),
            sites: vec![pl, en],
        }
    }
}

impl Config {
    /// Load the YAML config at `path`, or the built-in defaults when `None`.
    #[instrument(level = "info")]
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(p) => {
                let contents = std::fs::read_to_string(Path::new(p))?;
                let config = Self::from_yaml(&contents)?;
                info!(path = p, sites = config.sites.len(), "Loaded configuration");
                Ok(config)
            }
            None => {
                info!("No config file given; using built-in sites");
                Ok(Self::default())
            }
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn site(&self, lang: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|s| s.lang.eq_ignore_ascii_case(lang))
    }

    /// Sites selected by an optional `--lang` filter.
    pub fn selected_sites(&self, lang: Option<&str>) -> Vec<&SiteConfig> {
        match lang {
            Some(l) => self.site(l).into_iter().collect(),
            None => self.sites.iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sites() {
        let config = Config::default();
        let pl = config.site("pl").unwrap();
        assert!(pl.native);
        assert_eq!(pl.fallback_bucket(), Bucket::Local);
        assert_eq!(pl.digest.path, "pl/aktualnosci.html");
        assert_eq!(pl.digest.sections.len(), 3);

        let en = config.site("EN").unwrap();
        assert!(!en.native);
        assert_eq!(en.fallback_bucket(), Bucket::World);
        assert_eq!(en.hotbar.total_limit, 25);
    }

    #[test]
    fn test_cache_paths() {
        let config = Config::default();
        let pl = config.site("pl").unwrap();
        assert_eq!(pl.summaries_cache_path(".cache/"), ".cache/news_summaries_pl.json");
        assert_eq!(pl.hotbar_cache_path("/srv/cache"), "/srv/cache/news_hotbar_pl.json");
    }

    #[test]
    fn test_yaml_with_defaults() {
        let yaml = r#"
sites:
  - lang: pl
    native: true
    digest:
      path: pl/aktualnosci.html
      sections:
        - label: Sport
          urls: ["https://www.polsatsport.pl/rss/wszystkie.xml"]
    ticker:
      policy:
        head_per_bucket: 4
    rules:
      - bucket: sports
        pattern: "mecz"
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.cache_dir, ".cache");
        assert_eq!(config.comments.max_text_chars, 2000);
        let site = config.site("pl").unwrap();
        assert_eq!(site.digest.max_per_section, 6);
        assert_eq!(site.digest.horizon_hours, 36);
        assert_eq!(site.hotbar.per_feed_limit, 15);
        assert_eq!(site.ticker.policy, SelectionPolicy::HeadPerBucket(4));
        assert_eq!(site.rules().len(), 1);
        assert_eq!(site.rules()[0].bucket, Bucket::Sports);
    }

    #[test]
    fn test_empty_rules_use_builtin_table() {
        let config = Config::default();
        let site = config.site("pl").unwrap();
        assert!(!site.rules().is_empty());
        assert_eq!(site.rules()[0].bucket, Bucket::Local);
    }

    #[test]
    fn test_selected_sites() {
        let config = Config::default();
        assert_eq!(config.selected_sites(None).len(), 2);
        assert_eq!(config.selected_sites(Some("en")).len(), 1);
        assert!(config.selected_sites(Some("de")).is_empty());
    }
}
