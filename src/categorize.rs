//! Headline categorization into ticker buckets.
//!
//! Each site owns one ordered rule table of `{bucket, pattern}` pairs. A
//! headline is normalized (lower-case, diacritics stripped) and tested
//! against the rules in order; the first match decides the bucket. When
//! nothing matches the site's fallback bucket is used: `local` on the
//! native-language site, `world` on the secondary one.
//!
//! Rule order matters. A title matching both a local and a world pattern
//! lands in whichever bucket's rule comes first in the table.

use crate::config::SiteConfig;
use crate::models::{Bucket, SummaryEntry};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use tracing::{debug, instrument, warn};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryRule {
    pub bucket: Bucket,
    pub pattern: String,
}

impl CategoryRule {
    pub fn new(bucket: Bucket, pattern: &str) -> Self {
        Self {
            bucket,
            pattern: pattern.to_string(),
        }
    }
}

const PL_LOCAL: &str = r"\b(sejm\w*|senat\w*|prezydent\w*|premier\w*|rzad\w*|minist\w*|posl\w*|partia|partii|pis|psl|koalicj\w*|konfederacj\w*|lewic\w*|tusk\w*|nawrock\w*|kaczynsk\w*|holown\w*|trzaskowsk\w*|wybor\w*|ustaw\w*|polsk\w*|polak\w*|polacy|warszaw\w*|krakow\w*|gdansk\w*|wroclaw\w*|poznan\w*|lodz\w*|katowic\w*|kraj\w*|gmin\w*|samorzad\w*|wojewod\w*|policj\w*|prokurat\w*|budzet\w*|zus|nfz)\b";
const PL_WORLD: &str = r"\b(nato|ue|unia europejska|unii europejskiej|onz|usa|stany zjednoczone|ameryk\w*|rosj\w*|rosyjsk\w*|ukrain\w*|kijow\w*|moskw\w*|kreml\w*|chin\w*|pekin\w*|niemc\w*|niemiec\w*|berlin\w*|francj\w*|paryz\w*|izrael\w*|hamas\w*|iran\w*|trump\w*|putin\w*|zelensk\w*|biden\w*|macron\w*|bruksel\w*|londyn\w*|swiat(a|u|em|owy|owa|owe|owych|owej)?|miedzynarodow\w*|szczyt\w*)\b";
const PL_SPORTS: &str = r"\b(sport\w*|mecz\w*|ligi|liga|lidze|ligowy\w*|ekstraklas\w*|pilk\w*|reprezentacj\w*|trener\w*|gol[ai]?|bramk\w*|mistrz\w*|olimpi\w*|medal\w*|turniej\w*|tenis\w*|swiatek|hurkacz\w*|lewandowsk\w*|skoki|skoczk\w*|siatkar\w*|siatkow\w*|koszyk\w*|zuzel\w*|formul\w*|f1|wimbledon|final\w*|puchar\w*|legia|lech|rakow)\b";

const EN_LOCAL: &str = r"\b(parliament\w*|government\w*|minister\w*|president\w*|election\w*|senate|congress\w*|vote[sd]?|voters?|policy|policies|budget\w*|court\w*|police|poland|polish|warsaw|sejm|tusk|nawrocki)\b";
const EN_WORLD: &str = r"\b(nato|eu|european union|un|united nations|russia\w*|ukrain\w*|kyiv|moscow|kremlin|china|chinese|beijing|israel\w*|gaza|hamas|iran\w*|war|ceasefire|summit\w*|trump|putin|zelensky\w*|white house|global|international|worldwide|foreign)\b";
const EN_SPORTS: &str = r"\b(sport\w*|football|soccer|match\w*|league|cup|goals?|olympic\w*|tennis|swiatek|nba|nfl|formula (1|one)|f1|grand prix|champion\w*|tournament\w*|coach\w*|striker|transfer\w*|wimbledon|fifa|uefa)\b";

/// The built-in rule table for a site language.
///
/// Order is local/politics, then world, then sports.
pub fn default_rules(lang: &str) -> Vec<CategoryRule> {
    let (local, world, sports) = match lang.to_ascii_lowercase().as_str() {
        "pl" => (PL_LOCAL, PL_WORLD, PL_SPORTS),
        _ => (EN_LOCAL, EN_WORLD, EN_SPORTS),
    };
    vec![
        CategoryRule::new(Bucket::Local, local),
        CategoryRule::new(Bucket::World, world),
        CategoryRule::new(Bucket::Sports, sports),
    ]
}

/// Lower-case the text and strip diacritics.
///
/// `ł` has no Unicode decomposition, so it is mapped to `l` explicitly.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .replace('ł', "l")
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Headlines grouped per bucket, each list in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buckets {
    pub local: Vec<SummaryEntry>,
    pub world: Vec<SummaryEntry>,
    pub sports: Vec<SummaryEntry>,
}

impl Buckets {
    pub fn get(&self, bucket: Bucket) -> &[SummaryEntry] {
        match bucket {
            Bucket::Local => &self.local,
            Bucket::World => &self.world,
            Bucket::Sports => &self.sports,
        }
    }

    fn get_mut(&mut self, bucket: Bucket) -> &mut Vec<SummaryEntry> {
        match bucket {
            Bucket::Local => &mut self.local,
            Bucket::World => &mut self.world,
            Bucket::Sports => &mut self.sports,
        }
    }

    pub fn len(&self) -> usize {
        self.local.len() + self.world.len() + self.sports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A compiled rule table plus the site's fallback bucket.
#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<(Bucket, Regex)>,
    fallback: Bucket,
}

impl Categorizer {
    /// Compile `rules` in order. Patterns that fail to compile are logged and skipped.
    pub fn new(rules: &[CategoryRule], fallback: Bucket) -> Self {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            match RegexBuilder::new(&rule.pattern).case_insensitive(true).build() {
                Ok(re) => compiled.push((rule.bucket, re)),
                Err(e) => warn!(bucket = %rule.bucket, error = %e, "Skipping invalid category pattern"),
            }
        }
        Self {
            rules: compiled,
            fallback,
        }
    }

    pub fn for_site(site: &SiteConfig) -> Self {
        Self::new(&site.rules(), site.fallback_bucket())
    }

    pub fn classify(&self, title: &str) -> Bucket {
        let normalized = normalize_title(title);
        self.rules
            .iter()
            .find(|(_, re)| re.is_match(&normalized))
            .map(|(bucket, _)| *bucket)
            .unwrap_or(self.fallback)
    }

    #[instrument(level = "debug", skip_all, fields(count = entries.len()))]
    pub fn categorize(&self, entries: &[SummaryEntry]) -> Buckets {
        let mut buckets = Buckets::default();
        for entry in entries {
            let bucket = self.classify(&entry.title);
            buckets.get_mut(bucket).push(entry.clone());
        }
        debug!(
            local = buckets.local.len(),
            world = buckets.world.len(),
            sports = buckets.sports.len(),
            "Categorized headlines"
        );
        buckets
    }
}

/// Categorize `entries` with the site's rule table and fallback.
pub fn categorize(entries: &[SummaryEntry], site: &SiteConfig) -> Buckets {
    Categorizer::for_site(site).categorize(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn entry(title: &str) -> SummaryEntry {
        SummaryEntry {
            title: title.to_string(),
            date: None,
            url: None,
            hot: false,
        }
    }

    #[test]
    fn test_normalize_title_strips_diacritics() {
        assert_eq!(normalize_title("Świątek wygrywa w Łodzi"), "swiatek wygrywa w lodzi");
        assert_eq!(normalize_title("Zażółć GĘŚLĄ jaźń"), "zazolc gesla jazn");
        assert_eq!(normalize_title("Café Müller"), "cafe muller");
    }

    #[test]
    fn test_local_rule_fires_before_world_on_native_site() {
        let config = Config::default();
        let site = config.site("pl").unwrap();
        let categorizer = Categorizer::for_site(site);
        assert_eq!(categorizer.classify("Sejm debates NATO summit"), Bucket::Local);
    }

    #[test]
    fn test_rule_order_decides_overlapping_titles() {
        let rules = vec![
            CategoryRule::new(Bucket::World, "nato"),
            CategoryRule::new(Bucket::Local, "sejm"),
        ];
        let categorizer = Categorizer::new(&rules, Bucket::Local);
        assert_eq!(categorizer.classify("Sejm debates NATO summit"), Bucket::World);
    }

    #[test]
    fn test_fallback_differs_per_site() {
        let config = Config::default();
        let pl = Categorizer::for_site(config.site("pl").unwrap());
        let en = Categorizer::for_site(config.site("en").unwrap());
        let title = "Nowy przepis na sernik";
        assert_eq!(pl.classify(title), Bucket::Local);
        assert_eq!(en.classify(title), Bucket::World);
    }

    #[test]
    fn test_polish_defaults() {
        let config = Config::default();
        let pl = Categorizer::for_site(config.site("pl").unwrap());
        assert_eq!(pl.classify("Premier zapowiada zmiany w rządzie"), Bucket::Local);
        assert_eq!(pl.classify("Putin grozi Ukrainie"), Bucket::World);
        assert_eq!(pl.classify("Iga Świątek awansowała do finału"), Bucket::Sports);
    }

    #[test]
    fn test_english_defaults() {
        let config = Config::default();
        let en = Categorizer::for_site(config.site("en").unwrap());
        assert_eq!(en.classify("Parliament passes budget bill"), Bucket::Local);
        assert_eq!(en.classify("Ceasefire talks resume in Gaza"), Bucket::World);
        assert_eq!(en.classify("Arsenal win the FA Cup final"), Bucket::Sports);
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let rules = vec![
            CategoryRule::new(Bucket::Sports, "(unclosed"),
            CategoryRule::new(Bucket::Sports, "mecz"),
        ];
        let categorizer = Categorizer::new(&rules, Bucket::World);
        assert_eq!(categorizer.classify("Wielki mecz"), Bucket::Sports);
        assert_eq!(categorizer.classify("Cokolwiek"), Bucket::World);
    }

    #[test]
    fn test_categorize_keeps_input_order() {
        let config = Config::default();
        let site = config.site("pl").unwrap();
        let entries = vec![
            entry("Sejm uchwalił budżet"),
            entry("Mecz Legii z Lechem"),
            entry("Premier w Brukseli"),
        ];
        let buckets = categorize(&entries, site);
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets.local[0].title, "Sejm uchwalił budżet");
        assert_eq!(buckets.local[1].title, "Premier w Brukseli");
        assert_eq!(buckets.sports[0].title, "Mecz Legii z Lechem");
        assert!(buckets.world.is_empty());
    }
}
