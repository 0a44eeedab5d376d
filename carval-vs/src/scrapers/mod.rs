//! Scraper set: one adapter per external listings source
//!
//! Adapters share their request discipline (rate limiting, bounded retry,
//! browser headers) through [`client::ScrapeClient`] and differ only in
//! URL construction and the fragment patterns they extract listings with.
//! Site markup is a collaborator concern: the extraction patterns are
//! deliberately small and live next to the adapter that owns them.

pub mod autotrader;
pub mod cargurus;
pub mod cars_com;
pub mod client;

pub use autotrader::AutotraderSource;
pub use cargurus::CarGurusSource;
pub use cars_com::CarsComSource;
pub use client::ScrapeClient;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Scraper errors
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Timeout, connect failure, or 5xx. Retried internally up to the
    /// attempt bound before surfacing
    #[error("Transient error: {0}")]
    Transient(String),

    /// 4xx response: bad query or blocked client. Not retried.
    #[error("Blocked by source (HTTP {0})")]
    Blocked(u16),
}

/// Query for one fetch pass over a source
#[derive(Debug, Clone)]
pub struct ListingQuery {
    pub make: String,
    pub model: String,
    pub year: Option<i64>,
    pub max_results: u32,
}

/// A single scraped observation, not yet persisted
#[derive(Debug, Clone)]
pub struct ScrapedListing {
    pub source: &'static str,
    pub price: f64,
    pub mileage: Option<i64>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub url: Option<String>,
}

/// Result of one fetch pass: a finite batch plus the count of listing
/// elements that failed extraction and were skipped.
///
/// Zero listings is a valid empty outcome, distinct from an error.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub listings: Vec<ScrapedListing>,
    pub skipped: u32,
}

/// A listings source the resolver can query.
///
/// One pass per call: the returned batch is finite and not restartable.
#[async_trait::async_trait]
pub trait ListingSource: Send + Sync {
    /// Source name used in run logs and listing provenance
    fn name(&self) -> &'static str;

    /// Fetch listings for a (make, model, year) query
    async fn fetch(&self, query: &ListingQuery) -> Result<FetchOutcome, ScrapeError>;
}

// Shared fragment patterns. Individual sites differ in markup, but the
// price/mileage/location text fragments are uniform enough to extract with
// one set of patterns once an adapter has isolated the listing fragments.
static PRICE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\s*([0-9][0-9,]{2,})").expect("price pattern"));
static MILEAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-9][0-9,]*)\s*(?:mi\b|miles\b)").expect("mileage pattern"));
static LOCATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z .'-]+),\s*([A-Z]{2})\b").expect("location pattern"));

/// Listings priced outside this band are treated as extraction noise
const MIN_PLAUSIBLE_PRICE: f64 = 500.0;
const MAX_PLAUSIBLE_PRICE: f64 = 500_000.0;

/// Parse a price string like "$25,000" into a float
pub fn clean_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse::<f64>().ok()
}

/// Parse a mileage string like "50,000 miles" into an integer
pub fn clean_mileage(raw: &str) -> Option<i64> {
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    cleaned.parse::<i64>().ok()
}

/// Extract listings from a page by splitting on a listing-fragment marker.
///
/// Fragments missing a parseable, plausible price are skipped and counted;
/// a bad element never aborts the batch.
pub(crate) fn extract_from_fragments(
    html: &str,
    fragment_marker: &str,
    source: &'static str,
    max_results: usize,
) -> FetchOutcome {
    let mut outcome = FetchOutcome::default();

    for fragment in html.split(fragment_marker).skip(1) {
        if outcome.listings.len() >= max_results {
            break;
        }

        let price = PRICE_RE
            .captures(fragment)
            .and_then(|c| clean_price(c.get(1).map(|m| m.as_str()).unwrap_or_default()));

        let price = match price {
            Some(p) if (MIN_PLAUSIBLE_PRICE..=MAX_PLAUSIBLE_PRICE).contains(&p) => p,
            _ => {
                outcome.skipped += 1;
                continue;
            }
        };

        let mileage = MILEAGE_RE
            .captures(fragment)
            .and_then(|c| clean_mileage(c.get(1).map(|m| m.as_str()).unwrap_or_default()));

        let (city, state) = match LOCATION_RE.captures(fragment) {
            Some(c) => (
                c.get(1).map(|m| m.as_str().trim().to_string()),
                c.get(2).map(|m| m.as_str().to_string()),
            ),
            None => (None, None),
        };

        outcome.listings.push(ScrapedListing {
            source,
            price,
            mileage,
            city,
            state,
            url: None,
        });
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_price_strips_symbols() {
        assert_eq!(clean_price("$25,000"), Some(25000.0));
        assert_eq!(clean_price("25000"), Some(25000.0));
        assert_eq!(clean_price("$ 18,995"), Some(18995.0));
        assert_eq!(clean_price("call for price"), None);
    }

    #[test]
    fn clean_mileage_strips_units() {
        assert_eq!(clean_mileage("50,000 miles"), Some(50000));
        assert_eq!(clean_mileage("50000"), Some(50000));
        assert_eq!(clean_mileage(""), None);
    }

    #[test]
    fn extraction_skips_malformed_fragments() {
        let html = r#"
            <div class="listing-card">2020 Toyota Camry $21,500 38,000 mi Columbus, OH</div>
            <div class="listing-card">2020 Toyota Camry - call for price</div>
            <div class="listing-card">2020 Toyota Camry $19,900 45,210 mi</div>
        "#;

        let outcome = extract_from_fragments(html, "listing-card", "test", 100);
        assert_eq!(outcome.listings.len(), 2);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.listings[0].price, 21500.0);
        assert_eq!(outcome.listings[0].mileage, Some(38000));
        assert_eq!(outcome.listings[0].state.as_deref(), Some("OH"));
        assert_eq!(outcome.listings[1].price, 19900.0);
    }

    #[test]
    fn extraction_rejects_implausible_prices() {
        let html = r#"<li class="card">$99 promo</li><li class="card">$23,400 31,000 mi</li>"#;
        let outcome = extract_from_fragments(html, "card", "test", 100);
        assert_eq!(outcome.listings.len(), 1);
        assert_eq!(outcome.skipped, 1);
    }

    #[test]
    fn extraction_honors_max_results() {
        let html = r#"<x class="c">$10,000</x><x class="c">$11,000</x><x class="c">$12,000</x>"#;
        let outcome = extract_from_fragments(html, r#"class="c""#, "test", 2);
        assert_eq!(outcome.listings.len(), 2);
    }

    #[test]
    fn empty_page_is_valid_empty_outcome() {
        let outcome = extract_from_fragments("<html></html>", "listing-card", "test", 100);
        assert!(outcome.listings.is_empty());
        assert_eq!(outcome.skipped, 0);
    }
}
