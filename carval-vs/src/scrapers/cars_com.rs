//! Cars.com listings adapter

use super::{
    extract_from_fragments, FetchOutcome, ListingQuery, ListingSource, ScrapeClient, ScrapeError,
};
use carval_common::config::ScrapeConfig;
use tracing::{info, warn};

const SOURCE_NAME: &str = "cars_com";
const BASE_URL: &str = "https://www.cars.com";

/// Marker isolating one listing fragment in a results page
const FRAGMENT_MARKER: &str = "vehicle-card";

/// Results per page on cars.com search
const PAGE_SIZE: u32 = 20;

/// Default search location when the query carries none
const DEFAULT_ZIP: &str = "10001";
const DEFAULT_RADIUS_MILES: u32 = 500;

pub struct CarsComSource {
    client: ScrapeClient,
}

impl CarsComSource {
    pub fn new(config: &ScrapeConfig) -> Result<Self, ScrapeError> {
        Ok(Self {
            client: ScrapeClient::new(SOURCE_NAME, config)?,
        })
    }

    fn search_url(query: &ListingQuery, page: u32) -> String {
        let make_slug = query.make.to_lowercase().replace(' ', "_");
        let model_slug = format!(
            "{}-{}",
            make_slug,
            query.model.to_lowercase().replace(' ', "_")
        );

        let mut url = format!(
            "{}/shopping/results/?stock_type=used&makes[]={}&models[]={}\
             &maximum_distance={}&zip={}&page={}&page_size={}&sort=best_match_desc",
            BASE_URL, make_slug, model_slug, DEFAULT_RADIUS_MILES, DEFAULT_ZIP, page, PAGE_SIZE
        );

        if let Some(year) = query.year {
            url.push_str(&format!("&year_min={}&year_max={}", year, year));
        }

        url
    }
}

#[async_trait::async_trait]
impl ListingSource for CarsComSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self, query: &ListingQuery) -> Result<FetchOutcome, ScrapeError> {
        let mut outcome = FetchOutcome::default();
        let max_results = query.max_results as usize;
        let max_pages = query.max_results / PAGE_SIZE + 1;

        for page in 1..=max_pages {
            if outcome.listings.len() >= max_results {
                break;
            }

            let url = Self::search_url(query, page);
            let html = match self.client.get_html(&url).await {
                Ok(html) => html,
                // A failure on the first page means the source gave us
                // nothing; later pages return what was already collected.
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    warn!(source = SOURCE_NAME, page, "Page fetch failed: {}", e);
                    break;
                }
            };

            let page_outcome = extract_from_fragments(
                &html,
                FRAGMENT_MARKER,
                SOURCE_NAME,
                max_results - outcome.listings.len(),
            );

            if page_outcome.listings.is_empty() && page_outcome.skipped == 0 {
                break; // past the last page of results
            }

            outcome.skipped += page_outcome.skipped;
            outcome.listings.extend(page_outcome.listings);
        }

        info!(
            source = SOURCE_NAME,
            found = outcome.listings.len(),
            skipped = outcome.skipped,
            "Fetch complete"
        );

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_url_includes_year_bounds() {
        let query = ListingQuery {
            make: "Toyota".to_string(),
            model: "Camry".to_string(),
            year: Some(2020),
            max_results: 50,
        };

        let url = CarsComSource::search_url(&query, 1);
        assert!(url.starts_with("https://www.cars.com/shopping/results/"));
        assert!(url.contains("makes[]=toyota"));
        assert!(url.contains("models[]=toyota-camry"));
        assert!(url.contains("year_min=2020"));
        assert!(url.contains("year_max=2020"));
    }

    #[test]
    fn search_url_slugs_multiword_models() {
        let query = ListingQuery {
            make: "Jeep".to_string(),
            model: "Grand Cherokee".to_string(),
            year: None,
            max_results: 50,
        };

        let url = CarsComSource::search_url(&query, 2);
        assert!(url.contains("models[]=jeep-grand_cherokee"));
        assert!(url.contains("page=2"));
        assert!(!url.contains("year_min"));
    }
}
