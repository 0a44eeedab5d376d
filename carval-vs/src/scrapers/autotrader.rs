//! Autotrader listings adapter

use super::{
    extract_from_fragments, FetchOutcome, ListingQuery, ListingSource, ScrapeClient, ScrapeError,
};
use carval_common::config::ScrapeConfig;
use tracing::{info, warn};

const SOURCE_NAME: &str = "autotrader";
const BASE_URL: &str = "https://www.autotrader.com";

const FRAGMENT_MARKER: &str = "inventory-listing";

/// Autotrader pages by record offset rather than page number
const RECORDS_PER_PAGE: u32 = 25;

pub struct AutotraderSource {
    client: ScrapeClient,
}

impl AutotraderSource {
    pub fn new(config: &ScrapeConfig) -> Result<Self, ScrapeError> {
        Ok(Self {
            client: ScrapeClient::new(SOURCE_NAME, config)?,
        })
    }

    fn search_url(query: &ListingQuery, first_record: u32) -> String {
        let make_slug = query.make.to_lowercase().replace(' ', "-");
        let model_slug = query.model.to_lowercase().replace(' ', "-");

        let mut url = format!(
            "{}/cars-for-sale/used/{}/{}?firstRecord={}&numRecords={}&sortBy=relevance",
            BASE_URL, make_slug, model_slug, first_record, RECORDS_PER_PAGE
        );

        if let Some(year) = query.year {
            url.push_str(&format!("&startYear={}&endYear={}", year, year));
        }

        url
    }
}

#[async_trait::async_trait]
impl ListingSource for AutotraderSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self, query: &ListingQuery) -> Result<FetchOutcome, ScrapeError> {
        let mut outcome = FetchOutcome::default();
        let max_results = query.max_results as usize;

        let mut first_record = 0u32;
        while outcome.listings.len() < max_results && first_record < query.max_results {
            let url = Self::search_url(query, first_record);
            let html = match self.client.get_html(&url).await {
                Ok(html) => html,
                Err(e) if first_record == 0 => return Err(e),
                Err(e) => {
                    warn!(source = SOURCE_NAME, first_record, "Page fetch failed: {}", e);
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
                break;
            }

            outcome.skipped += page_outcome.skipped;
            outcome.listings.extend(page_outcome.listings);
            first_record += RECORDS_PER_PAGE;
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
    fn search_url_uses_record_offsets() {
        let query = ListingQuery {
            make: "Honda".to_string(),
            model: "CR-V".to_string(),
            year: Some(2019),
            max_results: 50,
        };

        let url = AutotraderSource::search_url(&query, 25);
        assert!(url.contains("/cars-for-sale/used/honda/cr-v"));
        assert!(url.contains("firstRecord=25"));
        assert!(url.contains("startYear=2019"));
    }
}
