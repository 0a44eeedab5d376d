//! CarGurus listings adapter
//!
//! CarGurus renders most of its results client-side; the server response
//! still carries an initial result set, so this adapter reads a single
//! page per pass rather than paginating.

use super::{
    extract_from_fragments, FetchOutcome, ListingQuery, ListingSource, ScrapeClient, ScrapeError,
};
use carval_common::config::ScrapeConfig;
use tracing::info;

const SOURCE_NAME: &str = "cargurus";
const BASE_URL: &str = "https://www.cargurus.com";

const FRAGMENT_MARKER: &str = "cg-dealFinder-result";

pub struct CarGurusSource {
    client: ScrapeClient,
}

impl CarGurusSource {
    pub fn new(config: &ScrapeConfig) -> Result<Self, ScrapeError> {
        Ok(Self {
            client: ScrapeClient::new(SOURCE_NAME, config)?,
        })
    }

    fn search_url(query: &ListingQuery) -> String {
        let mut url = format!(
            "{}/Cars/inventorylisting/viewDetailsFilterViewInventoryListing.action\
             ?sourceContext=carGurusHomePageModel&entitySelectingHelper.selectedEntity={}+{}",
            BASE_URL,
            query.make.replace(' ', "+"),
            query.model.replace(' ', "+"),
        );

        if let Some(year) = query.year {
            url.push_str(&format!("&startYear={}&endYear={}", year, year));
        }

        url
    }
}

#[async_trait::async_trait]
impl ListingSource for CarGurusSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    async fn fetch(&self, query: &ListingQuery) -> Result<FetchOutcome, ScrapeError> {
        let url = Self::search_url(query);
        let html = self.client.get_html(&url).await?;

        let outcome =
            extract_from_fragments(&html, FRAGMENT_MARKER, SOURCE_NAME, query.max_results as usize);

        info!(
            source = SOURCE_NAME,
            found = outcome.listings.len(),
            skipped = outcome.skipped,
            "Fetch complete"
        );

        Ok(outcome)
    }
}
