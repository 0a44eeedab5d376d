//! Shared fixtures for integration tests
#![allow(dead_code)] // not every test binary uses every fixture

use carval_vs::scrapers::{
    FetchOutcome, ListingQuery, ListingSource, ScrapeError, ScrapedListing,
};
use sqlx::SqlitePool;
use std::path::PathBuf;
use tempfile::TempDir;

/// Create a temporary database with the full schema
pub async fn test_database() -> (TempDir, PathBuf, SqlitePool) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("carval_test.db");

    let pool = carval_common::db::init_database(&db_path)
        .await
        .expect("Failed to initialize database");

    (temp_dir, db_path, pool)
}

/// A source that always returns a valid empty batch
pub struct EmptySource;

#[async_trait::async_trait]
impl ListingSource for EmptySource {
    fn name(&self) -> &'static str {
        "empty_stub"
    }

    async fn fetch(&self, _query: &ListingQuery) -> Result<FetchOutcome, ScrapeError> {
        Ok(FetchOutcome::default())
    }
}

/// A source that returns one listing per configured price
pub struct FixedSource {
    pub prices: Vec<f64>,
    pub skipped: u32,
}

impl FixedSource {
    pub fn new(prices: &[f64]) -> Self {
        Self {
            prices: prices.to_vec(),
            skipped: 0,
        }
    }
}

#[async_trait::async_trait]
impl ListingSource for FixedSource {
    fn name(&self) -> &'static str {
        "fixed_stub"
    }

    async fn fetch(&self, _query: &ListingQuery) -> Result<FetchOutcome, ScrapeError> {
        Ok(FetchOutcome {
            listings: self
                .prices
                .iter()
                .map(|&price| ScrapedListing {
                    source: "fixed_stub",
                    price,
                    mileage: Some(40_000),
                    city: Some("Columbus".to_string()),
                    state: Some("OH".to_string()),
                    url: None,
                })
                .collect(),
            skipped: self.skipped,
        })
    }
}

/// A source that always fails as blocked
pub struct BlockedSource;

#[async_trait::async_trait]
impl ListingSource for BlockedSource {
    fn name(&self) -> &'static str {
        "blocked_stub"
    }

    async fn fetch(&self, _query: &ListingQuery) -> Result<FetchOutcome, ScrapeError> {
        Err(ScrapeError::Blocked(403))
    }
}
