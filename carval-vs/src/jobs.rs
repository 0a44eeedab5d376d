//! Scrape job orchestration
//!
//! Shared by the resolver's live-scrape stage and the CLI `scrape`
//! command: fan over the configured sources in order, persist what they
//! return, log every adapter invocation, and recompute the group's
//! stored aggregate from the recent listing window.

use crate::db::{listings, run_log, valuations};
use crate::scrapers::{ListingQuery, ListingSource, ScrapeError};
use crate::valuation::stats::{self, Sample};
use anyhow::Result;
use carval_common::config::{ScrapeConfig, ValuationConfig};
use carval_common::db::models::{RunOutcome, ScraperRunLog, VehicleListing, VehicleValuation};
use carval_common::types::VehicleGroup;
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Per-source outcome of one job
#[derive(Debug)]
pub struct SourceReport {
    pub source: &'static str,
    pub found: u32,
    pub skipped: u32,
    pub outcome: RunOutcome,
    pub error: Option<String>,
}

/// Overall outcome of one scrape job
#[derive(Debug, Default)]
pub struct ScrapeJobReport {
    pub per_source: Vec<SourceReport>,
    pub total_found: u32,
    pub total_skipped: u32,
    /// The recomputed aggregate, when the merged window was non-empty
    pub valuation: Option<VehicleValuation>,
}

/// Run a scrape job for one comparables group.
///
/// With `stop_at_min_sample` the source list is walked only until the
/// collected sample reaches the minimum threshold (primary first, then
/// secondary, and so on); without it every source is queried.
///
/// A failing source is logged and skipped: one blocked site must not
/// starve the job of the others' listings.
pub async fn run_scrape_job(
    pool: &SqlitePool,
    sources: &[Arc<dyn ListingSource>],
    group: &VehicleGroup,
    scrape_cfg: &ScrapeConfig,
    valuation_cfg: &ValuationConfig,
    stop_at_min_sample: bool,
) -> Result<ScrapeJobReport> {
    let mut report = ScrapeJobReport::default();
    let mut scraped: Vec<VehicleListing> = Vec::new();

    let query = ListingQuery {
        make: group.make.clone(),
        model: group.model.clone(),
        year: Some(group.year),
        max_results: scrape_cfg.max_results,
    };

    info!(group = %group.label(), "Starting scrape job");

    for source in sources {
        let started_at = Utc::now();

        let (outcome, found, skipped, error) = match source.fetch(&query).await {
            Ok(fetch) => {
                let found = fetch.listings.len() as u32;
                let outcome = if fetch.skipped > 0 {
                    RunOutcome::Partial
                } else {
                    RunOutcome::Success
                };

                let observed_at = Utc::now();
                scraped.extend(fetch.listings.into_iter().map(|l| VehicleListing {
                    guid: Uuid::new_v4(),
                    make: group.make.clone(),
                    model: group.model.clone(),
                    year: group.year,
                    source: l.source.to_string(),
                    price: l.price,
                    mileage: l.mileage,
                    city: l.city,
                    state: l.state,
                    listing_url: l.url,
                    observed_at,
                }));

                (outcome, found, fetch.skipped, None)
            }
            Err(ScrapeError::Blocked(status)) => {
                warn!(source = source.name(), status, "Source blocked the client");
                (
                    RunOutcome::Failure,
                    0,
                    0,
                    Some(format!("blocked (HTTP {})", status)),
                )
            }
            Err(e) => {
                warn!(source = source.name(), "Source failed: {}", e);
                (RunOutcome::Failure, 0, 0, Some(e.to_string()))
            }
        };

        run_log::record(
            pool,
            &ScraperRunLog {
                guid: Uuid::new_v4(),
                source: source.name().to_string(),
                make: group.make.clone(),
                model: group.model.clone(),
                year: Some(group.year),
                items_found: found as i64,
                items_skipped: skipped as i64,
                outcome,
                message: error.clone(),
                started_at,
                finished_at: Utc::now(),
            },
        )
        .await?;

        report.total_found += found;
        report.total_skipped += skipped;
        report.per_source.push(SourceReport {
            source: source.name(),
            found,
            skipped,
            outcome,
            error,
        });

        if stop_at_min_sample && report.total_found >= valuation_cfg.min_sample {
            break;
        }
    }

    if !scraped.is_empty() {
        listings::insert_batch(pool, &scraped).await?;
    }

    report.valuation = recompute_valuation(pool, group, valuation_cfg).await?;

    info!(
        group = %group.label(),
        found = report.total_found,
        skipped = report.total_skipped,
        "Scrape job complete"
    );

    Ok(report)
}

/// Recompute and store the aggregate for a group from the recent listing
/// window. Returns `None` when the window holds no usable sample.
pub async fn recompute_valuation(
    pool: &SqlitePool,
    group: &VehicleGroup,
    valuation_cfg: &ValuationConfig,
) -> Result<Option<VehicleValuation>> {
    let recent = listings::recent_for_group(pool, group, valuation_cfg.listing_window_days).await?;

    let samples: Vec<Sample> = recent
        .iter()
        .map(|l| Sample {
            price: l.price,
            mileage: l.mileage,
        })
        .collect();

    let aggregate = match stats::aggregate(&samples, valuation_cfg.mad_multiplier) {
        Some(agg) => agg,
        None => return Ok(None),
    };

    let valuation = VehicleValuation {
        guid: Uuid::new_v4(),
        make: group.make.clone(),
        model: group.model.clone(),
        year: group.year,
        mean_price: aggregate.mean,
        median_price: aggregate.median,
        retail_price: aggregate.retail,
        sample_size: aggregate.sample_size as i64,
        avg_mileage: aggregate.avg_mileage,
        computed_at: Utc::now(),
    };

    valuations::upsert_for_group(pool, &valuation).await?;

    Ok(Some(valuation))
}

/// Retention pass: purge listings older than the retention window
pub async fn run_cleanup(pool: &SqlitePool, retention_days: i64) -> Result<u64> {
    let cutoff = Utc::now() - Duration::days(retention_days);
    let purged = listings::delete_older_than(pool, cutoff).await?;

    if purged > 0 {
        info!(purged, "Purged listings past retention");
    }

    Ok(purged)
}
