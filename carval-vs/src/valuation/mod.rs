//! Valuation resolver: cache → live scrape → depreciation fallback
//!
//! State-free per call. Each stage absorbs the previous stage's failure
//! and the final stage cannot fail, so `resolve` always returns a value
//! with a provenance tag and a confidence label; callers never see a raw
//! scrape error.

pub mod depreciation;
pub mod stats;

use crate::db::valuations;
use crate::jobs;
use crate::scrapers::ListingSource;
use carval_common::config::{ScrapeConfig, ValuationConfig};
use carval_common::db::models::VehicleValuation;
use carval_common::rules::BusinessRules;
use carval_common::types::{Confidence, Provenance, VehicleGroup};
use chrono::{Datelike, Duration, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, info, warn};

use depreciation::TableMatch;

/// Per-mile adjustment when the claimant's odometer differs from the
/// market sample's average
const MILEAGE_RATE_PER_MILE: f64 = 0.10;

/// Market-derived values never adjust below this
const MIN_MARKET_VALUE: f64 = 500.0;

/// One valuation request
#[derive(Debug, Clone)]
pub struct ValuationRequest {
    pub group: VehicleGroup,
    pub mileage: Option<i64>,
    pub state: Option<String>,
}

/// Aggregate figures carried along with a market-derived value
#[derive(Debug, Clone)]
pub struct MarketSummary {
    pub mean: f64,
    pub median: f64,
    pub retail: f64,
    pub avg_mileage: Option<f64>,
}

/// The resolver's single answer shape, whatever stage produced it
#[derive(Debug, Clone)]
pub struct ResolvedValuation {
    pub value: f64,
    pub provenance: Provenance,
    pub confidence: Confidence,
    pub sample_size: Option<u32>,
    pub market: Option<MarketSummary>,
    /// Human-readable adjustment trail, for display only
    pub notes: Vec<String>,
}

/// Ordered-fallback valuation resolver
pub struct ValuationResolver {
    valuation_cfg: ValuationConfig,
    scrape_cfg: ScrapeConfig,
    rules: BusinessRules,
    sources: Vec<Arc<dyn ListingSource>>,
}

impl ValuationResolver {
    pub fn new(
        valuation_cfg: ValuationConfig,
        scrape_cfg: ScrapeConfig,
        rules: BusinessRules,
        sources: Vec<Arc<dyn ListingSource>>,
    ) -> Self {
        Self {
            valuation_cfg,
            scrape_cfg,
            rules,
            sources,
        }
    }

    /// Resolve a value for the requested vehicle group.
    ///
    /// Never fails: when both the cache and the live scrape come up empty
    /// the static depreciation model answers.
    pub async fn resolve(&self, pool: &SqlitePool, request: &ValuationRequest) -> ResolvedValuation {
        // Stage 1: fresh stored valuation. A database error here is a miss,
        // not a failure; the chain continues.
        match valuations::find_for_group(pool, &request.group).await {
            Ok(Some(stored)) if self.is_fresh(&stored) => {
                debug!(group = %request.group.label(), "Valuation cache hit");
                return self.from_market_row(&stored, request, Provenance::Cache);
            }
            Ok(_) => {}
            Err(e) => warn!(group = %request.group.label(), "Cache check failed: {}", e),
        }

        // Stage 2: live scrape, primary source first
        match jobs::run_scrape_job(
            pool,
            &self.sources,
            &request.group,
            &self.scrape_cfg,
            &self.valuation_cfg,
            true,
        )
        .await
        {
            Ok(report) => {
                if let Some(valuation) = report.valuation {
                    info!(
                        group = %request.group.label(),
                        sample = valuation.sample_size,
                        "Resolved from market data"
                    );
                    return self.from_market_row(&valuation, request, Provenance::MarketData);
                }
            }
            Err(e) => warn!(group = %request.group.label(), "Live scrape failed: {}", e),
        }

        // Stage 3: static depreciation model, which always has an answer
        info!(group = %request.group.label(), "Falling back to depreciation model");
        self.from_depreciation(request)
    }

    fn is_fresh(&self, stored: &VehicleValuation) -> bool {
        Utc::now() - stored.computed_at < Duration::days(self.valuation_cfg.freshness_days)
    }

    fn from_market_row(
        &self,
        stored: &VehicleValuation,
        request: &ValuationRequest,
        provenance: Provenance,
    ) -> ResolvedValuation {
        let mut value = stored.mean_price;
        let mut notes = vec![format!(
            "Market sample of {} listings (mean ${:.0}, median ${:.0})",
            stored.sample_size, stored.mean_price, stored.median_price
        )];

        if let (Some(mileage), Some(avg_mileage)) = (request.mileage, stored.avg_mileage) {
            let diff = mileage as f64 - avg_mileage;
            let adjustment = -diff * MILEAGE_RATE_PER_MILE;
            if adjustment.abs() >= 1.0 {
                value += adjustment;
                notes.push(format!(
                    "Mileage adjustment: ${:.0} for {:.0} miles vs sample average",
                    adjustment, diff
                ));
            }
        }

        value = self.apply_regional(value, request.state.as_deref(), &mut notes);
        value = value.max(MIN_MARKET_VALUE);

        let confidence = market_confidence(
            stored.sample_size,
            self.valuation_cfg.high_confidence_sample,
        );

        ResolvedValuation {
            value,
            provenance,
            confidence,
            sample_size: Some(stored.sample_size as u32),
            market: Some(MarketSummary {
                mean: stored.mean_price,
                median: stored.median_price,
                retail: stored.retail_price,
                avg_mileage: stored.avg_mileage,
            }),
            notes,
        }
    }

    fn from_depreciation(&self, request: &ValuationRequest) -> ResolvedValuation {
        let est = depreciation::estimate_value(
            &request.group.make,
            &request.group.model,
            request.group.year,
            request.mileage,
            Utc::now().year() as i64,
        );

        let mut notes = vec![match est.table_match {
            TableMatch::ExactModel => format!(
                "Depreciated from ${:.0} MSRP over {} years",
                est.base_msrp, est.age
            ),
            TableMatch::MakeAverage => format!(
                "Model not in tables; depreciated from {} average MSRP ${:.0}",
                request.group.make, est.base_msrp
            ),
            TableMatch::IndustryDefault => format!(
                "Make not in tables; depreciated from industry default MSRP ${:.0}",
                est.base_msrp
            ),
        }];

        if est.mileage_adjustment.abs() >= 1.0 {
            notes.push(format!(
                "Mileage adjustment: ${:.0}",
                est.mileage_adjustment
            ));
        }

        let value = self.apply_regional(est.value, request.state.as_deref(), &mut notes);

        let confidence = match est.table_match {
            TableMatch::ExactModel => Confidence::Medium,
            TableMatch::MakeAverage | TableMatch::IndustryDefault => Confidence::Low,
        };

        ResolvedValuation {
            value,
            provenance: Provenance::FallbackModel,
            confidence,
            sample_size: None,
            market: None,
            notes,
        }
    }

    fn apply_regional(&self, value: f64, state: Option<&str>, notes: &mut Vec<String>) -> f64 {
        let Some(state) = state else {
            return value;
        };

        let multiplier = self.rules.regional_multiplier(state);
        if multiplier != 1.0 {
            let pct = ((multiplier - 1.0) * 100.0).round();
            let direction = if pct > 0.0 { "higher" } else { "lower" };
            notes.push(format!(
                "Regional adjustment: {:.0}% {} for {}",
                pct.abs(),
                direction,
                state
            ));
        }

        value * multiplier
    }
}

/// Confidence label for a market-derived sample.
///
/// Monotonic in sample size: growing a sample never lowers the label.
fn market_confidence(sample_size: i64, high_threshold: u32) -> Confidence {
    if sample_size >= high_threshold as i64 {
        Confidence::High
    } else {
        Confidence::Medium
    }
}
