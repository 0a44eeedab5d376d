//! Row models for the market data store

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Decoded vehicle attributes, one row per unique VIN.
///
/// Created on first successful decode, immutable afterwards, never
/// deleted; the decode cost is amortized across requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSpecification {
    pub vin: String,
    pub make: String,
    pub model: String,
    pub year: i64,
    pub trim: Option<String>,
    pub body_type: Option<String>,
    pub decoded_at: DateTime<Utc>,
}

/// One scraped market observation.
///
/// Listings are market comparables keyed to a (make, model, year) group,
/// not to the claimant's VIN. Append-only; expired rows are removed by the
/// retention cleanup pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleListing {
    pub guid: Uuid,
    pub make: String,
    pub model: String,
    pub year: i64,
    pub source: String,
    pub price: f64,
    pub mileage: Option<i64>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub listing_url: Option<String>,
    pub observed_at: DateTime<Utc>,
}

/// Aggregate over a group of listings, overwritten on each recompute.
///
/// Invariant: `sample_size >= 1` whenever a row exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleValuation {
    pub guid: Uuid,
    pub make: String,
    pub model: String,
    pub year: i64,
    pub mean_price: f64,
    pub median_price: f64,
    pub retail_price: f64,
    pub sample_size: i64,
    pub avg_mileage: Option<f64>,
    pub computed_at: DateTime<Utc>,
}

/// One scrape invocation's outcome, for observability only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperRunLog {
    pub guid: Uuid,
    pub source: String,
    pub make: String,
    pub model: String,
    pub year: Option<i64>,
    pub items_found: i64,
    pub items_skipped: i64,
    pub outcome: RunOutcome,
    pub message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Outcome of a single scraper invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// All fetched elements parsed
    Success,
    /// Batch returned, but some elements were skipped
    Partial,
    /// The source raised an error; nothing usable returned
    Failure,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Success => "success",
            RunOutcome::Partial => "partial",
            RunOutcome::Failure => "failure",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(RunOutcome::Success),
            "partial" => Some(RunOutcome::Partial),
            "failure" => Some(RunOutcome::Failure),
            _ => None,
        }
    }
}
