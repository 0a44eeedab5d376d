//! Claim and vehicle domain types shared across the workspace

use serde::{Deserialize, Serialize};

/// Identifies a group of market comparables.
///
/// Listings and valuations key on (make, model, year) rather than a
/// specific VIN: comparables describe the market for a vehicle like the
/// claimant's, not the claimant's vehicle itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleGroup {
    pub make: String,
    pub model: String,
    pub year: i64,
}

impl VehicleGroup {
    pub fn new(make: impl Into<String>, model: impl Into<String>, year: i64) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
            year,
        }
    }

    /// Display key used in logs and error messages
    pub fn label(&self) -> String {
        format!("{} {} {}", self.year, self.make, self.model)
    }
}

/// Inbound claim record from the (excluded) API layer.
///
/// The core consumes exactly these fields; transport concerns are not
/// parsed or validated here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimInput {
    pub vin: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i64>,
    pub mileage: Option<i64>,
    pub severity: String,
    pub collision_type: Option<String>,
    pub state: Option<String>,
    pub injuries: u32,
}

/// Which resolution stage produced a valuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Fresh stored valuation, no network touched
    Cache,
    /// Computed from listings scraped this pass
    MarketData,
    /// Static depreciation model
    FallbackModel,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Cache => "cache",
            Provenance::MarketData => "market_data",
            Provenance::FallbackModel => "fallback_model",
        }
    }
}

/// Confidence label attached to every resolved valuation.
///
/// Ordered so that `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_ordering() {
        assert!(Confidence::Low < Confidence::Medium);
        assert!(Confidence::Medium < Confidence::High);
    }

    #[test]
    fn provenance_tags() {
        assert_eq!(Provenance::MarketData.as_str(), "market_data");
        assert_eq!(Provenance::FallbackModel.as_str(), "fallback_model");
    }

    #[test]
    fn group_label() {
        let g = VehicleGroup::new("Toyota", "Camry", 2020);
        assert_eq!(g.label(), "2020 Toyota Camry");
    }
}
