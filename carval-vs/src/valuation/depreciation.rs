//! Static depreciation model: the valuation of last resort
//!
//! Base MSRP figures and make-keyed depreciation curves from published
//! industry depreciation studies. The ladder of defaults (exact model →
//! make average → industry default) means this path always yields a value.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// 2024 base-model MSRP by make and model
static BASE_MSRP: Lazy<HashMap<&'static str, Vec<(&'static str, f64)>>> = Lazy::new(|| {
    HashMap::from([
        ("Toyota", vec![
            ("Camry", 28_515.0),
            ("Corolla", 22_050.0),
            ("RAV4", 29_075.0),
            ("Highlander", 37_895.0),
            ("Tacoma", 29_395.0),
        ]),
        ("Honda", vec![
            ("Civic", 24_650.0),
            ("Accord", 28_295.0),
            ("CR-V", 30_800.0),
            ("Pilot", 41_035.0),
        ]),
        ("Ford", vec![
            ("F-150", 37_965.0),
            ("Escape", 29_185.0),
            ("Explorer", 38_590.0),
            ("Mustang", 30_920.0),
            ("Bronco", 35_000.0),
        ]),
        ("Chevrolet", vec![
            ("Silverado", 38_800.0),
            ("Equinox", 28_600.0),
            ("Malibu", 25_100.0),
            ("Traverse", 37_700.0),
            ("Camaro", 27_000.0),
            ("Tahoe", 58_000.0),
        ]),
        ("Tesla", vec![
            ("Model 3", 42_000.0),
            ("Model Y", 52_000.0),
            ("Model S", 88_000.0),
            ("Model X", 98_000.0),
        ]),
        ("Porsche", vec![
            ("911", 115_000.0),
            ("Cayenne", 79_000.0),
            ("Macan", 60_000.0),
            ("Panamera", 95_000.0),
        ]),
        ("BMW", vec![
            ("3 Series", 43_800.0),
            ("5 Series", 57_200.0),
            ("X3", 47_200.0),
            ("X5", 65_400.0),
            ("7 Series", 95_000.0),
        ]),
        ("Mercedes", vec![
            ("C-Class", 46_150.0),
            ("E-Class", 61_850.0),
            ("GLE", 61_950.0),
            ("GLC", 47_400.0),
            ("S-Class", 117_000.0),
        ]),
        ("Audi", vec![
            ("A4", 41_500.0),
            ("A6", 56_200.0),
            ("Q5", 45_300.0),
            ("Q7", 59_100.0),
        ]),
        ("Lexus", vec![
            ("ES", 43_190.0),
            ("RX", 49_850.0),
            ("NX", 41_035.0),
            ("IS", 42_185.0),
        ]),
        ("Nissan", vec![
            ("Altima", 26_730.0),
            ("Rogue", 30_155.0),
            ("Frontier", 31_340.0),
            ("Pathfinder", 36_330.0),
        ]),
        ("Hyundai", vec![
            ("Elantra", 22_350.0),
            ("Sonata", 26_530.0),
            ("Tucson", 28_600.0),
            ("Santa Fe", 33_850.0),
        ]),
        ("Kia", vec![
            ("Forte", 20_790.0),
            ("Optima", 25_990.0),
            ("Sportage", 27_490.0),
            ("Sorento", 32_690.0),
        ]),
        ("Subaru", vec![
            ("Impreza", 23_850.0),
            ("Outback", 29_495.0),
            ("Forester", 28_995.0),
            ("Crosstrek", 25_995.0),
        ]),
        ("Mazda", vec![
            ("Mazda3", 24_475.0),
            ("CX-5", 29_250.0),
            ("CX-9", 39_190.0),
            ("Mazda6", 26_470.0),
        ]),
        ("Jeep", vec![
            ("Wrangler", 32_915.0),
            ("Grand Cherokee", 43_360.0),
            ("Compass", 29_995.0),
            ("Cherokee", 31_450.0),
        ]),
        ("Ram", vec![
            ("1500", 39_595.0),
            ("2500", 46_395.0),
            ("3500", 48_425.0),
        ]),
        ("GMC", vec![
            ("Sierra", 40_400.0),
            ("Terrain", 31_900.0),
            ("Acadia", 37_800.0),
            ("Yukon", 60_000.0),
        ]),
    ])
});

/// Year-over-year depreciation fractions for the first ten years, by make
static DEPRECIATION_CURVES: Lazy<HashMap<&'static str, [f64; 10]>> = Lazy::new(|| {
    HashMap::from([
        ("Toyota", [0.18, 0.09, 0.07, 0.06, 0.05, 0.04, 0.04, 0.03, 0.03, 0.02]),
        ("Lexus", [0.19, 0.09, 0.07, 0.06, 0.05, 0.04, 0.04, 0.03, 0.03, 0.02]),
        ("Honda", [0.20, 0.10, 0.08, 0.06, 0.05, 0.04, 0.04, 0.03, 0.03, 0.02]),
        ("Subaru", [0.21, 0.10, 0.08, 0.06, 0.05, 0.04, 0.04, 0.03, 0.03, 0.02]),
        ("BMW", [0.27, 0.14, 0.11, 0.09, 0.07, 0.06, 0.05, 0.04, 0.03, 0.03]),
        ("Mercedes", [0.28, 0.15, 0.11, 0.09, 0.07, 0.06, 0.05, 0.04, 0.03, 0.03]),
        ("Audi", [0.26, 0.14, 0.10, 0.08, 0.07, 0.06, 0.05, 0.04, 0.03, 0.03]),
        ("Ford", [0.25, 0.13, 0.10, 0.08, 0.07, 0.06, 0.05, 0.04, 0.03, 0.03]),
        ("Chevrolet", [0.26, 0.14, 0.11, 0.09, 0.07, 0.06, 0.05, 0.04, 0.03, 0.03]),
        ("GMC", [0.24, 0.12, 0.10, 0.08, 0.07, 0.06, 0.05, 0.04, 0.03, 0.03]),
        ("Ram", [0.23, 0.12, 0.09, 0.08, 0.06, 0.05, 0.05, 0.04, 0.03, 0.03]),
        ("Nissan", [0.27, 0.14, 0.11, 0.09, 0.07, 0.06, 0.05, 0.04, 0.03, 0.03]),
        ("Hyundai", [0.28, 0.15, 0.12, 0.10, 0.08, 0.06, 0.05, 0.04, 0.03, 0.03]),
        ("Kia", [0.28, 0.15, 0.12, 0.10, 0.08, 0.06, 0.05, 0.04, 0.03, 0.03]),
        ("Jeep", [0.24, 0.12, 0.09, 0.07, 0.06, 0.05, 0.04, 0.04, 0.03, 0.03]),
        ("Mazda", [0.25, 0.13, 0.10, 0.08, 0.07, 0.06, 0.05, 0.04, 0.03, 0.03]),
        ("Tesla", [0.30, 0.16, 0.12, 0.10, 0.08, 0.07, 0.06, 0.05, 0.04, 0.03]),
        ("Porsche", [0.25, 0.12, 0.09, 0.07, 0.06, 0.05, 0.04, 0.03, 0.03, 0.02]),
    ])
});

/// Past the ten-year schedule, value drops 2% per year
const LONG_TAIL_RATE: f64 = 0.02;

/// Industry-average MSRP when the make is unknown entirely
const INDUSTRY_DEFAULT_MSRP: f64 = 35_000.0;

/// Fallback curve for unknown makes (middle-of-the-road resale)
const DEFAULT_CURVE_MAKE: &str = "Toyota";

/// Mileage expectation and adjustment rates
const AVG_MILES_PER_YEAR: f64 = 12_000.0;
const MILEAGE_PENALTY_PER_MILE: f64 = 0.12;
/// Below-average mileage earns half the per-mile rate back
const LOW_MILEAGE_CREDIT_FACTOR: f64 = 0.5;

/// No vehicle depreciates to scrap below this floor
const MIN_VALUE_FLOOR: f64 = 1_500.0;

/// How specifically the static tables matched the requested vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableMatch {
    /// The exact (make, model) row
    ExactModel,
    /// Make known, model not listed: average MSRP across the make
    MakeAverage,
    /// Make unknown: industry default MSRP and curve
    IndustryDefault,
}

/// Depreciation-model output
#[derive(Debug, Clone)]
pub struct DepreciationEstimate {
    pub value: f64,
    pub base_msrp: f64,
    pub age: i64,
    pub table_match: TableMatch,
    pub mileage_adjustment: f64,
}

fn msrp_for(make: &str, model: &str) -> (f64, TableMatch) {
    match BASE_MSRP.get(make) {
        Some(models) => {
            if let Some((_, msrp)) = models.iter().find(|(name, _)| *name == model) {
                (*msrp, TableMatch::ExactModel)
            } else {
                let avg = models.iter().map(|(_, m)| m).sum::<f64>() / models.len() as f64;
                (avg, TableMatch::MakeAverage)
            }
        }
        None => (INDUSTRY_DEFAULT_MSRP, TableMatch::IndustryDefault),
    }
}

/// Estimate a vehicle's value from the static tables.
///
/// `as_of_year` is passed in (rather than read from the clock) so the
/// computation stays pure. This function cannot fail: every rung of the
/// default ladder has a value.
pub fn estimate_value(
    make: &str,
    model: &str,
    year: i64,
    mileage: Option<i64>,
    as_of_year: i64,
) -> DepreciationEstimate {
    let age = (as_of_year - year).max(0);

    let (base_msrp, table_match) = msrp_for(make, model);

    let curve = DEPRECIATION_CURVES
        .get(make)
        .or_else(|| DEPRECIATION_CURVES.get(DEFAULT_CURVE_MAKE))
        .expect("default curve present");

    let mut value = base_msrp;
    for rate in curve.iter().take(age.min(curve.len() as i64) as usize) {
        value *= 1.0 - rate;
    }

    if age > curve.len() as i64 {
        let remaining = age - curve.len() as i64;
        value *= (1.0 - LONG_TAIL_RATE).powi(remaining as i32);
    }

    // Mileage adjustment against the expected odometer for this age
    let mut mileage_adjustment = 0.0;
    if let Some(miles) = mileage {
        let expected = age as f64 * AVG_MILES_PER_YEAR;
        let diff = miles as f64 - expected;
        mileage_adjustment = if diff > 0.0 {
            -diff * MILEAGE_PENALTY_PER_MILE
        } else {
            -diff * MILEAGE_PENALTY_PER_MILE * LOW_MILEAGE_CREDIT_FACTOR
        };
        value += mileage_adjustment;
    }

    value = value.max(MIN_VALUE_FLOOR);

    DepreciationEstimate {
        value,
        base_msrp,
        age,
        table_match,
        mileage_adjustment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_model_match() {
        let est = estimate_value("Toyota", "Camry", 2020, None, 2024);
        assert_eq!(est.table_match, TableMatch::ExactModel);
        assert_eq!(est.base_msrp, 28_515.0);
        assert!(est.value > 0.0);
        assert!(est.value < est.base_msrp);
    }

    #[test]
    fn camry_depreciation_schedule() {
        // 4 years of the Toyota curve, no mileage adjustment
        let est = estimate_value("Toyota", "Camry", 2020, None, 2024);
        let expected = 28_515.0 * (1.0 - 0.18) * (1.0 - 0.09) * (1.0 - 0.07) * (1.0 - 0.06);
        assert!((est.value - expected).abs() < 0.01);
    }

    #[test]
    fn unlisted_model_uses_make_average() {
        let est = estimate_value("Toyota", "Supra", 2020, None, 2024);
        assert_eq!(est.table_match, TableMatch::MakeAverage);
        assert!(est.value > 0.0);
    }

    #[test]
    fn unknown_make_uses_industry_default() {
        let est = estimate_value("Zastava", "Yugo", 2020, None, 2024);
        assert_eq!(est.table_match, TableMatch::IndustryDefault);
        assert_eq!(est.base_msrp, INDUSTRY_DEFAULT_MSRP);
        assert!(est.value > 0.0);
    }

    #[test]
    fn high_mileage_is_penalized_low_mileage_credited() {
        let expected_miles = 4 * 12_000;
        let high = estimate_value("Toyota", "Camry", 2020, Some(expected_miles + 20_000), 2024);
        let average = estimate_value("Toyota", "Camry", 2020, Some(expected_miles), 2024);
        let low = estimate_value("Toyota", "Camry", 2020, Some(expected_miles - 20_000), 2024);

        assert!(high.value < average.value);
        assert!(low.value > average.value);
        // credit is half the penalty rate
        let penalty = average.value - high.value;
        let credit = low.value - average.value;
        assert!((credit - penalty * 0.5).abs() < 0.01);
    }

    #[test]
    fn old_vehicle_hits_the_floor_not_zero() {
        let est = estimate_value("Kia", "Forte", 1990, Some(300_000), 2024);
        assert_eq!(est.value, MIN_VALUE_FLOOR);
    }

    #[test]
    fn future_model_year_has_zero_age() {
        let est = estimate_value("Toyota", "Camry", 2025, None, 2024);
        assert_eq!(est.age, 0);
        assert_eq!(est.value, est.base_msrp);
    }
}
