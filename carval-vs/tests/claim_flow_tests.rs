//! End-to-end claim flow: resolve a vehicle value, then estimate the
//! claim cost from it

mod common;

use carval_common::config::{ScrapeConfig, ValuationConfig};
use carval_common::rules::BusinessRules;
use carval_common::types::{ClaimInput, Provenance, VehicleGroup};
use carval_vs::claims;
use carval_vs::estimator;
use carval_vs::valuation::{ValuationRequest, ValuationResolver};
use common::{test_database, EmptySource};
use std::sync::Arc;

#[tokio::test]
async fn camry_major_damage_in_ohio() {
    // Empty store, zero-listing sources: the value must come from the
    // depreciation model and the cost from the static rules.
    let (_dir, _path, pool) = test_database().await;
    let rules = BusinessRules::default();

    let resolver = ValuationResolver::new(
        ValuationConfig::default(),
        ScrapeConfig::default(),
        rules.clone(),
        vec![Arc::new(EmptySource)],
    );

    let request = ValuationRequest {
        group: VehicleGroup::new("Toyota", "Camry", 2020),
        mileage: None,
        state: None,
    };
    let resolved = resolver.resolve(&pool, &request).await;

    assert_eq!(resolved.provenance, Provenance::FallbackModel);
    assert!(resolved.value > 0.0);

    let estimate = estimator::estimate(
        &rules,
        resolved.value,
        "Major Damage",
        None,
        0,
        Some("OH"),
    )
    .expect("estimate failed");

    // value × Major-Damage ratio × OH regional multiplier
    let expected = resolved.value * 0.45 * 0.95;
    assert!(
        (estimate.predicted_cost - expected).abs() < 1.0,
        "got {}, expected {}",
        estimate.predicted_cost,
        expected
    );

    // breakdown names both factors
    assert!(estimate
        .reasoning
        .iter()
        .any(|line| line.contains("Major Damage")));
    assert!(estimate.reasoning.iter().any(|line| line.contains("OH")));
}

#[tokio::test]
async fn injuries_and_collision_type_shape_the_cost() {
    let (_dir, _path, pool) = test_database().await;
    let rules = BusinessRules::default();

    let resolver = ValuationResolver::new(
        ValuationConfig::default(),
        ScrapeConfig::default(),
        rules.clone(),
        vec![Arc::new(EmptySource)],
    );

    let request = ValuationRequest {
        group: VehicleGroup::new("Honda", "Civic", 2018),
        mileage: Some(60_000),
        state: None,
    };
    let resolved = resolver.resolve(&pool, &request).await;
    assert!(resolved.value > 0.0);

    let estimate = estimator::estimate(
        &rules,
        resolved.value,
        "Minor Damage",
        Some("Rear Collision"),
        2,
        Some("TX"),
    )
    .expect("estimate failed");

    // TX multiplier is 1.0, so: value × 0.18 × 0.90 + 2 injuries
    let expected = resolved.value * 0.18 * 0.90 + 2.0 * rules.injury_increment;
    assert!((estimate.predicted_cost - expected).abs() < 1.0);
}

#[tokio::test]
async fn claim_record_flows_through_without_a_vin() {
    let (_dir, _path, pool) = test_database().await;
    let rules = BusinessRules::default();

    let resolver = ValuationResolver::new(
        ValuationConfig::default(),
        ScrapeConfig::default(),
        rules.clone(),
        vec![Arc::new(EmptySource)],
    );

    let claim = ClaimInput {
        vin: None,
        make: Some("Toyota".to_string()),
        model: Some("Camry".to_string()),
        year: Some(2020),
        mileage: None,
        severity: "Major Damage".to_string(),
        collision_type: None,
        state: Some("OH".to_string()),
        injuries: 0,
    };

    let outcome = claims::estimate_claim(&pool, None, &resolver, &rules, &claim)
        .await
        .expect("claim flow failed");

    assert_eq!(outcome.valuation.provenance, Provenance::FallbackModel);
    let expected = outcome.valuation.value * 0.45 * 0.95;
    assert!((outcome.estimate.predicted_cost - expected).abs() < 1.0);
}

#[tokio::test]
async fn claim_without_identity_or_vin_is_rejected() {
    let (_dir, _path, pool) = test_database().await;
    let rules = BusinessRules::default();

    let resolver = ValuationResolver::new(
        ValuationConfig::default(),
        ScrapeConfig::default(),
        rules.clone(),
        vec![Arc::new(EmptySource)],
    );

    let claim = ClaimInput {
        severity: "Major Damage".to_string(),
        ..ClaimInput::default()
    };

    let result = claims::estimate_claim(&pool, None, &resolver, &rules, &claim).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn unknown_severity_is_rejected_not_defaulted() {
    let rules = BusinessRules::default();
    let result = estimator::estimate(&rules, 15_000.0, "Cosmic Damage", None, 0, Some("OH"));
    assert!(result.is_err());
}
