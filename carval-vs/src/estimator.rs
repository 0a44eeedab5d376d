//! Cost estimator: business-rules arithmetic over a resolved vehicle value
//!
//! A pure function over explicit inputs. The rules tables are derived
//! offline from historical claims and loaded once at startup; nothing here
//! recomputes them at request time.

use carval_common::rules::BusinessRules;
use carval_common::{Error, Result};

/// Claims never settle below this, whatever the arithmetic says
const MIN_PREDICTED_COST: f64 = 500.0;

/// Predicted cost plus the factor breakdown that produced it
#[derive(Debug, Clone)]
pub struct CostEstimate {
    pub predicted_cost: f64,
    /// Human-readable contributing factors, for display only
    pub reasoning: Vec<String>,
}

/// Estimate a repair/claim cost.
///
/// An unknown severity label is rejected with a validation error rather
/// than silently defaulting; same for a present-but-unknown collision
/// type. A `None` collision type skips that factor (claims data leaves it
/// unreported for non-collision incidents).
pub fn estimate(
    rules: &BusinessRules,
    vehicle_value: f64,
    severity: &str,
    collision_type: Option<&str>,
    injuries: u32,
    state: Option<&str>,
) -> Result<CostEstimate> {
    if !vehicle_value.is_finite() || vehicle_value <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "vehicle value must be positive, got {}",
            vehicle_value
        )));
    }

    let ratio = rules
        .severity_ratio(severity)
        .ok_or_else(|| Error::Validation(format!("unknown severity label: {:?}", severity)))?;

    let mut reasoning = Vec::new();
    let mut cost = vehicle_value * ratio;
    reasoning.push(format!(
        "{}: {:.0}% of vehicle value (${:.0})",
        severity,
        ratio * 100.0,
        cost
    ));

    if let Some(collision) = collision_type {
        let multiplier = rules.collision_multiplier(collision).ok_or_else(|| {
            Error::Validation(format!("unknown collision type: {:?}", collision))
        })?;
        cost *= multiplier;
        if multiplier != 1.0 {
            reasoning.push(format!("{}: ×{:.2}", collision, multiplier));
        }
    }

    if injuries > 0 {
        let increment = injuries as f64 * rules.injury_increment;
        cost += increment;
        reasoning.push(format!(
            "Injuries: {} × ${:.0} = ${:.0}",
            injuries, rules.injury_increment, increment
        ));
    }

    if let Some(state) = state {
        let multiplier = rules.regional_multiplier(state);
        if multiplier != 1.0 {
            cost *= multiplier;
            let pct = ((multiplier - 1.0) * 100.0).round();
            let direction = if pct > 0.0 { "higher" } else { "lower" };
            reasoning.push(format!(
                "Regional adjustment: {:.0}% {} for {}",
                pct.abs(),
                direction,
                state
            ));
        }
    }

    let cost = cost.max(MIN_PREDICTED_COST);

    Ok(CostEstimate {
        predicted_cost: cost,
        reasoning,
    })
}
