//! End-to-end claim flow: vehicle identity → market value → cost estimate
//!
//! This is the path an inbound claim record takes. VIN decoding is
//! best-effort: a rejected or unavailable decode falls back to whatever
//! attributes the claim already carried, and only a claim with no usable
//! vehicle identity at all is an error.

use crate::db::specifications;
use crate::estimator::{self, CostEstimate};
use crate::services::{DecodeError, VinDecoder};
use crate::valuation::{ResolvedValuation, ValuationRequest, ValuationResolver};
use carval_common::rules::BusinessRules;
use carval_common::types::{ClaimInput, VehicleGroup};
use carval_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::warn;

/// Everything a claim handler needs to render an answer
#[derive(Debug, Clone)]
pub struct ClaimOutcome {
    pub group: VehicleGroup,
    pub valuation: ResolvedValuation,
    pub estimate: CostEstimate,
}

/// Estimate a claim end-to-end.
///
/// The regional multiplier is applied once, at the cost step, so the
/// resolver is asked for the unregionalized value.
pub async fn estimate_claim(
    pool: &SqlitePool,
    decoder: Option<&VinDecoder>,
    resolver: &ValuationResolver,
    rules: &BusinessRules,
    claim: &ClaimInput,
) -> Result<ClaimOutcome> {
    let group = resolve_vehicle_identity(pool, decoder, claim).await?;

    let request = ValuationRequest {
        group: group.clone(),
        mileage: claim.mileage,
        state: None,
    };
    let valuation = resolver.resolve(pool, &request).await;

    let estimate = estimator::estimate(
        rules,
        valuation.value,
        &claim.severity,
        claim.collision_type.as_deref(),
        claim.injuries,
        claim.state.as_deref(),
    )?;

    Ok(ClaimOutcome {
        group,
        valuation,
        estimate,
    })
}

/// Fill in (make, model, year) from the claim, decoding the VIN for
/// whichever are missing. Decode failures are non-fatal as long as the
/// claim carried usable attributes.
async fn resolve_vehicle_identity(
    pool: &SqlitePool,
    decoder: Option<&VinDecoder>,
    claim: &ClaimInput,
) -> Result<VehicleGroup> {
    let mut make = claim.make.clone();
    let mut model = claim.model.clone();
    let mut year = claim.year;

    let needs_decode = make.is_none() || model.is_none() || year.is_none();
    if needs_decode {
        if let (Some(vin), Some(decoder)) = (claim.vin.as_deref(), decoder) {
            match decoder.decode(vin).await {
                Ok(spec) => {
                    specifications::insert_ignore(pool, &spec)
                        .await
                        .map_err(|e| Error::Internal(e.to_string()))?;
                    make.get_or_insert(spec.make);
                    model.get_or_insert(spec.model);
                    year.get_or_insert(spec.year);
                }
                Err(DecodeError::InvalidVin(reason)) => {
                    warn!("VIN rejected ({}); continuing with claim attributes", reason);
                }
                Err(DecodeError::Unavailable(reason)) => {
                    warn!(
                        "VIN decode unavailable ({}); continuing with claim attributes",
                        reason
                    );
                }
            }
        }
    }

    match (make, model, year) {
        (Some(make), Some(model), Some(year)) => Ok(VehicleGroup::new(make, model, year)),
        _ => Err(Error::InvalidInput(
            "claim needs make, model, and year, or a decodable VIN".to_string(),
        )),
    }
}
