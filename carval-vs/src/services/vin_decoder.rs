//! NHTSA vPIC client for VIN decoding
//!
//! Free API provided by the National Highway Traffic Safety Administration:
//! <https://vpic.nhtsa.dot.gov/api/>
//!
//! Decoded specifications are cached in-process by VIN; each VIN costs at
//! most one network call per process lifetime. The decoder does not retry;
//! retry policy belongs to the caller, and the claim flow treats a decode
//! failure as non-fatal.

use carval_common::db::models::VehicleSpecification;
use chrono::Utc;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

const NHTSA_BASE_URL: &str = "https://vpic.nhtsa.dot.gov/api/vehicles";
const USER_AGENT: &str = "carval/0.1.0";

/// VIN decoder errors
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Input is not a plausible VIN; no network call was made
    #[error("Invalid VIN: {0}")]
    InvalidVin(String),

    /// Network failure, non-success status, or unparseable response.
    ///
    /// All transient decode failures normalize to this one kind; a timeout
    /// and a malformed body look the same to the caller.
    #[error("Decode service unavailable: {0}")]
    Unavailable(String),
}

/// Raw vPIC decode response
#[derive(Debug, Deserialize)]
struct VpicResponse {
    #[serde(rename = "Results")]
    results: Vec<VpicVariable>,
}

#[derive(Debug, Deserialize)]
struct VpicVariable {
    #[serde(rename = "Variable")]
    variable: Option<String>,
    #[serde(rename = "Value")]
    value: Option<String>,
}

/// Raw vPIC models-for-make response
#[derive(Debug, Deserialize)]
struct VpicModelsResponse {
    #[serde(rename = "Results")]
    results: Vec<VpicModel>,
}

#[derive(Debug, Deserialize)]
struct VpicModel {
    #[serde(rename = "Model_Name")]
    model_name: Option<String>,
}

/// VIN decoder with an in-process cache
pub struct VinDecoder {
    http: reqwest::Client,
    cache: RwLock<HashMap<String, VehicleSpecification>>,
}

impl VinDecoder {
    pub fn new(timeout: Duration) -> Result<Self, DecodeError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| DecodeError::Unavailable(e.to_string()))?;

        Ok(Self {
            http,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Decode a VIN into vehicle attributes.
    ///
    /// Malformed input fails with [`DecodeError::InvalidVin`] before any
    /// network activity. A cache hit returns without a network call.
    pub async fn decode(&self, vin: &str) -> Result<VehicleSpecification, DecodeError> {
        let vin = normalize_vin(vin)?;

        if let Some(spec) = self.cache.read().await.get(&vin) {
            debug!(vin = %vin, "VIN cache hit");
            return Ok(spec.clone());
        }

        let url = format!("{}/DecodeVin/{}?format=json", NHTSA_BASE_URL, vin);
        debug!(vin = %vin, url = %url, "Querying vPIC");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| DecodeError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DecodeError::Unavailable(format!("HTTP {}", status.as_u16())));
        }

        let body: VpicResponse = response
            .json()
            .await
            .map_err(|e| DecodeError::Unavailable(format!("unparseable response: {}", e)))?;

        let spec = parse_decode_results(&vin, &body.results)?;

        info!(
            vin = %vin,
            make = %spec.make,
            model = %spec.model,
            year = spec.year,
            "Decoded VIN"
        );

        self.cache.write().await.insert(vin, spec.clone());

        Ok(spec)
    }

    /// List model names vPIC knows for a make
    pub async fn models_for_make(&self, make: &str) -> Result<Vec<String>, DecodeError> {
        let url = format!("{}/GetModelsForMake/{}?format=json", NHTSA_BASE_URL, make);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| DecodeError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DecodeError::Unavailable(format!("HTTP {}", status.as_u16())));
        }

        let body: VpicModelsResponse = response
            .json()
            .await
            .map_err(|e| DecodeError::Unavailable(format!("unparseable response: {}", e)))?;

        Ok(body
            .results
            .into_iter()
            .filter_map(|m| m.model_name)
            .collect())
    }
}

/// Validate VIN shape and normalize to uppercase.
///
/// A VIN is 17 characters, alphanumeric, and never contains I, O, or Q
/// (reserved to avoid confusion with 1 and 0).
fn normalize_vin(vin: &str) -> Result<String, DecodeError> {
    let vin = vin.trim().to_uppercase();

    if vin.len() != 17 {
        return Err(DecodeError::InvalidVin(format!(
            "must be 17 characters, got {}",
            vin.len()
        )));
    }

    if let Some(bad) = vin
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() || matches!(c, 'I' | 'O' | 'Q'))
    {
        return Err(DecodeError::InvalidVin(format!(
            "character '{}' is not allowed",
            bad
        )));
    }

    Ok(vin)
}

/// Map vPIC variable rows into a specification.
///
/// Make, model, and a parseable model year are required; their absence
/// means the response was unusable.
fn parse_decode_results(
    vin: &str,
    results: &[VpicVariable],
) -> Result<VehicleSpecification, DecodeError> {
    let mut values: HashMap<&str, &str> = HashMap::new();
    for row in results {
        if let (Some(variable), Some(value)) = (row.variable.as_deref(), row.value.as_deref()) {
            if !value.is_empty() {
                values.insert(variable, value);
            }
        }
    }

    let make = values
        .get("Make")
        .ok_or_else(|| DecodeError::Unavailable("response missing Make".to_string()))?;
    let model = values
        .get("Model")
        .ok_or_else(|| DecodeError::Unavailable("response missing Model".to_string()))?;
    let year = values
        .get("Model Year")
        .and_then(|y| y.parse::<i64>().ok())
        .ok_or_else(|| DecodeError::Unavailable("response missing Model Year".to_string()))?;

    Ok(VehicleSpecification {
        vin: vin.to_string(),
        make: make.to_string(),
        model: model.to_string(),
        year,
        trim: values.get("Trim").map(|s| s.to_string()),
        body_type: values.get("Body Class").map(|s| s.to_string()),
        decoded_at: Utc::now(),
    })
}
