use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::LedgerConfig;
use crate::domain::{LedgerState, Liters};

/// Persisted form of [`LedgerState`].
///
/// Every field is optional so records written by older versions still load;
/// missing fields fall back to an empty map, the configured default mileage or
/// a zero price. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_to_bucket: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tank: Option<BTreeMap<String, Liters>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt: Option<BTreeMap<String, Liters>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_ride_start: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mileage_km_per_liter: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_price_per_liter: Option<f64>,
}

impl StateRecord {
    pub fn from_state(state: &LedgerState) -> Self {
        Self {
            identity_to_bucket: Some(state.identity_to_bucket.clone()),
            tank: Some(state.tank.clone()),
            debt: Some(state.debt.clone()),
            pending_ride_start: Some(state.pending_ride_start.clone()),
            mileage_km_per_liter: Some(state.mileage_km_per_liter),
            last_price_per_liter: Some(state.last_price_per_liter),
        }
    }

    /// Build a normalized state, returning it with the list of corrections applied.
    pub fn into_state(self, config: &LedgerConfig) -> (LedgerState, Vec<String>) {
        let mut state = LedgerState {
            identity_to_bucket: self.identity_to_bucket.unwrap_or_default(),
            tank: self.tank.unwrap_or_default(),
            debt: self.debt.unwrap_or_default(),
            pending_ride_start: self.pending_ride_start.unwrap_or_default(),
            mileage_km_per_liter: self
                .mileage_km_per_liter
                .unwrap_or(config.default_mileage),
            last_price_per_liter: self.last_price_per_liter.unwrap_or(0.0),
        };
        let corrections = state.normalize(&config.buckets, config.default_mileage);
        (state, corrections)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
