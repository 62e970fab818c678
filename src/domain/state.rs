use std::collections::BTreeMap;

use super::{BucketPair, Liters};

/// The whole mutable balance state of the ledger.
///
/// `tank` and `debt` are keyed by bucket name; both configured buckets always
/// have an entry. `debt[b]` is what `b` owes the other bucket, in liters.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerState {
    /// External identity -> bucket name. Only grows between resets.
    pub identity_to_bucket: BTreeMap<String, String>,
    pub tank: BTreeMap<String, Liters>,
    pub debt: BTreeMap<String, Liters>,
    /// Identity -> odometer reading (km) of a ride in progress.
    pub pending_ride_start: BTreeMap<String, f64>,
    pub mileage_km_per_liter: f64,
    pub last_price_per_liter: f64,
}

impl LedgerState {
    /// Zero state: empty tanks and debts, no registrations, default mileage, no price.
    pub fn fresh(buckets: &BucketPair, default_mileage: f64) -> Self {
        let zeroes: BTreeMap<String, Liters> = buckets
            .names()
            .iter()
            .map(|name| (name.to_string(), 0.0))
            .collect();

        Self {
            identity_to_bucket: BTreeMap::new(),
            tank: zeroes.clone(),
            debt: zeroes,
            pending_ride_start: BTreeMap::new(),
            mileage_km_per_liter: default_mileage,
            last_price_per_liter: 0.0,
        }
    }

    pub fn tank_of(&self, bucket: &str) -> Liters {
        self.tank.get(bucket).copied().unwrap_or(0.0)
    }

    pub fn debt_of(&self, bucket: &str) -> Liters {
        self.debt.get(bucket).copied().unwrap_or(0.0)
    }

    /// Liters held across all tanks.
    pub fn total_tank(&self) -> Liters {
        self.tank.values().sum()
    }

    /// Liters owed across all buckets.
    pub fn total_debt(&self) -> Liters {
        self.debt.values().sum()
    }

    /// Bring a state loaded from storage back within its invariants.
    ///
    /// Returns a description of every correction made, empty if the state
    /// was already consistent.
    pub fn normalize(&mut self, buckets: &BucketPair, default_mileage: f64) -> Vec<String> {
        let mut corrections = Vec::new();

        for name in buckets.names() {
            for (label, map) in [("tank", &mut self.tank), ("debt", &mut self.debt)] {
                match map.get(name).copied() {
                    None => {
                        map.insert(name.to_string(), 0.0);
                        corrections.push(format!("{} for {} missing, set to 0", label, name));
                    }
                    Some(value) if !value.is_finite() || value < 0.0 => {
                        map.insert(name.to_string(), 0.0);
                        corrections.push(format!("{} for {} was {}, set to 0", label, name, value));
                    }
                    Some(_) => {}
                }
            }
        }

        for (label, map) in [("tank", &mut self.tank), ("debt", &mut self.debt)] {
            let stale: Vec<String> = map
                .keys()
                .filter(|name| !buckets.contains(name))
                .cloned()
                .collect();
            for name in stale {
                map.remove(&name);
                corrections.push(format!("dropped {} of unknown bucket {}", label, name));
            }
        }

        let before = self.identity_to_bucket.len();
        self.identity_to_bucket
            .retain(|_, bucket| buckets.contains(bucket));
        let dropped = before - self.identity_to_bucket.len();
        if dropped > 0 {
            corrections.push(format!(
                "dropped {} registration(s) to unknown buckets",
                dropped
            ));
        }

        let before = self.pending_ride_start.len();
        self.pending_ride_start.retain(|_, km| km.is_finite());
        if self.pending_ride_start.len() < before {
            corrections.push("dropped pending rides with invalid odometer readings".to_string());
        }

        if !self.mileage_km_per_liter.is_finite() || self.mileage_km_per_liter <= 0.0 {
            corrections.push(format!(
                "mileage was {}, set to default {}",
                self.mileage_km_per_liter, default_mileage
            ));
            self.mileage_km_per_liter = default_mileage;
        }

        if !self.last_price_per_liter.is_finite() || self.last_price_per_liter < 0.0 {
            corrections.push(format!(
                "last price was {}, set to 0",
                self.last_price_per_liter
            ));
            self.last_price_per_liter = 0.0;
        }

        corrections
    }
}
