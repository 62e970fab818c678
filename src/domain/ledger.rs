use thiserror::Error;

use super::{BucketPair, LITER_EPSILON, LedgerState, Liters, PayRequest, is_effectively_zero};

/// Why the engine rejected an operation. A rejection never changes state.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Invalid bucket '{name}'. Use one of: {allowed}")]
    InvalidBucket { name: String, allowed: String },

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Identity '{0}' is not registered")]
    NotRegistered(String),

    #[error("No ride started")]
    NoRideStarted,

    #[error("End odometer reading ({end} km) can't be less than the start ({start} km)")]
    NegativeDistance { start: f64, end: f64 },

    #[error("Mileage is not set to a positive number")]
    NoMileage,

    #[error(
        "Not enough fuel: ride needs {used:.2} L, but only {available:.2} L is available in total"
    )]
    InsufficientFuel { used: Liters, available: Liters },

    #[error("No fuel price set yet")]
    NoPriceSet,

    #[error("No debt to clear")]
    NoDebt,
}

/// Reject a computed balance that left the range of finite numbers.
fn finite(label: &str, value: Liters) -> Result<Liters, LedgerError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(LedgerError::InvalidValue(format!(
            "{} would overflow, got {}",
            label, value
        )))
    }
}

/// Outcome of a completed ride.
#[derive(Debug, Clone, PartialEq)]
pub struct RideResult {
    pub distance_km: f64,
    pub used_liters: Liters,
    /// Liters drawn from the other bucket's tank and added to the rider's debt.
    pub borrowed_liters: Liters,
    pub other_bucket: String,
}

/// Outcome of a fill-up.
#[derive(Debug, Clone, PartialEq)]
pub struct FillResult {
    /// Liters that went to clearing the filler's debt (credited to the other tank).
    pub cleared_liters: Liters,
    /// Liters credited to the filler's own tank.
    pub remaining_liters: Liters,
    pub new_price: f64,
    pub other_bucket: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SettleResult {
    pub liters_owed: Liters,
    pub cash_value: f64,
    pub price_per_liter: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PayResult {
    pub cleared_liters: Liters,
    pub remaining_debt: Liters,
    /// Cash handed over, `None` for a full payoff.
    pub amount_paid: Option<f64>,
    pub other_bucket: String,
}

/// Who owes whom, from the point of view of the bucket asking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebtDirection {
    CallerOwes,
    OtherOwes,
    Settled,
}

/// Read-only projection of the ledger for one bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusView {
    pub bucket: String,
    pub other_bucket: String,
    /// Every tank, in configured bucket order.
    pub tanks: Vec<(String, Liters)>,
    /// `debt[bucket] - debt[other]`: positive when the caller owes.
    pub net_debt_liters: Liters,
    pub mileage_km_per_liter: f64,
    pub last_price_per_liter: f64,
}

impl StatusView {
    pub fn direction(&self) -> DebtDirection {
        if is_effectively_zero(self.net_debt_liters) {
            DebtDirection::Settled
        } else if self.net_debt_liters > 0.0 {
            DebtDirection::CallerOwes
        } else {
            DebtDirection::OtherOwes
        }
    }

    /// Absolute net debt converted at the last known price.
    pub fn net_debt_cash(&self) -> f64 {
        self.net_debt_liters.abs() * self.last_price_per_liter
    }
}

/// The shared fuel ledger: owns the balance state and applies operations to it.
///
/// Every mutating method either commits its whole change or returns an error
/// with the state untouched.
#[derive(Debug, Clone)]
pub struct LedgerEngine {
    buckets: BucketPair,
    default_mileage: f64,
    state: LedgerState,
}

impl LedgerEngine {
    /// Engine over a fresh zero state.
    pub fn new(buckets: BucketPair, default_mileage: f64) -> Self {
        let state = LedgerState::fresh(&buckets, default_mileage);
        Self {
            buckets,
            default_mileage,
            state,
        }
    }

    /// Engine over a previously persisted state. The state is expected to be normalized.
    pub fn with_state(buckets: BucketPair, default_mileage: f64, state: LedgerState) -> Self {
        Self {
            buckets,
            default_mileage,
            state,
        }
    }

    pub fn buckets(&self) -> &BucketPair {
        &self.buckets
    }

    pub fn default_mileage(&self) -> f64 {
        self.default_mileage
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    /// Replace the whole state, e.g. when restoring a snapshot.
    pub fn replace_state(&mut self, state: LedgerState) {
        self.state = state;
    }

    /// Bucket registered for `identity`.
    pub fn bucket_of(&self, identity: &str) -> Result<&str, LedgerError> {
        self.state
            .identity_to_bucket
            .get(identity)
            .map(String::as_str)
            .ok_or_else(|| LedgerError::NotRegistered(identity.to_string()))
    }

    /// `(bucket, other)` for a configured bucket name.
    fn pair_for(&self, bucket: &str) -> Result<(String, String), LedgerError> {
        match self.buckets.other(bucket) {
            Some(other) => Ok((bucket.to_string(), other.to_string())),
            None => Err(LedgerError::InvalidBucket {
                name: bucket.to_string(),
                allowed: self.buckets.joined(),
            }),
        }
    }

    // ========================
    // Registration & settings
    // ========================

    /// Bind `identity` to a bucket. Re-registering silently rebinds.
    /// Returns the canonical bucket name.
    pub fn register(&mut self, identity: &str, bucket: &str) -> Result<String, LedgerError> {
        if identity.trim().is_empty() {
            return Err(LedgerError::InvalidValue(
                "identity must not be empty".to_string(),
            ));
        }
        let canonical = self
            .buckets
            .resolve(bucket)
            .ok_or_else(|| LedgerError::InvalidBucket {
                name: bucket.trim().to_string(),
                allowed: self.buckets.joined(),
            })?
            .to_string();

        self.state
            .identity_to_bucket
            .insert(identity.to_string(), canonical.clone());
        Ok(canonical)
    }

    /// Set the vehicle-wide mileage. Any registered bucket may change it.
    pub fn set_mileage(&mut self, bucket: &str, km_per_liter: f64) -> Result<(), LedgerError> {
        self.pair_for(bucket)?;
        if !km_per_liter.is_finite() || km_per_liter <= 0.0 {
            return Err(LedgerError::InvalidValue(format!(
                "mileage must be positive, got {}",
                km_per_liter
            )));
        }
        self.state.mileage_km_per_liter = km_per_liter;
        Ok(())
    }

    // ========================
    // Rides
    // ========================

    /// Remember where a ride started. Overwrites any earlier pending start.
    pub fn start_ride(&mut self, identity: &str, odometer_km: f64) -> Result<(), LedgerError> {
        if !odometer_km.is_finite() {
            return Err(LedgerError::InvalidValue(format!(
                "odometer reading must be a number, got {}",
                odometer_km
            )));
        }
        self.state
            .pending_ride_start
            .insert(identity.to_string(), odometer_km);
        Ok(())
    }

    /// Finish the pending ride of `identity` and charge the fuel it used.
    ///
    /// The rider's own tank is drained first; any shortfall is taken from the
    /// other tank and recorded as debt. On rejection the pending start stays in
    /// place so the ride can be ended again with a corrected reading.
    pub fn end_ride(&mut self, identity: &str, odometer_km: f64) -> Result<RideResult, LedgerError> {
        let (me, other) = self.pair_for(self.bucket_of(identity)?)?;

        if !odometer_km.is_finite() {
            return Err(LedgerError::InvalidValue(format!(
                "odometer reading must be a number, got {}",
                odometer_km
            )));
        }

        let start = self
            .state
            .pending_ride_start
            .get(identity)
            .copied()
            .ok_or(LedgerError::NoRideStarted)?;

        let distance = odometer_km - start;
        if distance < 0.0 {
            return Err(LedgerError::NegativeDistance {
                start,
                end: odometer_km,
            });
        }

        let mileage = self.state.mileage_km_per_liter;
        if mileage <= 0.0 {
            return Err(LedgerError::NoMileage);
        }

        let used = distance / mileage;
        let mine = self.state.tank_of(&me);
        let theirs = self.state.tank_of(&other);
        let available = mine + theirs;
        if used > available + LITER_EPSILON {
            return Err(LedgerError::InsufficientFuel { used, available });
        }

        let borrowed = if mine >= used {
            self.state.tank.insert(me.clone(), mine - used);
            0.0
        } else {
            // Within tolerance the other tank can be a hair short; never take more than it holds.
            let borrowed = (used - mine).min(theirs);
            let debt = finite("debt", self.state.debt_of(&me) + borrowed)?;
            self.state.tank.insert(me.clone(), 0.0);
            self.state.tank.insert(other.clone(), theirs - borrowed);
            self.state.debt.insert(me.clone(), debt);
            borrowed
        };

        self.state.pending_ride_start.remove(identity);

        Ok(RideResult {
            distance_km: distance,
            used_liters: used,
            borrowed_liters: borrowed,
            other_bucket: other,
        })
    }

    // ========================
    // Fuel & money
    // ========================

    /// Record a fill-up paid by `bucket`. The fill first repays the filler's
    /// debt (those liters land in the other tank), the rest goes to the filler.
    /// The price of this fill becomes the last known price.
    pub fn fill(
        &mut self,
        bucket: &str,
        liters: Liters,
        total_cost: f64,
    ) -> Result<FillResult, LedgerError> {
        let (me, other) = self.pair_for(bucket)?;
        if !liters.is_finite() || liters <= 0.0 {
            return Err(LedgerError::InvalidValue(format!(
                "liters must be positive, got {}",
                liters
            )));
        }
        if !total_cost.is_finite() || total_cost <= 0.0 {
            return Err(LedgerError::InvalidValue(format!(
                "total cost must be positive, got {}",
                total_cost
            )));
        }

        let price = total_cost / liters;
        if !price.is_finite() || price <= 0.0 {
            return Err(LedgerError::InvalidValue(format!(
                "price per liter out of range: {} / {} L",
                total_cost, liters
            )));
        }

        let debt = self.state.debt_of(&me);
        let cleared = liters.min(debt);
        let remaining = liters - cleared;
        let theirs = finite("tank", self.state.tank_of(&other) + cleared)?;
        let mine = finite("tank", self.state.tank_of(&me) + remaining)?;

        self.state.last_price_per_liter = price;
        if cleared > 0.0 {
            self.state.debt.insert(me.clone(), debt - cleared);
            self.state.tank.insert(other.clone(), theirs);
        }
        self.state.tank.insert(me, mine);

        Ok(FillResult {
            cleared_liters: cleared,
            remaining_liters: remaining,
            new_price: price,
            other_bucket: other,
        })
    }

    /// Cash value of what `bucket` owes, at the last known price.
    pub fn settle(&self, bucket: &str) -> Result<SettleResult, LedgerError> {
        self.pair_for(bucket)?;
        let price = self.state.last_price_per_liter;
        if price <= 0.0 {
            return Err(LedgerError::NoPriceSet);
        }
        let owed = self.state.debt_of(bucket);
        Ok(SettleResult {
            liters_owed: owed,
            cash_value: owed * price,
            price_per_liter: price,
        })
    }

    /// Pay down the debt of `bucket`. Cleared liters are returned to the
    /// other tank. A cash amount worth more than the debt only clears the debt.
    pub fn pay(&mut self, bucket: &str, request: PayRequest) -> Result<PayResult, LedgerError> {
        let (me, other) = self.pair_for(bucket)?;
        let debt = self.state.debt_of(&me);

        let (cleared, amount_paid) = match request {
            PayRequest::Full => {
                if debt <= LITER_EPSILON {
                    return Err(LedgerError::NoDebt);
                }
                (debt, None)
            }
            PayRequest::Cash(amount) => {
                if !amount.is_finite() || amount <= 0.0 {
                    return Err(LedgerError::InvalidValue(format!(
                        "amount must be positive, got {}",
                        amount
                    )));
                }
                let price = self.state.last_price_per_liter;
                if price <= 0.0 {
                    return Err(LedgerError::NoPriceSet);
                }
                if debt <= LITER_EPSILON {
                    return Err(LedgerError::NoDebt);
                }
                (debt.min(amount / price), Some(amount))
            }
        };

        let remaining = if cleared >= debt { 0.0 } else { debt - cleared };
        let theirs = finite("tank", self.state.tank_of(&other) + cleared)?;
        self.state.debt.insert(me, remaining);
        self.state.tank.insert(other.clone(), theirs);

        Ok(PayResult {
            cleared_liters: cleared,
            remaining_debt: remaining,
            amount_paid,
            other_bucket: other,
        })
    }

    // ========================
    // Queries & lifecycle
    // ========================

    pub fn status(&self, bucket: &str) -> Result<StatusView, LedgerError> {
        let (me, other) = self.pair_for(bucket)?;
        let tanks = self
            .buckets
            .names()
            .iter()
            .map(|name| (name.to_string(), self.state.tank_of(name)))
            .collect();

        Ok(StatusView {
            net_debt_liters: self.state.debt_of(&me) - self.state.debt_of(&other),
            bucket: me,
            other_bucket: other,
            tanks,
            mileage_km_per_liter: self.state.mileage_km_per_liter,
            last_price_per_liter: self.state.last_price_per_liter,
        })
    }

    /// Wipe everything, registrations included.
    pub fn reset(&mut self) {
        self.state = LedgerState::fresh(&self.buckets, self.default_mileage);
    }
}
