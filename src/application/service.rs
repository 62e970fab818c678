use tokio::sync::Mutex;

use crate::config::LedgerConfig;
use crate::domain::{
    BucketPair, FillResult, LedgerEngine, LedgerError, PayRequest, PayResult, RideResult,
    SettleResult, StatusView,
};
use crate::storage::{Repository, StateRecord};

use super::AppError;

/// Application service providing the ledger operations to any client.
///
/// One engine lives behind one exclusive lock. A mutation runs on a copy of the
/// engine, is persisted, and only then replaces the live engine, so a failed
/// operation or a failed write leaves nothing behind.
pub struct LedgerService {
    repo: Repository,
    engine: Mutex<LedgerEngine>,
}

impl LedgerService {
    /// Initialize a new database at the given path, or open it if it exists.
    pub async fn init(database_path: &str, config: LedgerConfig) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        let service = Self::open(repo, config).await?;

        // Seed the record so later `connect` calls find a complete ledger
        let snapshot = StateRecord::from_state(service.engine.lock().await.state());
        service.repo.save_state(&snapshot).await?;
        Ok(service)
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str, config: LedgerConfig) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Self::open(repo, config).await
    }

    async fn open(repo: Repository, config: LedgerConfig) -> Result<Self, AppError> {
        let engine = match repo.load_state().await? {
            Some(stored) => {
                let (state, corrections) = stored.record.into_state(&config);
                for correction in &corrections {
                    tracing::warn!(%correction, "normalized stored ledger state");
                }
                LedgerEngine::with_state(config.buckets, config.default_mileage, state)
            }
            None => {
                tracing::info!("no stored ledger state, starting fresh");
                LedgerEngine::new(config.buckets, config.default_mileage)
            }
        };

        Ok(Self {
            repo,
            engine: Mutex::new(engine),
        })
    }

    /// Apply `op` to a working copy, persist it, then commit it.
    async fn mutate<T, F>(&self, operation: &'static str, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut LedgerEngine) -> Result<T, LedgerError>,
    {
        let mut engine = self.engine.lock().await;
        let mut working = engine.clone();

        let output = op(&mut working).inspect_err(|err| {
            tracing::debug!(operation, %err, "operation rejected");
        })?;

        self.repo
            .save_state(&StateRecord::from_state(working.state()))
            .await?;
        *engine = working;

        tracing::debug!(operation, "operation committed");
        Ok(output)
    }

    async fn read<T, F>(&self, op: F) -> Result<T, AppError>
    where
        F: FnOnce(&LedgerEngine) -> Result<T, LedgerError>,
    {
        let engine = self.engine.lock().await;
        Ok(op(&*engine)?)
    }

    /// The configured bucket pair.
    pub async fn buckets(&self) -> BucketPair {
        self.engine.lock().await.buckets().clone()
    }

    /// The configuration the ledger runs with.
    pub async fn config(&self) -> LedgerConfig {
        let engine = self.engine.lock().await;
        LedgerConfig {
            buckets: engine.buckets().clone(),
            default_mileage: engine.default_mileage(),
        }
    }

    /// Bucket registered for `identity`.
    pub async fn bucket_of(&self, identity: &str) -> Result<String, AppError> {
        self.read(|engine| engine.bucket_of(identity).map(str::to_string))
            .await
    }

    // ========================
    // Registration & settings
    // ========================

    /// Bind an identity to a bucket. Returns the canonical bucket name.
    pub async fn register(&self, identity: &str, bucket: &str) -> Result<String, AppError> {
        let bucket = self
            .mutate("register", |engine| engine.register(identity, bucket))
            .await?;
        tracing::info!(identity, %bucket, "registered");
        Ok(bucket)
    }

    pub async fn set_mileage(&self, identity: &str, km_per_liter: f64) -> Result<(), AppError> {
        self.mutate("set_mileage", |engine| {
            let bucket = engine.bucket_of(identity)?.to_string();
            engine.set_mileage(&bucket, km_per_liter)
        })
        .await?;
        tracing::info!(identity, km_per_liter, "mileage set");
        Ok(())
    }

    // ========================
    // Rides
    // ========================

    pub async fn start_ride(&self, identity: &str, odometer_km: f64) -> Result<(), AppError> {
        self.mutate("start_ride", |engine| {
            engine.bucket_of(identity)?;
            engine.start_ride(identity, odometer_km)
        })
        .await?;
        tracing::info!(identity, odometer_km, "ride started");
        Ok(())
    }

    pub async fn end_ride(&self, identity: &str, odometer_km: f64) -> Result<RideResult, AppError> {
        let ride = self
            .mutate("end_ride", |engine| engine.end_ride(identity, odometer_km))
            .await?;
        tracing::info!(
            identity,
            distance_km = ride.distance_km,
            used_liters = ride.used_liters,
            borrowed_liters = ride.borrowed_liters,
            "ride ended"
        );
        Ok(ride)
    }

    // ========================
    // Fuel & money
    // ========================

    pub async fn fill(
        &self,
        identity: &str,
        liters: f64,
        total_cost: f64,
    ) -> Result<FillResult, AppError> {
        let fill = self
            .mutate("fill", |engine| {
                let bucket = engine.bucket_of(identity)?.to_string();
                engine.fill(&bucket, liters, total_cost)
            })
            .await?;
        tracing::info!(
            identity,
            liters,
            cleared_liters = fill.cleared_liters,
            price = fill.new_price,
            "fill recorded"
        );
        Ok(fill)
    }

    pub async fn settle(&self, identity: &str) -> Result<SettleResult, AppError> {
        self.read(|engine| engine.settle(engine.bucket_of(identity)?))
            .await
    }

    pub async fn pay(&self, identity: &str, request: PayRequest) -> Result<PayResult, AppError> {
        let pay = self
            .mutate("pay", |engine| {
                let bucket = engine.bucket_of(identity)?.to_string();
                engine.pay(&bucket, request)
            })
            .await?;
        tracing::info!(
            identity,
            cleared_liters = pay.cleared_liters,
            remaining_debt = pay.remaining_debt,
            "payment recorded"
        );
        Ok(pay)
    }

    // ========================
    // Queries & lifecycle
    // ========================

    pub async fn status(&self, identity: &str) -> Result<StatusView, AppError> {
        self.read(|engine| engine.status(engine.bucket_of(identity)?))
            .await
    }

    /// Wipe the ledger, registrations included.
    pub async fn reset(&self) -> Result<(), AppError> {
        self.mutate("reset", |engine| {
            engine.reset();
            Ok(())
        })
        .await?;
        tracing::info!("ledger reset");
        Ok(())
    }

    /// Persistable copy of the current state.
    pub async fn snapshot(&self) -> StateRecord {
        StateRecord::from_state(self.engine.lock().await.state())
    }

    /// Replace the whole ledger with `record`, normalized against the current
    /// configuration. Returns the corrections normalization applied.
    pub async fn restore(&self, record: StateRecord) -> Result<Vec<String>, AppError> {
        let corrections = self
            .mutate("restore", |engine| {
                let config = LedgerConfig {
                    buckets: engine.buckets().clone(),
                    default_mileage: engine.default_mileage(),
                };
                let (state, corrections) = record.into_state(&config);
                engine.replace_state(state);
                Ok(corrections)
            })
            .await?;
        for correction in &corrections {
            tracing::warn!(%correction, "normalized restored ledger state");
        }
        tracing::info!("ledger restored from snapshot");
        Ok(corrections)
    }
}
