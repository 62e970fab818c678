use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};

use super::{MIGRATION_001_INITIAL, StateRecord};

/// A record as stored, with the time of its last write.
#[derive(Debug, Clone)]
pub struct StoredState {
    pub record: StateRecord,
    pub updated_at: DateTime<Utc>,
}

/// Repository persisting the ledger record.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Load the stored ledger record, if one was ever written.
    pub async fn load_state(&self) -> Result<Option<StoredState>> {
        let row = sqlx::query("SELECT payload, updated_at FROM ledger_state WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch ledger state")?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: String = row.get("payload");
        let updated_at: String = row.get("updated_at");
        let record = StateRecord::from_json(&payload).context("Invalid ledger state payload")?;
        let updated_at = DateTime::parse_from_rfc3339(&updated_at)
            .context("Invalid updated_at timestamp")?
            .with_timezone(&Utc);

        tracing::debug!(%updated_at, "loaded ledger state");
        Ok(Some(StoredState { record, updated_at }))
    }

    /// Write the ledger record, replacing the previous one.
    pub async fn save_state(&self, record: &StateRecord) -> Result<DateTime<Utc>> {
        let payload = record
            .to_json()
            .context("Failed to serialize ledger state")?;
        let updated_at = self.save_raw_payload(&payload).await?;
        tracing::debug!(bytes = payload.len(), "saved ledger state");
        Ok(updated_at)
    }

    /// Store a JSON payload as-is, e.g. a record in an older layout.
    pub async fn save_raw_payload(&self, payload: &str) -> Result<DateTime<Utc>> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO ledger_state (id, payload, updated_at)
            VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET payload = excluded.payload, updated_at = excluded.updated_at
            "#,
        )
        .bind(payload)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save ledger state")?;
        Ok(now)
    }
}
