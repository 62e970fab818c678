use anyhow::Result;
use std::io::Read;

use crate::application::{AppError, LedgerService};
use crate::io::export::{LedgerSnapshot, SNAPSHOT_VERSION};

/// What an import did (or would do, on a dry run)
#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub registrations: usize,
    pub pending_rides: usize,
    pub total_tank_liters: f64,
    pub total_debt_liters: f64,
    /// Fixes applied while normalizing the snapshot
    pub corrections: Vec<String>,
    pub applied: bool,
}

/// Importer for loading a snapshot into the ledger
pub struct Importer<'a> {
    service: &'a LedgerService,
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Replace the ledger with a JSON snapshot. With `dry_run` the snapshot is
    /// only validated and summarized.
    pub async fn import_state_json<R: Read>(
        &self,
        reader: R,
        dry_run: bool,
    ) -> Result<ImportSummary> {
        let snapshot: LedgerSnapshot = serde_json::from_reader(reader)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(AppError::InvalidSnapshot(format!(
                "unsupported snapshot version {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            ))
            .into());
        }

        let config = self.service.config().await;
        let (state, corrections) = snapshot.state.clone().into_state(&config);

        if !dry_run {
            self.service.restore(snapshot.state).await?;
        }

        Ok(ImportSummary {
            registrations: state.identity_to_bucket.len(),
            pending_rides: state.pending_ride_start.len(),
            total_tank_liters: state.total_tank(),
            total_debt_liters: state.total_debt(),
            corrections,
            applied: !dry_run,
        })
    }
}
