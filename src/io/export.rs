use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::storage::StateRecord;

/// Layout version of [`LedgerSnapshot`]. Bumped only on incompatible changes.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Full ledger snapshot for export/import
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub state: StateRecord,
}

/// One line of the balances table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRow {
    pub bucket: String,
    pub tank_liters: f64,
    pub debt_liters: f64,
}

/// Exporter for converting ledger data to various formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Tank and debt of each bucket, in configured order.
    pub async fn balances(&self) -> Vec<BalanceRow> {
        let buckets = self.service.buckets().await;
        let record = self.service.snapshot().await;
        let tank = record.tank.unwrap_or_default();
        let debt = record.debt.unwrap_or_default();

        buckets
            .names()
            .iter()
            .map(|name| BalanceRow {
                bucket: name.to_string(),
                tank_liters: tank.get(*name).copied().unwrap_or(0.0),
                debt_liters: debt.get(*name).copied().unwrap_or(0.0),
            })
            .collect()
    }

    /// Export balances to CSV format
    pub async fn export_balances_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let rows = self.balances().await;
        let mut csv_writer = csv::Writer::from_writer(writer);

        for row in &rows {
            csv_writer.serialize(row)?;
        }

        csv_writer.flush()?;
        Ok(rows.len())
    }

    /// Export balances as a JSON array
    pub async fn export_balances_json<W: Write>(&self, mut writer: W) -> Result<usize> {
        let rows = self.balances().await;
        let json = serde_json::to_string_pretty(&rows)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;
        Ok(rows.len())
    }

    /// Export the whole ledger as JSON snapshot
    pub async fn export_state_json<W: Write>(&self, mut writer: W) -> Result<LedgerSnapshot> {
        let snapshot = LedgerSnapshot {
            version: SNAPSHOT_VERSION,
            exported_at: Utc::now(),
            state: self.service.snapshot().await,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
