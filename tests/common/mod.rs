// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use fuelsplit::application::LedgerService;
use fuelsplit::config::LedgerConfig;
use tempfile::TempDir;

/// Identity registered as Aditya by [`registered_service`]
pub const ADITYA_ID: &str = "tg-1001";
/// Identity registered as Archit by [`registered_service`]
pub const ARCHIT_ID: &str = "tg-2002";

/// Path of the test database inside `temp_dir`
pub fn db_path(temp_dir: &TempDir) -> String {
    temp_dir
        .path()
        .join("test.db")
        .to_str()
        .unwrap()
        .to_string()
}

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let service = LedgerService::init(&db_path(&temp_dir), LedgerConfig::default()).await?;
    Ok((service, temp_dir))
}

/// Test service with both default buckets registered
pub async fn registered_service() -> Result<(LedgerService, TempDir)> {
    let (service, temp_dir) = test_service().await?;
    service.register(ADITYA_ID, "Aditya").await?;
    service.register(ARCHIT_ID, "Archit").await?;
    Ok((service, temp_dir))
}

/// Reopen the database of `temp_dir` as a fresh service
pub async fn reopen(temp_dir: &TempDir) -> Result<LedgerService> {
    Ok(LedgerService::connect(&db_path(temp_dir), LedgerConfig::default()).await?)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}
