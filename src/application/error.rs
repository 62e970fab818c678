use thiserror::Error;

use crate::domain::LedgerError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// The engine rejection behind this error, if that is what it is.
    pub fn as_ledger(&self) -> Option<&LedgerError> {
        match self {
            AppError::Ledger(err) => Some(err),
            _ => None,
        }
    }
}
