// Application layer - serializes access to the ledger engine and persists
// every committed change before reporting it.

pub mod error;
pub mod service;

pub use error::*;
pub use service::*;
