use thiserror::Error;

use crate::domain::BucketPair;

/// Names used when none are configured.
pub const DEFAULT_BUCKETS: [&str; 2] = ["Aditya", "Archit"];

/// Mileage (km per liter) of a fresh ledger.
pub const DEFAULT_MILEAGE: f64 = 40.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Exactly two bucket names are required, got {0}")]
    BucketCount(usize),

    #[error("Bucket names must not be empty")]
    EmptyBucketName,

    #[error("Bucket names must differ, got '{0}' twice")]
    DuplicateBucket(String),

    #[error("Default mileage must be a positive number, got {0}")]
    InvalidMileage(f64),
}

/// Validated configuration of a ledger: which two buckets exist and the
/// mileage a fresh ledger starts with.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerConfig {
    pub buckets: BucketPair,
    pub default_mileage: f64,
}

impl LedgerConfig {
    pub fn new<S: AsRef<str>>(names: &[S], default_mileage: f64) -> Result<Self, ConfigError> {
        if names.len() != 2 {
            return Err(ConfigError::BucketCount(names.len()));
        }
        let first = names[0].as_ref().trim();
        let second = names[1].as_ref().trim();
        if first.is_empty() || second.is_empty() {
            return Err(ConfigError::EmptyBucketName);
        }
        if first.to_lowercase() == second.to_lowercase() {
            return Err(ConfigError::DuplicateBucket(first.to_string()));
        }
        if !default_mileage.is_finite() || default_mileage <= 0.0 {
            return Err(ConfigError::InvalidMileage(default_mileage));
        }

        Ok(Self {
            buckets: BucketPair::new(first, second),
            default_mileage,
        })
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            buckets: BucketPair::new(DEFAULT_BUCKETS[0], DEFAULT_BUCKETS[1]),
            default_mileage: DEFAULT_MILEAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.buckets.names(), ["Aditya", "Archit"]);
        assert_eq!(config.default_mileage, 40.0);
    }

    #[test]
    fn test_valid_config_trims_names() {
        let config = LedgerConfig::new(&[" Left ", "Right"], 30.0).unwrap();
        assert_eq!(config.buckets.names(), ["Left", "Right"]);
    }

    #[test]
    fn test_bucket_count() {
        assert_eq!(
            LedgerConfig::new(&["Solo"], 40.0),
            Err(ConfigError::BucketCount(1))
        );
        assert_eq!(
            LedgerConfig::new(&["A", "B", "C"], 40.0),
            Err(ConfigError::BucketCount(3))
        );
    }

    #[test]
    fn test_invalid_names() {
        assert_eq!(
            LedgerConfig::new(&["A", " "], 40.0),
            Err(ConfigError::EmptyBucketName)
        );
        assert_eq!(
            LedgerConfig::new(&["Sam", "sam"], 40.0),
            Err(ConfigError::DuplicateBucket("Sam".to_string()))
        );
    }

    #[test]
    fn test_invalid_mileage() {
        assert_eq!(
            LedgerConfig::new(&["A", "B"], 0.0),
            Err(ConfigError::InvalidMileage(0.0))
        );
        assert!(LedgerConfig::new(&["A", "B"], f64::INFINITY).is_err());
    }
}
