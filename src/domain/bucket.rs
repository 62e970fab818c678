use serde::{Deserialize, Serialize};

/// The two parties sharing the vehicle. Names are configuration data; the
/// count is always exactly two, so "the other bucket" is always well defined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketPair {
    names: [String; 2],
}

impl BucketPair {
    /// Build a pair from two names. Callers validate the names first
    /// (see [`crate::config::LedgerConfig`]).
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            names: [first.into(), second.into()],
        }
    }

    /// Both names, in configured order.
    pub fn names(&self) -> [&str; 2] {
        [self.names[0].as_str(), self.names[1].as_str()]
    }

    pub fn first(&self) -> &str {
        &self.names[0]
    }

    pub fn second(&self) -> &str {
        &self.names[1]
    }

    /// True if `name` is exactly one of the configured names.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Resolve user input to the canonical configured spelling.
    /// Matching ignores surrounding whitespace and letter case.
    pub fn resolve(&self, input: &str) -> Option<&str> {
        let input = input.trim();
        self.names
            .iter()
            .find(|n| n.to_lowercase() == input.to_lowercase())
            .map(String::as_str)
    }

    /// The other bucket of the pair. `None` if `name` is not configured.
    pub fn other(&self, name: &str) -> Option<&str> {
        if name == self.names[0] {
            Some(&self.names[1])
        } else if name == self.names[1] {
            Some(&self.names[0])
        } else {
            None
        }
    }

    /// Human-readable list, e.g. "Aditya, Archit".
    pub fn joined(&self) -> String {
        self.names.join(", ")
    }
}

impl std::fmt::Display for BucketPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.joined())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> BucketPair {
        BucketPair::new("Aditya", "Archit")
    }

    #[test]
    fn test_other_bucket() {
        let buckets = pair();
        assert_eq!(buckets.other("Aditya"), Some("Archit"));
        assert_eq!(buckets.other("Archit"), Some("Aditya"));
        assert_eq!(buckets.other("Nobody"), None);
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        let buckets = pair();
        assert_eq!(buckets.resolve("aditya"), Some("Aditya"));
        assert_eq!(buckets.resolve("  ARCHIT "), Some("Archit"));
        assert_eq!(buckets.resolve("Adi"), None);
    }

    #[test]
    fn test_contains_is_exact() {
        let buckets = pair();
        assert!(buckets.contains("Aditya"));
        assert!(!buckets.contains("aditya"));
    }

    #[test]
    fn test_names_are_data() {
        let buckets = BucketPair::new("Left", "Right");
        assert_eq!(buckets.names(), ["Left", "Right"]);
        assert_eq!(buckets.other("Right"), Some("Left"));
        assert_eq!(buckets.joined(), "Left, Right");
    }
}
