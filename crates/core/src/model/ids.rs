use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of a training module in the fixed linear sequence `1..=N`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(u32);

impl ModuleId {
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }

    /// The module that follows this one in the sequence.
    #[must_use]
    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Returns true when the id falls inside `1..=module_count`.
    #[must_use]
    pub fn is_known(&self, module_count: u32) -> bool {
        (1..=module_count).contains(&self.0)
    }
}

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleId({})", self.0)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for parsing an id from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    raw: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse ModuleId from {:?}", self.raw)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for ModuleId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .map(ModuleId::new)
            .map_err(|_| ParseIdError { raw: s.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_id_parses_trimmed_numbers() {
        let id: ModuleId = " 3 ".parse().unwrap();
        assert_eq!(id, ModuleId::new(3));
        assert_eq!(id.to_string(), "3");
    }

    #[test]
    fn module_id_rejects_codes() {
        assert!("rm-001".parse::<ModuleId>().is_err());
    }

    #[test]
    fn known_range_is_one_based() {
        assert!(!ModuleId::new(0).is_known(5));
        assert!(ModuleId::new(1).is_known(5));
        assert!(ModuleId::new(5).is_known(5));
        assert!(!ModuleId::new(6).is_known(5));
        assert_eq!(ModuleId::new(5).next(), ModuleId::new(6));
    }
}
