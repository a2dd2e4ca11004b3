use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Validation failures for the risk calculator. Messages are user-facing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssessmentError {
    #[error("Please fill in all fields before calculating risk ({field} is empty).")]
    EmptyField { field: &'static str },

    #[error("Likelihood must be between 1 and 5, got {0}.")]
    LikelihoodOutOfRange(u8),

    #[error("Impact must be between 1 and 5, got {0}.")]
    ImpactOutOfRange(u8),
}

//
// ─── RATINGS ──────────────────────────────────────────────────────────────────
//

/// How probable a threat is, on a 1..=5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Likelihood(u8);

/// How damaging a threat would be, on a 1..=5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Impact(u8);

impl Likelihood {
    /// # Errors
    ///
    /// Returns `AssessmentError::LikelihoodOutOfRange` outside 1..=5.
    pub fn new(value: u8) -> Result<Self, AssessmentError> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(AssessmentError::LikelihoodOutOfRange(value))
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Rare",
            2 => "Unlikely",
            3 => "Possible",
            4 => "Likely",
            _ => "Almost Certain",
        }
    }
}

impl Impact {
    /// # Errors
    ///
    /// Returns `AssessmentError::ImpactOutOfRange` outside 1..=5.
    pub fn new(value: u8) -> Result<Self, AssessmentError> {
        if (1..=5).contains(&value) {
            Ok(Self(value))
        } else {
            Err(AssessmentError::ImpactOutOfRange(value))
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Very Low",
            2 => "Low",
            3 => "Moderate",
            4 => "High",
            _ => "Very High",
        }
    }
}

//
// ─── LEVELS ───────────────────────────────────────────────────────────────────
//

/// Risk band derived from `likelihood * impact`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// `<= 8` is low, `9..=15` medium, anything above high.
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=8 => Self::Low,
            9..=15 => Self::Medium,
            _ => Self::High,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }

    #[must_use]
    pub fn recommendation(self) -> &'static Recommendation {
        match self {
            Self::Low => &LOW_RECOMMENDATION,
            Self::Medium => &MEDIUM_RECOMMENDATION,
            Self::High => &HIGH_RECOMMENDATION,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static guidance attached to a risk level.
#[derive(Debug, PartialEq, Eq)]
pub struct Recommendation {
    pub headline: &'static str,
    pub actions: &'static [&'static str],
}

static LOW_RECOMMENDATION: Recommendation = Recommendation {
    headline: "Recommended Actions:",
    actions: &[
        "Continue monitoring the risk",
        "Implement standard security controls",
        "Review periodically (quarterly)",
        "Document in risk register",
    ],
};

static MEDIUM_RECOMMENDATION: Recommendation = Recommendation {
    headline: "Recommended Actions:",
    actions: &[
        "Develop mitigation plan within 30 days",
        "Implement additional security controls",
        "Increase monitoring frequency",
        "Assign risk owner for oversight",
        "Review monthly and after significant changes",
    ],
};

static HIGH_RECOMMENDATION: Recommendation = Recommendation {
    headline: "Recommended Actions (URGENT):",
    actions: &[
        "Immediate attention required",
        "Develop and implement mitigation plan within 7 days",
        "Consider risk transfer (insurance)",
        "Implement compensating controls immediately",
        "Escalate to senior management",
        "Continuous monitoring required",
        "Weekly reviews until risk is reduced",
    ],
};

//
// ─── ASSESSMENT ───────────────────────────────────────────────────────────────
//

/// A single risk calculator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskAssessmentEntry {
    assessed_at: DateTime<Utc>,
    asset: String,
    threat: String,
    likelihood: Likelihood,
    impact: Impact,
}

impl RiskAssessmentEntry {
    /// Validate calculator input and build an entry.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::EmptyField` for a blank asset or threat, or a
    /// range error for ratings outside 1..=5.
    pub fn assess(
        asset: &str,
        threat: &str,
        likelihood: u8,
        impact: u8,
        assessed_at: DateTime<Utc>,
    ) -> Result<Self, AssessmentError> {
        let asset = asset.trim();
        if asset.is_empty() {
            return Err(AssessmentError::EmptyField { field: "asset" });
        }
        let threat = threat.trim();
        if threat.is_empty() {
            return Err(AssessmentError::EmptyField { field: "threat" });
        }
        Ok(Self {
            assessed_at,
            asset: asset.to_string(),
            threat: threat.to_string(),
            likelihood: Likelihood::new(likelihood)?,
            impact: Impact::new(impact)?,
        })
    }

    #[must_use]
    pub fn assessed_at(&self) -> DateTime<Utc> {
        self.assessed_at
    }

    #[must_use]
    pub fn asset(&self) -> &str {
        &self.asset
    }

    #[must_use]
    pub fn threat(&self) -> &str {
        &self.threat
    }

    #[must_use]
    pub fn likelihood(&self) -> Likelihood {
        self.likelihood
    }

    #[must_use]
    pub fn impact(&self) -> Impact {
        self.impact
    }

    /// `likelihood * impact`, always in 1..=25.
    #[must_use]
    pub fn score(&self) -> u8 {
        self.likelihood.0 * self.impact.0
    }

    #[must_use]
    pub fn level(&self) -> RiskLevel {
        RiskLevel::from_score(self.score())
    }
}

//
// ─── HISTORY ──────────────────────────────────────────────────────────────────
//

/// Most-recent-first list of assessments with a fixed capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskHistory {
    entries: VecDeque<RiskAssessmentEntry>,
    capacity: usize,
}

impl RiskHistory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Rebuild from persisted entries (already most-recent-first).
    /// Anything past the capacity is discarded.
    #[must_use]
    pub fn from_persisted(entries: Vec<RiskAssessmentEntry>, capacity: usize) -> Self {
        let mut history = Self::new(capacity);
        history.entries.extend(entries.into_iter().take(history.capacity));
        history
    }

    /// Insert at the front, evicting the oldest entry when full.
    /// Returns the evicted entry, if any.
    pub fn push(&mut self, entry: RiskAssessmentEntry) -> Option<RiskAssessmentEntry> {
        self.entries.push_front(entry);
        if self.entries.len() > self.capacity {
            self.entries.pop_back()
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &RiskAssessmentEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&RiskAssessmentEntry> {
        self.entries.front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn entry(asset: &str, minutes: i64) -> RiskAssessmentEntry {
        RiskAssessmentEntry::assess(asset, "phishing", 2, 2, fixed_now() + Duration::minutes(minutes))
            .unwrap()
    }

    #[test]
    fn scores_and_bands_match_the_matrix() {
        let medium = RiskAssessmentEntry::assess("CRM", "malware", 3, 4, fixed_now()).unwrap();
        assert_eq!(medium.score(), 12);
        assert_eq!(medium.level(), RiskLevel::Medium);

        let high = RiskAssessmentEntry::assess("CRM", "malware", 5, 5, fixed_now()).unwrap();
        assert_eq!(high.score(), 25);
        assert_eq!(high.level(), RiskLevel::High);

        let low = RiskAssessmentEntry::assess("CRM", "malware", 2, 3, fixed_now()).unwrap();
        assert_eq!(low.score(), 6);
        assert_eq!(low.level(), RiskLevel::Low);
    }

    #[test]
    fn band_edges_are_inclusive() {
        assert_eq!(RiskLevel::from_score(8), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(9), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(15), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(16), RiskLevel::High);
    }

    #[test]
    fn blank_fields_are_rejected() {
        assert_eq!(
            RiskAssessmentEntry::assess("  ", "phishing", 1, 1, fixed_now()),
            Err(AssessmentError::EmptyField { field: "asset" })
        );
        assert_eq!(
            RiskAssessmentEntry::assess("Server", "", 1, 1, fixed_now()),
            Err(AssessmentError::EmptyField { field: "threat" })
        );
        assert_eq!(
            RiskAssessmentEntry::assess("Server", "ddos", 6, 1, fixed_now()),
            Err(AssessmentError::LikelihoodOutOfRange(6))
        );
        assert_eq!(
            RiskAssessmentEntry::assess("Server", "ddos", 1, 0, fixed_now()),
            Err(AssessmentError::ImpactOutOfRange(0))
        );
    }

    #[test]
    fn labels_cover_the_scale() {
        assert_eq!(Likelihood::new(1).unwrap().label(), "Rare");
        assert_eq!(Likelihood::new(5).unwrap().label(), "Almost Certain");
        assert_eq!(Impact::new(3).unwrap().label(), "Moderate");
    }

    #[test]
    fn recommendations_are_keyed_by_level() {
        assert!(RiskLevel::High.recommendation().headline.contains("URGENT"));
        assert_eq!(RiskLevel::Low.recommendation().actions.len(), 4);
        assert_eq!(RiskLevel::Medium.recommendation().actions.len(), 5);
    }

    #[test]
    fn eleventh_entry_evicts_the_oldest() {
        let mut history = RiskHistory::new(10);
        for i in 0..10 {
            assert!(history.push(entry(&format!("asset-{i}"), i)).is_none());
        }
        let evicted = history.push(entry("asset-10", 10)).unwrap();

        assert_eq!(evicted.asset(), "asset-0");
        assert_eq!(history.len(), 10);
        assert_eq!(history.latest().unwrap().asset(), "asset-10");
        assert_eq!(history.iter().last().unwrap().asset(), "asset-1");
    }

    #[test]
    fn from_persisted_truncates_to_capacity() {
        let entries = (0..12).map(|i| entry(&format!("a{i}"), i)).collect();
        let history = RiskHistory::from_persisted(entries, 10);
        assert_eq!(history.len(), 10);
        assert_eq!(history.latest().unwrap().asset(), "a0");
    }
}
