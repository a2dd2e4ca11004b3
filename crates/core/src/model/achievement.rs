use std::fmt;

use serde::{Deserialize, Serialize};

/// Badge identifiers. Serialized in kebab-case (`first-steps`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AchievementId {
    FirstSteps,
    Halfway,
    KnowledgeSeeker,
    RiskMaster,
    QuizExpert,
}

impl AchievementId {
    pub const ALL: [AchievementId; 5] = [
        AchievementId::FirstSteps,
        AchievementId::Halfway,
        AchievementId::KnowledgeSeeker,
        AchievementId::RiskMaster,
        AchievementId::QuizExpert,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstSteps => "first-steps",
            Self::Halfway => "halfway",
            Self::KnowledgeSeeker => "knowledge-seeker",
            Self::RiskMaster => "risk-master",
            Self::QuizExpert => "quiz-expert",
        }
    }

    /// Resolve a stored identifier, including the short names older
    /// dashboards wrote (`first`, `master`, `quiz`, `perfect-score`).
    #[must_use]
    pub fn from_alias(raw: &str) -> Option<Self> {
        match raw.trim() {
            "first-steps" | "first" => Some(Self::FirstSteps),
            "halfway" => Some(Self::Halfway),
            "knowledge-seeker" | "master" => Some(Self::KnowledgeSeeker),
            "risk-master" => Some(Self::RiskMaster),
            "quiz-expert" | "quiz" | "perfect-score" => Some(Self::QuizExpert),
            _ => None,
        }
    }

    #[must_use]
    pub fn badge(self) -> &'static Achievement {
        match self {
            Self::FirstSteps => &FIRST_STEPS,
            Self::Halfway => &HALFWAY,
            Self::KnowledgeSeeker => &KNOWLEDGE_SEEKER,
            Self::RiskMaster => &RISK_MASTER,
            Self::QuizExpert => &QUIZ_EXPERT,
        }
    }
}

impl fmt::Display for AchievementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display metadata for a badge.
#[derive(Debug, PartialEq, Eq)]
pub struct Achievement {
    pub id: AchievementId,
    pub symbol: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

static FIRST_STEPS: Achievement = Achievement {
    id: AchievementId::FirstSteps,
    symbol: "[1]",
    name: "First Steps",
    description: "Complete your first training module",
};

static HALFWAY: Achievement = Achievement {
    id: AchievementId::Halfway,
    symbol: "[1/2]",
    name: "Halfway There",
    description: "Complete half of the training modules",
};

static KNOWLEDGE_SEEKER: Achievement = Achievement {
    id: AchievementId::KnowledgeSeeker,
    symbol: "[*]",
    name: "Knowledge Seeker",
    description: "Complete every training module",
};

static RISK_MASTER: Achievement = Achievement {
    id: AchievementId::RiskMaster,
    symbol: "<!>",
    name: "Risk Master",
    description: "Run five risk assessments",
};

static QUIZ_EXPERT: Achievement = Achievement {
    id: AchievementId::QuizExpert,
    symbol: "(A+)",
    name: "Quiz Expert",
    description: "Reach the expert mark on the knowledge quiz",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_map_onto_canonical_ids() {
        assert_eq!(AchievementId::from_alias("first"), Some(AchievementId::FirstSteps));
        assert_eq!(AchievementId::from_alias("master"), Some(AchievementId::KnowledgeSeeker));
        assert_eq!(AchievementId::from_alias("perfect-score"), Some(AchievementId::QuizExpert));
        assert_eq!(AchievementId::from_alias("speed-demon"), None);
    }

    #[test]
    fn serde_uses_kebab_case() {
        let json = serde_json::to_string(&AchievementId::KnowledgeSeeker).unwrap();
        assert_eq!(json, "\"knowledge-seeker\"");
        for id in AchievementId::ALL {
            assert_eq!(AchievementId::from_alias(id.as_str()), Some(id));
            assert_eq!(id.badge().id, id);
        }
    }
}
