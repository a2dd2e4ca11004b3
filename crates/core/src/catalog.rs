//! Static training content: modules, the quiz question bank, and threat names.

use thiserror::Error;

use crate::model::ModuleId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("question bank is empty")]
    EmptyBank,

    #[error("question {index} has fewer than two options")]
    TooFewOptions { index: usize },

    #[error("question {index} marks option {correct} correct but has {options} options")]
    CorrectOutOfRange {
        index: usize,
        correct: usize,
        options: usize,
    },

    #[error("module catalog is empty")]
    NoModules,

    #[error("module at position {position} has id {found}, expected {expected}")]
    OutOfSequence {
        position: usize,
        expected: ModuleId,
        found: ModuleId,
    },
}

//
// ─── MODULES ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

/// Catalog entry for one module. Content bodies live with the presentation
/// layer; the engine only needs identity and ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainingModule {
    pub id: ModuleId,
    pub code: &'static str,
    pub title: &'static str,
    pub category: &'static str,
    pub difficulty: Difficulty,
    pub duration_minutes: u32,
}

/// Ordered module list. Ids run `1..=N` in catalog order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCatalog {
    modules: Vec<TrainingModule>,
}

impl ModuleCatalog {
    /// # Errors
    ///
    /// Returns `CatalogError::NoModules` for an empty list and
    /// `CatalogError::OutOfSequence` when the ids are not `1..=N` in order.
    pub fn new(modules: Vec<TrainingModule>) -> Result<Self, CatalogError> {
        if modules.is_empty() {
            return Err(CatalogError::NoModules);
        }
        for (position, (module, id)) in modules.iter().zip(1_u32..).enumerate() {
            let expected = ModuleId::new(id);
            if module.id != expected {
                return Err(CatalogError::OutOfSequence {
                    position,
                    expected,
                    found: module.id,
                });
            }
        }
        Ok(Self { modules })
    }

    #[must_use]
    pub fn modules(&self) -> &[TrainingModule] {
        &self.modules
    }

    #[must_use]
    pub fn len(&self) -> u32 {
        u32::try_from(self.modules.len()).unwrap_or(u32::MAX)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: ModuleId) -> Option<&TrainingModule> {
        self.modules.iter().find(|m| m.id == id)
    }

    /// Resolve either a numeric id (`"3"`) or a module code (`"ir-001"`).
    #[must_use]
    pub fn resolve(&self, raw: &str) -> Option<ModuleId> {
        let raw = raw.trim();
        if let Ok(id) = raw.parse::<ModuleId>() {
            return Some(id);
        }
        self.modules
            .iter()
            .find(|m| m.code.eq_ignore_ascii_case(raw))
            .map(|m| m.id)
    }
}

impl Default for ModuleCatalog {
    fn default() -> Self {
        let entries = [
            (
                "rm-001",
                "Introduction to Cyber Risk Management",
                "Risk Management",
                Difficulty::Beginner,
                45,
            ),
            (
                "ta-001",
                "Threat Analysis and Intelligence",
                "Threat Intelligence",
                Difficulty::Intermediate,
                60,
            ),
            (
                "ir-001",
                "Incident Response and Forensics",
                "Incident Response",
                Difficulty::Advanced,
                90,
            ),
            (
                "sc-001",
                "Secure Coding and Application Security",
                "Application Security",
                Difficulty::Intermediate,
                75,
            ),
            (
                "cc-001",
                "Cloud Security and Zero Trust Architecture",
                "Cloud Security",
                Difficulty::Advanced,
                80,
            ),
        ];
        let modules = entries
            .into_iter()
            .zip(1_u32..)
            .map(|((code, title, category, difficulty, duration_minutes), id)| TrainingModule {
                id: ModuleId::new(id),
                code,
                title,
                category,
                difficulty,
                duration_minutes,
            })
            .collect();
        Self { modules }
    }
}

//
// ─── QUESTION BANK ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct: usize,
}

impl QuizQuestion {
    #[must_use]
    pub fn new(prompt: &str, options: &[&str], correct: usize) -> Self {
        Self {
            prompt: prompt.to_string(),
            options: options.iter().map(|o| (*o).to_string()).collect(),
            correct,
        }
    }
}

/// Per-question outcome of a graded sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionReview {
    pub index: usize,
    pub chosen: Option<usize>,
    pub correct_option: usize,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedQuiz {
    pub score: u32,
    pub total_questions: u32,
    pub review: Vec<QuestionReview>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBank {
    questions: Vec<QuizQuestion>,
}

impl QuestionBank {
    /// # Errors
    ///
    /// Returns `CatalogError` for an empty bank or a malformed question.
    pub fn new(questions: Vec<QuizQuestion>) -> Result<Self, CatalogError> {
        if questions.is_empty() {
            return Err(CatalogError::EmptyBank);
        }
        for (index, question) in questions.iter().enumerate() {
            if question.options.len() < 2 {
                return Err(CatalogError::TooFewOptions { index });
            }
            if question.correct >= question.options.len() {
                return Err(CatalogError::CorrectOutOfRange {
                    index,
                    correct: question.correct,
                    options: question.options.len(),
                });
            }
        }
        Ok(Self { questions })
    }

    #[must_use]
    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Grade an answer sheet. Missing or unanswered entries count as wrong;
    /// answers beyond the bank are ignored.
    #[must_use]
    pub fn grade(&self, answers: &[Option<usize>]) -> GradedQuiz {
        let review: Vec<QuestionReview> = self
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let chosen = answers.get(index).copied().flatten();
                QuestionReview {
                    index,
                    chosen,
                    correct_option: question.correct,
                    is_correct: chosen == Some(question.correct),
                }
            })
            .collect();

        let score = review.iter().filter(|r| r.is_correct).count();
        GradedQuiz {
            score: u32::try_from(score).unwrap_or(u32::MAX),
            total_questions: u32::try_from(self.questions.len()).unwrap_or(u32::MAX),
            review,
        }
    }
}

impl Default for QuestionBank {
    fn default() -> Self {
        let questions = vec![
            QuizQuestion::new(
                "What is the primary goal of a cybersecurity risk assessment?",
                &[
                    "To eliminate all security risks",
                    "To identify, analyze, and prioritize security risks",
                    "To install antivirus software",
                    "To create user passwords",
                ],
                1,
            ),
            QuizQuestion::new(
                "Which of the following is NOT a component of the CIA triad?",
                &["Confidentiality", "Integrity", "Availability", "Authentication"],
                3,
            ),
            QuizQuestion::new(
                "What does NIST stand for?",
                &[
                    "Network Information Security Technology",
                    "National Institute of Standards and Technology",
                    "New Internet Security Tools",
                    "National Information Systems Training",
                ],
                1,
            ),
            QuizQuestion::new(
                "Which risk treatment option involves taking action to reduce the likelihood or impact of a risk?",
                &["Risk Avoidance", "Risk Transfer", "Risk Mitigation", "Risk Acceptance"],
                2,
            ),
            QuizQuestion::new(
                "What is the purpose of multi-factor authentication (MFA)?",
                &[
                    "To make passwords longer",
                    "To add an additional layer of security beyond passwords",
                    "To replace all passwords",
                    "To create automatic backups",
                ],
                1,
            ),
            QuizQuestion::new(
                "Which type of attack involves overwhelming a system with traffic to make it unavailable?",
                &["Phishing", "Malware", "DDoS (Distributed Denial of Service)", "SQL Injection"],
                2,
            ),
            QuizQuestion::new(
                "What is the first step in incident response?",
                &["Recovery", "Preparation", "Containment", "Eradication"],
                1,
            ),
            QuizQuestion::new(
                "Which regulation focuses on protecting personal health information?",
                &["GDPR", "SOX", "HIPAA", "PCI-DSS"],
                2,
            ),
            QuizQuestion::new(
                "What is the principle of 'least privilege' in access control?",
                &[
                    "Users should have the minimum access necessary to perform their job",
                    "All users should have administrator access",
                    "Access should be granted based on seniority",
                    "Users should share passwords for convenience",
                ],
                0,
            ),
            QuizQuestion::new(
                "What is a Zero Trust security model based on?",
                &[
                    "Trusting all internal network traffic",
                    "Never trust, always verify",
                    "Only trusting executives",
                    "Trusting devices but not users",
                ],
                1,
            ),
        ];
        Self { questions }
    }
}

//
// ─── THREATS ──────────────────────────────────────────────────────────────────
//

const THREAT_NAMES: &[(&str, &str)] = &[
    ("malware", "Malware Attack"),
    ("phishing", "Phishing"),
    ("insider", "Insider Threat"),
    ("ddos", "DDoS Attack"),
    ("data-breach", "Data Breach"),
    ("ransomware", "Ransomware"),
];

/// Display name for a threat code; unknown codes are returned as given.
#[must_use]
pub fn threat_display_name(code: &str) -> &str {
    let trimmed = code.trim();
    THREAT_NAMES
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(trimmed))
        .map_or(trimmed, |(_, name)| *name)
}

#[must_use]
pub fn threat_codes() -> impl Iterator<Item = &'static str> {
    THREAT_NAMES.iter().map(|(code, _)| *code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_numbers_modules_in_order() {
        let catalog = ModuleCatalog::default();
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.get(ModuleId::new(3)).unwrap().code, "ir-001");
        assert_eq!(catalog.resolve("CC-001"), Some(ModuleId::new(5)));
        assert_eq!(catalog.resolve("2"), Some(ModuleId::new(2)));
        assert_eq!(catalog.resolve("zz-999"), None);
    }

    #[test]
    fn custom_catalogs_must_number_modules_in_order() {
        let mut modules = ModuleCatalog::default().modules().to_vec();
        modules.swap(1, 2);
        assert_eq!(
            ModuleCatalog::new(modules),
            Err(CatalogError::OutOfSequence {
                position: 1,
                expected: ModuleId::new(2),
                found: ModuleId::new(3),
            })
        );

        let first_two = ModuleCatalog::default().modules()[..2].to_vec();
        assert_eq!(ModuleCatalog::new(first_two).unwrap().len(), 2);
        assert_eq!(ModuleCatalog::new(Vec::new()), Err(CatalogError::NoModules));
    }

    #[test]
    fn grading_counts_only_matching_answers() {
        let bank = QuestionBank::default();
        let mut answers: Vec<Option<usize>> =
            bank.questions().iter().map(|q| Some(q.correct)).collect();
        answers[0] = Some(0);
        answers[1] = None;
        answers.truncate(9);

        let graded = bank.grade(&answers);
        assert_eq!(graded.total_questions, 10);
        assert_eq!(graded.score, 7);
        assert!(!graded.review[0].is_correct);
        assert_eq!(graded.review[1].chosen, None);
        assert!(!graded.review[9].is_correct);
    }

    #[test]
    fn bank_validation_rejects_bad_questions() {
        assert_eq!(QuestionBank::new(vec![]), Err(CatalogError::EmptyBank));
        let bad = QuizQuestion::new("Q?", &["a", "b"], 2);
        assert_eq!(
            QuestionBank::new(vec![bad]),
            Err(CatalogError::CorrectOutOfRange {
                index: 0,
                correct: 2,
                options: 2
            })
        );
    }

    #[test]
    fn threat_names_fall_back_to_input() {
        assert_eq!(threat_display_name("ddos"), "DDoS Attack");
        assert_eq!(threat_display_name(" Supply chain "), "Supply chain");
        assert_eq!(threat_codes().count(), 6);
    }
}
