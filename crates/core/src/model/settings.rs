use thiserror::Error;

/// Storage keys for the two independent persisted documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageKeys {
    pub progress: String,
    pub risk_history: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            progress: "cybersecurity-training-progress".to_string(),
            risk_history: "risk-assessments".to_string(),
        }
    }
}

/// Policy knobs that differed between the dashboard variants.
///
/// Percentages are whole numbers in `0..=100`; a fraction `score / total`
/// meets a threshold when `score * 100 >= threshold * total`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    module_count: u32,
    halfway_threshold: u32,
    pass_percent: u8,
    certificate_percent: u8,
    quiz_expert_percent: u8,
    risk_master_threshold: u32,
    history_capacity: usize,
    keys: StorageKeys,
}

/// Unvalidated settings; `None` fields fall back to the defaults.
#[derive(Debug, Clone, Default)]
pub struct EngineSettingsDraft {
    pub module_count: Option<u32>,
    pub halfway_threshold: Option<u32>,
    pub pass_percent: Option<u8>,
    pub certificate_percent: Option<u8>,
    pub quiz_expert_percent: Option<u8>,
    pub risk_master_threshold: Option<u32>,
    pub history_capacity: Option<usize>,
    pub keys: Option<StorageKeys>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("module count must be > 0")]
    NoModules,

    #[error("halfway threshold ({threshold}) must be between 1 and the module count ({module_count})")]
    InvalidHalfwayThreshold { threshold: u32, module_count: u32 },

    #[error("{name} must be a percentage between 1 and 100, got {value}")]
    InvalidPercent { name: &'static str, value: u8 },

    #[error("risk history capacity must be > 0")]
    EmptyHistory,

    #[error("storage key `{0}` cannot be empty")]
    EmptyStorageKey(&'static str),

    #[error("progress and risk history must use different storage keys")]
    SharedStorageKey,
}

impl EngineSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the draft, filling unset fields from the defaults.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if any threshold is out of range or the storage
    /// keys are empty or collide.
    pub fn validate(self) -> Result<EngineSettings, SettingsError> {
        let defaults = EngineSettings::default();

        let module_count = self.module_count.unwrap_or(defaults.module_count);
        if module_count == 0 {
            return Err(SettingsError::NoModules);
        }

        let halfway_threshold = self
            .halfway_threshold
            .unwrap_or_else(|| defaults.halfway_threshold.min(module_count));
        if halfway_threshold == 0 || halfway_threshold > module_count {
            return Err(SettingsError::InvalidHalfwayThreshold {
                threshold: halfway_threshold,
                module_count,
            });
        }

        let pass_percent = percent("pass_percent", self.pass_percent, defaults.pass_percent)?;
        let certificate_percent = percent(
            "certificate_percent",
            self.certificate_percent,
            defaults.certificate_percent,
        )?;
        let quiz_expert_percent = percent(
            "quiz_expert_percent",
            self.quiz_expert_percent,
            defaults.quiz_expert_percent,
        )?;

        let history_capacity = self.history_capacity.unwrap_or(defaults.history_capacity);
        if history_capacity == 0 {
            return Err(SettingsError::EmptyHistory);
        }

        let keys = self.keys.unwrap_or(defaults.keys);
        if keys.progress.trim().is_empty() {
            return Err(SettingsError::EmptyStorageKey("progress"));
        }
        if keys.risk_history.trim().is_empty() {
            return Err(SettingsError::EmptyStorageKey("risk_history"));
        }
        if keys.progress == keys.risk_history {
            return Err(SettingsError::SharedStorageKey);
        }

        Ok(EngineSettings {
            module_count,
            halfway_threshold,
            pass_percent,
            certificate_percent,
            quiz_expert_percent,
            risk_master_threshold: self
                .risk_master_threshold
                .unwrap_or(defaults.risk_master_threshold),
            history_capacity,
            keys,
        })
    }
}

fn percent(name: &'static str, value: Option<u8>, default: u8) -> Result<u8, SettingsError> {
    let value = value.unwrap_or(default);
    if value == 0 || value > 100 {
        return Err(SettingsError::InvalidPercent { name, value });
    }
    Ok(value)
}

impl Default for EngineSettings {
    /// Five modules, 70% pass mark, 80% certificate and quiz-expert marks,
    /// halfway at three modules, risk master at five assessments, and a
    /// ten-entry risk history.
    fn default() -> Self {
        Self {
            module_count: 5,
            halfway_threshold: 3,
            pass_percent: 70,
            certificate_percent: 80,
            quiz_expert_percent: 80,
            risk_master_threshold: 5,
            history_capacity: 10,
            keys: StorageKeys::default(),
        }
    }
}

impl EngineSettings {
    #[must_use]
    pub fn module_count(&self) -> u32 {
        self.module_count
    }

    #[must_use]
    pub fn halfway_threshold(&self) -> u32 {
        self.halfway_threshold
    }

    #[must_use]
    pub fn pass_percent(&self) -> u8 {
        self.pass_percent
    }

    #[must_use]
    pub fn certificate_percent(&self) -> u8 {
        self.certificate_percent
    }

    #[must_use]
    pub fn quiz_expert_percent(&self) -> u8 {
        self.quiz_expert_percent
    }

    #[must_use]
    pub fn risk_master_threshold(&self) -> u32 {
        self.risk_master_threshold
    }

    #[must_use]
    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    #[must_use]
    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }
}
