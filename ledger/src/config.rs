use crate::error::LedgerError;
use crate::error::Result;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;

pub const DEFAULT_STORAGE_KEY: &str = "aether_memory";
pub const DEFAULT_MAX_EXPERIENCES: usize = 10_000;

/// Caps the experiences collection. The oldest entries are evicted first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetentionPolicy {
    /// `None` or `0` disables eviction.
    pub max_experiences: Option<usize>,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_experiences: Some(DEFAULT_MAX_EXPERIENCES),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Key the whole memory document is stored under.
    pub storage_key: String,
    pub retention: RetentionPolicy,
    /// Confidence gained by a preference on each repeated update.
    pub confidence_step: f64,
    /// How many tags `most_frequent_tags` reports.
    pub top_tag_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            retention: RetentionPolicy::default(),
            confidence_step: 0.1,
            top_tag_limit: 10,
        }
    }
}

impl LedgerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: Self = toml::from_str(s).map_err(|e| LedgerError::Config(e.to_string()))?;
        if cfg.retention.max_experiences == Some(0) {
            cfg.retention.max_experiences = None;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// `confidence_step` must be finite and in (0, 1].
    pub fn validate(&self) -> Result<()> {
        let step = self.confidence_step;
        if !step.is_finite() || step <= 0.0 || step > 1.0 {
            return Err(LedgerError::Config(format!(
                "confidence_step must be in (0, 1], got {step}"
            )));
        }
        Ok(())
    }

    /// Read a TOML config file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(s) => Self::from_toml_str(&s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply `AETHER_LEDGER_KEY` and `AETHER_LEDGER_MAX_EXPERIENCES`.
    /// `AETHER_LEDGER_MAX_EXPERIENCES=0` disables eviction.
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(key) = std::env::var("AETHER_LEDGER_KEY")
            && !key.trim().is_empty()
        {
            self.storage_key = key;
        }
        if let Ok(raw) = std::env::var("AETHER_LEDGER_MAX_EXPERIENCES") {
            let n: usize = raw.trim().parse().map_err(|_| {
                LedgerError::Config(format!("AETHER_LEDGER_MAX_EXPERIENCES: not a number: {raw}"))
            })?;
            self.retention.max_experiences = (n > 0).then_some(n);
        }
        Ok(self)
    }
}
