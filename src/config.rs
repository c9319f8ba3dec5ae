use crate::core::{BotError, Result};
use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Bot core configuration.
///
/// Built either programmatically (builder setters) or from environment
/// variables via [`BotConfig::from_env`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Maximum records kept per conversation (FIFO beyond this).
    pub max_context_size: usize,

    /// Records older than this are dropped by the sweep.
    pub context_max_age_minutes: u64,

    /// Cadence of the background sweep.
    pub sweep_interval_secs: u64,

    /// Channel-name prefix recognized as a support channel.
    pub support_channel_prefix: String,

    /// Role ids that grant the admin capability.
    pub admin_role_ids: Vec<String>,
}

impl BotConfig {
    /// Set the per-conversation record bound.
    pub fn max_context_size(mut self, size: usize) -> Self {
        self.max_context_size = size;
        self
    }

    /// Set the record age limit, in minutes.
    pub fn context_max_age_minutes(mut self, minutes: u64) -> Self {
        self.context_max_age_minutes = minutes;
        self
    }

    /// Set the sweep cadence, in seconds.
    pub fn sweep_interval_secs(mut self, secs: u64) -> Self {
        self.sweep_interval_secs = secs;
        self
    }

    /// Set the support channel prefix.
    pub fn support_channel_prefix(mut self, prefix: &str) -> Self {
        self.support_channel_prefix = prefix.to_string();
        self
    }

    /// Set the admin-granting role ids.
    pub fn admin_role_ids<I, S>(mut self, role_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.admin_role_ids = role_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect();
        self
    }

    /// Loads configuration from the process environment.
    ///
    /// Recognized variables: `MAX_CONTEXT_SIZE`, `CONTEXT_MAX_AGE_MINUTES`,
    /// `SWEEP_INTERVAL_SECS`, `SUPPORT_CHANNEL_PREFIX`, `ADMIN_ROLE_IDS`
    /// (comma-separated). Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads from an arbitrary
    /// variable source, which keeps parsing testable without touching the
    /// process environment.
    pub fn from_vars<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = get("MAX_CONTEXT_SIZE") {
            config.max_context_size = raw.parse().map_err(|_| {
                BotError::Config(format!("MAX_CONTEXT_SIZE is not a valid integer: '{}'", raw))
            })?;
        }
        if let Some(raw) = get("CONTEXT_MAX_AGE_MINUTES") {
            config.context_max_age_minutes = raw.parse().map_err(|_| {
                BotError::Config(format!(
                    "CONTEXT_MAX_AGE_MINUTES is not a valid integer: '{}'",
                    raw
                ))
            })?;
        }
        if let Some(raw) = get("SWEEP_INTERVAL_SECS") {
            config.sweep_interval_secs = raw.parse().map_err(|_| {
                BotError::Config(format!(
                    "SWEEP_INTERVAL_SECS is not a valid integer: '{}'",
                    raw
                ))
            })?;
        }
        if let Some(prefix) = get("SUPPORT_CHANNEL_PREFIX") {
            config.support_channel_prefix = prefix;
        }
        if let Some(raw) = get("ADMIN_ROLE_IDS") {
            config.admin_role_ids = raw
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect();
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_context_size == 0 {
            return Err(BotError::Config("max_context_size must be > 0".into()));
        }
        if self.context_max_age_minutes == 0 {
            return Err(BotError::Config(
                "context_max_age_minutes must be > 0".into(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(BotError::Config("sweep_interval_secs must be > 0".into()));
        }
        Ok(())
    }

    /// Record age limit as a chrono duration. Values beyond what chrono can
    /// represent saturate to the maximum duration instead of wrapping.
    pub fn max_age(&self) -> ChronoDuration {
        i64::try_from(self.context_max_age_minutes)
            .ok()
            .and_then(ChronoDuration::try_minutes)
            .unwrap_or(ChronoDuration::MAX)
    }

    /// Sweep cadence as a std duration.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            max_context_size: 10,
            context_max_age_minutes: 30,
            sweep_interval_secs: 300,
            support_channel_prefix: "support-".to_string(),
            admin_role_ids: Vec::new(),
        }
    }
}
