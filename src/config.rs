use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

use crate::vm::InputPolicy;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{key} must be an integer, got '{value}'")]
    InvalidBudget { key: String, value: String },

    #[error("{key}: {reason}")]
    InvalidPolicy { key: String, reason: String },

    #[error("{key} must be a boolean, got '{value}'")]
    InvalidFlag { key: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Instructions per run; `None` is unbounded
    pub step_budget: Option<usize>,
    pub input_policy: InputPolicy,
    /// Treat input and output as character codes
    pub ascii: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            step_budget: None,
            input_policy: InputPolicy::Batch,
            ascii: false,
        }
    }
}

pub const STEP_BUDGET_VAR: &str = "INTCODE_STEP_BUDGET";
pub const INPUT_POLICY_VAR: &str = "INTCODE_INPUT_POLICY";
pub const ASCII_VAR: &str = "INTCODE_ASCII";

impl RunConfig {
    /// Build a config from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(STEP_BUDGET_VAR) {
            let signed = value
                .trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::InvalidBudget {
                    key: STEP_BUDGET_VAR.to_string(),
                    value: value.clone(),
                })?;
            config.step_budget = budget_from_signed(signed);
        }

        if let Some(value) = lookup(INPUT_POLICY_VAR) {
            config.input_policy = value.trim().parse::<InputPolicy>().map_err(|reason| {
                ConfigError::InvalidPolicy {
                    key: INPUT_POLICY_VAR.to_string(),
                    reason,
                }
            })?;
        }

        if let Some(value) = lookup(ASCII_VAR) {
            config.ascii = match value.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => {
                    return Err(ConfigError::InvalidFlag {
                        key: ASCII_VAR.to_string(),
                        value,
                    })
                }
            };
        }

        Ok(config)
    }
}

/// Negative budgets mean unbounded
pub fn budget_from_signed(budget: i64) -> Option<usize> {
    usize::try_from(budget).ok()
}

/// Environment snapshot taken on first use; invalid values fall back to defaults
pub static CONFIG: Lazy<RunConfig> = Lazy::new(|| {
    RunConfig::from_env().unwrap_or_else(|err| {
        log::warn!("ignoring invalid environment configuration: {}", err);
        RunConfig::default()
    })
});

pub fn init() {
    Lazy::force(&CONFIG);
}
