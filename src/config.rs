//! Protocol parameters for hook installation and hook state.
//!
//! Every validator must run with identical values; they are loaded once from
//! TOML and threaded into the processor rather than read ambiently.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const NSDELETE_LIMIT_ENV: &str = "HOOKSET_MAX_NSDELETE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Capacity of every account's hook table.
    pub max_slots: usize,
    pub max_definition_size: usize,
    pub supported_api_versions: Vec<u16>,
    pub max_state_key_size: usize,
    pub max_state_value_size: usize,
    /// Limits on `HookParameters` carried by one entry.
    pub max_hook_parameters: usize,
    pub max_hook_parameter_name_size: usize,
    pub max_hook_parameter_value_size: usize,
    /// Drops charged for any SetHook.
    pub base_fee: u64,
    /// Drops charged per non-trivial entry (install, clear, update, NSDELETE).
    pub hook_operation_fee: u64,
    pub reserve_base: u64,
    pub reserve_increment: u64,
    /// Upper bound on state entries removed by all NSDELETEs of one transaction.
    pub max_namespace_delete_entries: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_slots: 10,
            max_definition_size: 0xFFFF,
            supported_api_versions: vec![0],
            max_state_key_size: 32,
            max_state_value_size: 128,
            max_hook_parameters: 16,
            max_hook_parameter_name_size: 32,
            max_hook_parameter_value_size: 256,
            base_fee: 10,
            hook_operation_fee: 1_000,
            reserve_base: 10_000_000,
            reserve_increment: 2_000_000,
            max_namespace_delete_entries: 512,
        }
    }
}

impl ProtocolConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                tracing::debug!("no protocol config given, using defaults");
                let mut config = Self::default();
                config.apply_env_overrides();
                config.validate()?;
                Ok(config)
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(raw) = std::env::var(NSDELETE_LIMIT_ENV) {
            match raw.trim().parse::<usize>() {
                Ok(limit) => self.max_namespace_delete_entries = limit,
                Err(err) => {
                    tracing::warn!("invalid {NSDELETE_LIMIT_ENV}={raw:?}, ignoring: {err}")
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_slots == 0 {
            return Err(ConfigError::Invalid("max_slots must be > 0".into()));
        }
        if self.supported_api_versions.is_empty() {
            return Err(ConfigError::Invalid(
                "supported_api_versions must not be empty".into(),
            ));
        }
        if self.max_definition_size == 0
            || self.max_state_key_size == 0
            || self.max_state_value_size == 0
            || self.max_hook_parameter_name_size == 0
        {
            return Err(ConfigError::Invalid("size limits must be > 0".into()));
        }
        if self.max_namespace_delete_entries == 0 {
            return Err(ConfigError::Invalid(
                "max_namespace_delete_entries must be > 0".into(),
            ));
        }
        Ok(())
    }

    /// Drops required for a SetHook carrying `operations` non-trivial entries.
    pub fn required_fee(&self, operations: usize) -> u64 {
        self.base_fee
            .saturating_add(self.hook_operation_fee.saturating_mul(operations as u64))
    }
}
