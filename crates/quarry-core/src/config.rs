//! Engine configuration.
//!
//! Loaded from TOML; every field has a default so an empty document is a
//! valid configuration.

use crate::error::{ErrorClass, ErrorOrigin, InternalError};
use serde::Deserialize;
use thiserror::Error as ThisError;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 1000;
pub const MIN_SCAN_BATCH: usize = 16;
pub const MAX_SCAN_BATCH: usize = 1024;
pub const MAX_CURSOR_HEX_LEN: usize = 8 * 1024;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to parse engine config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid engine config: {field} {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl From<ConfigError> for InternalError {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Config, err.to_string())
    }
}

///
/// EngineConfig
///
/// Page-size policy and physical fetch granularity for query evaluation.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Page size used when a query carries no limit.
    pub default_limit: u32,

    /// Hard ceiling on page size; larger requested limits are clamped.
    pub max_limit: u32,

    /// Smallest number of columns fetched per store round trip.
    pub min_scan_batch: usize,

    /// Largest number of columns a scanner buffers per round trip.
    pub max_scan_batch: usize,

    /// Longest accepted cursor token, in hex characters.
    pub max_cursor_hex_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
            min_scan_batch: MIN_SCAN_BATCH,
            max_scan_batch: MAX_SCAN_BATCH,
            max_cursor_hex_len: MAX_CURSOR_HEX_LEN,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    /// Reject settings that would make pagination degenerate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "max_limit",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.default_limit == 0 || self.default_limit > self.max_limit {
            return Err(ConfigError::Invalid {
                field: "default_limit",
                reason: format!("must be within 1..={}", self.max_limit),
            });
        }
        if self.min_scan_batch == 0 || self.min_scan_batch > self.max_scan_batch {
            return Err(ConfigError::Invalid {
                field: "min_scan_batch",
                reason: format!("must be within 1..={}", self.max_scan_batch),
            });
        }
        if self.max_cursor_hex_len < 2 {
            return Err(ConfigError::Invalid {
                field: "max_cursor_hex_len",
                reason: "must allow at least one encoded byte".to_string(),
            });
        }

        Ok(())
    }

    /// Resolve the effective page size for a requested limit.
    #[must_use]
    pub fn effective_limit(&self, requested: Option<u32>) -> u32 {
        match requested {
            None | Some(0) => self.default_limit,
            Some(limit) => limit.min(self.max_limit),
        }
    }

    /// Physical fetch granularity for a page of `limit` results.
    ///
    /// One extra column lets the executor detect exhaustion without a second
    /// round trip.
    #[must_use]
    pub fn scan_batch_size(&self, limit: u32) -> usize {
        let wanted = usize::try_from(limit)
            .unwrap_or(usize::MAX)
            .saturating_add(1);

        wanted.clamp(self.min_scan_batch, self.max_scan_batch)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").expect("empty config should parse");

        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.default_limit, 10);
        assert_eq!(config.max_limit, 1000);
    }

    #[test]
    fn partial_documents_override_only_named_fields() {
        let config = EngineConfig::from_toml_str("max_limit = 50\nmin_scan_batch = 4\n")
            .expect("partial config should parse");

        assert_eq!(config.max_limit, 50);
        assert_eq!(config.min_scan_batch, 4);
        assert_eq!(config.max_scan_batch, MAX_SCAN_BATCH);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = EngineConfig::from_toml_str("page_size = 3").expect_err("unknown key");

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn inconsistent_limits_are_rejected() {
        let err = EngineConfig::from_toml_str("default_limit = 20\nmax_limit = 5")
            .expect_err("default above max");

        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "default_limit",
                ..
            }
        ));
    }

    #[test]
    fn limits_are_defaulted_and_clamped() {
        let config = EngineConfig::default();

        assert_eq!(config.effective_limit(None), 10);
        assert_eq!(config.effective_limit(Some(0)), 10);
        assert_eq!(config.effective_limit(Some(15)), 15);
        assert_eq!(config.effective_limit(Some(50_000)), 1000);
    }

    #[test]
    fn scan_batch_tracks_limit_within_bounds() {
        let config = EngineConfig::default();

        assert_eq!(config.scan_batch_size(1), MIN_SCAN_BATCH);
        assert_eq!(config.scan_batch_size(100), 101);
        assert_eq!(config.scan_batch_size(1000), 1001);

        let tight = EngineConfig {
            max_scan_batch: 64,
            ..EngineConfig::default()
        };
        assert_eq!(tight.scan_batch_size(1000), 64);
    }
}
