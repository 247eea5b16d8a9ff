// src/config.rs

//! Tunables for a [`crate::session::Session`].

use crate::core::ChshError;
use crate::game::Scoring;
use crate::simulation::GameVariant;
use crate::stream::StreamLimits;
use crate::validation::check_shared_bit_count;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a session plays and streams its batches.
///
/// Missing fields take their defaults when deserialized, so `{}` is a valid
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Rounds played by each batch.
    pub rounds_per_batch: usize,
    /// Batches started per recompute. `None` streams until cancelled.
    pub max_batches: Option<usize>,
    /// Batches in flight at once.
    pub concurrency: usize,
    /// Per-evaluation budget. `None` disables the deadline.
    pub timeout_millis: Option<u64>,
    /// Length of `sharedBits` in the classical game.
    pub shared_bit_count: u32,
    /// Delay before an error replaces the displayed counts. Quick edits
    /// often pass through broken states; a result arriving during the delay
    /// supersedes the error.
    pub error_grace_millis: u64,
    /// Rule used to summarise the running total.
    pub scoring: Scoring,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rounds_per_batch: 1000,
            max_batches: Some(100),
            concurrency: 2,
            timeout_millis: Some(2000),
            shared_bit_count: 16,
            error_grace_millis: 500,
            scoring: Scoring::Chsh,
        }
    }
}

impl SessionConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ChshError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ChshError::invalid_input(format!("Invalid session config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ChshError> {
        if self.rounds_per_batch == 0 {
            return Err(ChshError::invalid_input("rounds_per_batch must be at least 1"));
        }
        if self.timeout_millis == Some(0) {
            return Err(ChshError::invalid_input("timeout_millis must be positive or absent"));
        }
        check_shared_bit_count(self.shared_bit_count)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_millis.map(Duration::from_millis)
    }

    pub fn error_grace(&self) -> Duration {
        Duration::from_millis(self.error_grace_millis)
    }

    pub fn limits(&self) -> StreamLimits {
        StreamLimits { max_batches: self.max_batches, concurrency: self.concurrency }
    }

    /// The classical game with this configuration's `shared_bit_count`.
    pub fn classical_variant(&self) -> GameVariant {
        GameVariant::Classical { shared_bit_count: self.shared_bit_count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_gives_defaults() -> Result<(), ChshError> {
        assert_eq!(SessionConfig::from_json("{}")?, SessionConfig::default());
        Ok(())
    }

    #[test]
    fn partial_json_overrides_fields() -> Result<(), ChshError> {
        let config = SessionConfig::from_json(r#"{"rounds_per_batch": 10, "timeout_millis": null}"#)?;
        assert_eq!(config.rounds_per_batch, 10);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.limits(), StreamLimits { max_batches: Some(100), concurrency: 2 });
        assert_eq!(config.error_grace(), Duration::from_millis(500));
        assert_eq!(config.classical_variant(), GameVariant::Classical { shared_bit_count: 16 });
        assert_eq!(config.scoring, Scoring::Chsh);
        Ok(())
    }

    #[test]
    fn scoring_is_named_in_snake_case() -> Result<(), ChshError> {
        let config = SessionConfig::from_json(r#"{"scoring": "signalling"}"#)?;
        assert_eq!(config.scoring, Scoring::Signalling);
        assert!(SessionConfig::from_json(r#"{"scoring": "Signalling"}"#).is_err());
        Ok(())
    }

    #[test]
    fn rejects_invalid_values() {
        for json in [
            r#"{"rounds_per_batch": 0}"#,
            r#"{"shared_bit_count": 53}"#,
            r#"{"timeout_millis": 0}"#,
            r#"{"concurrency": "two"}"#,
            "not json",
        ] {
            assert!(
                matches!(SessionConfig::from_json(json), Err(ChshError::InvalidInput { .. })),
                "accepted {}",
                json
            );
        }
    }
}
