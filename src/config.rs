use serde::{Deserialize, Serialize};

/// Which weight a counted vote contributes to a tally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightPolicy {
    /// Weight captured when the vote was recorded on chain.
    #[default]
    AtCast,
    /// Voter's current weight at tally time.
    Live,
}

/// Status a pending action must reach before `PendingAction::wait` returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    #[default]
    InBlock,
    Finalized,
}

/// Closed calls kept in memory when no limit is configured.
pub const DEFAULT_CLOSED_HISTORY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub confirmation: Confirmation,
    pub weight_policy: WeightPolicy,
    /// Most recent closed calls to keep, older ones are dropped.
    pub closed_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            confirmation: Confirmation::default(),
            weight_policy: WeightPolicy::default(),
            closed_history: DEFAULT_CLOSED_HISTORY,
        }
    }
}

impl EngineConfig {
    pub fn with_confirmation(mut self, confirmation: Confirmation) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn with_weight_policy(mut self, weight_policy: WeightPolicy) -> Self {
        self.weight_policy = weight_policy;
        self
    }

    pub fn with_closed_history(mut self, closed_history: usize) -> Self {
        self.closed_history = closed_history;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"weight_policy":"live"}"#).unwrap();
        assert_eq!(config.weight_policy, WeightPolicy::Live);
        assert_eq!(config.confirmation, Confirmation::InBlock);
        assert_eq!(config.closed_history, DEFAULT_CLOSED_HISTORY);
    }
}
