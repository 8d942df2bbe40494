//! Fixed, ordered stage delays.

use crate::config::ConfigError;
use std::sync::Arc;
use std::time::Duration;

/// Stage delays in milliseconds: 5s, 15s, 40s, 5min, 9min. They add up to 15 minutes.
pub const DEFAULT_STAGES_MS: [u64; 5] = [5_000, 15_000, 40_000, 300_000, 540_000];

/// Read-only after construction; clones share the same sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSchedule {
    stages: Arc<[Duration]>,
}

impl StageSchedule {
    pub fn new(stages: Vec<Duration>) -> Result<Self, ConfigError> {
        if stages.is_empty() {
            return Err(ConfigError::InvalidSchedule("no stages".into()));
        }
        if let Some(index) = stages.iter().position(|d| d.is_zero()) {
            return Err(ConfigError::InvalidSchedule(format!(
                "stage {index} has a zero delay"
            )));
        }
        Ok(Self {
            stages: stages.into(),
        })
    }

    pub fn from_millis(millis: &[u64]) -> Result<Self, ConfigError> {
        Self::new(millis.iter().copied().map(Duration::from_millis).collect())
    }

    /// Delay before the stage-`stage` message is delivered.
    pub fn ttl(&self, stage: usize) -> Option<Duration> {
        self.stages.get(stage).copied()
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn is_last(&self, stage: usize) -> bool {
        stage + 1 >= self.stages.len()
    }

    /// Time from the first publish until the final stage fires.
    pub fn total(&self) -> Duration {
        self.stages.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = Duration> + '_ {
        self.stages.iter().copied()
    }
}

impl Default for StageSchedule {
    fn default() -> Self {
        Self {
            stages: DEFAULT_STAGES_MS
                .iter()
                .copied()
                .map(Duration::from_millis)
                .collect(),
        }
    }
}
