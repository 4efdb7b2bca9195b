use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tokio::time::Duration;

/// Snapshot emission granularity. Progress itself is sampled off a monotonic
/// anchor, so the tick interval bounds how often renderers hear about it, not
/// how accurate it is.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 16;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryConfig {
    pub step_count: usize,
    pub step_duration_ms: u64,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

impl StoryConfig {
    pub fn new(step_count: usize, step_duration_ms: u64) -> Result<Self> {
        if step_count == 0 {
            bail!("step_count must be greater than zero");
        }
        if step_duration_ms == 0 {
            bail!("step_duration_ms must be greater than zero");
        }

        Ok(Self {
            step_count,
            step_duration_ms,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        })
    }

    pub fn with_tick_interval_ms(mut self, tick_interval_ms: u64) -> Result<Self> {
        if tick_interval_ms == 0 {
            bail!("tick_interval_ms must be greater than zero");
        }
        self.tick_interval_ms = tick_interval_ms;
        Ok(self)
    }

    pub fn step_duration(&self) -> Duration {
        Duration::from_millis(self.step_duration_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_step_count() {
        assert!(StoryConfig::new(0, 8_000).is_err());
    }

    #[test]
    fn rejects_zero_duration() {
        assert!(StoryConfig::new(5, 0).is_err());
    }

    #[test]
    fn rejects_zero_tick_interval() {
        let config = StoryConfig::new(5, 8_000).unwrap();
        assert!(config.with_tick_interval_ms(0).is_err());
    }

    #[test]
    fn defaults_tick_interval() {
        let config = StoryConfig::new(5, 8_000).unwrap();
        assert_eq!(config.tick_interval_ms, DEFAULT_TICK_INTERVAL_MS);
    }
}
