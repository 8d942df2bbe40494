//! Runtime configuration, read from the environment.
//!
//! Every setting has a default matching the production deployment, so an empty
//! environment yields [`PipelineConfig::default`].

use crate::escalation::{DelayQueueSettings, StageSchedule, DEFAULT_CANCEL_REASON};
use std::time::Duration;
use thiserror::Error;

pub const ENV_STAGE_SCHEDULE_MS: &str = "SKY_STAGE_SCHEDULE_MS";
pub const ENV_CANCEL_REASON: &str = "SKY_CANCEL_REASON";
pub const ENV_DISH_CACHE_TTL_SECS: &str = "SKY_DISH_CACHE_TTL_SECS";
pub const ENV_CACHE_LOCK_TIMEOUT_MS: &str = "SKY_CACHE_LOCK_TIMEOUT_MS";
pub const ENV_LOCK_SWEEP_INTERVAL_SECS: &str = "SKY_LOCK_SWEEP_INTERVAL_SECS";
pub const ENV_REDELIVERY_DELAY_MS: &str = "SKY_REDELIVERY_DELAY_MS";
pub const ENV_MAX_REDELIVERIES: &str = "SKY_MAX_REDELIVERIES";
pub const ENV_CHANNEL_CAPACITY: &str = "SKY_CHANNEL_CAPACITY";

const DEFAULT_DISH_CACHE_TTL_SECS: u64 = 60 * 60;
const DEFAULT_CACHE_LOCK_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_REDELIVERY_DELAY_MS: u64 = 1_000;
const DEFAULT_MAX_REDELIVERIES: u32 = 10;
const DEFAULT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("{key} is invalid: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid stage schedule: {0}")]
    InvalidSchedule(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub schedule: StageSchedule,
    pub cancel_reason: String,
    pub dish_cache_ttl: Duration,
    /// `None` waits on a key's mutex without bound.
    pub cache_lock_timeout: Option<Duration>,
    /// `None` leaves the lock registry to grow for the life of the process.
    pub lock_sweep_interval: Option<Duration>,
    pub redelivery_delay: Duration,
    pub max_redeliveries: u32,
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            schedule: StageSchedule::default(),
            cancel_reason: DEFAULT_CANCEL_REASON.to_string(),
            dish_cache_ttl: Duration::from_secs(DEFAULT_DISH_CACHE_TTL_SECS),
            cache_lock_timeout: Some(Duration::from_millis(DEFAULT_CACHE_LOCK_TIMEOUT_MS)),
            lock_sweep_interval: None,
            redelivery_delay: Duration::from_millis(DEFAULT_REDELIVERY_DELAY_MS),
            max_redeliveries: DEFAULT_MAX_REDELIVERIES,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Loads the config through a custom key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value is set but does not parse, or is zero where
    /// zero has no meaning.
    pub fn from_env_with<F>(get_env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let schedule = match get_env(ENV_STAGE_SCHEDULE_MS) {
            Some(raw) => parse_schedule(&raw)?,
            None => defaults.schedule,
        };
        let cancel_reason = match get_env(ENV_CANCEL_REASON) {
            Some(raw) if raw.trim().is_empty() => {
                return Err(invalid(ENV_CANCEL_REASON, &raw, "must not be blank"))
            }
            Some(raw) => raw,
            None => defaults.cancel_reason,
        };

        let ttl_secs = parse_u64(
            &get_env,
            ENV_DISH_CACHE_TTL_SECS,
            DEFAULT_DISH_CACHE_TTL_SECS,
            false,
        )?;
        let lock_timeout_ms = parse_u64(
            &get_env,
            ENV_CACHE_LOCK_TIMEOUT_MS,
            DEFAULT_CACHE_LOCK_TIMEOUT_MS,
            true,
        )?;
        let sweep_secs = parse_u64(&get_env, ENV_LOCK_SWEEP_INTERVAL_SECS, 0, true)?;
        let redelivery_ms = parse_u64(
            &get_env,
            ENV_REDELIVERY_DELAY_MS,
            DEFAULT_REDELIVERY_DELAY_MS,
            false,
        )?;
        let max_redeliveries = parse_u64(
            &get_env,
            ENV_MAX_REDELIVERIES,
            u64::from(DEFAULT_MAX_REDELIVERIES),
            true,
        )?;
        let capacity = parse_u64(
            &get_env,
            ENV_CHANNEL_CAPACITY,
            DEFAULT_CHANNEL_CAPACITY as u64,
            false,
        )?;

        Ok(Self {
            schedule,
            cancel_reason,
            dish_cache_ttl: Duration::from_secs(ttl_secs),
            cache_lock_timeout: (lock_timeout_ms > 0)
                .then(|| Duration::from_millis(lock_timeout_ms)),
            lock_sweep_interval: (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs)),
            redelivery_delay: Duration::from_millis(redelivery_ms),
            max_redeliveries: u32::try_from(max_redeliveries).map_err(|_| {
                invalid(ENV_MAX_REDELIVERIES, &max_redeliveries.to_string(), "exceeds u32")
            })?,
            channel_capacity: usize::try_from(capacity).map_err(|_| {
                invalid(ENV_CHANNEL_CAPACITY, &capacity.to_string(), "exceeds usize")
            })?,
        })
    }

    pub fn delay_queue(&self) -> DelayQueueSettings {
        DelayQueueSettings {
            redelivery_delay: self.redelivery_delay,
            max_redeliveries: self.max_redeliveries,
            capacity: self.channel_capacity,
        }
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_u64<F>(
    get_env: &F,
    key: &'static str,
    default: u64,
    zero_ok: bool,
) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = get_env(key) else {
        return Ok(default);
    };
    let parsed = raw
        .trim()
        .parse::<u64>()
        .map_err(|_| invalid(key, &raw, "expected a non-negative integer"))?;
    if parsed == 0 && !zero_ok {
        return Err(invalid(key, &raw, "must be greater than zero"));
    }
    Ok(parsed)
}

fn parse_schedule(raw: &str) -> Result<StageSchedule, ConfigError> {
    let millis = raw
        .split(',')
        .map(|part| {
            part.trim().parse::<u64>().map_err(|_| {
                invalid(ENV_STAGE_SCHEDULE_MS, raw, "expected comma-separated milliseconds")
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    StageSchedule::from_millis(&millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_gives_defaults() {
        let config = PipelineConfig::from_env_with(|_| None).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.schedule.len(), 5);
        assert_eq!(config.cancel_reason, "payment timeout, auto-cancelled");
        assert_eq!(config.dish_cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.lock_sweep_interval, None);
    }

    #[test]
    fn test_overrides() {
        let config = PipelineConfig::from_env_with(lookup(&[
            (ENV_STAGE_SCHEDULE_MS, "100, 200,300"),
            (ENV_CANCEL_REASON, "unpaid"),
            (ENV_CACHE_LOCK_TIMEOUT_MS, "0"),
            (ENV_LOCK_SWEEP_INTERVAL_SECS, "60"),
            (ENV_MAX_REDELIVERIES, "0"),
        ]))
        .unwrap();

        assert_eq!(config.schedule, StageSchedule::from_millis(&[100, 200, 300]).unwrap());
        assert_eq!(config.cancel_reason, "unpaid");
        assert_eq!(config.cache_lock_timeout, None);
        assert_eq!(config.lock_sweep_interval, Some(Duration::from_secs(60)));
        assert_eq!(config.delay_queue().max_redeliveries, 0);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for (key, value) in [
            (ENV_STAGE_SCHEDULE_MS, ""),
            (ENV_STAGE_SCHEDULE_MS, "100,abc"),
            (ENV_STAGE_SCHEDULE_MS, "100,0"),
            (ENV_CANCEL_REASON, "  "),
            (ENV_DISH_CACHE_TTL_SECS, "0"),
            (ENV_REDELIVERY_DELAY_MS, "-5"),
            (ENV_CHANNEL_CAPACITY, "lots"),
        ] {
            let result = PipelineConfig::from_env_with(lookup(&[(key, value)]));
            assert!(result.is_err(), "{key}={value:?} should be rejected");
        }
    }
}
