use std::time::Duration;

/// Process configuration, read from `SLOTKEEP_*` environment variables.
/// Missing or unparsable values fall back to defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub adapter_timeout: Duration,
    pub sweep_interval: Duration,
    pub notify_channel_capacity: usize,
    pub metrics_port: Option<u16>,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            adapter_timeout: Duration::from_millis(5_000),
            sweep_interval: Duration::from_secs(60),
            notify_channel_capacity: 256,
            metrics_port: None,
            log_json: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        Self {
            adapter_timeout: parsed("SLOTKEEP_ADAPTER_TIMEOUT_MS")
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.adapter_timeout),
            sweep_interval: parsed("SLOTKEEP_SWEEP_INTERVAL_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            notify_channel_capacity: parsed("SLOTKEEP_NOTIFY_CHANNEL_CAPACITY")
                .filter(|c| *c > 0)
                .map(|c| c as usize)
                .unwrap_or(defaults.notify_channel_capacity),
            metrics_port: lookup("SLOTKEEP_METRICS_PORT").and_then(|s| s.trim().parse().ok()),
            log_json: lookup("SLOTKEEP_LOG_JSON")
                .map(|s| matches!(s.trim(), "1" | "true" | "yes"))
                .unwrap_or(defaults.log_json),
        }
    }

    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            adapter_timeout: self.adapter_timeout,
        }
    }
}

/// The part of the configuration the booking engine itself reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on any single adapter or notifier call.
    pub adapter_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Config::default().engine()
    }
}
