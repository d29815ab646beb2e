//! Settings for the stages this crate assembles, with sensible defaults.
//!
//! Nothing in [`crate::component`], [`crate::balancer`], [`crate::cache`],
//! [`crate::session`], or [`crate::storage`] reads this module -- every
//! stage takes its tuning parameters as plain constructor arguments.
//! `PipelineConfig` exists purely so a binary assembling those stages into
//! a service has one place to gather the numbers from the environment or
//! the command line, the way [`crate::middleware::RecoveryConfig`] does for
//! the HTTP-layer timeout.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

const DEFAULT_STATIC_POOL_SIZE: usize = 4;
const DEFAULT_DYNAMIC_MAX_WORKERS: usize = 16;
const DEFAULT_DYNAMIC_ADD_TIMEOUT_SECS: u64 = 1;
const DEFAULT_DYNAMIC_REMOVE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CACHE_EXPIRATION_SECS: u64 = 60;
const DEFAULT_SESSION_EXPIRATION_SECS: u64 = 1800;
const DEFAULT_STORAGE_SWEEP_INTERVAL_SECS: u64 = 60;

/// Tuning parameters for the stages a service assembles out of this crate.
///
/// All fields have defaults matching the constants above; every accessor
/// returns a ready-to-use [`Duration`] or count rather than a raw integer,
/// mirroring the style of the workspace's other `*Config` types.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct PipelineConfig {
    /// Fixed worker count for a [`crate::balancer::StaticLoadBalancer`].
    #[cfg_attr(
        feature = "config",
        arg(long, env = "MPSERVER_STATIC_POOL_SIZE", default_value_t = DEFAULT_STATIC_POOL_SIZE)
    )]
    #[serde(default = "default_static_pool_size")]
    pub static_pool_size: usize,

    /// Upper bound on worker count for a [`crate::balancer::DynamicLoadBalancer`].
    #[cfg_attr(
        feature = "config",
        arg(long, env = "MPSERVER_DYNAMIC_MAX_WORKERS", default_value_t = DEFAULT_DYNAMIC_MAX_WORKERS)
    )]
    #[serde(default = "default_dynamic_max_workers")]
    pub dynamic_max_workers: usize,

    /// How long the dynamic balancer waits for a worker to accept a job
    /// before spawning another, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "MPSERVER_DYNAMIC_ADD_TIMEOUT_SECS", default_value_t = DEFAULT_DYNAMIC_ADD_TIMEOUT_SECS)
    )]
    #[serde(default = "default_dynamic_add_timeout_secs")]
    pub dynamic_add_timeout_secs: u64,

    /// How long the dynamic balancer waits without a job before shutting
    /// down its most-recently-added worker, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "MPSERVER_DYNAMIC_REMOVE_TIMEOUT_SECS", default_value_t = DEFAULT_DYNAMIC_REMOVE_TIMEOUT_SECS)
    )]
    #[serde(default = "default_dynamic_remove_timeout_secs")]
    pub dynamic_remove_timeout_secs: u64,

    /// How long a [`crate::cache::CacheComponent`] entry stays fresh before
    /// the next lookup invalidates it, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "MPSERVER_CACHE_EXPIRATION_SECS", default_value_t = DEFAULT_CACHE_EXPIRATION_SECS)
    )]
    #[serde(default = "default_cache_expiration_secs")]
    pub cache_expiration_secs: u64,

    /// How long a [`crate::session::SessionManager`] session stays alive
    /// without being advanced, in seconds. Zero means sessions never
    /// expire.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "MPSERVER_SESSION_EXPIRATION_SECS", default_value_t = DEFAULT_SESSION_EXPIRATION_SECS)
    )]
    #[serde(default = "default_session_expiration_secs")]
    pub session_expiration_secs: u64,

    /// How often a [`crate::storage::StorageCleaner`] wakes up to sweep
    /// expired entries, in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "MPSERVER_STORAGE_SWEEP_INTERVAL_SECS", default_value_t = DEFAULT_STORAGE_SWEEP_INTERVAL_SECS)
    )]
    #[serde(default = "default_storage_sweep_interval_secs")]
    pub storage_sweep_interval_secs: u64,
}

fn default_static_pool_size() -> usize {
    DEFAULT_STATIC_POOL_SIZE
}

fn default_dynamic_max_workers() -> usize {
    DEFAULT_DYNAMIC_MAX_WORKERS
}

fn default_dynamic_add_timeout_secs() -> u64 {
    DEFAULT_DYNAMIC_ADD_TIMEOUT_SECS
}

fn default_dynamic_remove_timeout_secs() -> u64 {
    DEFAULT_DYNAMIC_REMOVE_TIMEOUT_SECS
}

fn default_cache_expiration_secs() -> u64 {
    DEFAULT_CACHE_EXPIRATION_SECS
}

fn default_session_expiration_secs() -> u64 {
    DEFAULT_SESSION_EXPIRATION_SECS
}

fn default_storage_sweep_interval_secs() -> u64 {
    DEFAULT_STORAGE_SWEEP_INTERVAL_SECS
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            static_pool_size: DEFAULT_STATIC_POOL_SIZE,
            dynamic_max_workers: DEFAULT_DYNAMIC_MAX_WORKERS,
            dynamic_add_timeout_secs: DEFAULT_DYNAMIC_ADD_TIMEOUT_SECS,
            dynamic_remove_timeout_secs: DEFAULT_DYNAMIC_REMOVE_TIMEOUT_SECS,
            cache_expiration_secs: DEFAULT_CACHE_EXPIRATION_SECS,
            session_expiration_secs: DEFAULT_SESSION_EXPIRATION_SECS,
            storage_sweep_interval_secs: DEFAULT_STORAGE_SWEEP_INTERVAL_SECS,
        }
    }
}

impl PipelineConfig {
    /// Timeout the dynamic balancer waits for a worker to accept a job.
    #[inline]
    #[must_use]
    pub fn dynamic_add_timeout(&self) -> Duration {
        Duration::from_secs(self.dynamic_add_timeout_secs)
    }

    /// Timeout the dynamic balancer waits without a job before scaling down.
    #[inline]
    #[must_use]
    pub fn dynamic_remove_timeout(&self) -> Duration {
        Duration::from_secs(self.dynamic_remove_timeout_secs)
    }

    /// How long a cache entry stays fresh.
    #[inline]
    #[must_use]
    pub fn cache_expiration(&self) -> Duration {
        Duration::from_secs(self.cache_expiration_secs)
    }

    /// How long a session stays alive without advancing. `None` means
    /// sessions never expire.
    #[inline]
    #[must_use]
    pub fn session_expiration(&self) -> Option<Duration> {
        (self.session_expiration_secs > 0).then(|| Duration::from_secs(self.session_expiration_secs))
    }

    /// How often [`crate::storage::StorageCleaner`] wakes up to sweep.
    #[inline]
    #[must_use]
    pub fn storage_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.storage_sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "config")]
    use clap::Parser;

    #[cfg(feature = "config")]
    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        pipeline: PipelineConfig,
    }

    #[test]
    fn defaults_match_the_documented_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.static_pool_size, DEFAULT_STATIC_POOL_SIZE);
        assert_eq!(config.dynamic_max_workers, DEFAULT_DYNAMIC_MAX_WORKERS);
        assert_eq!(config.dynamic_add_timeout(), Duration::from_secs(1));
        assert_eq!(config.cache_expiration(), Duration::from_secs(60));
        assert_eq!(config.session_expiration(), Some(Duration::from_secs(1800)));
    }

    #[test]
    fn zero_session_expiration_means_sessions_never_expire() {
        let config = PipelineConfig { session_expiration_secs: 0, ..PipelineConfig::default() };
        assert_eq!(config.session_expiration(), None);
    }

    #[test]
    fn round_trips_through_json() {
        let config = PipelineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: PipelineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.static_pool_size, config.static_pool_size);
    }

    #[cfg(feature = "config")]
    #[test]
    fn parses_from_environment_variables() {
        // SAFETY: test-only, single-threaded within this test's scope.
        unsafe {
            std::env::set_var("MPSERVER_STATIC_POOL_SIZE", "8");
        }
        let cli = Cli::parse_from(["test"]);
        assert_eq!(cli.pipeline.static_pool_size, 8);
        unsafe {
            std::env::remove_var("MPSERVER_STATIC_POOL_SIZE");
        }
    }
}
