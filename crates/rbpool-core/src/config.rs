//! Allocator and tree configuration.
//!
//! Pool behaviour can be tuned through environment variables, read once per
//! process and cached:
//! - `RBPOOL_OOM_POLICY`: `abort` (default) terminates the process when the
//!   host heap refuses a request and no out-of-memory handler is installed.
//!   `error` surfaces [`crate::AllocError::OutOfMemory`] to the caller instead.
//! - `RBPOOL_LOG`: minimum lifecycle log level kept in memory
//!   (`trace`, `debug`, `info`, `warn`, `error`, `off`). Default `warn`.
//! - `RBPOOL_REFILL_BATCH`: number of blocks requested per free-list refill.
//!   Default 20.

use std::sync::OnceLock;

use crate::log::LogLevel;

/// Number of blocks a refill asks `chunk_alloc` for.
pub const DEFAULT_REFILL_BATCH: usize = 20;

/// What the fallback allocator does when the host heap refuses a request and
/// no out-of-memory handler is registered.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OomPolicy {
    /// Record a fatal lifecycle event and abort the process.
    #[default]
    Abort,
    /// Return `AllocError::OutOfMemory` to the caller.
    Error,
}

impl OomPolicy {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" | "fatal" | "default" => Self::Abort,
            "error" | "err" | "surface" | "result" => Self::Error,
            _ => Self::Abort,
        }
    }

    /// Returns true if exhaustion is reported to the caller.
    #[must_use]
    pub const fn surfaces_errors(self) -> bool {
        matches!(self, Self::Error)
    }
}

/// Parse a log level threshold. `off` maps to `None`.
#[must_use]
pub fn log_level_from_str_loose(s: &str) -> Option<LogLevel> {
    match s.trim().to_ascii_lowercase().as_str() {
        "trace" => Some(LogLevel::Trace),
        "debug" => Some(LogLevel::Debug),
        "info" => Some(LogLevel::Info),
        "warn" | "warning" => Some(LogLevel::Warn),
        "error" => Some(LogLevel::Error),
        "fatal" => Some(LogLevel::Fatal),
        "off" | "none" | "disabled" => None,
        _ => Some(LogLevel::Warn),
    }
}

/// Pool allocator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Blocks requested per free-list refill. Always at least 1.
    pub refill_batch: usize,
    /// Behaviour on unrecoverable host heap exhaustion.
    pub oom_policy: OomPolicy,
    /// Minimum level kept by the lifecycle log. `None` disables logging.
    pub log_level: Option<LogLevel>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            refill_batch: DEFAULT_REFILL_BATCH,
            oom_policy: OomPolicy::default(),
            log_level: Some(LogLevel::Warn),
        }
    }
}

impl PoolConfig {
    /// Builds a configuration from the `RBPOOL_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let oom_policy = std::env::var("RBPOOL_OOM_POLICY")
            .map(|v| OomPolicy::from_str_loose(&v))
            .unwrap_or(defaults.oom_policy);
        let log_level = std::env::var("RBPOOL_LOG")
            .map(|v| log_level_from_str_loose(&v))
            .unwrap_or(defaults.log_level);
        let refill_batch = std::env::var("RBPOOL_REFILL_BATCH")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or(defaults.refill_batch);
        Self {
            refill_batch,
            oom_policy,
            log_level,
        }
    }

    /// Same configuration with a different OOM policy.
    #[must_use]
    pub const fn with_oom_policy(mut self, oom_policy: OomPolicy) -> Self {
        self.oom_policy = oom_policy;
        self
    }

    /// Same configuration with a different log threshold.
    #[must_use]
    pub const fn with_log_level(mut self, log_level: Option<LogLevel>) -> Self {
        self.log_level = log_level;
        self
    }

    /// Same configuration with a different refill batch (clamped to 1).
    #[must_use]
    pub fn with_refill_batch(mut self, refill_batch: usize) -> Self {
        self.refill_batch = refill_batch.max(1);
        self
    }
}

static GLOBAL_CONFIG: OnceLock<PoolConfig> = OnceLock::new();

/// Process-wide configuration (reads env vars on first call, caches thereafter).
#[must_use]
pub fn global_config() -> PoolConfig {
    *GLOBAL_CONFIG.get_or_init(PoolConfig::from_env)
}

/// Per-tree configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeConfig {
    /// Maximum number of live nodes.
    pub node_limit: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            node_limit: crate::tree::node::MAX_NODES,
        }
    }
}

impl TreeConfig {
    /// Configuration with an explicit node cap, clamped to the index space.
    #[must_use]
    pub fn with_node_limit(node_limit: usize) -> Self {
        Self {
            node_limit: node_limit.min(crate::tree::node::MAX_NODES),
        }
    }
}
