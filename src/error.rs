//! Error types for EcoSync.
//!
//! Engine commands never fail on bad input: unknown ids and unmet
//! preconditions leave the snapshot unchanged. The errors here cover the
//! remaining cases (configuration, background threads, subscriber streams)
//! plus an explicit redemption outcome for callers that want to tell the
//! user why a reward could not be claimed.

use thiserror::Error;

/// Configuration errors raised when an engine is constructed.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Tick interval for '{engine}' must be greater than zero")]
    ZeroTickInterval {
        engine: String,
    },

    #[error("Step increment range {min}..={max} is empty")]
    EmptyStepIncrement {
        min: u64,
        max: u64,
    },

    #[error("Snapshot stream capacity must be greater than zero")]
    ZeroStreamCapacity,

    #[error("Initial battery state of charge {soc} is outside [{min}, {max}]")]
    BatterySocOutOfRange {
        soc: i32,
        min: i32,
        max: i32,
    },

    #[error("Origin latitude {lat} / longitude {lon} is not a valid coordinate")]
    InvalidOrigin {
        lat: f64,
        lon: f64,
    },

    #[error("Reward '{id}' must cost at least one point")]
    ZeroRewardPrice {
        id: String,
    },

    #[error("Reward id '{id}' appears more than once in the catalog")]
    DuplicateRewardId {
        id: String,
    },
}

/// Errors from background tickers and snapshot streams.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Failed to spawn ticker thread '{name}': {message}")]
    SpawnFailed {
        name: String,
        message: String,
    },

    #[error("Operation timed out after {duration_ms}ms")]
    Timeout {
        duration_ms: u64,
    },

    #[error("Channel disconnected: {path}")]
    Disconnected {
        path: String,
    },

    #[error("No snapshot available on {path}")]
    Empty {
        path: String,
    },
}

/// Why a redemption was refused. The engine state is untouched in every case.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RedeemError {
    #[error("Reward not found: {id}")]
    UnknownReward {
        id: String,
    },

    #[error("Reward '{id}' was already redeemed")]
    AlreadyRedeemed {
        id: String,
    },

    #[error("Reward '{id}' needs {required} points, only {available} available")]
    InsufficientPoints {
        id: String,
        required: u64,
        available: u64,
    },
}

/// Top-level error type for EcoSync.
#[derive(Debug, Error, PartialEq)]
pub enum EcoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("Redemption error: {0}")]
    Redeem(#[from] RedeemError),
}

impl EcoError {
    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns true if this is a runtime error.
    #[must_use]
    pub const fn is_runtime(&self) -> bool {
        matches!(self, Self::Runtime(_))
    }

    /// Returns true if this is a redemption error.
    #[must_use]
    pub const fn is_redeem(&self) -> bool {
        matches!(self, Self::Redeem(_))
    }

    /// Returns true if retrying the same call may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Runtime(e) => matches!(
                e,
                RuntimeError::Timeout { .. } | RuntimeError::Empty { .. } | RuntimeError::SpawnFailed { .. }
            ),
            // More steps can turn an insufficient balance into a valid one.
            Self::Redeem(e) => matches!(e, RedeemError::InsufficientPoints { .. }),
        }
    }
}

/// Result type alias for EcoSync operations.
pub type EcoResult<T> = Result<T, EcoError>;
