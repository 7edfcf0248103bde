//! Error types for configuration and sample sources.

use std::time::Duration;

use thiserror::Error;

/// A configuration value outside its documented range.
///
/// Configuration is rejected as a whole; values are never clamped.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("history capacity must be between {min} and {max}, got {value}")]
    HistoryCapacity { value: usize, min: usize, max: usize },

    #[error("{name} must be at least {min:?}, got {value:?}")]
    IntervalTooShort {
        name: &'static str,
        value: Duration,
        min: Duration,
    },

    #[error("timeout buffer ratio must be a finite number >= 1.0, got {0}")]
    TimeoutBufferRatio(f64),

    #[error("value buffer ratio must be a finite number >= 0, got {0}")]
    ValueBufferRatio(f64),

    #[error("{name} must be greater than 0")]
    ZeroChartDimension { name: &'static str },

    #[error("max chart size ({max}) must not be smaller than the minimum chart dimensions ({min})")]
    MaxChartSize { max: u16, min: u16 },

    #[error("probe timeout must be at least {min:?}, got {value:?}")]
    ProbeTimeout { value: Duration, min: Duration },

    #[error("queue capacity must be greater than 0")]
    QueueCapacity,

    #[error("invalid duration '{0}'")]
    InvalidDuration(String),

    #[error("no targets given")]
    NoTargets,
}

/// Errors raised at the sample source boundary.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    #[error("sample stream was already taken")]
    StreamTaken,

    #[error("source was stopped and cannot be restarted")]
    Stopped,

    #[error(transparent)]
    Config(#[from] ConfigError),
}
