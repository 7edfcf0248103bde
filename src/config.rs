//! Layered configuration and validated runtime settings.
//!
//! Sources, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. an optional config file (`--config`, any format the `config` crate reads)
//! 3. `RTTWATCH_*` environment variables, `__` separating nested keys
//!    (`RTTWATCH_PIPELINE__HISTORY_CAPACITY=300`)
//! 4. command line flags, applied by the binary on top of the loaded [`Settings`]
//!
//! ```toml
//! targets = ["1.1.1.1", "example.com:443"]
//!
//! [pipeline]
//! history_capacity = 150
//! refresh_interval = "200ms"
//!
//! [probe]
//! timeout = "2s"
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use chrono::TimeDelta;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::chart::ChartSettings;
use crate::data::duration::{format_duration, parse_duration};
use crate::data::HistoryPolicy;
use crate::error::ConfigError;

pub const MIN_HISTORY_CAPACITY: usize = 10;
pub const MAX_HISTORY_CAPACITY: usize = 1000;
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);
pub const MIN_PROBE_TIMEOUT: Duration = Duration::from_millis(100);

/// Settings as read from files and the environment. Durations are strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub targets: Vec<String>,
    pub pipeline: PipelineSettings,
    pub probe: ProbeSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub history_capacity: usize,
    pub refresh_interval: String,
    pub maintenance_interval: String,
    pub timeout_buffer_ratio: f64,
    pub value_buffer_ratio: f64,
    pub min_chart_width: u16,
    pub min_chart_height: u16,
    pub max_chart_size: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    pub interval: String,
    pub timeout: String,
    pub queue_capacity: usize,
    pub port: u16,
    pub family: AddressFamily,
}

/// Address family the probe engine connects over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    #[default]
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    pub fn matches(self, addr: &SocketAddr) -> bool {
        match self {
            AddressFamily::Ipv4 => addr.is_ipv4(),
            AddressFamily::Ipv6 => addr.is_ipv6(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            pipeline: PipelineSettings::default(),
            probe: ProbeSettings::default(),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            history_capacity: 150,
            refresh_interval: "200ms".to_string(),
            maintenance_interval: "200ms".to_string(),
            timeout_buffer_ratio: 1.2,
            value_buffer_ratio: 0.1,
            min_chart_width: 20,
            min_chart_height: 5,
            max_chart_size: 1000,
        }
    }
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            interval: "200ms".to_string(),
            timeout: "3s".to_string(),
            queue_capacity: 100,
            port: 80,
            family: AddressFamily::Ipv4,
        }
    }
}

impl Settings {
    /// Load defaults, then `path` if given, then `RTTWATCH_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        Self::load_with(path, environment())
    }

    /// Like [`Settings::load`] with an explicit environment source.
    pub fn load_with(path: Option<&Path>, env: Environment) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder.add_source(env).build()?.try_deserialize()
    }

    pub fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        let p = &self.pipeline;
        let config = PipelineConfig {
            history_capacity: p.history_capacity,
            refresh_interval: parse_duration(&p.refresh_interval)?,
            maintenance_interval: parse_duration(&p.maintenance_interval)?,
            timeout_buffer_ratio: p.timeout_buffer_ratio,
            value_buffer_ratio: p.value_buffer_ratio,
            min_chart_width: p.min_chart_width,
            min_chart_height: p.min_chart_height,
            max_chart_size: p.max_chart_size,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn probe_config(&self) -> Result<ProbeConfig, ConfigError> {
        let p = &self.probe;
        let config = ProbeConfig {
            interval: parse_duration(&p.interval)?,
            timeout: parse_duration(&p.timeout)?,
            queue_capacity: p.queue_capacity,
            port: p.port,
            family: p.family,
        };
        config.validate()?;
        Ok(config)
    }
}

/// `RTTWATCH_` prefixed variables, `__` between nested keys.
pub fn environment() -> Environment {
    Environment::with_prefix("RTTWATCH")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// Validated settings of the pipeline core.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub history_capacity: usize,
    pub refresh_interval: Duration,
    pub maintenance_interval: Duration,
    pub timeout_buffer_ratio: f64,
    pub value_buffer_ratio: f64,
    pub min_chart_width: u16,
    pub min_chart_height: u16,
    pub max_chart_size: u16,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            history_capacity: 150,
            refresh_interval: Duration::from_millis(200),
            maintenance_interval: Duration::from_millis(200),
            timeout_buffer_ratio: 1.2,
            value_buffer_ratio: 0.1,
            min_chart_width: 20,
            min_chart_height: 5,
            max_chart_size: 1000,
        }
    }
}

impl PipelineConfig {
    /// Reject the first out-of-range value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_HISTORY_CAPACITY..=MAX_HISTORY_CAPACITY).contains(&self.history_capacity) {
            return Err(ConfigError::HistoryCapacity {
                value: self.history_capacity,
                min: MIN_HISTORY_CAPACITY,
                max: MAX_HISTORY_CAPACITY,
            });
        }
        check_interval("refresh interval", self.refresh_interval)?;
        check_interval("maintenance interval", self.maintenance_interval)?;

        if !self.timeout_buffer_ratio.is_finite() || self.timeout_buffer_ratio < 1.0 {
            return Err(ConfigError::TimeoutBufferRatio(self.timeout_buffer_ratio));
        }
        if !self.value_buffer_ratio.is_finite() || self.value_buffer_ratio < 0.0 {
            return Err(ConfigError::ValueBufferRatio(self.value_buffer_ratio));
        }

        if self.min_chart_width == 0 {
            return Err(ConfigError::ZeroChartDimension {
                name: "min chart width",
            });
        }
        if self.min_chart_height == 0 {
            return Err(ConfigError::ZeroChartDimension {
                name: "min chart height",
            });
        }
        let min = self.min_chart_width.max(self.min_chart_height);
        if self.max_chart_size < min {
            return Err(ConfigError::MaxChartSize {
                max: self.max_chart_size,
                min,
            });
        }

        self.window_span().map(|_| ())
    }

    /// Age after which a Pending point is declared timed out.
    ///
    /// Fails when the scaled timeout does not fit in a duration.
    pub fn timeout_threshold(&self, probe_timeout: Duration) -> Result<TimeDelta, ConfigError> {
        Duration::try_from_secs_f64(probe_timeout.as_secs_f64() * self.timeout_buffer_ratio)
            .ok()
            .and_then(|threshold| TimeDelta::from_std(threshold).ok())
            .ok_or(ConfigError::TimeoutBufferRatio(self.timeout_buffer_ratio))
    }

    /// Capacity and interpolation tick for the series store.
    pub fn history_policy(&self) -> Result<HistoryPolicy, ConfigError> {
        Ok(HistoryPolicy {
            capacity: self.history_capacity,
            tick: to_delta(self.maintenance_interval)?,
        })
    }

    /// Width of the chart window: one maintenance tick per history slot.
    pub fn window_span(&self) -> Result<TimeDelta, ConfigError> {
        let tick = to_delta(self.maintenance_interval)?;
        i32::try_from(self.history_capacity)
            .ok()
            .and_then(|capacity| tick.checked_mul(capacity))
            .ok_or_else(|| ConfigError::InvalidDuration(format_duration(self.maintenance_interval)))
    }

    pub fn chart_settings(&self) -> ChartSettings {
        ChartSettings {
            min_width: self.min_chart_width,
            min_height: self.min_chart_height,
            max_size: self.max_chart_size,
            value_buffer_ratio: self.value_buffer_ratio,
        }
    }
}

/// Validated settings of the built-in probe engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeConfig {
    pub interval: Duration,
    pub timeout: Duration,
    pub queue_capacity: usize,
    /// Used for targets without an explicit port.
    pub port: u16,
    /// Resolved addresses of any other family are skipped.
    pub family: AddressFamily,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(200),
            timeout: Duration::from_secs(3),
            queue_capacity: 100,
            port: 80,
            family: AddressFamily::Ipv4,
        }
    }
}

impl ProbeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_interval("probe interval", self.interval)?;
        if self.timeout < MIN_PROBE_TIMEOUT {
            return Err(ConfigError::ProbeTimeout {
                value: self.timeout,
                min: MIN_PROBE_TIMEOUT,
            });
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::QueueCapacity);
        }
        Ok(())
    }
}

fn check_interval(name: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value < MIN_INTERVAL {
        return Err(ConfigError::IntervalTooShort {
            name,
            value,
            min: MIN_INTERVAL,
        });
    }
    Ok(())
}

fn to_delta(d: Duration) -> Result<TimeDelta, ConfigError> {
    TimeDelta::from_std(d).map_err(|_| ConfigError::InvalidDuration(format_duration(d)))
}
