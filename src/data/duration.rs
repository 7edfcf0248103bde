use std::time::Duration;

use crate::error::ConfigError;

/// Suffix to nanoseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("µs", 1_000.0),
    ("us", 1_000.0),
    ("ms", 1_000_000.0),
    ("s", 1_000_000_000.0),
    ("m", 60_000_000_000.0),
];

/// Parse duration strings like "200ms", "1.5s", "250us", "2m".
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let s = s.trim();

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            let val: f64 = val_str
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidDuration(s.to_string()))?;
            if !val.is_finite() || val < 0.0 {
                return Err(ConfigError::InvalidDuration(s.to_string()));
            }
            return Ok(Duration::from_nanos((val * multiplier) as u64));
        }
    }

    Err(ConfigError::InvalidDuration(s.to_string()))
}

/// Format a duration for display
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        "0ns".to_string()
    } else if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.0}µs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.0}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

/// Format a latency in milliseconds, switching unit with magnitude.
///
/// NaN (no reply) renders as `N/A`.
pub fn format_latency(ms: f64) -> String {
    if ms.is_nan() {
        "N/A".to_string()
    } else if ms < 1.0 {
        format!("{:.0}µs", ms * 1_000.0)
    } else if ms < 1_000.0 {
        format!("{:.1}ms", ms)
    } else {
        format!("{:.2}s", ms / 1_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        let d = parse_duration("1.5s").unwrap();
        assert_eq!(d, Duration::from_millis(1500));
    }

    #[test]
    fn test_parse_milliseconds() {
        let d = parse_duration("200ms").unwrap();
        assert_eq!(d, Duration::from_millis(200));
    }

    #[test]
    fn test_parse_microseconds() {
        assert_eq!(parse_duration("250us").unwrap().as_nanos(), 250_000);
        assert_eq!(parse_duration("16µs").unwrap().as_nanos(), 16_000);
    }

    #[test]
    fn test_parse_minutes() {
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_duration("fast").is_err());
        assert!(parse_duration("12").is_err());
        assert!(parse_duration("-3s").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(200)), "200ms");
        assert_eq!(format_duration(Duration::from_secs(3)), "3.0s");
    }

    #[test]
    fn test_format_latency_units() {
        assert_eq!(format_latency(0.25), "250µs");
        assert_eq!(format_latency(15.56), "15.6ms");
        assert_eq!(format_latency(1234.0), "1.23s");
        assert_eq!(format_latency(f64::NAN), "N/A");
    }
}
