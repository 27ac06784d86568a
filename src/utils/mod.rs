//! Utilities module for logging, error types and small formatting helpers

pub mod error;
pub mod logging;

// Re-export main types for convenience
pub use error::{Result, ResultExt, SaccharumError};
pub use logging::{init_logging, parse_level, LogConfig};

/// Format a probability (0-1) as a percentage string with one decimal
pub fn format_percent(probability: f32) -> String {
    format!("{:.1}%", probability * 100.0)
}

/// Format a duration in a human-readable way
pub fn format_duration(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else {
        let minutes = (seconds / 60.0).floor();
        let secs = seconds % 60.0;
        format!("{}m {:.0}s", minutes as u32, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.6543), "65.4%");
        assert_eq!(format_percent(1.0), "100.0%");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.25), "250ms");
        assert_eq!(format_duration(30.5), "30.5s");
        assert_eq!(format_duration(90.0), "1m 30s");
    }
}
