//! General time utility functions

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if the nanosecond count overflows.
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Format a number of elapsed seconds as `"{h}h {m}m {s}s"`.
pub fn format_hms(elapsed_s: u64) -> String {
    let hours = elapsed_s / 3600;
    let minutes = (elapsed_s % 3600) / 60;
    let seconds = elapsed_s % 60;

    format!("{}h {}m {}s", hours, minutes, seconds)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        assert_eq!(
            duration_to_seconds(chrono::Duration::milliseconds(1500)),
            Some(1.5)
        );
    }

    #[test]
    fn test_format_hms() {
        assert_eq!(format_hms(0), "0h 0m 0s");
        assert_eq!(format_hms(3725), "1h 2m 5s");
        assert_eq!(format_hms(90_061), "25h 1m 1s");
    }
}
