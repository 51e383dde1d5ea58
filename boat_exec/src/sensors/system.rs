//! Host system status

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{path::Path, time::Instant};

use comms_if::eqpt::system::SystemStatus;
use sysinfo::{Disks, System};
use util::{maths::round_dp, time::format_hms};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// SoC temperature in millidegrees Celsius.
const CPU_TEMP_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Collects CPU, memory and disk usage of the host.
pub struct SystemStats {
    sys: System,
    disks: Disks,
    start: Instant,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SystemStats {
    pub fn new() -> Self {
        let mut sys = System::new();

        // CPU usage is measured between refreshes, so take the first sample now
        sys.refresh_cpu();

        Self {
            sys,
            disks: Disks::new_with_refreshed_list(),
            start: Instant::now(),
        }
    }

    pub fn get_status(&mut self) -> SystemStatus {
        self.sys.refresh_cpu();
        self.sys.refresh_memory();
        self.disks.refresh();

        SystemStatus {
            cpu_temp: read_cpu_temp(),
            cpu_usage: round_dp(self.sys.global_cpu_info().cpu_usage() as f64, 1),
            memory_usage: round_dp(
                percent(self.sys.used_memory(), self.sys.total_memory()),
                1
            ),
            disk_usage: round_dp(self.root_disk_usage(), 1),
            uptime: format_hms(self.start.elapsed().as_secs()),
        }
    }

    fn root_disk_usage(&self) -> f64 {
        self.disks.iter()
            .find(|d| d.mount_point() == Path::new("/"))
            .map(|d| percent(d.total_space().saturating_sub(d.available_space()), d.total_space()))
            .unwrap_or(0.0)
    }
}

impl Default for SystemStats {
    fn default() -> Self {
        Self::new()
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn read_cpu_temp() -> Option<f64> {
    let raw = std::fs::read_to_string(CPU_TEMP_PATH).ok()?;
    parse_millidegrees(&raw)
}

fn parse_millidegrees(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .map(|m| round_dp(m / 1000.0, 1))
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    }
    else {
        part as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_millidegrees() {
        assert_eq!(parse_millidegrees("48312\n"), Some(48.3));
        assert_eq!(parse_millidegrees(""), None);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(1, 4), 25.0);
        assert_eq!(percent(1, 0), 0.0);
    }

    #[test]
    fn test_status_ranges() {
        let status = SystemStats::new().get_status();

        assert!((0.0..=100.0).contains(&status.memory_usage));
        assert!((0.0..=100.0).contains(&status.disk_usage));
        assert_eq!(status.uptime, "0h 0m 0s");
    }
}
