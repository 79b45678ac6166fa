//! Best-effort platform health read from procfs and the machine id.

use std::fs;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Health {
    /// `MemAvailable` from /proc/meminfo.
    pub mem_available_kb: Option<u64>,
    /// Current frequency of cpu0.
    pub cpu_mhz: Option<f32>,
    /// Contents of /etc/machine-id.
    pub device_id: Option<String>,
}

pub fn parse_meminfo(text: &str) -> Option<u64> {
    text.lines()
        .find_map(|l| l.strip_prefix("MemAvailable:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|n| n.parse().ok())
}

/// First `cpu MHz` entry of /proc/cpuinfo.
pub fn parse_cpuinfo_mhz(text: &str) -> Option<f32> {
    text.lines()
        .filter(|l| l.starts_with("cpu MHz"))
        .find_map(|l| l.split(':').nth(1))
        .and_then(|v| v.trim().parse().ok())
}

fn cpu_mhz() -> Option<f32> {
    // cpufreq reports kHz; x86 and most VMs only expose cpuinfo
    fs::read_to_string("/sys/devices/system/cpu/cpu0/cpufreq/scaling_cur_freq")
        .ok()
        .and_then(|s| s.trim().parse::<f32>().ok())
        .map(|khz| khz / 1000.0)
        .or_else(|| {
            fs::read_to_string("/proc/cpuinfo")
                .ok()
                .and_then(|s| parse_cpuinfo_mhz(&s))
        })
}

pub fn read_health() -> Health {
    Health {
        mem_available_kb: fs::read_to_string("/proc/meminfo")
            .ok()
            .and_then(|s| parse_meminfo(&s)),
        cpu_mhz: cpu_mhz(),
        device_id: fs::read_to_string("/etc/machine-id")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
    }
}
