//! Host hardware detection used for configuration defaults.

/// Logical CPU cores, or 4 if unknown.
pub fn detect_cpu_cores() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

/// Total system memory in bytes.
///
/// Reads `MemTotal` from `/proc/meminfo` on Linux. Falls back to 8 GB
/// elsewhere or if the file cannot be parsed.
#[cfg(target_os = "linux")]
pub fn detect_total_memory() -> usize {
    std::fs::read_to_string("/proc/meminfo")
        .ok()
        .and_then(|content| parse_meminfo_total(&content))
        .unwrap_or(FALLBACK_MEMORY)
}

#[cfg(not(target_os = "linux"))]
pub fn detect_total_memory() -> usize {
    FALLBACK_MEMORY
}

const FALLBACK_MEMORY: usize = 8 * 1024 * 1024 * 1024;

/// Extracts `MemTotal` (reported in kB) as bytes.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn parse_meminfo_total(content: &str) -> Option<usize> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("MemTotal:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse::<usize>().ok())
        .and_then(|kb| kb.checked_mul(1024))
}
