//! Host-level plugin reading load average, memory and uptime from /proc.
//!
//! Parsing is split from file access so the parsers can be exercised
//! against fixed input.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::plugin::{Plugin, PluginError};
use crate::record::Record;

pub const NAME: &str = "system";

const LOADAVG_PATH: &str = "/proc/loadavg";
const MEMINFO_PATH: &str = "/proc/meminfo";
const UPTIME_PATH: &str = "/proc/uptime";

/// System load averages for 1, 5, and 15 minute intervals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadAverage {
    pub one_min: f64,
    pub five_min: f64,
    pub fifteen_min: f64,
}

/// Memory figures from /proc/meminfo, in bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemoryInfo {
    pub total_bytes: u64,
    pub available_bytes: u64,
    pub swap_total_bytes: u64,
    pub swap_free_bytes: u64,
}

impl MemoryInfo {
    /// Used memory ratio (0.0-1.0).
    pub fn used_ratio(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        1.0 - (self.available_bytes as f64 / self.total_bytes as f64)
    }
}

/// Parses /proc/loadavg content.
/// Format: "0.00 0.01 0.05 1/234 5678"
pub fn parse_load_average(content: &str) -> Result<LoadAverage, PluginError> {
    let parts: Vec<&str> = content.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(PluginError::Parse(format!(
            "invalid /proc/loadavg format: expected at least 3 fields, got {}",
            parts.len()
        )));
    }

    let parse = |field: &str, label: &str| {
        field
            .parse::<f64>()
            .map_err(|e| PluginError::Parse(format!("failed to parse {} load average: {}", label, e)))
    };

    Ok(LoadAverage {
        one_min: parse(parts[0], "1min")?,
        five_min: parse(parts[1], "5min")?,
        fifteen_min: parse(parts[2], "15min")?,
    })
}

/// Parses /proc/meminfo content. Values in the file are in kB.
pub fn parse_memory_info(content: &str) -> Result<MemoryInfo, PluginError> {
    let mut total_bytes: Option<u64> = None;
    let mut available_bytes: Option<u64> = None;
    let mut swap_total_bytes: Option<u64> = None;
    let mut swap_free_bytes: Option<u64> = None;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(kb) = value.parse::<u64>() else {
            continue;
        };
        let slot = match key {
            "MemTotal:" => &mut total_bytes,
            "MemAvailable:" => &mut available_bytes,
            "SwapTotal:" => &mut swap_total_bytes,
            "SwapFree:" => &mut swap_free_bytes,
            _ => continue,
        };
        *slot = Some(kb * 1024);
    }

    match (total_bytes, available_bytes, swap_total_bytes, swap_free_bytes) {
        (Some(total), Some(available), Some(swap_total), Some(swap_free)) => Ok(MemoryInfo {
            total_bytes: total,
            available_bytes: available,
            swap_total_bytes: swap_total,
            swap_free_bytes: swap_free,
        }),
        _ => Err(PluginError::Parse(
            "failed to parse required fields from /proc/meminfo".to_string(),
        )),
    }
}

/// Parses /proc/uptime content.
/// Format: "<uptime_seconds> <idle_seconds>"
pub fn parse_uptime(content: &str) -> Result<f64, PluginError> {
    content
        .split_whitespace()
        .next()
        .ok_or_else(|| PluginError::Parse("invalid /proc/uptime format: no fields found".into()))?
        .parse::<f64>()
        .map_err(|e| PluginError::Parse(format!("failed to parse uptime: {}", e)))
}

fn to_i64(bytes: u64) -> i64 {
    i64::try_from(bytes).unwrap_or(i64::MAX)
}

#[derive(Debug, Default)]
pub struct SystemPlugin {
    running: AtomicBool,
}

impl SystemPlugin {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Plugin for SystemPlugin {
    fn name(&self) -> &str {
        NAME
    }

    async fn start(&self) -> Result<(), PluginError> {
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), PluginError> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn collect(&self) -> Result<Record, PluginError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(PluginError::NotRunning);
        }

        let load = parse_load_average(&tokio::fs::read_to_string(LOADAVG_PATH).await?)?;
        let memory = parse_memory_info(&tokio::fs::read_to_string(MEMINFO_PATH).await?)?;
        let uptime = parse_uptime(&tokio::fs::read_to_string(UPTIME_PATH).await?)?;

        Ok(Record::new()
            .with("timestamp", Utc::now())
            .with("load_1", load.one_min)
            .with("load_5", load.five_min)
            .with("load_15", load.fifteen_min)
            .with("memory_total_bytes", to_i64(memory.total_bytes))
            .with("memory_available_bytes", to_i64(memory.available_bytes))
            .with("memory_used_ratio", memory.used_ratio())
            .with("swap_total_bytes", to_i64(memory.swap_total_bytes))
            .with("swap_free_bytes", to_i64(memory.swap_free_bytes))
            .with("uptime_seconds", uptime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMINFO: &str = "MemTotal:       16000000 kB
MemFree:         2000000 kB
MemAvailable:    8000000 kB
Buffers:          100000 kB
Cached:          3000000 kB
SwapTotal:       4000000 kB
SwapFree:        3000000 kB
";

    #[test]
    fn test_parse_load_average() {
        let load = parse_load_average("0.50 1.25 2.00 1/234 5678\n").unwrap();
        assert_eq!(
            load,
            LoadAverage {
                one_min: 0.5,
                five_min: 1.25,
                fifteen_min: 2.0
            }
        );
    }

    #[test]
    fn test_parse_load_average_too_short() {
        assert!(parse_load_average("0.50 1.25").is_err());
    }

    #[test]
    fn test_parse_memory_info() {
        let memory = parse_memory_info(MEMINFO).unwrap();
        assert_eq!(memory.total_bytes, 16_000_000 * 1024);
        assert_eq!(memory.available_bytes, 8_000_000 * 1024);
        assert_eq!(memory.swap_free_bytes, 3_000_000 * 1024);
        assert!((memory.used_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parse_memory_info_missing_fields() {
        assert!(parse_memory_info("MemTotal: 1000 kB\n").is_err());
    }

    #[test]
    fn test_parse_uptime() {
        assert_eq!(parse_uptime("12345.67 54321.00\n").unwrap(), 12345.67);
        assert!(parse_uptime("").is_err());
    }

    #[tokio::test]
    async fn test_collect_before_start_fails() {
        let plugin = SystemPlugin::new();
        assert!(matches!(
            plugin.collect().await,
            Err(PluginError::NotRunning)
        ));
    }
}
