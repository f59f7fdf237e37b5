//! Host telemetry reported by the `system_info` command.
//!
//! Every category is best effort: values the platform cannot provide are left
//! out of the map instead of failing the request.
use std::{ffi::OsStr, thread};

use serde_json::{Map, Value, json};
use sysinfo::{Components, MINIMUM_CPU_UPDATE_INTERVAL, Pid, ProcessesToUpdate, System};

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Number of logical cores available to the daemon, never less than one.
pub fn logical_cores() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Samples host CPU, memory and thermal sensors.
#[derive(Debug, Default)]
pub struct SystemInfo;

impl SystemInfo {
    /// Core counts, frequency, utilisation and load average.
    pub fn cpu(&self) -> Map<String, Value> {
        let mut system = System::new();
        system.refresh_cpu_all();
        thread::sleep(MINIMUM_CPU_UPDATE_INTERVAL);
        system.refresh_cpu_usage();

        let mut info = Map::new();
        info.insert("logical_cores".into(), json!(logical_cores()));

        let cpus = system.cpus();
        if let Some(first) = cpus.first() {
            if !first.brand().is_empty() {
                info.insert("brand".into(), json!(first.brand()));
            }
            let max_freq = cpus.iter().map(|cpu| cpu.frequency()).max().unwrap_or(0);
            if max_freq > 0 {
                info.insert("current_freq_mhz".into(), json!(first.frequency()));
                info.insert("max_freq_mhz".into(), json!(max_freq));
            }
            info.insert(
                "cpu_percent".into(),
                json!(round1(system.global_cpu_usage() as f64)),
            );
        }

        let load = System::load_average();
        info.insert(
            "load_average".into(),
            json!([round2(load.one), round2(load.five), round2(load.fifteen)]),
        );
        info
    }

    /// Total and available memory in GB plus the used percentage.
    pub fn memory(&self) -> Map<String, Value> {
        let mut system = System::new();
        system.refresh_memory();

        let mut info = Map::new();
        let total = system.total_memory();
        if total == 0 {
            return info;
        }
        let available = system.available_memory();
        let used_percent = (total.saturating_sub(available)) as f64 / total as f64 * 100.0;
        info.insert("total_gb".into(), json!(round1(total as f64 / BYTES_PER_GB)));
        info.insert(
            "available_gb".into(),
            json!(round1(available as f64 / BYTES_PER_GB)),
        );
        info.insert("used_percent".into(), json!(round1(used_percent)));
        info
    }

    /// Temperature per sensor label, in degrees Celsius.
    pub fn thermal(&self) -> Map<String, Value> {
        let components = Components::new_with_refreshed_list();
        let mut info = Map::new();
        for component in components.list() {
            let reading: Option<f32> = component.temperature().into();
            if let Some(celsius) = reading.filter(|t| t.is_finite()) {
                info.insert(
                    component.label().to_string(),
                    json!({ "current_c": round1(celsius as f64) }),
                );
            }
        }
        info
    }
}

/// PIDs of every process named `name`, excluding the calling process.
pub fn pids_named(name: &str) -> Vec<u32> {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);
    let own = Pid::from_u32(std::process::id());

    system
        .processes()
        .iter()
        .filter(|(pid, process)| **pid != own && comm_matches(process.name(), name))
        .map(|(pid, _)| pid.as_u32())
        .collect()
}

/// Linux truncates process names to 15 bytes, so compare on that prefix.
fn comm_matches(process_name: &OsStr, wanted: &str) -> bool {
    const COMM_LEN: usize = 15;
    let actual = process_name.to_string_lossy();
    if wanted.len() > COMM_LEN && actual.len() == COMM_LEN {
        return wanted.as_bytes().starts_with(actual.as_bytes());
    }
    actual == wanted
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logical_cores_is_positive() {
        assert!(logical_cores() >= 1);
    }

    #[test]
    fn memory_reports_sane_percentages() {
        let memory = SystemInfo.memory();
        if let Some(used) = memory.get("used_percent").and_then(Value::as_f64) {
            assert!((0.0..=100.0).contains(&used));
        }
    }

    #[test]
    fn cpu_always_reports_logical_cores() {
        let cpu = SystemInfo.cpu();
        assert_eq!(cpu["logical_cores"], json!(logical_cores()));
    }

    #[test]
    fn comm_matching_handles_truncated_names() {
        assert!(comm_matches(OsStr::new("xmrig"), "xmrig"));
        assert!(!comm_matches(OsStr::new("xmrig-proxy"), "xmrig"));
        assert!(comm_matches(
            OsStr::new("fake-worker-123"),
            "fake-worker-1234567"
        ));
    }

    #[test]
    fn pids_named_excludes_self() {
        let own = std::process::id();
        let name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .unwrap_or_default();
        assert!(!pids_named(&name).contains(&own));
    }
}
