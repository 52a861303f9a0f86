//! Backend detection and auto-selection.
//!
//! Each runtime is probed through the same queries the selector uses, so
//! a backend only ranks high when it exposes a double-precision device.

use tracing::debug;

use super::query::{self, AttributeScratch, has_double_precision};
use super::{Backend, ClRuntime, CpuRuntime, DeviceAttribute, DeviceCategory};

/// What a probe of one backend found.
#[derive(Debug, Clone)]
pub struct BackendInfo {
    /// Backend type.
    pub backend: Backend,
    /// Human-readable name.
    pub name: &'static str,
    /// Whether the runtime answered at all.
    pub available: bool,
    /// Platforms reported.
    pub platforms: usize,
    /// Devices reported across all platforms.
    pub devices: usize,
    /// Devices advertising double precision.
    pub fp64_devices: usize,
    /// Priority for auto-selection (higher = preferred).
    pub priority: u32,
}

impl BackendInfo {
    /// Probes `runtime` across every platform and device category.
    ///
    /// Query failures leave the counts at what was found so far.
    fn probe<R: ClRuntime>(backend: Backend, name: &'static str, runtime: &R, base_priority: u32) -> Self {
        let mut info = Self {
            backend,
            name,
            available: false,
            platforms: 0,
            devices: 0,
            fp64_devices: 0,
            priority: 0,
        };
        let Ok(platforms) = query::list_platforms(runtime) else {
            return info;
        };
        info.available = !platforms.is_empty();
        info.platforms = platforms.len();

        let mut scratch = AttributeScratch::new();
        for platform in platforms {
            let Ok(devices) = query::list_devices(runtime, platform, DeviceCategory::All) else {
                continue;
            };
            info.devices += devices.len();
            info.fp64_devices += devices
                .into_iter()
                .filter(|&device| {
                    scratch
                        .device_attribute(runtime, device, DeviceAttribute::Extensions)
                        .is_ok_and(|ext| has_double_precision(&ext))
                })
                .count();
        }

        // Without a double-precision device a render cannot start.
        info.priority = match (info.available, info.fp64_devices) {
            (false, _) => 0,
            (true, 0) => 1,
            (true, _) => base_priority,
        };
        debug!(
            backend = name,
            platforms = info.platforms,
            devices = info.devices,
            fp64 = info.fp64_devices,
            "Probed backend"
        );
        info
    }

    /// One-line summary, e.g. `2 platforms, 3 devices, 1 with fp64`.
    pub fn description(&self) -> String {
        if !self.available {
            return "no platforms".to_string();
        }
        format!(
            "{} platform{}, {} device{}, {} with fp64",
            self.platforms,
            if self.platforms == 1 { "" } else { "s" },
            self.devices,
            if self.devices == 1 { "" } else { "s" },
            self.fp64_devices
        )
    }
}

/// Detect all available backends.
pub fn detect_backends() -> Vec<BackendInfo> {
    #[allow(unused_mut)]
    let mut backends = vec![BackendInfo::probe(Backend::Cpu, "CPU", &CpuRuntime::new(), 10)];

    #[cfg(feature = "opencl")]
    backends.push(BackendInfo::probe(
        Backend::OpenCl,
        "OpenCL",
        &super::OpenClRuntime::new(),
        100,
    ));

    backends.sort_by(|a, b| b.priority.cmp(&a.priority));
    backends
}

/// Select the best available backend.
pub fn select_best_backend() -> Backend {
    detect_backends()
        .into_iter()
        .filter(|b| b.available)
        .max_by_key(|b| b.priority)
        .map(|b| b.backend)
        .unwrap_or(Backend::Cpu)
}

/// Get description of available backends.
pub fn describe_backends() -> String {
    let mut desc = String::new();
    for info in detect_backends() {
        let status = if info.available { "+" } else { "-" };
        desc.push_str(&format!("[{}] {}: {}\n", status, info.name, info.description()));
    }
    desc
}
