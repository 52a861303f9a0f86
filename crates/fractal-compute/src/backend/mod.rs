//! Compute runtimes and device management.
//!
//! # Architecture
//!
//! ```text
//! DeviceSelector<R: ClRuntime> -> ComputeSession<R> -> KernelExecutor
//!     +-- CpuRuntime    (rayon host reference)
//!     +-- OpenClRuntime (OpenCL 1.2+ via opencl3)
//! ```
//!
//! Everything above the runtime talks to the accelerator through
//! [`ClRuntime`], so selection, session and dispatch logic is shared by
//! every backend and can be exercised against a scripted runtime.

mod cpu_backend;
mod detect;
mod runtime;
pub mod query;
pub mod selector;
pub mod session;

#[cfg(feature = "opencl")]
mod opencl_backend;

pub use cpu_backend::CpuRuntime;
pub use detect::{detect_backends, select_best_backend, describe_backends, BackendInfo};
pub use runtime::{BoundArg, ClRuntime, DeviceAttribute, MemAccess, PlatformAttribute};

#[cfg(feature = "opencl")]
pub use opencl_backend::OpenClRuntime;

use std::fmt;
use std::str::FromStr;

/// OpenCL status codes used across runtimes.
pub mod status {
    use crate::Status;

    pub const SUCCESS: Status = 0;
    pub const DEVICE_NOT_FOUND: Status = -1;
    pub const BUILD_PROGRAM_FAILURE: Status = -11;
    pub const INVALID_VALUE: Status = -30;
    pub const INVALID_PLATFORM: Status = -32;
    pub const INVALID_DEVICE: Status = -33;
    pub const INVALID_MEM_OBJECT: Status = -38;
    pub const INVALID_PROGRAM_EXECUTABLE: Status = -45;
    pub const INVALID_KERNEL_NAME: Status = -46;
    pub const INVALID_ARG_INDEX: Status = -49;
    pub const INVALID_ARG_VALUE: Status = -50;
    pub const INVALID_KERNEL_ARGS: Status = -52;
    pub const INVALID_WORK_GROUP_SIZE: Status = -54;
    pub const INVALID_BUFFER_SIZE: Status = -61;
    pub const PLATFORM_NOT_FOUND_KHR: Status = -1001;
}

/// Available compute backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Auto-select best available (OpenCL > CPU).
    #[default]
    Auto,
    /// Host reference runtime using rayon.
    Cpu,
    /// OpenCL platforms and devices.
    OpenCl,
}

impl Backend {
    /// Check if this backend is available on current system.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Auto => true,
            Self::Cpu => true,
            #[cfg(feature = "opencl")]
            Self::OpenCl => OpenClRuntime::is_available(),
            #[cfg(not(feature = "opencl"))]
            Self::OpenCl => false,
        }
    }

    /// Get human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Cpu => "cpu",
            Self::OpenCl => "opencl",
        }
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "opencl" | "cl" => Ok(Self::OpenCl),
            other => Err(format!("unknown backend '{other}' (expected auto, cpu or opencl)")),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Device category requested during enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceCategory {
    /// Whatever the platform reports as its default device.
    #[default]
    Default,
    Cpu,
    Gpu,
    Accelerator,
    All,
}

impl DeviceCategory {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
            Self::Accelerator => "accelerator",
            Self::All => "all",
        }
    }
}

impl FromStr for DeviceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "cpu" => Ok(Self::Cpu),
            "gpu" => Ok(Self::Gpu),
            "accelerator" | "acc" => Ok(Self::Accelerator),
            "all" => Ok(Self::All),
            other => Err(format!(
                "unknown device type '{other}' (expected default, cpu, gpu, accelerator or all)"
            )),
        }
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_parse() {
        assert_eq!("CPU".parse::<Backend>().unwrap(), Backend::Cpu);
        assert_eq!("opencl".parse::<Backend>().unwrap(), Backend::OpenCl);
        assert!("cuda".parse::<Backend>().is_err());
    }

    #[test]
    fn test_cpu_always_available() {
        assert!(Backend::Cpu.is_available());
        assert!(Backend::Auto.is_available());
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("gpu".parse::<DeviceCategory>().unwrap(), DeviceCategory::Gpu);
        assert_eq!("default".parse::<DeviceCategory>().unwrap(), DeviceCategory::Default);
        assert!("fpga".parse::<DeviceCategory>().is_err());
    }
}
