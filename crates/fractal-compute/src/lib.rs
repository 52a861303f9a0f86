//! Accelerator dispatch for escape-time fractals.
//!
//! Discovers compute platforms and devices, selects a double-precision
//! device, compiles the `ComputeColor` kernel, launches it over a padded
//! 2D grid and reads the per-pixel colors back.
//!
//! # Architecture
//!
//! ```text
//! pipeline::render
//!     └── ClRuntime (accelerator API seam)
//!             ├── CpuRuntime    (host reference, rayon)
//!             └── OpenClRuntime (opencl3, feature "opencl")
//!
//! DeviceSelector ──> ComputeSession ──> DispatchPlan ──> KernelExecutor
//!  (query, policy)   (context, queue,    (grid, args)     (write, launch,
//!                     program)                             blocking read)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use fractal_compute::{render, FirstEligible, RenderJob};
//!
//! let job = RenderJob::new(FractalMode::Mandelbrot, "params.txt", "out.png");
//! let summary = render(&job, &mut FirstEligible)?;
//! ```

pub mod backend;
pub mod dispatch;
#[cfg(feature = "io")]
pub mod pipeline;

pub use backend::{
    Backend, BoundArg, ClRuntime, CpuRuntime, DeviceAttribute, DeviceCategory, MemAccess, PlatformAttribute,
    detect_backends, describe_backends, select_best_backend,
};
pub use backend::query::{AttributeScratch, describe_platform, has_double_precision, FP64_EXTENSION};
pub use backend::selector::{
    DeviceSelector, DeviceSummary, FirstEligible, InteractivePrompt, PlatformSummary, Preset, SelectedDevice,
    SelectionStrategy,
};
pub use backend::session::{ComputeSession, load_kernel_source, DEFAULT_KERNEL_FILE};
#[cfg(feature = "opencl")]
pub use backend::OpenClRuntime;
pub use dispatch::{BufferSlot, DispatchPlan, KernelArg, KernelExecutor, WorkGeometry, KERNEL_NAME, TILE_SIZE};
#[cfg(feature = "io")]
pub use pipeline::{render, run, RenderConfig, RenderJob, RenderSummary};

use std::path::PathBuf;

use thiserror::Error;

/// Status code reported by the accelerator API (0 = success).
pub type Status = i32;

/// Compute pipeline errors.
#[derive(Error, Debug)]
pub enum ComputeError {
    /// Platform, device, context, queue, program, buffer or kernel call failed.
    #[error("Step {step}, status = {status}")]
    ConfigurationFailure { step: &'static str, status: Status },

    #[error("No compute platforms found")]
    NoPlatforms,

    #[error("No devices on platform")]
    NoDevicesAvailable,

    #[error("No device supports double precision")]
    NoCapableDevice,

    /// Kernel build failed; `log` is the device build log.
    #[error("Kernel build failed:\n{log}")]
    CompileError { log: String },

    #[error("Cannot open file: {}: {source}", path.display())]
    InputFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid parameters: {0}")]
    Parameters(#[source] fractal_core::Error),

    #[cfg(feature = "io")]
    #[error("Image writer failed: {0}")]
    OutputWriter(#[from] fractal_io::IoError),

    /// A selection strategy answered outside `0..count`.
    #[error("Selection {index} out of range (0..{count})")]
    InvalidSelection { index: usize, count: usize },

    #[error("Selection prompt failed: {0}")]
    Prompt(String),

    #[error("Session already closed")]
    SessionClosed,

    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),
}

impl ComputeError {
    /// Shorthand for [`ComputeError::ConfigurationFailure`].
    pub fn config(step: &'static str, status: Status) -> Self {
        Self::ConfigurationFailure { step, status }
    }
}

impl From<fractal_core::Error> for ComputeError {
    fn from(err: fractal_core::Error) -> Self {
        match err {
            fractal_core::Error::InputFile { path, source } => Self::InputFile { path, source },
            other => Self::Parameters(other),
        }
    }
}

pub type ComputeResult<T> = Result<T, ComputeError>;
