//! End-to-end render: parameters in, image file out.
//!
//! Inputs are validated before any runtime call: a missing parameter
//! file, a missing kernel source, an unsupported output extension or an
//! output file that cannot be created fails without touching the
//! accelerator.

use std::path::{Path, PathBuf};
use std::time::Instant;

use fractal_core::{FractalMode, FractalParameters, CHANNELS};
use fractal_io::ImageWriter;
use tracing::{debug, info, trace, warn};

use crate::backend::selector::{DeviceSelector, SelectionStrategy};
use crate::backend::session::{load_kernel_source, ComputeSession, DEFAULT_KERNEL_FILE};
use crate::backend::{select_best_backend, Backend, ClRuntime, CpuRuntime, DeviceCategory};
use crate::dispatch::{DispatchPlan, KernelExecutor, WorkGeometry};
use crate::{ComputeError, ComputeResult};

/// Runtime options of a render.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub backend: Backend,
    pub category: DeviceCategory,
    pub kernel_path: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Auto,
            category: DeviceCategory::Default,
            kernel_path: PathBuf::from(DEFAULT_KERNEL_FILE),
        }
    }
}

/// One render request.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub mode: FractalMode,
    pub params_path: PathBuf,
    pub output_path: PathBuf,
    pub config: RenderConfig,
}

impl RenderJob {
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(mode: FractalMode, params_path: P, output_path: Q) -> Self {
        Self {
            mode,
            params_path: params_path.as_ref().to_path_buf(),
            output_path: output_path.as_ref().to_path_buf(),
            config: RenderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RenderConfig) -> Self {
        self.config = config;
        self
    }
}

/// What a finished render did.
#[derive(Debug, Clone)]
pub struct RenderSummary {
    pub backend: &'static str,
    pub device: String,
    pub width: usize,
    pub height: usize,
    pub geometry: WorkGeometry,
}

/// Validated inputs of a job, with the output file already open.
struct Inputs {
    params: FractalParameters,
    source: String,
    writer: Box<dyn ImageWriter>,
}

impl Inputs {
    fn load(job: &RenderJob) -> ComputeResult<Self> {
        let params = FractalParameters::load(&job.params_path)?;
        debug!(rows = params.rows, cols = params.cols, "Loaded parameters");
        fractal_io::check_output(&job.output_path)?;
        let source = load_kernel_source(&job.config.kernel_path)?;
        let writer = fractal_io::create(&job.output_path, params.cols, params.rows, CHANNELS)?;
        debug!(output = %job.output_path.display(), format = writer.format_name(), "Opened output");
        Ok(Self { params, source, writer })
    }
}

/// Renders `job` on the backend named in its config.
pub fn render(job: &RenderJob, strategy: &mut dyn SelectionStrategy) -> ComputeResult<RenderSummary> {
    trace!(params = %job.params_path.display(), output = %job.output_path.display(), "render");
    let inputs = Inputs::load(job)?;

    let backend = match job.config.backend {
        Backend::Auto => select_best_backend(),
        other => other,
    };
    info!(backend = backend.name(), "Selected backend");

    match backend {
        Backend::OpenCl => {
            #[cfg(feature = "opencl")]
            {
                execute(&crate::backend::OpenClRuntime::new(), job, inputs, strategy)
            }
            #[cfg(not(feature = "opencl"))]
            {
                Err(ComputeError::BackendNotAvailable(
                    "opencl (built without the \"opencl\" feature)".into(),
                ))
            }
        }
        Backend::Cpu | Backend::Auto => execute(&CpuRuntime::new(), job, inputs, strategy),
    }
}

/// Renders `job` on an explicit runtime.
pub fn run<R: ClRuntime>(
    runtime: &R,
    job: &RenderJob,
    strategy: &mut dyn SelectionStrategy,
) -> ComputeResult<RenderSummary> {
    let inputs = Inputs::load(job)?;
    execute(runtime, job, inputs, strategy)
}

/// Removes the partly written output of a failed render.
fn discard_output<T>(job: &RenderJob, result: ComputeResult<T>) -> ComputeResult<T> {
    if result.is_err() {
        if let Err(err) = std::fs::remove_file(&job.output_path) {
            warn!(path = %job.output_path.display(), %err, "Could not remove partial output");
        }
    }
    result
}

fn execute<R: ClRuntime>(
    runtime: &R,
    job: &RenderJob,
    inputs: Inputs,
    strategy: &mut dyn SelectionStrategy,
) -> ComputeResult<RenderSummary> {
    discard_output(job, render_with(runtime, job, inputs, strategy))
}

fn render_with<R: ClRuntime>(
    runtime: &R,
    job: &RenderJob,
    inputs: Inputs,
    strategy: &mut dyn SelectionStrategy,
) -> ComputeResult<RenderSummary> {
    let start = Instant::now();
    let Inputs { params, source, writer } = inputs;

    let selected = DeviceSelector::new(runtime).select(job.config.category, strategy)?;
    let plan = DispatchPlan::new(job.mode, &params)?;

    let mut session = ComputeSession::open(runtime, selected.device, &source)?;
    let color = KernelExecutor::new(&session).run(&plan, &params.base_color)?;
    session.close();
    debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Kernel finished");

    let pixels = fractal_io::assemble_into(&color, writer).map_err(ComputeError::from)?;
    info!(
        mode = job.mode.name(),
        device = %selected.device_name,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Rendered {}x{}",
        pixels.width,
        pixels.height
    );

    Ok(RenderSummary {
        backend: runtime.name(),
        device: selected.device_name,
        width: pixels.width,
        height: pixels.height,
        geometry: plan.geometry,
    })
}
