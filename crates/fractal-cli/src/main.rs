//! fractal - Mandelbrot and Julia set renderer
//!
//! Reads a parameter file, renders on an OpenCL device (or the host CPU)
//! and writes the image.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fractal_compute::{
    describe_backends, render, Backend, DeviceCategory, FirstEligible, InteractivePrompt, Preset, RenderConfig,
    RenderJob, RenderSummary, SelectionStrategy, DEFAULT_KERNEL_FILE,
};
use fractal_core::FractalMode;

#[derive(Parser, Debug)]
#[command(name = "fractal")]
#[command(author, version, about = "Render Mandelbrot and Julia sets")]
#[command(long_about = "
Renders an escape-time fractal described by a parameter file.

Parameter file (whitespace separated):
  rows cols
  maxIterations maxLengthSquared
  realMin realMax
  imagMin imagMax
  juliaRe juliaIm
  c00 c01 c02
  c10 c11 c12
  c20 c21 c22

Examples:
  fractal M params.txt mandelbrot.png
  fractal J params.txt julia.jpg --first
  fractal M params.txt out.png --backend cpu -v
  fractal J params.txt out.png --device-type gpu --platform 1 --device 0
")]
struct Cli {
    /// Fractal type: M = Mandelbrot, anything else = Julia
    mode: String,

    /// Parameter file
    params: PathBuf,

    /// Output image (.png, .jpg)
    output: PathBuf,

    /// Kernel source file
    #[arg(long, default_value = DEFAULT_KERNEL_FILE)]
    kernel: PathBuf,

    /// Compute backend
    #[arg(long, value_enum, default_value_t = BackendArg::Auto)]
    backend: BackendArg,

    /// Device category to enumerate
    #[arg(long = "device-type", value_enum, default_value_t = DeviceTypeArg::Default)]
    device_type: DeviceTypeArg,

    /// Platform index (skips the platform prompt)
    #[arg(long)]
    platform: Option<usize>,

    /// Index among double-precision devices (skips the device prompt)
    #[arg(long)]
    device: Option<usize>,

    /// Take the first platform and device instead of prompting
    #[arg(long)]
    first: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BackendArg {
    Auto,
    Cpu,
    Opencl,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Auto => Backend::Auto,
            BackendArg::Cpu => Backend::Cpu,
            BackendArg::Opencl => Backend::OpenCl,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DeviceTypeArg {
    Default,
    Cpu,
    Gpu,
    Accelerator,
    All,
}

impl From<DeviceTypeArg> for DeviceCategory {
    fn from(arg: DeviceTypeArg) -> Self {
        match arg {
            DeviceTypeArg::Default => DeviceCategory::Default,
            DeviceTypeArg::Cpu => DeviceCategory::Cpu,
            DeviceTypeArg::Gpu => DeviceCategory::Gpu,
            DeviceTypeArg::Accelerator => DeviceCategory::Accelerator,
            DeviceTypeArg::All => DeviceCategory::All,
        }
    }
}

/// Sets up stderr logging and the optional file sink.
///
/// `RUST_LOG` overrides the level picked from `verbose`. The returned guard
/// flushes the file sink and must live until exit.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr)
            .try_init()
            .context("Failed to initialise logging")?;
        return Ok(None);
    };

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .with_context(|| format!("Log path has no file name: {}", path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .try_init()
        .context("Failed to initialise logging")?;
    Ok(Some(guard))
}

fn run(cli: &Cli) -> Result<RenderSummary> {
    let mode = FractalMode::from_arg(&cli.mode);
    let config = RenderConfig {
        backend: cli.backend.into(),
        category: cli.device_type.into(),
        kernel_path: cli.kernel.clone(),
    };
    let job = RenderJob::new(mode, &cli.params, &cli.output).with_config(config);
    debug!(?job, "Render job");

    let mut strategy: Box<dyn SelectionStrategy> = if cli.first {
        Box::new(Preset::new(cli.platform, cli.device, FirstEligible))
    } else {
        Box::new(Preset::new(cli.platform, cli.device, InteractivePrompt::stdio()))
    };

    render(&job, strategy.as_mut()).with_context(|| format!("Failed to render {}", cli.output.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.log.as_deref())?;
    debug!("Backends:\n{}", describe_backends().trim_end());

    let summary = run(&cli)?;
    info!(
        backend = summary.backend,
        device = %summary.device,
        global = ?summary.geometry.global,
        "Wrote {} ({}x{})",
        cli.output.display(),
        summary.width,
        summary.height
    );
    Ok(())
}
