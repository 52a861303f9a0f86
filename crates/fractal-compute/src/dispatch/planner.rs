//! Work geometry and kernel argument marshalling.

use fractal_core::{FractalMode, FractalParameters, CHANNELS};
use tracing::trace;

use crate::backend::status::INVALID_ARG_VALUE;
use crate::{ComputeError, ComputeResult};

/// Kernel entry point.
pub const KERNEL_NAME: &str = "ComputeColor";

/// Work-group size along (columns, rows).
pub const TILE_SIZE: [usize; 2] = [16, 16];

/// Kernel parameter names by position.
pub const ARG_NAMES: [&str; 14] = [
    "type",
    "d_baseColor",
    "d_imageColor",
    "JuliaRE",
    "JuliaIM",
    "MaxIterations",
    "MaxLengthSquared",
    "realMin",
    "realMax",
    "imagMin",
    "imagMax",
    "nRows",
    "nCols",
    "nChannels",
];

/// Rounds `dim` up to a multiple of `tile`.
pub fn pad_to_tile(dim: usize, tile: usize) -> usize {
    dim.div_ceil(tile) * tile
}

/// Global and local sizes of a 2D launch, ordered (columns, rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkGeometry {
    pub global: [usize; 2],
    pub local: [usize; 2],
}

impl WorkGeometry {
    /// Geometry for a `rows` x `cols` image with [`TILE_SIZE`] groups.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::with_tile(rows, cols, TILE_SIZE)
    }

    pub fn with_tile(rows: usize, cols: usize, tile: [usize; 2]) -> Self {
        Self {
            global: [pad_to_tile(cols, tile[0]), pad_to_tile(rows, tile[1])],
            local: tile,
        }
    }

    /// Total work items, padding included.
    pub fn work_items(&self) -> usize {
        self.global[0] * self.global[1]
    }

    pub fn groups(&self) -> [usize; 2] {
        [self.global[0] / self.local[0], self.global[1] / self.local[1]]
    }
}

/// Device buffer referenced by a kernel argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSlot {
    /// 9 doubles, read-only.
    BaseColor,
    /// rows * cols * channels doubles, write-only.
    ImageColor,
}

/// One positional kernel argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KernelArg {
    Int(i32),
    Double(f64),
    Buffer(BufferSlot),
}

/// Everything needed to launch `ComputeColor` once.
#[derive(Debug, Clone)]
pub struct DispatchPlan {
    pub mode: FractalMode,
    pub rows: usize,
    pub cols: usize,
    pub geometry: WorkGeometry,
    /// Arguments in kernel parameter order, see [`ARG_NAMES`].
    pub args: Vec<KernelArg>,
}

impl DispatchPlan {
    pub fn new(mode: FractalMode, params: &FractalParameters) -> ComputeResult<Self> {
        let int = |v: usize| {
            i32::try_from(v).map_err(|_| ComputeError::config("clSetKernelArg", INVALID_ARG_VALUE))
        };
        let max_iterations = i32::try_from(params.max_iterations)
            .map_err(|_| ComputeError::config("clSetKernelArg", INVALID_ARG_VALUE))?;

        let args = vec![
            KernelArg::Int(mode.flag()),
            KernelArg::Buffer(BufferSlot::BaseColor),
            KernelArg::Buffer(BufferSlot::ImageColor),
            KernelArg::Double(params.julia.0),
            KernelArg::Double(params.julia.1),
            KernelArg::Int(max_iterations),
            KernelArg::Double(params.max_length_squared),
            KernelArg::Double(params.real.0),
            KernelArg::Double(params.real.1),
            KernelArg::Double(params.imag.0),
            KernelArg::Double(params.imag.1),
            KernelArg::Int(int(params.rows)?),
            KernelArg::Int(int(params.cols)?),
            KernelArg::Int(int(CHANNELS)?),
        ];
        debug_assert_eq!(args.len(), ARG_NAMES.len());

        let geometry = WorkGeometry::new(params.rows, params.cols);
        trace!(?mode, ?geometry, "DispatchPlan::new");
        Ok(Self {
            mode,
            rows: params.rows,
            cols: params.cols,
            geometry,
            args,
        })
    }

    /// Elements in the image color buffer.
    pub fn color_len(&self) -> usize {
        self.rows * self.cols * CHANNELS
    }
}
