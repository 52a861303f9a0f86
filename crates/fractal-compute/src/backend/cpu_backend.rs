//! Host reference runtime using rayon for parallelization.
//!
//! Behaves like a single-platform, single-device OpenCL implementation:
//! programs are checked for kernel entry points and balanced delimiters,
//! kernel arguments are validated against the parsed signature, and the
//! `ComputeColor` kernel runs natively with one rayon task per image row.

use std::sync::{Arc, RwLock};

use rayon::prelude::*;
use tracing::{debug, trace, warn};

use fractal_core::BASE_COLOR_LEN;

use crate::{ComputeError, ComputeResult, Status};
use super::status::*;
use super::{BoundArg, ClRuntime, DeviceAttribute, DeviceCategory, MemAccess, PlatformAttribute};

const PLATFORM_NAME: &str = "fractal-rs host";
const KERNEL_ENTRY: &str = "ComputeColor";
const KERNEL_ARITY: usize = 14;

/// CPU runtime.
#[derive(Debug, Clone)]
pub struct CpuRuntime {
    device_name: String,
}

impl CpuRuntime {
    pub fn new() -> Self {
        Self {
            device_name: format!("Host CPU ({} threads)", rayon::current_num_threads()),
        }
    }

    fn platform_value(attr: PlatformAttribute) -> &'static str {
        match attr {
            PlatformAttribute::Profile => "FULL_PROFILE",
            PlatformAttribute::Version => "OpenCL 1.2 host",
            PlatformAttribute::Name => PLATFORM_NAME,
            PlatformAttribute::Vendor => "fractal-rs",
            PlatformAttribute::Extensions => "cl_khr_fp64 cl_khr_byte_addressable_store",
        }
    }

    fn device_value(&self, attr: DeviceAttribute) -> &str {
        match attr {
            DeviceAttribute::Name => &self.device_name,
            DeviceAttribute::Vendor => "fractal-rs",
            DeviceAttribute::Extensions => "cl_khr_fp64 cl_khr_byte_addressable_store",
        }
    }
}

impl Default for CpuRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// Context handle.
#[derive(Debug)]
pub struct CpuContext {
    device: usize,
}

/// In-order queue; commands complete before the enqueue call returns.
#[derive(Debug)]
pub struct CpuQueue {
    device: usize,
}

/// Program with its parsed entry points.
#[derive(Debug)]
pub struct CpuProgram {
    source: String,
    built: bool,
    log: String,
    entries: Vec<(String, usize)>,
}

/// Buffer in host memory.
#[derive(Debug)]
pub struct CpuBuffer {
    access: MemAccess,
    data: Arc<RwLock<Vec<f64>>>,
}

#[derive(Debug, Clone)]
enum CpuArg {
    Int(i32),
    Double(f64),
    Buffer(Arc<RwLock<Vec<f64>>>, MemAccess),
}

/// Kernel with bound arguments.
#[derive(Debug)]
pub struct CpuKernel {
    name: String,
    args: Vec<Option<CpuArg>>,
}

fn copy_info(value: &str, buf: &mut [u8]) -> ComputeResult<usize> {
    let bytes = value.as_bytes();
    if buf.len() < bytes.len() + 1 {
        return Err(ComputeError::config("clGetInfo", INVALID_VALUE));
    }
    buf[..bytes.len()].copy_from_slice(bytes);
    buf[bytes.len()] = 0;
    Ok(bytes.len() + 1)
}

/// Blanks out `//` and `/* */` comments.
///
/// Newlines inside comments are kept so line numbers still match the
/// original source. Comment markers inside string literals are left alone.
/// The second value is the line of an unterminated block comment.
fn strip_comments(source: &str) -> (String, Option<usize>) {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut line = 1;
    let mut in_string = false;

    while let Some(ch) = chars.next() {
        if ch == '\n' {
            line += 1;
        }
        if in_string {
            out.push(ch);
            match ch {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        if escaped == '\n' {
                            line += 1;
                        }
                        out.push(escaped);
                    }
                }
                '"' | '\n' => in_string = false,
                _ => {}
            }
            continue;
        }

        let next = chars.peek().copied();
        match (ch, next) {
            ('"', _) => {
                in_string = true;
                out.push(ch);
            }
            ('/', Some('/')) => {
                while chars.next_if(|&c| c != '\n').is_some() {}
                out.push(' ');
            }
            ('/', Some('*')) => {
                let start = line;
                chars.next();
                out.push(' ');
                let mut closed = false;
                while let Some(c) = chars.next() {
                    if c == '\n' {
                        line += 1;
                        out.push('\n');
                    } else if c == '*' && chars.next_if_eq(&'/').is_some() {
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return (out, Some(start));
                }
            }
            _ => out.push(ch),
        }
    }
    (out, None)
}

/// Finds `__kernel void name(...)` declarations and their parameter counts.
///
/// Expects comment-free source, see [`strip_comments`].
fn entry_points(source: &str) -> Vec<(String, usize)> {
    let mut entries = Vec::new();
    let mut rest = source;
    while let Some(pos) = rest.find("__kernel") {
        rest = &rest[pos + "__kernel".len()..];
        let mut words = rest.split_whitespace();
        if words.next() != Some("void") {
            continue;
        }
        let Some(word) = words.next() else { break };
        let name: String = word
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '_')
            .collect();
        if name.is_empty() {
            continue;
        }
        let Some(open) = rest.find('(') else { break };
        let Some(close) = rest[open..].find(')') else { break };
        let params = rest[open + 1..open + close].trim();
        let arity = if params.is_empty() || params == "void" {
            0
        } else {
            params.split(',').count()
        };
        entries.push((name, arity));
    }
    entries
}

/// Reports unbalanced braces and parentheses as `line: message` entries.
fn delimiter_errors(source: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let mut stack: Vec<(char, usize)> = Vec::new();
    for (line_no, line) in source.lines().enumerate() {
        for ch in line.chars() {
            match ch {
                '{' | '(' => stack.push((ch, line_no + 1)),
                '}' | ')' => {
                    let want = if ch == '}' { '{' } else { '(' };
                    match stack.pop() {
                        Some((open, _)) if open == want => {}
                        _ => errors.push(format!("{}: error: unmatched '{}'", line_no + 1, ch)),
                    }
                }
                _ => {}
            }
        }
    }
    for (open, line) in stack {
        errors.push(format!("{}: error: '{}' is never closed", line, open));
    }
    errors
}

impl ClRuntime for CpuRuntime {
    type Platform = usize;
    type Device = usize;
    type Context = CpuContext;
    type Queue = CpuQueue;
    type Program = CpuProgram;
    type Kernel = CpuKernel;
    type Buffer = CpuBuffer;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn platforms(&self) -> ComputeResult<Vec<usize>> {
        Ok(vec![0])
    }

    fn devices(&self, platform: usize, category: DeviceCategory) -> ComputeResult<Vec<usize>> {
        if platform != 0 {
            return Err(ComputeError::config("clGetDeviceIDs", INVALID_PLATFORM));
        }
        Ok(match category {
            DeviceCategory::Default | DeviceCategory::Cpu | DeviceCategory::All => vec![0],
            DeviceCategory::Gpu | DeviceCategory::Accelerator => Vec::new(),
        })
    }

    fn platform_info_size(&self, platform: usize, attr: PlatformAttribute) -> ComputeResult<usize> {
        if platform != 0 {
            return Err(ComputeError::config("clGetPlatformInfo", INVALID_PLATFORM));
        }
        Ok(Self::platform_value(attr).len() + 1)
    }

    fn platform_info(&self, platform: usize, attr: PlatformAttribute, buf: &mut [u8]) -> ComputeResult<usize> {
        if platform != 0 {
            return Err(ComputeError::config("clGetPlatformInfo", INVALID_PLATFORM));
        }
        copy_info(Self::platform_value(attr), buf)
    }

    fn device_info_size(&self, device: usize, attr: DeviceAttribute) -> ComputeResult<usize> {
        if device != 0 {
            return Err(ComputeError::config("clGetDeviceInfo", INVALID_DEVICE));
        }
        Ok(self.device_value(attr).len() + 1)
    }

    fn device_info(&self, device: usize, attr: DeviceAttribute, buf: &mut [u8]) -> ComputeResult<usize> {
        if device != 0 {
            return Err(ComputeError::config("clGetDeviceInfo", INVALID_DEVICE));
        }
        copy_info(self.device_value(attr), buf)
    }

    fn create_context(&self, device: usize) -> ComputeResult<CpuContext> {
        if device != 0 {
            return Err(ComputeError::config("clCreateContext", INVALID_DEVICE));
        }
        Ok(CpuContext { device })
    }

    fn create_queue(&self, context: &CpuContext, device: usize) -> ComputeResult<CpuQueue> {
        if device != context.device {
            return Err(ComputeError::config("clCreateCommandQueue", INVALID_DEVICE));
        }
        Ok(CpuQueue { device })
    }

    fn create_program(&self, _context: &CpuContext, source: &str) -> ComputeResult<CpuProgram> {
        if source.trim().is_empty() {
            return Err(ComputeError::config("clCreateProgramWithSource", INVALID_VALUE));
        }
        Ok(CpuProgram {
            source: source.to_string(),
            built: false,
            log: String::new(),
            entries: Vec::new(),
        })
    }

    fn build_program(&self, program: &mut CpuProgram, device: usize) -> ComputeResult<()> {
        if device != 0 {
            return Err(ComputeError::config("clBuildProgram", INVALID_DEVICE));
        }
        let (code, open_comment) = strip_comments(&program.source);
        let mut log: Vec<String> = delimiter_errors(&code);
        if let Some(line) = open_comment {
            log.push(format!("{line}: error: unterminated comment"));
        }
        let entries = entry_points(&code);
        if entries.is_empty() {
            log.push("error: no __kernel function found".into());
        }

        program.built = log.is_empty();
        program.entries = if program.built { entries } else { Vec::new() };
        program.log = log.join("\n");
        if program.built {
            debug!(kernels = program.entries.len(), "Program built");
            Ok(())
        } else {
            Err(ComputeError::config("clBuildProgram", BUILD_PROGRAM_FAILURE))
        }
    }

    fn build_log(&self, program: &CpuProgram, _device: usize) -> ComputeResult<String> {
        Ok(program.log.clone())
    }

    fn create_buffer(&self, _context: &CpuContext, access: MemAccess, len: usize) -> ComputeResult<CpuBuffer> {
        if len == 0 {
            return Err(ComputeError::config("clCreateBuffer", INVALID_BUFFER_SIZE));
        }
        trace!(?access, len, "CpuRuntime::create_buffer");
        Ok(CpuBuffer {
            access,
            data: Arc::new(RwLock::new(vec![0.0; len])),
        })
    }

    unsafe fn enqueue_write(
        &self,
        _queue: &CpuQueue,
        buffer: &mut CpuBuffer,
        _blocking: bool,
        data: &[f64],
    ) -> ComputeResult<()> {
        let mut dst = buffer
            .data
            .write()
            .map_err(|_| ComputeError::config("clEnqueueWriteBuffer", INVALID_MEM_OBJECT))?;
        if data.len() > dst.len() {
            return Err(ComputeError::config("clEnqueueWriteBuffer", INVALID_VALUE));
        }
        dst[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn create_kernel(&self, program: &CpuProgram, name: &str) -> ComputeResult<CpuKernel> {
        if !program.built {
            return Err(ComputeError::config("clCreateKernel", INVALID_PROGRAM_EXECUTABLE));
        }
        let Some((_, arity)) = program.entries.iter().find(|(entry, _)| entry == name) else {
            return Err(ComputeError::config("clCreateKernel", INVALID_KERNEL_NAME));
        };
        if name != KERNEL_ENTRY || *arity != KERNEL_ARITY {
            warn!(name, arity, "No host implementation for kernel");
            return Err(ComputeError::config("clCreateKernel", INVALID_KERNEL_NAME));
        }
        Ok(CpuKernel {
            name: name.to_string(),
            args: vec![None; *arity],
        })
    }

    fn set_arg(&self, kernel: &mut CpuKernel, index: u32, arg: BoundArg<'_, CpuBuffer>) -> ComputeResult<()> {
        let slot = kernel
            .args
            .get_mut(index as usize)
            .ok_or(ComputeError::config("clSetKernelArg", INVALID_ARG_INDEX))?;
        *slot = Some(match arg {
            BoundArg::Int(v) => CpuArg::Int(v),
            BoundArg::Double(v) => CpuArg::Double(v),
            BoundArg::Buffer(b) => CpuArg::Buffer(Arc::clone(&b.data), b.access),
        });
        Ok(())
    }

    fn enqueue_kernel(
        &self,
        queue: &CpuQueue,
        kernel: &CpuKernel,
        global: [usize; 2],
        local: [usize; 2],
    ) -> ComputeResult<()> {
        const STEP: &str = "clEnqueueNDRangeKernel";
        if local.contains(&0) || global[0] % local[0] != 0 || global[1] % local[1] != 0 {
            return Err(ComputeError::config(STEP, INVALID_WORK_GROUP_SIZE));
        }
        trace!(kernel = %kernel.name, device = queue.device, ?global, ?local, "CpuRuntime::enqueue_kernel");

        let launch = Launch::decode(&kernel.args).map_err(|status| ComputeError::config(STEP, status))?;
        launch.run(global).map_err(|status| ComputeError::config(STEP, status))
    }

    fn enqueue_read(&self, _queue: &CpuQueue, buffer: &CpuBuffer, out: &mut [f64]) -> ComputeResult<()> {
        let src = buffer
            .data
            .read()
            .map_err(|_| ComputeError::config("clEnqueueReadBuffer", INVALID_MEM_OBJECT))?;
        if out.len() > src.len() {
            return Err(ComputeError::config("clEnqueueReadBuffer", INVALID_VALUE));
        }
        out.copy_from_slice(&src[..out.len()]);
        Ok(())
    }

    fn finish(&self, _queue: &CpuQueue) -> ComputeResult<()> {
        Ok(())
    }
}

/// Decoded `ComputeColor` arguments.
struct Launch {
    mode: i32,
    base: Arc<RwLock<Vec<f64>>>,
    image: Arc<RwLock<Vec<f64>>>,
    julia: (f64, f64),
    max_iterations: i32,
    max_length_squared: f64,
    real: (f64, f64),
    imag: (f64, f64),
    rows: usize,
    cols: usize,
    channels: usize,
}

impl Launch {
    fn decode(args: &[Option<CpuArg>]) -> Result<Self, Status> {
        let get = |i: usize| args.get(i).and_then(Option::as_ref).ok_or(INVALID_KERNEL_ARGS);
        let int = |i: usize| -> Result<i32, Status> {
            match get(i)? {
                CpuArg::Int(v) => Ok(*v),
                _ => Err(INVALID_KERNEL_ARGS),
            }
        };
        let double = |i: usize| -> Result<f64, Status> {
            match get(i)? {
                CpuArg::Double(v) => Ok(*v),
                _ => Err(INVALID_KERNEL_ARGS),
            }
        };
        let buffer = |i: usize, writable: bool| -> Result<Arc<RwLock<Vec<f64>>>, Status> {
            match get(i)? {
                CpuArg::Buffer(_, MemAccess::ReadOnly) if writable => Err(INVALID_ARG_VALUE),
                CpuArg::Buffer(b, _) => Ok(Arc::clone(b)),
                _ => Err(INVALID_KERNEL_ARGS),
            }
        };
        let dim = |i: usize| -> Result<usize, Status> { usize::try_from(int(i)?).map_err(|_| INVALID_ARG_VALUE) };

        Ok(Self {
            mode: int(0)?,
            base: buffer(1, false)?,
            image: buffer(2, true)?,
            julia: (double(3)?, double(4)?),
            max_iterations: int(5)?,
            max_length_squared: double(6)?,
            real: (double(7)?, double(8)?),
            imag: (double(9)?, double(10)?),
            rows: dim(11)?,
            cols: dim(12)?,
            channels: dim(13)?,
        })
    }

    fn run(&self, global: [usize; 2]) -> Result<(), Status> {
        let base: [f64; BASE_COLOR_LEN] = {
            let guard = self.base.read().map_err(|_| INVALID_MEM_OBJECT)?;
            guard
                .get(..BASE_COLOR_LEN)
                .and_then(|s| s.try_into().ok())
                .ok_or(INVALID_BUFFER_SIZE)?
        };

        let row_stride = self.cols * self.channels;
        let len = self.rows * row_stride;
        let mut image = self.image.write().map_err(|_| INVALID_MEM_OBJECT)?;
        if image.len() < len {
            return Err(INVALID_BUFFER_SIZE);
        }
        if row_stride == 0 {
            return Ok(());
        }

        // Work items past the image edge do nothing.
        let cols_run = self.cols.min(global[0]);
        let rows_run = self.rows.min(global[1]);
        let written = self.channels.min(3);

        image[..len]
            .par_chunks_mut(row_stride)
            .take(rows_run)
            .enumerate()
            .for_each(|(row, line)| {
                for col in 0..cols_run {
                    let rgb = self.pixel(row, col, &base);
                    let px = &mut line[col * self.channels..col * self.channels + written];
                    px.copy_from_slice(&rgb[..written]);
                }
            });
        Ok(())
    }

    fn pixel(&self, row: usize, col: usize, base: &[f64; BASE_COLOR_LEN]) -> [f64; 3] {
        let re = self.real.0 + (col as f64 + 0.5) * (self.real.1 - self.real.0) / self.cols as f64;
        let im = self.imag.1 - (row as f64 + 0.5) * (self.imag.1 - self.imag.0) / self.rows as f64;
        let (z, c) = if self.mode == 0 {
            ((0.0, 0.0), (re, im))
        } else {
            ((re, im), self.julia)
        };
        let count = escape_count(z, c, self.max_iterations, self.max_length_squared);
        shade(count, self.max_iterations, base)
    }
}

/// Iterations of `z = z^2 + c` before `|z|^2` exceeds `max_length_squared`.
fn escape_count(mut z: (f64, f64), c: (f64, f64), max_iterations: i32, max_length_squared: f64) -> i32 {
    let mut count = 0;
    while count < max_iterations && z.0 * z.0 + z.1 * z.1 <= max_length_squared {
        z = (z.0 * z.0 - z.1 * z.1 + c.0, 2.0 * z.0 * z.1 + c.1);
        count += 1;
    }
    count
}

/// Blends the three base-color rows by escape fraction.
fn shade(count: i32, max_iterations: i32, base: &[f64; BASE_COLOR_LEN]) -> [f64; 3] {
    let t = if max_iterations > 0 {
        count as f64 / max_iterations as f64
    } else {
        0.0
    };
    let (from, to, s) = if t <= 0.5 { (0, 3, 2.0 * t) } else { (3, 6, 2.0 * t - 1.0) };
    [0, 1, 2].map(|k| base[from + k] + s * (base[to + k] - base[from + k]))
}
