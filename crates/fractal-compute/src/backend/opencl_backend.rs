//! OpenCL runtime via `opencl3`.
//!
//! Thin mapping of [`ClRuntime`] onto the OpenCL 1.2 host API. Platform
//! and device handles are raw ids; contexts, queues, programs, kernels
//! and buffers are the `opencl3` RAII wrappers, released on drop.

use std::ptr;

use opencl3::command_queue::CommandQueue;
use opencl3::context::Context;
use opencl3::device::{
    Device, CL_DEVICE_TYPE_ACCELERATOR, CL_DEVICE_TYPE_ALL, CL_DEVICE_TYPE_CPU, CL_DEVICE_TYPE_DEFAULT,
    CL_DEVICE_TYPE_GPU,
};
use opencl3::error_codes::ClError;
use opencl3::kernel::Kernel;
use opencl3::memory::{Buffer, ClMem, CL_MEM_READ_ONLY, CL_MEM_READ_WRITE, CL_MEM_WRITE_ONLY};
use opencl3::platform::{get_platforms, Platform};
use opencl3::program::Program;
use opencl3::types::{cl_device_id, cl_device_type, cl_double, cl_platform_id, CL_BLOCKING, CL_NON_BLOCKING};
use tracing::{debug, error, trace};

use crate::{ComputeError, ComputeResult};
use super::status::{DEVICE_NOT_FOUND, INVALID_VALUE, PLATFORM_NOT_FOUND_KHR};
use super::{BoundArg, ClRuntime, DeviceAttribute, DeviceCategory, MemAccess, PlatformAttribute};

/// OpenCL runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenClRuntime;

impl OpenClRuntime {
    pub fn new() -> Self {
        Self
    }

    /// True when an ICD loader reports at least one platform.
    pub fn is_available() -> bool {
        get_platforms().map(|p| !p.is_empty()).unwrap_or(false)
    }
}

/// Maps an OpenCL error onto a named step, logging it.
fn check<T>(step: &'static str, result: Result<T, ClError>) -> ComputeResult<T> {
    match result {
        Ok(value) => {
            trace!(step, "OK");
            Ok(value)
        }
        Err(err) => {
            error!("Step {}, status = {}", step, err.0);
            Err(ComputeError::config(step, err.0))
        }
    }
}

fn device_type(category: DeviceCategory) -> cl_device_type {
    match category {
        DeviceCategory::Default => CL_DEVICE_TYPE_DEFAULT,
        DeviceCategory::Cpu => CL_DEVICE_TYPE_CPU,
        DeviceCategory::Gpu => CL_DEVICE_TYPE_GPU,
        DeviceCategory::Accelerator => CL_DEVICE_TYPE_ACCELERATOR,
        DeviceCategory::All => CL_DEVICE_TYPE_ALL,
    }
}

fn platform_value(platform: cl_platform_id, attr: PlatformAttribute) -> ComputeResult<String> {
    let p = Platform::new(platform);
    let value = match attr {
        PlatformAttribute::Profile => p.profile(),
        PlatformAttribute::Version => p.version(),
        PlatformAttribute::Name => p.name(),
        PlatformAttribute::Vendor => p.vendor(),
        PlatformAttribute::Extensions => p.extensions(),
    };
    check("clGetPlatformInfo", value)
}

fn device_value(device: cl_device_id, attr: DeviceAttribute) -> ComputeResult<String> {
    let d = Device::new(device);
    let value = match attr {
        DeviceAttribute::Name => d.name(),
        DeviceAttribute::Vendor => d.vendor(),
        DeviceAttribute::Extensions => d.extensions(),
    };
    check("clGetDeviceInfo", value)
}

fn copy_info(value: &str, buf: &mut [u8]) -> ComputeResult<usize> {
    let bytes = value.as_bytes();
    let n = bytes.len().min(buf.len());
    if n < bytes.len() {
        return Err(ComputeError::config("clGetInfo", INVALID_VALUE));
    }
    buf[..n].copy_from_slice(bytes);
    if let Some(terminator) = buf.get_mut(n) {
        *terminator = 0;
        return Ok(n + 1);
    }
    Ok(n)
}

impl ClRuntime for OpenClRuntime {
    type Platform = cl_platform_id;
    type Device = cl_device_id;
    type Context = Context;
    type Queue = CommandQueue;
    type Program = Program;
    type Kernel = Kernel;
    type Buffer = Buffer<cl_double>;

    fn name(&self) -> &'static str {
        "opencl"
    }

    fn platforms(&self) -> ComputeResult<Vec<cl_platform_id>> {
        match get_platforms() {
            Ok(platforms) => Ok(platforms.iter().map(Platform::id).collect()),
            // No ICD installed.
            Err(err) if err.0 == PLATFORM_NOT_FOUND_KHR => Ok(Vec::new()),
            Err(err) => check("clGetPlatformIDs", Err(err)),
        }
    }

    fn devices(&self, platform: cl_platform_id, category: DeviceCategory) -> ComputeResult<Vec<cl_device_id>> {
        match Platform::new(platform).get_devices(device_type(category)) {
            Ok(devices) => Ok(devices),
            Err(err) if err.0 == DEVICE_NOT_FOUND => Ok(Vec::new()),
            Err(err) => check("clGetDeviceIDs", Err(err)),
        }
    }

    fn platform_info_size(&self, platform: cl_platform_id, attr: PlatformAttribute) -> ComputeResult<usize> {
        Ok(platform_value(platform, attr)?.len() + 1)
    }

    fn platform_info(&self, platform: cl_platform_id, attr: PlatformAttribute, buf: &mut [u8]) -> ComputeResult<usize> {
        copy_info(&platform_value(platform, attr)?, buf)
    }

    fn device_info_size(&self, device: cl_device_id, attr: DeviceAttribute) -> ComputeResult<usize> {
        Ok(device_value(device, attr)?.len() + 1)
    }

    fn device_info(&self, device: cl_device_id, attr: DeviceAttribute, buf: &mut [u8]) -> ComputeResult<usize> {
        copy_info(&device_value(device, attr)?, buf)
    }

    fn create_context(&self, device: cl_device_id) -> ComputeResult<Context> {
        check("clCreateContext", Context::from_device(&Device::new(device)))
    }

    fn create_queue(&self, context: &Context, _device: cl_device_id) -> ComputeResult<CommandQueue> {
        // OpenCL 1.2 entry point; the context holds exactly one device.
        #[allow(deprecated)]
        let queue = CommandQueue::create_default(context, 0);
        check("clCreateCommandQueue", queue)
    }

    fn create_program(&self, context: &Context, source: &str) -> ComputeResult<Program> {
        check("clCreateProgramWithSource", Program::create_from_source(context, source))
    }

    fn build_program(&self, program: &mut Program, device: cl_device_id) -> ComputeResult<()> {
        check("clBuildProgram", program.build(&[device], ""))
    }

    fn build_log(&self, program: &Program, device: cl_device_id) -> ComputeResult<String> {
        check("clGetProgramBuildInfo", program.get_build_log(device))
    }

    fn create_buffer(&self, context: &Context, access: MemAccess, len: usize) -> ComputeResult<Buffer<cl_double>> {
        let flags = match access {
            MemAccess::ReadOnly => CL_MEM_READ_ONLY,
            MemAccess::WriteOnly => CL_MEM_WRITE_ONLY,
            MemAccess::ReadWrite => CL_MEM_READ_WRITE,
        };
        debug!(?access, len, "clCreateBuffer");
        // SAFETY: no host pointer is passed, so the buffer owns its storage.
        let buffer = unsafe { Buffer::<cl_double>::create(context, flags, len, ptr::null_mut()) };
        check("clCreateBuffer", buffer)
    }

    unsafe fn enqueue_write(
        &self,
        queue: &CommandQueue,
        buffer: &mut Buffer<cl_double>,
        blocking: bool,
        data: &[f64],
    ) -> ComputeResult<()> {
        let flag = if blocking { CL_BLOCKING } else { CL_NON_BLOCKING };
        // SAFETY: the caller keeps `data` alive until the queue drains.
        let event = unsafe { queue.enqueue_write_buffer(buffer, flag, 0, data, &[]) };
        check("clEnqueueWriteBuffer", event).map(drop)
    }

    fn create_kernel(&self, program: &Program, name: &str) -> ComputeResult<Kernel> {
        check("clCreateKernel", Kernel::create(program, name))
    }

    fn set_arg(&self, kernel: &mut Kernel, index: u32, arg: BoundArg<'_, Buffer<cl_double>>) -> ComputeResult<()> {
        // SAFETY: each value matches the kernel's declared parameter type.
        let result = unsafe {
            match arg {
                BoundArg::Int(v) => kernel.set_arg(index, &v),
                BoundArg::Double(v) => kernel.set_arg(index, &v),
                BoundArg::Buffer(b) => kernel.set_arg(index, &b.get()),
            }
        };
        check("clSetKernelArg", result)
    }

    fn enqueue_kernel(
        &self,
        queue: &CommandQueue,
        kernel: &Kernel,
        global: [usize; 2],
        local: [usize; 2],
    ) -> ComputeResult<()> {
        // SAFETY: all arguments are bound and both arrays have work_dim entries.
        let event = unsafe {
            queue.enqueue_nd_range_kernel(kernel.get(), 2, ptr::null(), global.as_ptr(), local.as_ptr(), &[])
        };
        check("clEnqueueNDRangeKernel", event).map(drop)
    }

    fn enqueue_read(&self, queue: &CommandQueue, buffer: &Buffer<cl_double>, out: &mut [f64]) -> ComputeResult<()> {
        // SAFETY: blocking read; `out` is filled when the call returns.
        let event = unsafe { queue.enqueue_read_buffer(buffer, CL_BLOCKING, 0, out, &[]) };
        check("clEnqueueReadBuffer", event).map(drop)
    }

    fn finish(&self, queue: &CommandQueue) -> ComputeResult<()> {
        check("clFinish", queue.finish())
    }
}
