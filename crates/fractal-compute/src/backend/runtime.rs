//! Accelerator runtime abstraction.

use crate::ComputeResult;
use super::DeviceCategory;

/// Textual platform attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformAttribute {
    Profile,
    Version,
    Name,
    Vendor,
    Extensions,
}

impl PlatformAttribute {
    /// All attributes in report order.
    pub const ALL: [PlatformAttribute; 5] = [
        Self::Profile,
        Self::Version,
        Self::Name,
        Self::Vendor,
        Self::Extensions,
    ];

    /// API label, e.g. `CL_PLATFORM_PROFILE`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Profile => "CL_PLATFORM_PROFILE",
            Self::Version => "CL_PLATFORM_VERSION",
            Self::Name => "CL_PLATFORM_NAME",
            Self::Vendor => "CL_PLATFORM_VENDOR",
            Self::Extensions => "CL_PLATFORM_EXTENSIONS",
        }
    }
}

/// Textual device attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAttribute {
    Name,
    Vendor,
    Extensions,
}

impl DeviceAttribute {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "CL_DEVICE_NAME",
            Self::Vendor => "CL_DEVICE_VENDOR",
            Self::Extensions => "CL_DEVICE_EXTENSIONS",
        }
    }
}

/// Kernel-side access of a device buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemAccess {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

/// Kernel argument bound to a runtime buffer.
#[derive(Debug, Clone, Copy)]
pub enum BoundArg<'a, B> {
    Int(i32),
    Double(f64),
    Buffer(&'a B),
}

/// Accelerator API seam.
///
/// Mirrors the OpenCL host API at the granularity the renderer needs.
/// Every fallible call reports [`crate::ComputeError::ConfigurationFailure`]
/// naming the step and the status code. Resource handles release
/// themselves on drop.
pub trait ClRuntime {
    /// Platform handle.
    type Platform: Copy + std::fmt::Debug;
    /// Device handle.
    type Device: Copy + std::fmt::Debug;
    type Context;
    type Queue;
    type Program;
    type Kernel;
    /// Device buffer of `f64` elements.
    type Buffer;

    /// Runtime name for logs.
    fn name(&self) -> &'static str;

    /// Enumerates platforms. An absent ICD loader yields an empty list.
    fn platforms(&self) -> ComputeResult<Vec<Self::Platform>>;

    /// Enumerates devices of `category`. No matching device yields an empty list.
    fn devices(&self, platform: Self::Platform, category: DeviceCategory) -> ComputeResult<Vec<Self::Device>>;

    /// Size in bytes of a platform attribute, terminator included.
    fn platform_info_size(&self, platform: Self::Platform, attr: PlatformAttribute) -> ComputeResult<usize>;

    /// Fills `buf` with a platform attribute; returns bytes written.
    fn platform_info(&self, platform: Self::Platform, attr: PlatformAttribute, buf: &mut [u8]) -> ComputeResult<usize>;

    /// Size in bytes of a device attribute, terminator included.
    fn device_info_size(&self, device: Self::Device, attr: DeviceAttribute) -> ComputeResult<usize>;

    /// Fills `buf` with a device attribute; returns bytes written.
    fn device_info(&self, device: Self::Device, attr: DeviceAttribute, buf: &mut [u8]) -> ComputeResult<usize>;

    fn create_context(&self, device: Self::Device) -> ComputeResult<Self::Context>;

    /// In-order command queue on `device`.
    fn create_queue(&self, context: &Self::Context, device: Self::Device) -> ComputeResult<Self::Queue>;

    fn create_program(&self, context: &Self::Context, source: &str) -> ComputeResult<Self::Program>;

    /// Builds `program` for `device`.
    fn build_program(&self, program: &mut Self::Program, device: Self::Device) -> ComputeResult<()>;

    /// Build log of the last build of `program` on `device`.
    fn build_log(&self, program: &Self::Program, device: Self::Device) -> ComputeResult<String>;

    /// Allocates `len` elements of device memory.
    fn create_buffer(&self, context: &Self::Context, access: MemAccess, len: usize) -> ComputeResult<Self::Buffer>;

    /// Queues a host-to-device copy.
    ///
    /// # Safety
    ///
    /// When `blocking` is false, `data` must stay alive and unmodified until
    /// a later blocking command or [`finish`](Self::finish) on `queue`
    /// has returned.
    unsafe fn enqueue_write(
        &self,
        queue: &Self::Queue,
        buffer: &mut Self::Buffer,
        blocking: bool,
        data: &[f64],
    ) -> ComputeResult<()>;

    fn create_kernel(&self, program: &Self::Program, name: &str) -> ComputeResult<Self::Kernel>;

    /// Binds argument `index` of `kernel`.
    fn set_arg(&self, kernel: &mut Self::Kernel, index: u32, arg: BoundArg<'_, Self::Buffer>) -> ComputeResult<()>;

    /// Launches `kernel` over a 2D grid.
    fn enqueue_kernel(
        &self,
        queue: &Self::Queue,
        kernel: &Self::Kernel,
        global: [usize; 2],
        local: [usize; 2],
    ) -> ComputeResult<()>;

    /// Blocking device-to-host copy; every earlier command on `queue` has
    /// completed when this returns.
    fn enqueue_read(&self, queue: &Self::Queue, buffer: &Self::Buffer, out: &mut [f64]) -> ComputeResult<()>;

    /// Waits for every queued command.
    fn finish(&self, queue: &Self::Queue) -> ComputeResult<()>;
}
