//! Scripted runtime for integration tests.
//!
//! Records every call by name and every resource release in order. The
//! only kernel it knows fills each pixel with the first base-color row
//! and keeps a copy of the whole base-color buffer it was launched with.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use fractal_compute::backend::status;
use fractal_compute::{
    BoundArg, ClRuntime, ComputeError, ComputeResult, DeviceAttribute, DeviceCategory, MemAccess, PlatformAttribute,
};

#[derive(Debug, Clone)]
pub struct MockDevice {
    pub name: String,
    pub fp64: bool,
}

impl MockDevice {
    pub fn new(name: &str, fp64: bool) -> Self {
        Self { name: name.into(), fp64 }
    }
}

#[derive(Debug, Clone)]
pub struct MockPlatform {
    pub name: String,
    pub devices: Vec<MockDevice>,
}

impl MockPlatform {
    pub fn new(name: &str, devices: Vec<MockDevice>) -> Self {
        Self { name: name.into(), devices }
    }
}

type Log = Rc<RefCell<Vec<String>>>;

#[derive(Default)]
pub struct MockRuntime {
    pub platforms: Vec<MockPlatform>,
    /// Build log returned when set; the build then fails.
    pub build_failure: Option<String>,
    calls: Log,
    released: Log,
    launches: RefCell<Vec<([usize; 2], [usize; 2])>>,
    writes: RefCell<Vec<bool>>,
    bases: RefCell<Vec<Vec<f64>>>,
}

impl MockRuntime {
    pub fn new(platforms: Vec<MockPlatform>) -> Self {
        Self {
            platforms,
            ..Default::default()
        }
    }

    /// One platform with one fp64 device.
    pub fn single() -> Self {
        Self::new(vec![MockPlatform::new("Mock", vec![MockDevice::new("Mock GPU", true)])])
    }

    pub fn failing_build(mut self, log: &str) -> Self {
        self.build_failure = Some(log.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.borrow().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn released(&self) -> Vec<String> {
        self.released.borrow().clone()
    }

    /// `(global, local)` of every launch.
    pub fn launches(&self) -> Vec<([usize; 2], [usize; 2])> {
        self.launches.borrow().clone()
    }

    /// Base-color buffer contents seen by every launch.
    pub fn bases(&self) -> Vec<Vec<f64>> {
        self.bases.borrow().clone()
    }

    /// Blocking flag of every buffer write.
    pub fn writes(&self) -> Vec<bool> {
        self.writes.borrow().clone()
    }

    fn call(&self, name: &str) {
        self.calls.borrow_mut().push(name.to_string());
    }

    fn device(&self, (p, d): (usize, usize)) -> ComputeResult<&MockDevice> {
        self.platforms
            .get(p)
            .and_then(|pl| pl.devices.get(d))
            .ok_or(ComputeError::config("clGetDeviceInfo", status::INVALID_DEVICE))
    }

    fn platform_value(&self, p: usize, attr: PlatformAttribute) -> ComputeResult<String> {
        let platform = self
            .platforms
            .get(p)
            .ok_or(ComputeError::config("clGetPlatformInfo", status::INVALID_PLATFORM))?;
        Ok(match attr {
            PlatformAttribute::Profile => "FULL_PROFILE".into(),
            PlatformAttribute::Version => "OpenCL 1.2 mock".into(),
            PlatformAttribute::Name => platform.name.clone(),
            PlatformAttribute::Vendor => "Mock Inc.".into(),
            PlatformAttribute::Extensions => "cl_khr_icd".into(),
        })
    }

    fn device_value(&self, id: (usize, usize), attr: DeviceAttribute) -> ComputeResult<String> {
        let device = self.device(id)?;
        Ok(match attr {
            DeviceAttribute::Name => device.name.clone(),
            DeviceAttribute::Vendor => "Mock Inc.".into(),
            DeviceAttribute::Extensions if device.fp64 => "cl_khr_icd cl_khr_fp64".into(),
            DeviceAttribute::Extensions => "cl_khr_icd".into(),
        })
    }
}

/// Pushes `name` onto the release log when dropped.
pub struct Tracked {
    name: &'static str,
    released: Log,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.released.borrow_mut().push(self.name.to_string());
    }
}

impl MockRuntime {
    fn tracked(&self, name: &'static str) -> Tracked {
        Tracked {
            name,
            released: Rc::clone(&self.released),
        }
    }
}

pub struct MockBuffer {
    _tracked: Tracked,
    data: Rc<RefCell<Vec<f64>>>,
}

#[derive(Clone)]
enum MockArg {
    Int(i32),
    Double(f64),
    Buffer(Rc<RefCell<Vec<f64>>>),
}

pub struct MockKernel {
    _tracked: Tracked,
    args: HashMap<u32, MockArg>,
}

fn copy_info(value: &str, buf: &mut [u8]) -> usize {
    buf[..value.len()].copy_from_slice(value.as_bytes());
    buf[value.len()] = 0;
    value.len() + 1
}

impl ClRuntime for MockRuntime {
    type Platform = usize;
    type Device = (usize, usize);
    type Context = Tracked;
    type Queue = Tracked;
    type Program = Tracked;
    type Kernel = MockKernel;
    type Buffer = MockBuffer;

    fn name(&self) -> &'static str {
        "mock"
    }

    fn platforms(&self) -> ComputeResult<Vec<usize>> {
        self.call("platforms");
        Ok((0..self.platforms.len()).collect())
    }

    fn devices(&self, platform: usize, _category: DeviceCategory) -> ComputeResult<Vec<(usize, usize)>> {
        self.call("devices");
        let count = self.platforms.get(platform).map_or(0, |p| p.devices.len());
        Ok((0..count).map(|d| (platform, d)).collect())
    }

    fn platform_info_size(&self, platform: usize, attr: PlatformAttribute) -> ComputeResult<usize> {
        self.call("platform_info_size");
        Ok(self.platform_value(platform, attr)?.len() + 1)
    }

    fn platform_info(&self, platform: usize, attr: PlatformAttribute, buf: &mut [u8]) -> ComputeResult<usize> {
        self.call("platform_info");
        Ok(copy_info(&self.platform_value(platform, attr)?, buf))
    }

    fn device_info_size(&self, device: (usize, usize), attr: DeviceAttribute) -> ComputeResult<usize> {
        self.call("device_info_size");
        Ok(self.device_value(device, attr)?.len() + 1)
    }

    fn device_info(&self, device: (usize, usize), attr: DeviceAttribute, buf: &mut [u8]) -> ComputeResult<usize> {
        self.call("device_info");
        Ok(copy_info(&self.device_value(device, attr)?, buf))
    }

    fn create_context(&self, _device: (usize, usize)) -> ComputeResult<Tracked> {
        self.call("create_context");
        Ok(self.tracked("context"))
    }

    fn create_queue(&self, _context: &Tracked, _device: (usize, usize)) -> ComputeResult<Tracked> {
        self.call("create_queue");
        Ok(self.tracked("queue"))
    }

    fn create_program(&self, _context: &Tracked, _source: &str) -> ComputeResult<Tracked> {
        self.call("create_program");
        Ok(self.tracked("program"))
    }

    fn build_program(&self, _program: &mut Tracked, _device: (usize, usize)) -> ComputeResult<()> {
        self.call("build_program");
        match self.build_failure {
            Some(_) => Err(ComputeError::config("clBuildProgram", status::BUILD_PROGRAM_FAILURE)),
            None => Ok(()),
        }
    }

    fn build_log(&self, _program: &Tracked, _device: (usize, usize)) -> ComputeResult<String> {
        self.call("build_log");
        Ok(self.build_failure.clone().unwrap_or_default())
    }

    fn create_buffer(&self, _context: &Tracked, _access: MemAccess, len: usize) -> ComputeResult<MockBuffer> {
        self.call("create_buffer");
        Ok(MockBuffer {
            _tracked: self.tracked("buffer"),
            data: Rc::new(RefCell::new(vec![0.0; len])),
        })
    }

    unsafe fn enqueue_write(
        &self,
        _queue: &Tracked,
        buffer: &mut MockBuffer,
        blocking: bool,
        data: &[f64],
    ) -> ComputeResult<()> {
        self.call("enqueue_write");
        self.writes.borrow_mut().push(blocking);
        buffer.data.borrow_mut()[..data.len()].copy_from_slice(data);
        Ok(())
    }

    fn create_kernel(&self, _program: &Tracked, name: &str) -> ComputeResult<MockKernel> {
        self.call("create_kernel");
        if name != "ComputeColor" {
            return Err(ComputeError::config("clCreateKernel", status::INVALID_KERNEL_NAME));
        }
        Ok(MockKernel {
            _tracked: self.tracked("kernel"),
            args: HashMap::new(),
        })
    }

    fn set_arg(&self, kernel: &mut MockKernel, index: u32, arg: BoundArg<'_, MockBuffer>) -> ComputeResult<()> {
        self.call("set_arg");
        let arg = match arg {
            BoundArg::Int(v) => MockArg::Int(v),
            BoundArg::Double(v) => MockArg::Double(v),
            BoundArg::Buffer(b) => MockArg::Buffer(Rc::clone(&b.data)),
        };
        kernel.args.insert(index, arg);
        Ok(())
    }

    fn enqueue_kernel(
        &self,
        _queue: &Tracked,
        kernel: &MockKernel,
        global: [usize; 2],
        local: [usize; 2],
    ) -> ComputeResult<()> {
        self.call("enqueue_kernel");
        self.launches.borrow_mut().push((global, local));
        let missing = || ComputeError::config("clEnqueueNDRangeKernel", status::INVALID_KERNEL_ARGS);
        if kernel.args.len() != 14 {
            return Err(missing());
        }
        let (Some(MockArg::Buffer(base)), Some(MockArg::Buffer(image))) = (kernel.args.get(&1), kernel.args.get(&2))
        else {
            return Err(missing());
        };
        if !matches!(kernel.args.get(&0), Some(MockArg::Int(_)))
            || !matches!(kernel.args.get(&3), Some(MockArg::Double(_)))
        {
            return Err(missing());
        }
        self.bases.borrow_mut().push(base.borrow().clone());
        let row0: Vec<f64> = base.borrow()[..3].to_vec();
        for px in image.borrow_mut().chunks_mut(3) {
            px.copy_from_slice(&row0);
        }
        Ok(())
    }

    fn enqueue_read(&self, _queue: &Tracked, buffer: &MockBuffer, out: &mut [f64]) -> ComputeResult<()> {
        self.call("enqueue_read");
        out.copy_from_slice(&buffer.data.borrow()[..out.len()]);
        Ok(())
    }

    fn finish(&self, _queue: &Tracked) -> ComputeResult<()> {
        self.call("finish");
        Ok(())
    }
}

/// Parameter file text for a `rows` x `cols` render.
pub fn params_text(rows: usize, cols: usize, max_iterations: u32, bounds: [f64; 4], base: [f64; 9]) -> String {
    let base: Vec<String> = base.iter().map(|v| v.to_string()).collect();
    format!(
        "{rows} {cols}\n{max_iterations} 4.0\n{} {}\n{} {}\n-0.8 0.156\n{}\n",
        bounds[0],
        bounds[1],
        bounds[2],
        bounds[3],
        base.join(" ")
    )
}

/// Path of the kernel source shipped at the workspace root.
pub fn kernel_path() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../MandelbrotJuliaGenerator.cl")
}
