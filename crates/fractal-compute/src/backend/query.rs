//! Capability queries.
//!
//! Attributes are fetched in two phases: ask the runtime for the size,
//! then read into a buffer of that size. [`AttributeScratch`] keeps one
//! buffer across queries and only grows it when an attribute is larger
//! than anything seen so far.

use tracing::{debug, trace};

use crate::ComputeResult;
use super::{ClRuntime, DeviceAttribute, DeviceCategory, PlatformAttribute};

/// Extension token advertising double-precision support.
pub const FP64_EXTENSION: &str = "cl_khr_fp64";

const BANNER: &str = "===============================================";

/// Reusable buffer for attribute queries.
#[derive(Debug, Default)]
pub struct AttributeScratch {
    buf: Vec<u8>,
}

impl AttributeScratch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current buffer size in bytes.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Reads one platform attribute as text.
    pub fn platform_attribute<R: ClRuntime>(
        &mut self,
        runtime: &R,
        platform: R::Platform,
        attr: PlatformAttribute,
    ) -> ComputeResult<String> {
        let size = runtime.platform_info_size(platform, attr)?;
        self.fetch(size, |buf| runtime.platform_info(platform, attr, buf))
    }

    /// Reads one device attribute as text.
    pub fn device_attribute<R: ClRuntime>(
        &mut self,
        runtime: &R,
        device: R::Device,
        attr: DeviceAttribute,
    ) -> ComputeResult<String> {
        let size = runtime.device_info_size(device, attr)?;
        self.fetch(size, |buf| runtime.device_info(device, attr, buf))
    }

    fn fetch<F>(&mut self, size: usize, read: F) -> ComputeResult<String>
    where
        F: FnOnce(&mut [u8]) -> ComputeResult<usize>,
    {
        if size > self.buf.len() {
            trace!(from = self.buf.len(), to = size, "Growing attribute scratch");
            self.buf.resize(size, 0);
        }
        let written = read(&mut self.buf[..size])?.min(size);
        let bytes = &self.buf[..written];
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).trim().to_string())
    }
}

/// True when a space-separated extension list names [`FP64_EXTENSION`].
pub fn has_double_precision(extensions: &str) -> bool {
    extensions.split_whitespace().any(|ext| ext == FP64_EXTENSION)
}

/// Lists platforms.
pub fn list_platforms<R: ClRuntime>(runtime: &R) -> ComputeResult<Vec<R::Platform>> {
    let platforms = runtime.platforms()?;
    debug!(runtime = runtime.name(), count = platforms.len(), "Enumerated platforms");
    Ok(platforms)
}

/// Lists devices of `category` on `platform`.
pub fn list_devices<R: ClRuntime>(
    runtime: &R,
    platform: R::Platform,
    category: DeviceCategory,
) -> ComputeResult<Vec<R::Device>> {
    let devices = runtime.devices(platform, category)?;
    debug!(?platform, %category, count = devices.len(), "Enumerated devices");
    Ok(devices)
}

/// Multi-line report of every [`PlatformAttribute`].
pub fn describe_platform<R: ClRuntime>(
    runtime: &R,
    platform: R::Platform,
    scratch: &mut AttributeScratch,
) -> ComputeResult<String> {
    let mut report = String::new();
    report.push_str(BANNER);
    report.push_str("\n========== PLATFORM INFORMATION ===============\n");
    report.push_str(BANNER);
    report.push('\n');
    for attr in PlatformAttribute::ALL {
        let value = scratch.platform_attribute(runtime, platform, attr)?;
        report.push_str(&format!("{:<24}{}\n", format!("{}:", attr.label()), value));
    }
    report.push_str("================= END =========================");
    Ok(report)
}
