//! Context, queue and program lifetime.

use std::path::Path;

use tracing::{debug, error, info, trace};

use crate::{ComputeError, ComputeResult};
use super::ClRuntime;

/// Kernel source file looked up when none is given.
pub const DEFAULT_KERNEL_FILE: &str = "MandelbrotJuliaGenerator.cl";

/// Reads kernel source text.
pub fn load_kernel_source<P: AsRef<Path>>(path: P) -> ComputeResult<String> {
    let path = path.as_ref();
    info!("Program file is: {}", path.display());
    let source = std::fs::read_to_string(path).map_err(|source| ComputeError::InputFile {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(bytes = source.len(), "Loaded kernel source");
    Ok(source)
}

/// Device context, in-order queue and built program.
///
/// Resources are released in reverse order of creation by
/// [`close`](Self::close), which is idempotent and also runs on drop.
/// A failed [`open`](Self::open) releases whatever it had created.
pub struct ComputeSession<'r, R: ClRuntime> {
    runtime: &'r R,
    device: R::Device,
    context: Option<R::Context>,
    queue: Option<R::Queue>,
    program: Option<R::Program>,
}

impl<'r, R: ClRuntime> ComputeSession<'r, R> {
    /// Creates a context and queue on `device` and builds `source` for it.
    ///
    /// A build failure yields [`ComputeError::CompileError`] carrying the
    /// device build log.
    pub fn open(runtime: &'r R, device: R::Device, source: &str) -> ComputeResult<Self> {
        trace!(runtime = runtime.name(), ?device, "ComputeSession::open");

        let context = runtime.create_context(device)?;
        let mut session = Self {
            runtime,
            device,
            context: Some(context),
            queue: None,
            program: None,
        };

        let queue = runtime.create_queue(session.context()?, device)?;
        session.queue = Some(queue);

        let mut program = runtime.create_program(session.context()?, source)?;
        if let Err(err) = runtime.build_program(&mut program, device) {
            let log = runtime
                .build_log(&program, device)
                .unwrap_or_else(|e| format!("<build log unavailable: {e}>"));
            error!(%err, "Kernel build failed");
            error!("Build log:\n{}", log);
            return Err(ComputeError::CompileError { log });
        }
        session.program = Some(program);

        debug!("Compute session ready");
        Ok(session)
    }

    pub fn runtime(&self) -> &'r R {
        self.runtime
    }

    pub fn device(&self) -> R::Device {
        self.device
    }

    pub fn context(&self) -> ComputeResult<&R::Context> {
        self.context.as_ref().ok_or(ComputeError::SessionClosed)
    }

    pub fn queue(&self) -> ComputeResult<&R::Queue> {
        self.queue.as_ref().ok_or(ComputeError::SessionClosed)
    }

    pub fn program(&self) -> ComputeResult<&R::Program> {
        self.program.as_ref().ok_or(ComputeError::SessionClosed)
    }

    pub fn is_open(&self) -> bool {
        self.context.is_some()
    }

    /// Releases program, queue and context. Safe to call more than once.
    pub fn close(&mut self) {
        if let Some(queue) = self.queue.as_ref() {
            if let Err(err) = self.runtime.finish(queue) {
                debug!(%err, "Queue finish before release failed");
            }
        }
        if self.program.take().is_some() {
            trace!("Released program");
        }
        if self.queue.take().is_some() {
            trace!("Released command queue");
        }
        if self.context.take().is_some() {
            debug!("Released context");
        }
    }
}

impl<R: ClRuntime> Drop for ComputeSession<'_, R> {
    fn drop(&mut self) {
        self.close();
    }
}
