//! Buffer staging, kernel launch and readback.

use fractal_core::{ColorBuffer, BASE_COLOR_LEN};
use tracing::{debug, info, trace, warn};

use crate::backend::session::ComputeSession;
use crate::backend::{BoundArg, ClRuntime, MemAccess};
use crate::ComputeResult;
use super::planner::{BufferSlot, DispatchPlan, KernelArg, ARG_NAMES, KERNEL_NAME};

/// Runs a [`DispatchPlan`] on an open session.
pub struct KernelExecutor<'s, 'r, R: ClRuntime> {
    session: &'s ComputeSession<'r, R>,
}

impl<'s, 'r, R: ClRuntime> KernelExecutor<'s, 'r, R> {
    pub fn new(session: &'s ComputeSession<'r, R>) -> Self {
        Self { session }
    }

    /// Launches the kernel once and returns the image color buffer.
    ///
    /// The base-color upload is queued without blocking; the blocking
    /// readback at the end orders it before the launch and the read on
    /// the in-order queue. Buffers and the kernel are released before
    /// returning, on success and on failure.
    pub fn run(&self, plan: &DispatchPlan, base_color: &[f64; BASE_COLOR_LEN]) -> ComputeResult<ColorBuffer> {
        let runtime = self.session.runtime();
        let queue = self.session.queue()?;

        let result = self.dispatch(plan, base_color);
        if result.is_err() {
            // The queued upload may still reference `base_color`.
            if let Err(err) = runtime.finish(queue) {
                warn!(%err, "Queue finish after failed dispatch");
            }
        }
        result
    }

    fn dispatch(&self, plan: &DispatchPlan, base_color: &[f64; BASE_COLOR_LEN]) -> ComputeResult<ColorBuffer> {
        let runtime = self.session.runtime();
        let context = self.session.context()?;
        let queue = self.session.queue()?;
        let program = self.session.program()?;

        let mut base_buf = runtime.create_buffer(context, MemAccess::ReadOnly, BASE_COLOR_LEN)?;
        let image_buf = runtime.create_buffer(context, MemAccess::WriteOnly, plan.color_len())?;
        debug!(base = BASE_COLOR_LEN, image = plan.color_len(), "Allocated device buffers");

        // SAFETY: `base_color` outlives this call, and the blocking read
        // below (or `finish` in `run` on failure) drains the queue first.
        unsafe { runtime.enqueue_write(queue, &mut base_buf, false, base_color)? };

        let mut kernel = runtime.create_kernel(program, KERNEL_NAME)?;
        for (index, arg) in plan.args.iter().enumerate() {
            trace!(index, name = ARG_NAMES[index], ?arg, "Binding kernel argument");
            let bound = match *arg {
                KernelArg::Int(v) => BoundArg::Int(v),
                KernelArg::Double(v) => BoundArg::Double(v),
                KernelArg::Buffer(BufferSlot::BaseColor) => BoundArg::Buffer(&base_buf),
                KernelArg::Buffer(BufferSlot::ImageColor) => BoundArg::Buffer(&image_buf),
            };
            runtime.set_arg(&mut kernel, index as u32, bound)?;
        }

        let geometry = plan.geometry;
        info!(
            global = ?geometry.global,
            local = ?geometry.local,
            mode = plan.mode.name(),
            "Launching {}",
            KERNEL_NAME
        );
        runtime.enqueue_kernel(queue, &kernel, geometry.global, geometry.local)?;

        let mut color = ColorBuffer::zeros(plan.rows, plan.cols);
        runtime.enqueue_read(queue, &image_buf, color.data_mut())?;

        drop(kernel);
        drop(image_buf);
        drop(base_buf);
        trace!("Released kernel and buffers");
        Ok(color)
    }
}
