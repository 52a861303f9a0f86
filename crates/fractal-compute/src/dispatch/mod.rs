//! Kernel launch planning and execution.
//!
//! [`DispatchPlan`] fixes the work geometry and the positional argument
//! table; [`KernelExecutor`] runs it on an open session.

mod executor;
mod planner;

pub use executor::KernelExecutor;
pub use planner::{pad_to_tile, BufferSlot, DispatchPlan, KernelArg, WorkGeometry, ARG_NAMES, KERNEL_NAME, TILE_SIZE};
