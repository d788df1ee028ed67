//! Low-level building blocks for custom dispatch pipelines.
//!
//! These expose device buffers, positional kernel arguments and the distance
//! kernels directly. Most users should prefer [`BlockMatcher`](crate::BlockMatcher).

pub use crate::block::{decode_results, LOCAL_CACHE_CAPACITY};
pub use crate::dispatch::{DispatchBuffers, KernelArg, KernelArgs, NUM_ARGS};
pub use crate::env::{BufferAccess, DeviceBuffer, Program, KERNEL_NAME};
pub use crate::kernel::lanes::LaneKernel;
#[cfg(feature = "simd")]
pub use crate::kernel::simd::{SimdX4, SimdX8};
pub use crate::kernel::{block_sse, block_sse_with, classify, DistanceKernel};
