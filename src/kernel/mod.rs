//! Distance kernels for block matching.
//!
//! A kernel accumulates the sum of squared differences between the reference
//! block and one candidate window. Each row is walked left to right in groups
//! of `LANES` columns; the squared differences of a group are summed lane by
//! lane and then added to the running distance. Columns that do not fill a
//! whole group are added one at a time. The summation order is therefore a
//! function of the vector width only, never of how candidates are scheduled.

use crate::block::KernelParams;

pub mod lanes;
pub(crate) mod workgroup;

#[cfg(feature = "simd")]
pub mod simd;

/// Row accumulation strategy used by the block-matching kernel.
pub trait DistanceKernel {
    /// Number of columns summed per group.
    const LANES: usize;

    /// Adds the squared differences of one row to `dist` and returns it.
    ///
    /// `reference` and `source` have the same length (the block width).
    fn accumulate_row(dist: f32, reference: &[f32], source: &[f32]) -> f32;
}

/// Vector width of the inner accumulation loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VectorWidth {
    /// One column at a time.
    Scalar,
    /// Groups of 4 columns.
    #[default]
    X4,
    /// Groups of 8 columns.
    X8,
}

impl VectorWidth {
    /// Number of columns per group.
    pub fn lanes(self) -> usize {
        match self {
            VectorWidth::Scalar => 1,
            VectorWidth::X4 => 4,
            VectorWidth::X8 => 8,
        }
    }

    /// Maps a lane count back to a width.
    pub fn from_lanes(lanes: usize) -> Option<Self> {
        match lanes {
            1 => Some(VectorWidth::Scalar),
            4 => Some(VectorWidth::X4),
            8 => Some(VectorWidth::X8),
            _ => None,
        }
    }
}

// Grouped kernels use `wide` when available; both paths produce identical sums.
pub(crate) type ScalarKernel = lanes::LaneKernel<1>;
#[cfg(not(feature = "simd"))]
pub(crate) type X4Kernel = lanes::LaneKernel<4>;
#[cfg(not(feature = "simd"))]
pub(crate) type X8Kernel = lanes::LaneKernel<8>;
#[cfg(feature = "simd")]
pub(crate) type X4Kernel = simd::SimdX4;
#[cfg(feature = "simd")]
pub(crate) type X8Kernel = simd::SimdX8;

/// Raw SSE between `reference` and the window of `source` starting at
/// `origin`, using kernel `K`.
///
/// # Panics
///
/// Panics if the window reaches past the end of `source`. Callers check
/// candidates with [`KernelParams::window_origin`] first.
pub fn block_sse<K: DistanceKernel>(
    reference: &[f32],
    source: &[f32],
    origin: usize,
    params: &KernelParams,
) -> f32 {
    let width = params.block_width;
    let mut dist = 0.0f32;
    for (y, ref_row) in reference.chunks_exact(width).take(params.block_height).enumerate() {
        let start = origin + y * params.src_stride;
        dist = K::accumulate_row(dist, ref_row, &source[start..start + width]);
    }
    dist
}

/// [`block_sse`] with the kernel selected at runtime.
pub fn block_sse_with(
    width: VectorWidth,
    reference: &[f32],
    source: &[f32],
    origin: usize,
    params: &KernelParams,
) -> f32 {
    match width {
        VectorWidth::Scalar => block_sse::<ScalarKernel>(reference, source, origin, params),
        VectorWidth::X4 => block_sse::<X4Kernel>(reference, source, origin, params),
        VectorWidth::X8 => block_sse::<X8Kernel>(reference, source, origin, params),
    }
}

/// Applies the acceptance rule to a raw SSE.
///
/// Returns the scaled distance when `0 < distance <= th_sse`. An exact zero
/// (the block compared against itself) and NaN are rejected.
#[inline]
pub fn classify(distance: f32, th_sse: f32, dist_mul: f32) -> Option<f32> {
    (distance > 0.0 && distance <= th_sse).then_some(distance * dist_mul)
}
