//! SIMD accumulation using the `wide` crate.
//!
//! The horizontal reduction adds lanes in index order, so these kernels give
//! bit-identical distances to [`LaneKernel`](crate::kernel::lanes::LaneKernel)
//! of the same width.

use crate::kernel::DistanceKernel;
use wide::{f32x4, f32x8};

/// Load 4 f32 values into f32x4.
#[inline]
fn load_f32x4(slice: &[f32]) -> f32x4 {
    f32x4::from([slice[0], slice[1], slice[2], slice[3]])
}

/// Load 8 f32 values into f32x8.
#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

#[inline]
fn hsum4(v: f32x4) -> f32 {
    let arr = v.to_array();
    arr[0] + arr[1] + arr[2] + arr[3]
}

#[inline]
fn hsum8(v: f32x8) -> f32 {
    let arr = v.to_array();
    arr[0] + arr[1] + arr[2] + arr[3] + arr[4] + arr[5] + arr[6] + arr[7]
}

#[inline]
fn remainder_sse(mut dist: f32, reference: &[f32], source: &[f32]) -> f32 {
    for (r, s) in reference.iter().zip(source) {
        let diff = r - s;
        dist += diff * diff;
    }
    dist
}

/// 4-wide SIMD kernel.
pub struct SimdX4;

impl DistanceKernel for SimdX4 {
    const LANES: usize = 4;

    #[inline]
    fn accumulate_row(mut dist: f32, reference: &[f32], source: &[f32]) -> f32 {
        let simd_end = reference.len() / Self::LANES * Self::LANES;
        let mut x = 0;
        while x < simd_end {
            let diff = load_f32x4(&reference[x..]) - load_f32x4(&source[x..]);
            dist += hsum4(diff * diff);
            x += Self::LANES;
        }
        remainder_sse(dist, &reference[simd_end..], &source[simd_end..])
    }
}

/// 8-wide SIMD kernel.
pub struct SimdX8;

impl DistanceKernel for SimdX8 {
    const LANES: usize = 8;

    #[inline]
    fn accumulate_row(mut dist: f32, reference: &[f32], source: &[f32]) -> f32 {
        let simd_end = reference.len() / Self::LANES * Self::LANES;
        let mut x = 0;
        while x < simd_end {
            let diff = load_f32x8(&reference[x..]) - load_f32x8(&source[x..]);
            dist += hsum8(diff * diff);
            x += Self::LANES;
        }
        remainder_sse(dist, &reference[simd_end..], &source[simd_end..])
    }
}

#[cfg(test)]
mod tests {
    use super::{SimdX4, SimdX8};
    use crate::kernel::lanes::LaneKernel;
    use crate::kernel::DistanceKernel;

    fn rows(len: usize) -> (Vec<f32>, Vec<f32>) {
        let reference = (0..len).map(|i| (i as f32 * 0.37).sin() * 100.0).collect();
        let source = (0..len).map(|i| (i as f32 * 0.53).cos() * 100.0).collect();
        (reference, source)
    }

    #[test]
    fn simd_matches_lane_kernels_bitwise() {
        for len in [1, 3, 4, 7, 8, 13, 16, 31] {
            let (reference, source) = rows(len);
            assert_eq!(
                SimdX4::accumulate_row(2.5, &reference, &source).to_bits(),
                LaneKernel::<4>::accumulate_row(2.5, &reference, &source).to_bits()
            );
            assert_eq!(
                SimdX8::accumulate_row(2.5, &reference, &source).to_bits(),
                LaneKernel::<8>::accumulate_row(2.5, &reference, &source).to_bits()
            );
        }
    }
}
