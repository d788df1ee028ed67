//! Portable fixed-width accumulation.
//!
//! `LaneKernel<N>` models an `N`-wide vector with a plain array, summing the
//! lanes of each group in index order exactly like a hardware horizontal add
//! of `s0 + s1 + ... + s(N-1)`.

use crate::kernel::DistanceKernel;

/// Array-backed kernel with `N` lanes per group.
pub struct LaneKernel<const N: usize>;

impl<const N: usize> DistanceKernel for LaneKernel<N> {
    const LANES: usize = N;

    #[inline]
    fn accumulate_row(mut dist: f32, reference: &[f32], source: &[f32]) -> f32 {
        let mut ref_groups = reference.chunks_exact(N);
        let mut src_groups = source.chunks_exact(N);
        for (r, s) in (&mut ref_groups).zip(&mut src_groups) {
            let mut sq = [0.0f32; N];
            for lane in 0..N {
                let diff = r[lane] - s[lane];
                sq[lane] = diff * diff;
            }
            let mut group = sq[0];
            for &value in &sq[1..] {
                group += value;
            }
            dist += group;
        }

        // Scalar remainder
        for (r, s) in ref_groups.remainder().iter().zip(src_groups.remainder()) {
            let diff = r - s;
            dist += diff * diff;
        }
        dist
    }
}
