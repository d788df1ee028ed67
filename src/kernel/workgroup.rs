//! Work-group execution of the block-matching kernel.
//!
//! The global range of one work item per candidate is split into groups of
//! `local_size` lanes. Each group first stages the reference block into its
//! local cache, every lane copying a strided slice of it, and only after the
//! whole group has staged (the barrier) do lanes compute distances against
//! the cached copy. Groups share nothing and may run in any order or in
//! parallel; each writes a disjoint slice of the outputs.

use crate::block::{KernelParams, Offset, REJECTED_DISTANCE};
use crate::kernel::{
    block_sse, classify, DistanceKernel, ScalarKernel, VectorWidth, X4Kernel, X8Kernel,
};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "rayon")]
use rayon::ThreadPool;

/// Fixed-capacity work-group local storage for the reference block.
pub(crate) struct LocalCache {
    data: Vec<f32>,
}

impl LocalCache {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity],
        }
    }

    /// Copies this lane's share of `reference`: indices `lane`,
    /// `lane + local_size`, `lane + 2 * local_size`, ...
    #[inline]
    fn stage(&mut self, lane: usize, local_size: usize, reference: &[f32]) {
        for i in (lane..reference.len()).step_by(local_size) {
            self.data[i] = reference[i];
        }
    }

    #[inline]
    fn block(&self, len: usize) -> &[f32] {
        &self.data[..len]
    }
}

/// Read-only inputs shared by every work item of a dispatch.
#[derive(Clone, Copy)]
pub(crate) struct KernelInputs<'a> {
    pub(crate) reference: &'a [f32],
    pub(crate) source: &'a [f32],
    pub(crate) candidates: &'a [Offset],
    pub(crate) params: KernelParams,
}

/// Runs one work-group. `distances` and `positions` are the group's slice of
/// the outputs and may be shorter than `local_size` for the last group; the
/// missing lanes still take part in staging.
fn run_group<K: DistanceKernel>(
    group_id: usize,
    local_size: usize,
    inputs: &KernelInputs<'_>,
    cache: &mut LocalCache,
    distances: &mut [f32],
    positions: &mut [Offset],
) {
    let params = &inputs.params;
    let block_len = params.block_len();

    for lane in 0..local_size {
        cache.stage(lane, local_size, &inputs.reference[..block_len]);
    }
    // barrier
    let local_ref = cache.block(block_len);

    let base = group_id * local_size;
    for (lane, (dist_out, pos_out)) in distances.iter_mut().zip(positions.iter_mut()).enumerate() {
        let pos = inputs.candidates[base + lane];
        let accepted = params.window_origin(pos).and_then(|origin| {
            let dist = block_sse::<K>(local_ref, inputs.source, origin, params);
            classify(dist, params.th_sse, params.dist_mul)
        });
        match accepted {
            Some(scaled) => {
                *dist_out = scaled;
                *pos_out = pos;
            }
            None => *dist_out = REJECTED_DISTANCE,
        }
    }
}

fn execute_with<K: DistanceKernel>(
    inputs: &KernelInputs<'_>,
    local_size: usize,
    cache_capacity: usize,
    distances: &mut [f32],
    positions: &mut [Offset],
) {
    let mut cache = LocalCache::new(cache_capacity);
    for (group_id, (dist_chunk, pos_chunk)) in distances
        .chunks_mut(local_size)
        .zip(positions.chunks_mut(local_size))
        .enumerate()
    {
        run_group::<K>(group_id, local_size, inputs, &mut cache, dist_chunk, pos_chunk);
    }
}

#[cfg(feature = "rayon")]
fn execute_with_par<K: DistanceKernel>(
    pool: &ThreadPool,
    inputs: &KernelInputs<'_>,
    local_size: usize,
    cache_capacity: usize,
    distances: &mut [f32],
    positions: &mut [Offset],
) {
    pool.install(|| {
        distances
            .par_chunks_mut(local_size)
            .zip(positions.par_chunks_mut(local_size))
            .enumerate()
            .for_each_init(
                || LocalCache::new(cache_capacity),
                |cache, (group_id, (dist_chunk, pos_chunk))| {
                    run_group::<K>(group_id, local_size, inputs, cache, dist_chunk, pos_chunk);
                },
            );
    });
}

/// Work-group geometry and scheduling for one dispatch.
pub(crate) struct Launch<'p> {
    pub(crate) local_size: usize,
    pub(crate) cache_capacity: usize,
    pub(crate) width: VectorWidth,
    #[cfg(feature = "rayon")]
    pub(crate) pool: Option<&'p ThreadPool>,
    #[cfg(not(feature = "rayon"))]
    pub(crate) _pool: std::marker::PhantomData<&'p ()>,
}

/// Executes every work-group of a dispatch. Returns once all outputs are
/// written.
///
/// Preconditions (checked by the dispatcher): `candidates`, `distances` and
/// `positions` have the same length, the block fits in `cache_capacity`, and
/// `local_size > 0`.
pub(crate) fn execute(
    launch: &Launch<'_>,
    inputs: &KernelInputs<'_>,
    distances: &mut [f32],
    positions: &mut [Offset],
) {
    let local_size = launch.local_size;
    let capacity = launch.cache_capacity;

    #[cfg(feature = "rayon")]
    if let Some(pool) = launch.pool {
        match launch.width {
            VectorWidth::Scalar => execute_with_par::<ScalarKernel>(
                pool, inputs, local_size, capacity, distances, positions,
            ),
            VectorWidth::X4 => {
                execute_with_par::<X4Kernel>(pool, inputs, local_size, capacity, distances, positions)
            }
            VectorWidth::X8 => {
                execute_with_par::<X8Kernel>(pool, inputs, local_size, capacity, distances, positions)
            }
        }
        return;
    }

    match launch.width {
        VectorWidth::Scalar => {
            execute_with::<ScalarKernel>(inputs, local_size, capacity, distances, positions)
        }
        VectorWidth::X4 => execute_with::<X4Kernel>(inputs, local_size, capacity, distances, positions),
        VectorWidth::X8 => execute_with::<X8Kernel>(inputs, local_size, capacity, distances, positions),
    }
}

#[cfg(test)]
mod tests {
    use super::{execute, KernelInputs, Launch, LocalCache};
    use crate::block::{KernelParams, Offset, REJECTED_DISTANCE};
    use crate::kernel::VectorWidth;

    fn sequential(local_size: usize) -> Launch<'static> {
        Launch {
            local_size,
            cache_capacity: 256,
            width: VectorWidth::X4,
            #[cfg(feature = "rayon")]
            pool: None,
            #[cfg(not(feature = "rayon"))]
            _pool: std::marker::PhantomData,
        }
    }

    #[test]
    fn strided_staging_covers_every_element() {
        let reference: Vec<f32> = (0..10).map(|v| v as f32 + 1.0).collect();
        let mut cache = LocalCache::new(16);
        for lane in 0..3 {
            cache.stage(lane, 3, &reference);
        }
        assert_eq!(cache.block(10), reference.as_slice());
    }

    #[test]
    fn padding_lanes_write_nothing() {
        let reference = [1.0, 2.0, 3.0, 4.0];
        let source = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let candidates = [Offset::new(0, 0), Offset::new(4, 0), Offset::new(2, 0)];
        let inputs = KernelInputs {
            reference: &reference,
            source: &source,
            candidates: &candidates,
            params: KernelParams {
                block_width: 4,
                block_height: 1,
                src_stride: 8,
                src_range: 8,
                th_sse: 100.0,
                dist_mul: 1.0,
            },
        };
        let mut distances = [0.0f32; 3];
        let mut positions = [Offset::default(); 3];
        execute(&sequential(4), &inputs, &mut distances, &mut positions);
        assert_eq!(distances, [REJECTED_DISTANCE, 64.0, 16.0]);
        assert_eq!(positions[1], Offset::new(4, 0));
        assert_eq!(positions[2], Offset::new(2, 0));
    }
}
