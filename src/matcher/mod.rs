//! One-call host round trip: stage, bind, dispatch, read back, decode.

use crate::block::{decode_results, KernelParams, MatchResult, Offset, ReferenceBlock};
use crate::dispatch::{BoundsPolicy, DispatchBuffers};
use crate::env::ComputeEnvironment;
use crate::image::ImageView;
use crate::trace::trace_span;
use crate::util::{BlockMatchError, BlockMatchResult};

/// Acceptance and bounds settings for block matching.
#[derive(Clone, Debug, PartialEq)]
pub struct MatchConfig {
    /// Inclusive upper bound on the raw SSE of an accepted candidate.
    pub th_sse: f32,
    /// Scale applied to accepted distances.
    pub dist_mul: f32,
    /// Handling of candidates whose window leaves the image.
    pub bounds: BoundsPolicy,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            th_sse: f32::INFINITY,
            dist_mul: 1.0,
            bounds: BoundsPolicy::Reject,
        }
    }
}

/// Matches reference blocks against candidate windows of a source image.
pub struct BlockMatcher<'env> {
    env: &'env ComputeEnvironment,
    cfg: MatchConfig,
}

impl<'env> BlockMatcher<'env> {
    /// Creates a matcher with the default configuration.
    pub fn new(env: &'env ComputeEnvironment) -> Self {
        Self {
            env,
            cfg: MatchConfig::default(),
        }
    }

    /// Replaces the match configuration.
    pub fn with_config(mut self, cfg: MatchConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &MatchConfig {
        &self.cfg
    }

    /// Kernel parameters for matching `block` against `image`.
    pub fn params_for(&self, block: &ReferenceBlock, image: ImageView<'_, f32>) -> KernelParams {
        KernelParams {
            block_width: block.width(),
            block_height: block.height(),
            src_stride: image.stride(),
            src_range: image.extent(),
            th_sse: self.cfg.th_sse,
            dist_mul: self.cfg.dist_mul,
        }
    }

    /// Computes one result per candidate, in candidate order.
    ///
    /// Windows must lie inside the image: besides the kernel's stride and
    /// range checks, `x + block_width` must not exceed the image width, so
    /// row padding never takes part in a distance.
    pub fn match_block(
        &self,
        block: &ReferenceBlock,
        image: ImageView<'_, f32>,
        candidates: &[Offset],
    ) -> BlockMatchResult<Vec<MatchResult>> {
        let _span = trace_span!(
            "match_block",
            candidates = candidates.len(),
            block_width = block.width(),
            block_height = block.height()
        )
        .entered();

        let params = self.params_for(block, image);
        let mut outside = Vec::new();
        if image.stride() > image.width() {
            for (index, pos) in candidates.iter().enumerate() {
                let fits = pos.x >= 0
                    && (pos.x as usize)
                        .checked_add(block.width())
                        .is_some_and(|end| end <= image.width());
                if fits {
                    continue;
                }
                match self.cfg.bounds {
                    BoundsPolicy::Reject => {
                        return Err(BlockMatchError::CandidateOutOfBounds {
                            index,
                            x: pos.x,
                            y: pos.y,
                        })
                    }
                    BoundsPolicy::MarkRejected => outside.push(index),
                }
            }
        }

        let source = &image.as_slice()[..params.src_range];
        let mut buffers = DispatchBuffers::stage(self.env, block, source, candidates)?;
        buffers.enqueue(self.env, &params, self.cfg.bounds)?;

        let distances = self.env.download(&buffers.distances)?;
        let positions = self.env.download(&buffers.positions)?;
        let mut results = decode_results(&distances, &positions)?;
        for index in outside {
            results[index] = MatchResult::rejected();
        }
        Ok(results)
    }
}
