//! Per-dispatch kernel parameters and their preconditions.

use crate::block::Offset;
use crate::util::{BlockMatchError, BlockMatchResult};

/// Default capacity, in elements, of the work-group local reference cache.
pub const LOCAL_CACHE_CAPACITY: usize = 256;

/// Tunables for one dispatch. Immutable while the dispatch runs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KernelParams {
    /// Reference block width in pixels.
    pub block_width: usize,
    /// Reference block height in pixels.
    pub block_height: usize,
    /// Source image row pitch in elements.
    pub src_stride: usize,
    /// Number of addressable elements in the source buffer.
    pub src_range: usize,
    /// Acceptance threshold on the raw SSE (inclusive).
    pub th_sse: f32,
    /// Scale applied to accepted distances.
    pub dist_mul: f32,
}

impl KernelParams {
    /// Returns `block_width * block_height`.
    pub fn block_len(&self) -> usize {
        self.block_width * self.block_height
    }

    /// Checks every precondition the kernel relies on.
    ///
    /// `capacity` is the local cache size of the program the params will be
    /// dispatched to.
    pub fn validate(&self, capacity: usize) -> BlockMatchResult<()> {
        if self.block_width == 0 || self.block_height == 0 {
            return Err(BlockMatchError::InvalidDimensions {
                width: self.block_width,
                height: self.block_height,
            });
        }
        let elements = self
            .block_width
            .checked_mul(self.block_height)
            .ok_or(BlockMatchError::InvalidDimensions {
                width: self.block_width,
                height: self.block_height,
            })?;
        if elements > capacity {
            return Err(BlockMatchError::BlockTooLarge { elements, capacity });
        }
        if self.src_stride < self.block_width {
            return Err(BlockMatchError::InvalidStride {
                width: self.block_width,
                stride: self.src_stride,
            });
        }
        if self.th_sse.is_nan() {
            return Err(BlockMatchError::InvalidParameter("th_sse must not be NaN"));
        }
        if !self.dist_mul.is_finite() || self.dist_mul < 0.0 {
            return Err(BlockMatchError::InvalidParameter(
                "dist_mul must be finite and non-negative",
            ));
        }
        Ok(())
    }

    /// Returns the buffer index of the candidate window origin, or `None`
    /// when any pixel of the window falls outside the addressable source.
    ///
    /// A window must not wrap across rows: `x + block_width <= src_stride`.
    pub fn window_origin(&self, offset: Offset) -> Option<usize> {
        if offset.x < 0 || offset.y < 0 {
            return None;
        }
        let x = offset.x as usize;
        let y = offset.y as usize;
        if x.checked_add(self.block_width)? > self.src_stride {
            return None;
        }
        let last_row = y.checked_add(self.block_height - 1)?;
        let end = last_row
            .checked_mul(self.src_stride)?
            .checked_add(x)?
            .checked_add(self.block_width)?;
        if end > self.src_range {
            return None;
        }
        Some(y * self.src_stride + x)
    }
}

#[cfg(test)]
mod tests {
    use super::{KernelParams, LOCAL_CACHE_CAPACITY};
    use crate::block::Offset;
    use crate::util::BlockMatchError;

    fn params(block_width: usize, block_height: usize) -> KernelParams {
        KernelParams {
            block_width,
            block_height,
            src_stride: 16,
            src_range: 64,
            th_sse: 10.0,
            dist_mul: 1.0,
        }
    }

    #[test]
    fn capacity_is_inclusive() {
        assert!(params(16, 16).validate(LOCAL_CACHE_CAPACITY).is_ok());
        let err = params(16, 17).validate(LOCAL_CACHE_CAPACITY).unwrap_err();
        assert_eq!(
            err,
            BlockMatchError::BlockTooLarge {
                elements: 272,
                capacity: 256,
            }
        );
    }

    #[test]
    fn rejects_negative_or_nan_scalars() {
        let mut p = params(4, 4);
        p.dist_mul = -2.0;
        assert!(matches!(
            p.validate(LOCAL_CACHE_CAPACITY),
            Err(BlockMatchError::InvalidParameter(_))
        ));
        p.dist_mul = 1.0;
        p.th_sse = f32::NAN;
        assert!(matches!(
            p.validate(LOCAL_CACHE_CAPACITY),
            Err(BlockMatchError::InvalidParameter(_))
        ));
    }

    #[test]
    fn window_origin_checks_rows_and_range() {
        let p = params(4, 2);
        assert_eq!(p.window_origin(Offset::new(12, 2)), Some(44));
        assert_eq!(p.window_origin(Offset::new(13, 0)), None);
        assert_eq!(p.window_origin(Offset::new(0, 3)), None);
        assert_eq!(p.window_origin(Offset::new(-1, 0)), None);
    }
}
