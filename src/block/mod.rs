//! Block-matching data model: offsets, reference blocks, parameters, results.

use crate::image::ImageView;
use crate::util::{BlockMatchError, BlockMatchResult};

mod params;
mod result;

pub use params::{KernelParams, LOCAL_CACHE_CAPACITY};
pub use result::{decode_results, MatchResult, REJECTED_DISTANCE};

/// Integer 2D offset of a candidate window inside the source image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Offset {
    /// Column of the window's top-left pixel.
    pub x: i32,
    /// Row of the window's top-left pixel.
    pub y: i32,
}

impl Offset {
    /// Creates an offset.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<(i32, i32)> for Offset {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// The fixed patch every candidate is compared against.
///
/// Pixels are stored row-major and contiguous (`stride == width`).
#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceBlock {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl ReferenceBlock {
    /// Creates a block from a contiguous row-major buffer.
    pub fn new(data: Vec<f32>, width: usize, height: usize) -> BlockMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(BlockMatchError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .ok_or(BlockMatchError::InvalidDimensions { width, height })?;
        if data.len() != needed {
            return Err(BlockMatchError::LengthMismatch {
                context: "reference block pixels",
                expected: needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Copies the `width x height` window at `(x, y)` out of an image.
    pub fn from_view(
        image: ImageView<'_, f32>,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> BlockMatchResult<Self> {
        let window = image.window(x, y, width, height)?;
        let mut data = Vec::with_capacity(width * height);
        for row in 0..height {
            let pixels = window.row(row).ok_or(BlockMatchError::BufferTooSmall {
                needed: window.extent(),
                got: window.as_slice().len(),
            })?;
            data.extend_from_slice(pixels);
        }
        Self::new(data, width, height)
    }

    /// Returns the block width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the block height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `width * height`.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false; blocks have at least one pixel.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the pixels in row-major order.
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::{Offset, ReferenceBlock};
    use crate::image::ImageView;
    use crate::util::BlockMatchError;

    #[test]
    fn from_view_copies_window_rows() {
        let data: Vec<f32> = (0..16).map(|v| v as f32).collect();
        let view = ImageView::from_slice(&data, 4, 4).unwrap();
        let block = ReferenceBlock::from_view(view, 1, 2, 2, 2).unwrap();
        assert_eq!(block.data(), &[9.0, 10.0, 13.0, 14.0]);
        assert_eq!((block.width(), block.height()), (2, 2));
    }

    #[test]
    fn new_rejects_wrong_pixel_count() {
        let err = ReferenceBlock::new(vec![0.0; 5], 2, 2).unwrap_err();
        assert_eq!(
            err,
            BlockMatchError::LengthMismatch {
                context: "reference block pixels",
                expected: 4,
                got: 5,
            }
        );
    }

    #[test]
    fn offset_from_tuple() {
        assert_eq!(Offset::from((3, -1)), Offset::new(3, -1));
    }
}
