//! Strided image views and owned `f32` images.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer. The stride counts
//! elements between the starts of consecutive rows, so a stride larger than
//! the width describes padded rows. This is the layout the block-matching
//! kernel addresses: a candidate at `(x, y)` starts at `y * stride + x`.

use crate::util::{BlockMatchError, BlockMatchResult};

#[cfg(feature = "image-io")]
pub mod io;

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> BlockMatchResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(
        data: &'a [T],
        width: usize,
        height: usize,
        stride: usize,
    ) -> BlockMatchResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(BlockMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Number of elements from the first pixel to one past the last pixel.
    ///
    /// Trailing padding after the last row is not included.
    pub fn extent(&self) -> usize {
        (self.height - 1) * self.stride + self.width
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }

    /// Returns a zero-copy view of a window, keeping the parent stride.
    pub fn window(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> BlockMatchResult<ImageView<'a, T>> {
        if width == 0 || height == 0 {
            return Err(BlockMatchError::InvalidDimensions { width, height });
        }
        let out_of_bounds = BlockMatchError::WindowOutOfBounds {
            x,
            y,
            width,
            height,
            img_width: self.width,
            img_height: self.height,
        };
        let end_x = x.checked_add(width).ok_or_else(|| out_of_bounds.clone())?;
        let end_y = y.checked_add(height).ok_or_else(|| out_of_bounds.clone())?;
        if end_x > self.width || end_y > self.height {
            return Err(out_of_bounds);
        }

        let start = y * self.stride + x;
        ImageView::new(&self.data[start..], width, height, self.stride)
    }
}

/// Owned single-channel `f32` image with contiguous rows.
#[derive(Clone, Debug)]
pub struct OwnedImage {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl OwnedImage {
    /// Creates an image from a contiguous row-major buffer.
    pub fn new(data: Vec<f32>, width: usize, height: usize) -> BlockMatchResult<Self> {
        let needed = required_len(width, height, width)?;
        if data.len() != needed {
            return Err(BlockMatchError::LengthMismatch {
                context: "image pixels",
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

    /// Converts an 8-bit view into an owned `f32` image, dropping row padding.
    pub fn from_u8(view: ImageView<'_, u8>) -> Self {
        let mut data = Vec::with_capacity(view.width() * view.height());
        for y in 0..view.height() {
            if let Some(row) = view.row(y) {
                data.extend(row.iter().map(|&v| v as f32));
            }
        }
        Self {
            data,
            width: view.width(),
            height: view.height(),
        }
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, f32> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }

    /// Returns the image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the pixel buffer.
    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> BlockMatchResult<usize> {
    if width == 0 || height == 0 {
        return Err(BlockMatchError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(BlockMatchError::InvalidStride { width, stride });
    }
    (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(BlockMatchError::InvalidDimensions { width, height })
}

#[cfg(test)]
mod tests {
    use super::{ImageView, OwnedImage};

    #[test]
    fn extent_excludes_trailing_padding() {
        let data = [0.0f32; 10];
        let view = ImageView::new(&data, 3, 2, 5).unwrap();
        assert_eq!(view.extent(), 8);
    }

    #[test]
    fn from_u8_drops_row_padding() {
        let data = [1u8, 2, 99, 3, 4, 99];
        let view = ImageView::new(&data, 2, 2, 3).unwrap();
        let owned = OwnedImage::from_u8(view);
        assert_eq!(owned.data(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(owned.view().stride(), 2);
    }
}
