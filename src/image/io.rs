//! Image loading via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::{ImageView, OwnedImage};
use crate::util::{BlockMatchError, BlockMatchResult};
use std::path::Path;

/// Converts a grayscale image buffer into an owned `f32` image.
pub fn owned_from_gray_image(img: &image::GrayImage) -> BlockMatchResult<OwnedImage> {
    let width = img.width() as usize;
    let height = img.height() as usize;
    let view = ImageView::from_slice(img.as_raw().as_slice(), width, height)?;
    Ok(OwnedImage::from_u8(view))
}

/// Converts any decoded image to luma and then to an owned `f32` image.
pub fn owned_from_dynamic_image(img: &image::DynamicImage) -> BlockMatchResult<OwnedImage> {
    owned_from_gray_image(&img.to_luma8())
}

/// Loads an image from disk as a grayscale `f32` image.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> BlockMatchResult<OwnedImage> {
    let img = image::open(path).map_err(|err| BlockMatchError::ImageIo {
        reason: err.to_string(),
    })?;
    owned_from_dynamic_image(&img)
}
