use blockmatch::{BlockMatchError, ImageView, OwnedImage, ReferenceBlock};

#[test]
fn image_view_rejects_invalid_dimensions() {
    let data = [0.0f32; 4];

    let err = ImageView::from_slice(&data, 0, 1).err().unwrap();
    assert_eq!(
        err,
        BlockMatchError::InvalidDimensions {
            width: 0,
            height: 1,
        }
    );
}

#[test]
fn image_view_rejects_invalid_stride() {
    let data = [0.0f32; 8];

    let err = ImageView::new(&data, 4, 1, 3).err().unwrap();
    assert_eq!(
        err,
        BlockMatchError::InvalidStride {
            width: 4,
            stride: 3,
        }
    );
}

#[test]
fn image_view_rejects_small_buffer() {
    let data = [0.0f32; 3];

    let err = ImageView::new(&data, 2, 2, 2).err().unwrap();
    assert_eq!(err, BlockMatchError::BufferTooSmall { needed: 4, got: 3 });
}

#[test]
fn window_keeps_parent_stride() {
    let data: Vec<f32> = (0..16).map(|v| v as f32).collect();
    let view = ImageView::from_slice(&data, 4, 4).unwrap();

    let window = view.window(1, 1, 2, 2).unwrap();
    assert_eq!(window.stride(), 4);
    assert_eq!(window.row(0).unwrap(), &[5.0, 6.0]);
    assert_eq!(window.row(1).unwrap(), &[9.0, 10.0]);
    assert_eq!(window.get(0, 0).copied(), Some(5.0));
    assert!(window.get(2, 0).is_none());

    let err = view.window(3, 3, 2, 2).err().unwrap();
    assert_eq!(
        err,
        BlockMatchError::WindowOutOfBounds {
            x: 3,
            y: 3,
            width: 2,
            height: 2,
            img_width: 4,
            img_height: 4,
        }
    );
}

#[test]
fn owned_image_requires_exact_pixel_count() {
    assert!(OwnedImage::new(vec![0.0; 6], 3, 2).is_ok());
    assert!(matches!(
        OwnedImage::new(vec![0.0; 7], 3, 2),
        Err(BlockMatchError::LengthMismatch { .. })
    ));
}

#[test]
fn reference_block_from_padded_view() {
    let data = [1.0f32, 2.0, -9.0, 3.0, 4.0, -9.0];
    let view = ImageView::new(&data, 2, 2, 3).unwrap();
    let block = ReferenceBlock::from_view(view, 0, 0, 2, 2).unwrap();
    assert_eq!(block.data(), &[1.0, 2.0, 3.0, 4.0]);
    assert_eq!(block.len(), 4);
}
